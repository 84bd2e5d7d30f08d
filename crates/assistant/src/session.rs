//! Session state and the main pipeline loop.
//!
//! A session covers one stretch of active assistance: player color is
//! detected once when the session starts, then mutation triggers drive
//! settle cycles whose settled positions flow through the scheduler into
//! advisory calls. Deactivation tears the session down; reactivation
//! builds a fresh one.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{broadcast, mpsc, watch};
use tracing::{debug, info, warn};

use board_reader::color::ensure_color;
use board_reader::observer::{BoardMutation, ChangeObserver, ANIMATION_GRACE};
use board_reader::snapshot::BoardReader;
use board_reader::{extract_position, stability};
use chess_core::context::advisory_context;
use chess_core::fen::{Color, Fen};

use crate::advisor::{Advisor, AnalysisRequest};
use crate::config::Config;
use crate::control::Notification;
use crate::history::{MoveHistory, HISTORY_CAP};
use crate::parse::AnalysisResult;
use crate::scheduler::{run_analysis, vet_result, Decision, SchedulerState, REDISPATCH_DELAY};

/// In the first couple of turns the position is analyzed no matter whose
/// turn it is, so the user gets opening guidance immediately.
const ALWAYS_ANALYZE_TURNS: u32 = 2;

/// Driver timestamps come from the tokio clock; a time-paused runtime then
/// controls debounce and cooldown along with the timers.
fn clock_now() -> Instant {
    tokio::time::Instant::now().into_std()
}

/// Per-session mutable state.
pub struct Session {
    player_color: Color,
    history: MoveHistory,
    scheduler: SchedulerState,
    current_fen: Option<String>,
    turn_count: u32,
}

/// What a settled position amounts to once session state is applied.
#[derive(Debug)]
pub enum Accepted {
    /// Unchanged, not our turn, or held back by the scheduler.
    Ignored,
    /// Failed structural validation; surfaced to the user as a sentinel.
    Invalid(String),
    /// Admitted for analysis right now.
    Dispatch(AnalysisRequest),
}

impl Session {
    pub fn new(player_color: Color, cooldown: Duration) -> Self {
        Self {
            player_color,
            history: MoveHistory::new(),
            scheduler: SchedulerState::new(cooldown),
            current_fen: None,
            turn_count: 0,
        }
    }

    pub fn player_color(&self) -> Color {
        self.player_color
    }

    /// Apply one settled position: dedupe against the position already on
    /// screen, validate, record it, and ask the scheduler for a verdict.
    pub fn accept(&mut self, fen: &Fen, now: Instant) -> Accepted {
        let serialized = fen.to_string();
        if self.current_fen.as_deref() == Some(serialized.as_str()) {
            debug!("settled position unchanged, ignoring");
            return Accepted::Ignored;
        }

        if let Err(e) = fen.validate() {
            return Accepted::Invalid(e.to_string());
        }

        self.current_fen = Some(serialized.clone());
        self.turn_count += 1;
        self.history.push(serialized);

        let player_to_move = fen.side_to_move == self.player_color;
        if !player_to_move && self.turn_count > ALWAYS_ANALYZE_TURNS {
            debug!("opponent to move, skipping analysis");
            return Accepted::Ignored;
        }

        match self.try_dispatch(fen, now, player_to_move) {
            Some(request) => Accepted::Dispatch(request),
            None => Accepted::Ignored,
        }
    }

    /// Run the scheduler's admission rules and build the request on
    /// dispatch. Also used to re-admit a coalesced position after the
    /// in-flight request completes.
    pub fn try_dispatch(&mut self, fen: &Fen, now: Instant, priority: bool) -> Option<AnalysisRequest> {
        match self.scheduler.admit(fen, now, priority) {
            Decision::Dispatch => Some(self.build_request(fen)),
            Decision::Deferred | Decision::Duplicate => None,
        }
    }

    /// Clear in-flight state and take the coalesced position, if any.
    pub fn complete(&mut self) -> Option<Fen> {
        self.scheduler.complete()
    }

    fn build_request(&self, fen: &Fen) -> AnalysisRequest {
        let history = self.history.tail(HISTORY_CAP);
        AnalysisRequest {
            fen: fen.to_string(),
            side_to_move: fen.side_to_move,
            player_color: self.player_color,
            context: advisory_context(fen, &history),
            history,
        }
    }
}

/// Drive sessions for as long as the process lives. Waits out inactive
/// stretches on the activation flag, runs one session per active stretch.
pub async fn run_pipeline<A, R>(
    advisor: Arc<A>,
    mut reader: R,
    config: Config,
    mut mutations_rx: mpsc::Receiver<BoardMutation>,
    notify_tx: broadcast::Sender<Notification>,
    mut active_rx: watch::Receiver<bool>,
) where
    A: Advisor + 'static,
    R: BoardReader + Send,
{
    loop {
        if !*active_rx.borrow() {
            if active_rx.changed().await.is_err() {
                return;
            }
            continue;
        }

        let color = ensure_color(&mut reader).await;
        let mut session = Session::new(color, config.analysis_cooldown);
        info!(%color, "session started");

        let shutdown = run_session(
            &advisor,
            &mut reader,
            &config,
            &mut mutations_rx,
            &notify_tx,
            &mut active_rx,
            &mut session,
        )
        .await;
        info!("session ended");
        if shutdown {
            return;
        }
    }
}

/// One active stretch. Returns true when the process should shut down
/// (a channel closed), false when the session was merely deactivated.
async fn run_session<A, R>(
    advisor: &Arc<A>,
    reader: &mut R,
    config: &Config,
    mutations_rx: &mut mpsc::Receiver<BoardMutation>,
    notify_tx: &broadcast::Sender<Notification>,
    active_rx: &mut watch::Receiver<bool>,
    session: &mut Session,
) -> bool
where
    A: Advisor + 'static,
    R: BoardReader + Send,
{
    let mut observer = ChangeObserver::new();
    let (done_tx, mut done_rx) = mpsc::channel::<AnalysisResult>(8);
    let (readmit_tx, mut readmit_rx) = mpsc::channel::<Fen>(8);

    // Analyze whatever is on screen before the first move arrives
    if let Some(snapshot) = reader.snapshot() {
        match extract_position(&snapshot) {
            Ok(fen) => process_settled(advisor, config, notify_tx, session, fen, &done_tx),
            Err(e) => debug!(error = %e, "initial position not extractable yet"),
        }
    }

    loop {
        tokio::select! {
            changed = active_rx.changed() => {
                if changed.is_err() {
                    return true;
                }
                if !*active_rx.borrow() {
                    return false;
                }
            }
            mutation = mutations_rx.recv() => {
                let Some(mutation) = mutation else { return true };
                if !observer.accept(&mutation, clock_now()) {
                    continue;
                }
                tokio::time::sleep(ANIMATION_GRACE).await;
                if let Some((fen, confirmed)) = stability::settle(reader).await {
                    if !confirmed {
                        warn!("proceeding with unconfirmed reading");
                    }
                    process_settled(advisor, config, notify_tx, session, fen, &done_tx);
                }
            }
            Some(result) = done_rx.recv() => {
                let _ = notify_tx.send(Notification::Analysis(result));
                if let Some(pending) = session.complete() {
                    let readmit_tx = readmit_tx.clone();
                    tokio::spawn(async move {
                        tokio::time::sleep(REDISPATCH_DELAY).await;
                        let _ = readmit_tx.send(pending).await;
                    });
                }
            }
            Some(fen) = readmit_rx.recv() => {
                let priority = fen.side_to_move == session.player_color();
                if let Some(request) = session.try_dispatch(&fen, clock_now(), priority) {
                    spawn_analysis(advisor, config, fen, request, done_tx.clone());
                }
            }
        }
    }
}

fn process_settled<A: Advisor + 'static>(
    advisor: &Arc<A>,
    config: &Config,
    notify_tx: &broadcast::Sender<Notification>,
    session: &mut Session,
    fen: Fen,
    done_tx: &mpsc::Sender<AnalysisResult>,
) {
    match session.accept(&fen, clock_now()) {
        Accepted::Ignored => {}
        Accepted::Invalid(reason) => {
            warn!(%reason, "settled position failed validation");
            let _ = notify_tx.send(Notification::Analysis(AnalysisResult::invalid_position(
                &reason,
            )));
        }
        Accepted::Dispatch(request) => {
            spawn_analysis(advisor, config, fen, request, done_tx.clone());
        }
    }
}

fn spawn_analysis<A: Advisor + 'static>(
    advisor: &Arc<A>,
    config: &Config,
    fen: Fen,
    request: AnalysisRequest,
    done_tx: mpsc::Sender<AnalysisResult>,
) {
    let advisor = Arc::clone(advisor);
    let timeout = config.analysis_timeout;
    info!(fen = %request.fen, "dispatching analysis");
    tokio::spawn(async move {
        let result = run_analysis(advisor.as_ref(), &request, timeout).await;
        let result = vet_result(&fen, result);
        let _ = done_tx.send(result).await;
    });
}
