//! End-to-end pipeline test: mutation events drive settle cycles, settled
//! positions flow through the scheduler, and advisory results come back on
//! the notification broadcast. Uses a scripted reader and a slow stub
//! advisor under a paused clock.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::{broadcast, mpsc, watch};

use assistant::advisor::{Advisor, AnalysisRequest};
use assistant::control::Notification;
use assistant::error::AssistantError;
use assistant::parse::AnalysisResult;
use assistant::session::run_pipeline;
use assistant::Config;
use board_reader::observer::BoardMutation;
use board_reader::snapshot::{BoardReader, BoardSnapshot, PieceSprite};
use chess_core::fen::{Fen, PieceKind};

// A short Italian-game sequence, one position per completed full move,
// always with White to move.
const POSITIONS: [&str; 5] = [
    "rnbqkbnr/pppp1ppp/8/4p3/4P3/8/PPPP1PPP/RNBQKBNR w KQkq - 0 2",
    "r1bqkbnr/pppp1ppp/2n5/4p3/4P3/5N2/PPPP1PPP/RNBQKB1R w KQkq - 0 3",
    "r1bqk1nr/pppp1ppp/2n5/2b1p3/2B1P3/5N2/PPPP1PPP/RNBQK2R w KQkq - 0 4",
    "r1bqk2r/pppp1ppp/2n2n2/2b1p3/2B1P3/2P2N2/PP1P1PPP/RNBQK2R w KQkq - 0 5",
    "r1bqk2r/pppp1ppp/2n2n2/2b5/2BpP3/2P2N2/PP3PPP/RNBQK2R w KQkq - 0 6",
];

fn sprites_from_fen(fen: &str, board_width: f64) -> Vec<PieceSprite> {
    let position: Fen = fen.parse().unwrap();
    let square = board_width / 8.0;
    position
        .placement
        .pieces()
        .map(|(file, rank, piece)| {
            let kind = match piece.kind {
                PieceKind::Pawn => "pawn",
                PieceKind::Knight => "knight",
                PieceKind::Bishop => "bishop",
                PieceKind::Rook => "rook",
                PieceKind::Queen => "queen",
                PieceKind::King => "king",
            };
            PieceSprite {
                class_hint: format!("{} {kind}", piece.color),
                x: file as f64 * square + 2.0,
                y: rank as f64 * square + 2.0,
            }
        })
        .collect()
}

fn snapshot_for(fen: &str, move_count: usize) -> BoardSnapshot {
    BoardSnapshot {
        board_width: 800.0,
        pieces: sprites_from_fen(fen, 800.0),
        move_count,
        turn_hint: Some("White to play".to_string()),
    }
}

/// Enough to detect the local color, too sparse to extract a position.
fn rendering_snapshot() -> BoardSnapshot {
    BoardSnapshot {
        board_width: 800.0,
        pieces: vec![PieceSprite {
            class_hint: "white pawn".to_string(),
            x: 100.0,
            y: 700.0,
        }],
        move_count: 0,
        turn_hint: None,
    }
}

#[derive(Clone)]
struct ScriptedReader(Arc<Mutex<BoardSnapshot>>);

impl BoardReader for ScriptedReader {
    fn snapshot(&mut self) -> Option<BoardSnapshot> {
        Some(self.0.lock().unwrap().clone())
    }
}

/// Stub advisor that takes five seconds per call and echoes the analyzed
/// position in the reasoning field.
struct SlowAdvisor {
    calls: Arc<AtomicUsize>,
}

impl Advisor for SlowAdvisor {
    fn analyze(
        &self,
        request: &AnalysisRequest,
    ) -> impl std::future::Future<Output = Result<AnalysisResult, AssistantError>> + Send {
        let calls = self.calls.clone();
        let fen = request.fen.clone();
        async move {
            calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(AnalysisResult {
                evaluation: 0.2,
                best_move: "Nc3".to_string(),
                move_reasoning: Some(fen),
                depth: 10,
                alternative_moves: Vec::new(),
            })
        }
    }
}

#[tokio::test(start_paused = true)]
async fn test_burst_of_moves_coalesces_to_two_dispatches() {
    let calls = Arc::new(AtomicUsize::new(0));
    let board = Arc::new(Mutex::new(rendering_snapshot()));

    let (mutation_tx, mutation_rx) = mpsc::channel(16);
    let (_active_tx, active_rx) = watch::channel(true);
    let (notify_tx, mut notify_rx) = broadcast::channel(16);

    let config = Config {
        advisor_url: String::new(),
        advisor_api_key: String::new(),
        advisor_model: String::new(),
        analysis_cooldown: Duration::from_secs(2),
        analysis_timeout: Duration::from_secs(25),
        snapshot_feed: "-".to_string(),
    };

    tokio::spawn(run_pipeline(
        Arc::new(SlowAdvisor {
            calls: calls.clone(),
        }),
        ScriptedReader(board.clone()),
        config,
        mutation_rx,
        notify_tx,
        active_rx,
    ));

    // Five moves land while the first advisory call is still in flight
    for (i, fen) in POSITIONS.iter().enumerate() {
        *board.lock().unwrap() = snapshot_for(fen, i + 1);
        mutation_tx
            .send(BoardMutation::MoveCounterChanged { count: i + 1 })
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(700)).await;
    }

    // Let the in-flight call finish and the coalesced position re-dispatch
    tokio::time::sleep(Duration::from_secs(12)).await;

    assert_eq!(calls.load(Ordering::SeqCst), 2);

    let first = match notify_rx.recv().await.unwrap() {
        Notification::Analysis(result) => result,
        other => panic!("unexpected notification: {other:?}"),
    };
    // First dispatch analyzed the first settled position
    assert!(first
        .move_reasoning
        .as_deref()
        .unwrap()
        .starts_with("rnbqkbnr/pppp1ppp/8/4p3"));

    let second = match notify_rx.recv().await.unwrap() {
        Notification::Analysis(result) => result,
        other => panic!("unexpected notification: {other:?}"),
    };
    // The intermediate positions coalesced away; only the newest survived
    assert!(second.move_reasoning.as_deref().unwrap().contains("2BpP3"));
    assert_eq!(second.best_move, "Nc3");

    // Nothing else was dispatched
    assert!(notify_rx.try_recv().is_err());
}
