//! Analysis scheduling: deduplication, single-flight, cooldown, and
//! coalescing over settled descriptors.
//!
//! The admission rules live in a timer-free state machine; the async side
//! (timeout, fallback substitution) wraps the advisory call itself.

use std::time::{Duration, Instant};

use tracing::{debug, error, warn};

use chess_core::fen::Fen;
use chess_core::plausibility::is_plausible;

use crate::advisor::{Advisor, AnalysisRequest};
use crate::parse::AnalysisResult;

/// Minimum interval between dispatched analyses.
pub const ANALYSIS_COOLDOWN: Duration = Duration::from_secs(2);
/// Delay before a coalesced descriptor is re-admitted after completion.
pub const REDISPATCH_DELAY: Duration = Duration::from_millis(500);

/// Substituted when a suggestion fails the plausibility check. A quiet
/// developing move is always safer to show than a hallucinated capture.
pub const FALLBACK_MOVE: &str = "Nf3";
pub const FALLBACK_REASONING: &str = "The suggested move failed a plausibility check; \
develop a knight toward the center and wait for the next analysis.";

/// Admission verdict for one settled descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Dispatch now; in-flight state has been taken.
    Dispatch,
    /// Parked in the pending slot (in flight or inside the cooldown).
    Deferred,
    /// Same placement and side as the last dispatch; dropped silently.
    Duplicate,
}

/// Scheduler bookkeeping. At most one request is in flight and at most one
/// descriptor is pending; newer descriptors overwrite older pending ones.
#[derive(Debug)]
pub struct SchedulerState {
    in_flight: bool,
    last_dispatch: Option<Instant>,
    last_key: Option<String>,
    pending: Option<Fen>,
    cooldown: Duration,
}

impl Default for SchedulerState {
    fn default() -> Self {
        Self::new(ANALYSIS_COOLDOWN)
    }
}

impl SchedulerState {
    pub fn new(cooldown: Duration) -> Self {
        Self {
            in_flight: false,
            last_dispatch: None,
            last_key: None,
            pending: None,
            cooldown,
        }
    }

    /// Apply the admission rules in priority order. `priority` marks the
    /// local user's turn right after the opponent's completed move, which
    /// bypasses the cooldown (never the single-flight guarantee).
    pub fn admit(&mut self, fen: &Fen, now: Instant, priority: bool) -> Decision {
        let key = fen.board_turn_key();

        if self.last_key.as_deref() == Some(key.as_str()) {
            debug!("position already analyzed, dropping");
            return Decision::Duplicate;
        }

        if self.in_flight {
            debug!("analysis in flight, parking descriptor in pending slot");
            self.pending = Some(fen.clone());
            return Decision::Deferred;
        }

        if let Some(last) = self.last_dispatch {
            if now.duration_since(last) < self.cooldown && !priority {
                debug!("inside cooldown, parking descriptor in pending slot");
                self.pending = Some(fen.clone());
                return Decision::Deferred;
            }
        }

        self.in_flight = true;
        self.last_dispatch = Some(now);
        self.last_key = Some(key);
        Decision::Dispatch
    }

    /// Clear in-flight state after a request finishes (success, failure, or
    /// timeout) and take whatever descriptor coalesced in the meantime.
    pub fn complete(&mut self) -> Option<Fen> {
        self.in_flight = false;
        self.pending.take()
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight
    }
}

/// Await the advisory call under a hard timeout. Failures and timeouts
/// degrade to the "analysis unavailable" sentinel; the caller's in-flight
/// state is cleared either way.
pub async fn run_analysis<A: Advisor>(
    advisor: &A,
    request: &AnalysisRequest,
    timeout: Duration,
) -> AnalysisResult {
    match tokio::time::timeout(timeout, advisor.analyze(request)).await {
        Ok(Ok(result)) => result,
        Ok(Err(e)) => {
            error!(error = %e, "advisory request failed");
            AnalysisResult::unavailable("the advisory service could not be reached")
        }
        Err(_) => {
            error!(timeout_secs = timeout.as_secs(), "advisory request timed out");
            AnalysisResult::unavailable("the analysis request timed out")
        }
    }
}

/// Post-hoc plausibility check on the suggestion. Rejection substitutes the
/// fixed fallback rather than surfacing an error.
pub fn vet_result(fen: &Fen, mut result: AnalysisResult) -> AnalysisResult {
    if !is_plausible(fen, &result.best_move) {
        warn!(
            suggested = %result.best_move,
            "suggested move failed plausibility check, substituting fallback"
        );
        result.best_move = FALLBACK_MOVE.to_string();
        result.move_reasoning = Some(FALLBACK_REASONING.to_string());
    }
    result
}
