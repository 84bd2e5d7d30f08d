//! Stability detection: a position read mid-animation is worthless, so a
//! reading is only trusted once the extractor returns it unchanged across
//! consecutive polls.

use std::time::Duration;

use tracing::{debug, warn};

use chess_core::fen::Fen;

use crate::extract::extract_position;
use crate::snapshot::BoardReader;

/// Consecutive confirming reads required after the baseline.
pub const REQUIRED_CONFIRMATIONS: u32 = 2;
/// Polling attempts before giving up on stability.
pub const MAX_POLLS: u32 = 10;
/// Delay between polls.
pub const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Outcome of feeding one reading to the detector.
#[derive(Debug, Clone, PartialEq)]
pub enum Poll<T> {
    /// Keep polling.
    Pending,
    /// Reading confirmed unchanged across consecutive polls.
    Settled(T),
    /// Poll cap reached without confirmation; last reading, degraded
    /// confidence.
    SettledUnconfirmed(T),
    /// Poll cap reached without any successful reading.
    Abandoned,
}

/// Explicit poll-driven state machine. Timer-free: the caller decides when
/// to poll, so tests can drive it with a plain reading sequence.
#[derive(Debug, Default)]
pub struct StabilityDetector<T> {
    baseline: Option<T>,
    confirmations: u32,
    polls: u32,
}

impl<T: PartialEq + Clone> StabilityDetector<T> {
    pub fn new() -> Self {
        Self {
            baseline: None,
            confirmations: 0,
            polls: 0,
        }
    }

    /// Feed one extraction result (`None` = extraction failed this tick).
    pub fn observe(&mut self, reading: Option<T>) -> Poll<T> {
        self.polls += 1;

        if let Some(reading) = reading {
            if self.baseline.as_ref() == Some(&reading) {
                self.confirmations += 1;
                if self.confirmations >= REQUIRED_CONFIRMATIONS {
                    return Poll::Settled(reading);
                }
            } else {
                // New reading becomes the baseline; confirmations restart
                self.baseline = Some(reading);
                self.confirmations = 0;
            }
        }

        if self.polls >= MAX_POLLS {
            match self.baseline.take() {
                Some(last) => Poll::SettledUnconfirmed(last),
                None => Poll::Abandoned,
            }
        } else {
            Poll::Pending
        }
    }
}

/// Poll the reader every [`POLL_INTERVAL`] until the extracted position
/// settles. Returns the position and whether it was confirmed, or `None`
/// when no position could be extracted at all.
pub async fn settle<R: BoardReader>(reader: &mut R) -> Option<(Fen, bool)> {
    let mut detector: StabilityDetector<Fen> = StabilityDetector::new();

    loop {
        let reading = reader.snapshot().and_then(|snapshot| {
            match extract_position(&snapshot) {
                Ok(fen) => Some(fen),
                Err(e) => {
                    debug!(error = %e, "extraction failed during stability poll");
                    None
                }
            }
        });

        match detector.observe(reading) {
            Poll::Pending => tokio::time::sleep(POLL_INTERVAL).await,
            Poll::Settled(fen) => {
                debug!(fen = %fen, "position settled");
                return Some((fen, true));
            }
            Poll::SettledUnconfirmed(fen) => {
                warn!(fen = %fen, "poll cap reached without stability, using last reading");
                return Some((fen, false));
            }
            Poll::Abandoned => {
                warn!("failed to extract a position after {MAX_POLLS} polls");
                return None;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settles_on_final_reading_after_change() {
        // [A, A, B, B, B] must settle on B, on the third B
        let mut detector = StabilityDetector::new();
        assert_eq!(detector.observe(Some("A")), Poll::Pending);
        assert_eq!(detector.observe(Some("A")), Poll::Pending);
        assert_eq!(detector.observe(Some("B")), Poll::Pending);
        assert_eq!(detector.observe(Some("B")), Poll::Pending);
        assert_eq!(detector.observe(Some("B")), Poll::Settled("B"));
    }

    #[test]
    fn test_settles_after_three_identical_reads() {
        let mut detector = StabilityDetector::new();
        assert_eq!(detector.observe(Some("A")), Poll::Pending);
        assert_eq!(detector.observe(Some("A")), Poll::Pending);
        assert_eq!(detector.observe(Some("A")), Poll::Settled("A"));
    }

    #[test]
    fn test_failed_extractions_do_not_reset_baseline() {
        let mut detector = StabilityDetector::new();
        assert_eq!(detector.observe(Some("A")), Poll::Pending);
        assert_eq!(detector.observe(None), Poll::Pending);
        assert_eq!(detector.observe(Some("A")), Poll::Pending);
        assert_eq!(detector.observe(Some("A")), Poll::Settled("A"));
    }

    #[test]
    fn test_poll_cap_emits_last_reading_unconfirmed() {
        let mut detector = StabilityDetector::new();
        // Alternate readings so confirmation never accumulates
        for i in 0..(MAX_POLLS - 1) {
            let reading = if i % 2 == 0 { "A" } else { "B" };
            assert_eq!(detector.observe(Some(reading)), Poll::Pending);
        }
        assert_eq!(
            detector.observe(Some("A")),
            Poll::SettledUnconfirmed("A")
        );
    }

    #[test]
    fn test_poll_cap_without_any_reading_abandons() {
        let mut detector: StabilityDetector<&str> = StabilityDetector::new();
        for _ in 0..(MAX_POLLS - 1) {
            assert_eq!(detector.observe(None), Poll::Pending);
        }
        assert_eq!(detector.observe(None), Poll::Abandoned);
    }
}
