//! Change observation: filters page mutations down to the ones that indicate
//! a move, and collapses the burst of mutation events one physical move
//! produces into a single trigger.

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

/// Minimum interval between settle triggers; one physical move fires many
/// mutation events in a burst.
pub const MIN_TRIGGER_INTERVAL: Duration = Duration::from_millis(300);

/// Grace delay before the first stability poll, letting the piece-drop
/// animation start resolving.
pub const ANIMATION_GRACE: Duration = Duration::from_millis(300);

/// A mutation observed on the page, already categorized by the shim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BoardMutation {
    /// The number of move-notation indicator elements changed.
    MoveCounterChanged { count: usize },
    /// A "last move" highlight marker appeared.
    LastMoveMarker,
    /// A piece element's position-bearing attribute mutated directly.
    PieceTransformChanged,
    /// Anything else on the page.
    Other,
}

/// Debouncing filter over the mutation stream.
#[derive(Debug, Default)]
pub struct ChangeObserver {
    last_trigger: Option<Instant>,
    last_move_count: Option<usize>,
}

impl ChangeObserver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true when this mutation should start a settle cycle.
    pub fn accept(&mut self, mutation: &BoardMutation, now: Instant) -> bool {
        if !self.is_move_indicating(mutation) {
            return false;
        }

        if let Some(last) = self.last_trigger {
            if now.duration_since(last) < MIN_TRIGGER_INTERVAL {
                return false;
            }
        }

        self.last_trigger = Some(now);
        true
    }

    fn is_move_indicating(&mut self, mutation: &BoardMutation) -> bool {
        match mutation {
            BoardMutation::MoveCounterChanged { count } => {
                // A repeat of the same count is a re-render, not a move
                let changed = self.last_move_count != Some(*count);
                self.last_move_count = Some(*count);
                changed
            }
            BoardMutation::LastMoveMarker | BoardMutation::PieceTransformChanged => true,
            BoardMutation::Other => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_move_counter_change_triggers_once() {
        let mut observer = ChangeObserver::new();
        let t0 = Instant::now();

        assert!(observer.accept(&BoardMutation::MoveCounterChanged { count: 5 }, t0));
        // Same count again, well past the debounce window: not a move
        assert!(!observer.accept(
            &BoardMutation::MoveCounterChanged { count: 5 },
            t0 + Duration::from_secs(2)
        ));
        assert!(observer.accept(
            &BoardMutation::MoveCounterChanged { count: 6 },
            t0 + Duration::from_secs(4)
        ));
    }

    #[test]
    fn test_burst_is_collapsed_to_one_trigger() {
        let mut observer = ChangeObserver::new();
        let t0 = Instant::now();

        assert!(observer.accept(&BoardMutation::PieceTransformChanged, t0));
        assert!(!observer.accept(&BoardMutation::LastMoveMarker, t0 + Duration::from_millis(50)));
        assert!(!observer.accept(
            &BoardMutation::PieceTransformChanged,
            t0 + Duration::from_millis(250)
        ));
        // Past the debounce window the next mutation triggers again
        assert!(observer.accept(
            &BoardMutation::LastMoveMarker,
            t0 + Duration::from_millis(350)
        ));
    }

    #[test]
    fn test_unrelated_mutations_ignored() {
        let mut observer = ChangeObserver::new();
        assert!(!observer.accept(&BoardMutation::Other, Instant::now()));
    }
}
