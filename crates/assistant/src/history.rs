//! Bounded log of accepted position descriptors.

use std::collections::VecDeque;

/// Entries kept before the oldest is evicted.
pub const HISTORY_CAP: usize = 50;

/// FIFO log of serialized descriptors, oldest first.
#[derive(Debug, Default)]
pub struct MoveHistory {
    entries: VecDeque<String>,
}

impl MoveHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, fen: String) {
        self.entries.push_back(fen);
        while self.entries.len() > HISTORY_CAP {
            self.entries.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Most recent `n` entries, oldest first.
    pub fn tail(&self, n: usize) -> Vec<String> {
        let skip = self.entries.len().saturating_sub(n);
        self.entries.iter().skip(skip).cloned().collect()
    }

    pub fn entries(&self) -> impl Iterator<Item = &String> {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_eviction_at_cap() {
        let mut history = MoveHistory::new();
        for i in 0..51 {
            history.push(format!("position-{i}"));
        }
        assert_eq!(history.len(), 50);
        assert!(!history.entries().any(|e| e == "position-0"));
        assert_eq!(history.entries().next().unwrap(), "position-1");
        assert_eq!(history.entries().last().unwrap(), "position-50");
    }

    #[test]
    fn test_tail_returns_most_recent() {
        let mut history = MoveHistory::new();
        for i in 0..10 {
            history.push(format!("p{i}"));
        }
        assert_eq!(history.tail(3), vec!["p7", "p8", "p9"]);
        assert_eq!(history.tail(100).len(), 10);
    }
}
