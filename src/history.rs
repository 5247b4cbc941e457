//! Run history
//!
//! Bounded, most-recent-first list of completed runs. Feeds the difficulty
//! controller at every run start.

use serde::{Deserialize, Serialize};

use crate::config::ConfigError;
use crate::consts::RUN_HISTORY_SIZE;

/// Outcome of one completed run (created once at death, never mutated)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunStats {
    pub duration_ms: f32,
    pub score: u64,
    pub coins: u32,
    /// Whether the player drew at least one line
    pub used_line: bool,
    pub jumps_performed: u32,
    /// Total time spent drawing
    pub draw_time_ms: f32,
    /// Died within the accident window
    pub accident_death: bool,
    pub near_misses: u32,
    /// Share of spent ink that ended up under the player's feet (0-1)
    pub ink_efficiency: f32,
}

/// Run history, newest first
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunHistory {
    capacity: usize,
    entries: Vec<RunStats>,
}

impl Default for RunHistory {
    fn default() -> Self {
        Self::new(RUN_HISTORY_SIZE)
    }
}

impl RunHistory {
    /// Create an empty history; capacity is at least 1
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            entries: Vec::with_capacity(capacity + 1),
        }
    }

    /// Insert a run at the front, evicting the oldest beyond capacity
    pub fn push(&mut self, stats: RunStats) {
        self.entries.insert(0, stats);
        self.entries.truncate(self.capacity);
    }

    /// Change capacity, dropping the oldest runs if it shrinks
    pub fn set_capacity(&mut self, capacity: usize) {
        self.capacity = capacity.max(1);
        self.entries.truncate(self.capacity);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Most recent run (if any)
    pub fn latest(&self) -> Option<&RunStats> {
        self.entries.first()
    }

    /// Runs, newest first
    pub fn iter(&self) -> impl Iterator<Item = &RunStats> {
        self.entries.iter()
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Restore a saved history; oversized saves are trimmed to capacity
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let mut history: RunHistory = serde_json::from_str(json)?;
        history.set_capacity(history.capacity);
        Ok(history)
    }
}

#[cfg(test)]
pub(crate) fn run(duration_ms: f32, score: u64, accident_death: bool) -> RunStats {
    RunStats {
        duration_ms,
        score,
        coins: 0,
        used_line: false,
        jumps_performed: 0,
        draw_time_ms: 0.0,
        accident_death,
        near_misses: 0,
        ink_efficiency: 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_newest_first() {
        let mut history = RunHistory::new(5);
        history.push(run(1_000.0, 10, false));
        history.push(run(2_000.0, 20, false));

        assert_eq!(history.len(), 2);
        assert_eq!(history.latest().map(|r| r.score), Some(20));
        let scores: Vec<u64> = history.iter().map(|r| r.score).collect();
        assert_eq!(scores, vec![20, 10]);
    }

    #[test]
    fn test_evicts_oldest_beyond_capacity() {
        let mut history = RunHistory::new(3);
        for score in 1..=5 {
            history.push(run(1_000.0, score, false));
        }
        let scores: Vec<u64> = history.iter().map(|r| r.score).collect();
        assert_eq!(scores, vec![5, 4, 3]);
    }

    #[test]
    fn test_zero_capacity_keeps_one() {
        let mut history = RunHistory::new(0);
        history.push(run(1.0, 1, false));
        history.push(run(1.0, 2, false));
        assert_eq!(history.len(), 1);
        assert_eq!(history.latest().map(|r| r.score), Some(2));
    }

    #[test]
    fn test_shrinking_capacity_drops_oldest() {
        let mut history = RunHistory::new(5);
        for score in 1..=5 {
            history.push(run(1_000.0, score, false));
        }
        history.set_capacity(2);
        let scores: Vec<u64> = history.iter().map(|r| r.score).collect();
        assert_eq!(scores, vec![5, 4]);
    }

    #[test]
    fn test_json_restore() {
        let mut history = RunHistory::new(4);
        history.push(run(12_000.0, 300, true));
        let json = history.to_json().expect("serializes");
        let restored = RunHistory::from_json(&json).expect("parses");
        assert_eq!(restored, history);
        assert!(RunHistory::from_json("[]").is_err());
    }
}
