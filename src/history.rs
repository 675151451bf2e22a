//! Linear undo/redo log of score snapshots.

use std::error::Error;
use std::fmt;
use std::sync::Arc;

use crate::score::Score;

/// Returned when the current snapshot is requested before any score has
/// been loaded. The UI keeps this unreachable by hiding score controls
/// until a load succeeds, but the failure is loud if that ever breaks.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EmptyHistoryError;

impl fmt::Display for EmptyHistoryError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "no score has been loaded")
    }
}

impl Error for EmptyHistoryError {}

/// Undo/redo log. Snapshots are stored behind `Arc` and never mutated after
/// being pushed, so playback or an in-flight transform can keep reading an
/// older snapshot while the cursor moves; truncation on push only removes
/// reachability from the log, not the snapshot itself.
#[derive(Default)]
pub struct History {
    snapshots: Vec<Arc<Score>>,
    cursor: usize,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    /// Discard everything and start over with `score` as snapshot 0.
    pub fn load(&mut self, score: Score) {
        self.snapshots = vec![Arc::new(score)];
        self.cursor = 0;
    }

    /// Truncate the redo branch and append a new snapshot.
    pub fn push(&mut self, score: Score) {
        self.snapshots.truncate(self.cursor + 1);
        self.snapshots.push(Arc::new(score));
        self.cursor = self.snapshots.len() - 1;
    }

    /// Step back one snapshot. No-op at the start of the log.
    pub fn undo(&mut self) -> Option<&Arc<Score>> {
        if self.cursor == 0 || self.snapshots.is_empty() {
            None
        } else {
            self.cursor -= 1;
            Some(&self.snapshots[self.cursor])
        }
    }

    /// Step forward one snapshot. No-op at the end of the log.
    pub fn redo(&mut self) -> Option<&Arc<Score>> {
        if self.cursor + 1 >= self.snapshots.len() {
            None
        } else {
            self.cursor += 1;
            Some(&self.snapshots[self.cursor])
        }
    }

    pub fn current(&self) -> Result<&Arc<Score>, EmptyHistoryError> {
        self.snapshots.get(self.cursor).ok_or(EmptyHistoryError)
    }

    pub fn can_undo(&self) -> bool {
        self.cursor > 0
    }

    pub fn can_redo(&self) -> bool {
        self.cursor + 1 < self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::score::{Note, Track};

    fn score(pitch: u8) -> Score {
        Score::new(vec![Track::new(vec![Note::new(pitch, 0.0, 1.0, 1.0)])])
    }

    #[test]
    fn test_empty() {
        let mut history = History::new();
        assert_eq!(history.current(), Err(EmptyHistoryError));
        assert!(history.undo().is_none());
        assert!(history.redo().is_none());
    }

    #[test]
    fn test_undo_redo() {
        let mut history = History::new();
        history.load(score(1));
        history.push(score(2));
        assert_eq!(history.current().unwrap().as_ref(), &score(2));

        assert_eq!(history.undo().unwrap().as_ref(), &score(1));
        assert!(history.undo().is_none()); // at snapshot 0
        assert_eq!(history.redo().unwrap().as_ref(), &score(2));
        assert!(history.redo().is_none()); // at last snapshot
    }

    #[test]
    fn test_push_discards_redo_branch() {
        let mut history = History::new();
        history.load(score(1));
        history.push(score(2));
        history.push(score(3));
        history.undo();
        history.undo();
        history.push(score(4));

        assert_eq!(history.snapshots.len(), 2);
        assert_eq!(history.snapshots[0].as_ref(), &score(1));
        assert_eq!(history.snapshots[1].as_ref(), &score(4));
        assert_eq!(history.cursor, 1);
        assert!(history.redo().is_none());
    }

    #[test]
    fn test_old_snapshot_outlives_truncation() {
        let mut history = History::new();
        history.load(score(1));
        history.push(score(2));
        let held = history.current().unwrap().clone();
        history.undo();
        history.push(score(3)); // drops score(2) from the log
        assert_eq!(held.as_ref(), &score(2));
    }

    #[test]
    fn test_load_resets() {
        let mut history = History::new();
        history.load(score(1));
        history.push(score(2));
        history.load(score(9));
        assert!(!history.can_undo());
        assert!(!history.can_redo());
        assert_eq!(history.current().unwrap().as_ref(), &score(9));
    }
}
