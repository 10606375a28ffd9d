//! Bounded undo/redo over one layer's persisted blob.
//!
//! History is scoped to a single (frame, layer role) pair and is discarded whenever
//! that pair changes. Snapshots are taken from the store, never from the live surface.

use std::collections::VecDeque;

use crate::state::{FrameID, LayerRole};

pub const DEFAULT_CAPACITY: usize = 20;

/// The persisted state of a layer at some moment.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum Snapshot {
    Blob(Vec<u8>),
    /// No blob was stored. Restoring this deletes the layer.
    Absent,
}
impl From<Option<Vec<u8>>> for Snapshot {
    fn from(value: Option<Vec<u8>>) -> Self {
        value.map_or(Self::Absent, Self::Blob)
    }
}

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Direction {
    Undo,
    Redo,
}

pub struct UndoHistory {
    capacity: usize,
    /// Most recent at the back.
    undo: VecDeque<Snapshot>,
    redo: VecDeque<Snapshot>,
    scope: Option<(FrameID, LayerRole)>,
}
fn push_bounded(stack: &mut VecDeque<Snapshot>, capacity: usize, snapshot: Snapshot) {
    if capacity == 0 {
        return;
    }
    while stack.len() >= capacity {
        stack.pop_front();
    }
    stack.push_back(snapshot);
}
impl UndoHistory {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            undo: VecDeque::with_capacity(capacity),
            redo: VecDeque::new(),
            scope: None,
        }
    }
    /// Point the history at a new (frame, role) pair, clearing it if that differs from the current one.
    /// Returns whether anything was discarded.
    pub fn rescope(&mut self, frame: FrameID, role: LayerRole) -> bool {
        if self.scope == Some((frame, role)) {
            return false;
        }
        self.scope = Some((frame, role));
        let had_any = self.can_undo() || self.can_redo();
        self.clear();
        had_any
    }
    #[must_use]
    pub fn scope(&self) -> Option<(FrameID, LayerRole)> {
        self.scope
    }
    /// Push the pre-mutation state. Any redo states are invalidated.
    pub fn record(&mut self, before: Snapshot) {
        push_bounded(&mut self.undo, self.capacity, before);
        self.redo.clear();
        log::debug!("history: {} undo states", self.undo.len());
    }
    /// Pop the next state to restore in `direction`, pushing `current` onto the opposite stack.
    ///
    /// `None` and no change if there is nothing to restore.
    pub fn take(&mut self, direction: Direction, current: Snapshot) -> Option<Snapshot> {
        let (from, to) = match direction {
            Direction::Undo => (&mut self.undo, &mut self.redo),
            Direction::Redo => (&mut self.redo, &mut self.undo),
        };
        let restore = from.pop_back()?;
        push_bounded(to, self.capacity, current);
        Some(restore)
    }
    #[must_use]
    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }
    #[must_use]
    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }
    #[must_use]
    pub fn undo_len(&self) -> usize {
        self.undo.len()
    }
    #[must_use]
    pub fn redo_len(&self) -> usize {
        self.redo.len()
    }
    pub fn clear(&mut self) {
        self.undo.clear();
        self.redo.clear();
    }
}

#[cfg(test)]
mod test {
    use super::{Direction, Snapshot, UndoHistory};
    use crate::state::{FrameID, LayerRole};

    fn blob(n: u8) -> Snapshot {
        Snapshot::Blob(vec![n])
    }
    #[test]
    fn undo_redo() {
        let mut history = UndoHistory::new(20);
        history.record(Snapshot::Absent);
        history.record(blob(1));
        // current is 2
        assert_eq!(history.take(Direction::Undo, blob(2)), Some(blob(1)));
        assert_eq!(history.take(Direction::Undo, blob(1)), Some(Snapshot::Absent));
        assert_eq!(history.take(Direction::Undo, Snapshot::Absent), None);
        assert_eq!(history.take(Direction::Redo, Snapshot::Absent), Some(blob(1)));
        assert_eq!(history.take(Direction::Redo, blob(1)), Some(blob(2)));
        assert!(!history.can_redo());
        assert_eq!(history.undo_len(), 2);
    }
    #[test]
    fn record_clears_redo() {
        let mut history = UndoHistory::new(20);
        history.record(blob(0));
        history.take(Direction::Undo, blob(1));
        assert!(history.can_redo());
        history.record(blob(0));
        assert!(!history.can_redo());
    }
    #[test]
    fn capacity() {
        let mut history = UndoHistory::new(20);
        for n in 0..25 {
            history.record(blob(n));
        }
        assert_eq!(history.undo_len(), 20);
        let mut oldest = None;
        while let Some(snapshot) = history.take(Direction::Undo, Snapshot::Absent) {
            oldest = Some(snapshot);
        }
        // 0..5 were dropped.
        assert_eq!(oldest, Some(blob(5)));
    }
    #[test]
    fn rescope() {
        let mut history = UndoHistory::new(20);
        let frame = FrameID::generate();
        assert!(!history.rescope(frame, LayerRole::Color));
        history.record(blob(0));
        assert!(!history.rescope(frame, LayerRole::Color));
        assert!(history.can_undo());
        assert!(history.rescope(frame, LayerRole::Lineart));
        assert!(!history.can_undo());
        history.record(blob(0));
        assert!(history.rescope(FrameID::generate(), LayerRole::Lineart));
        assert!(!history.can_undo());
    }
}
