//! Bounded undo/redo history of committed change sets.

use std::collections::VecDeque;

use log::trace;

use crate::model::ChangeSet;

/// Default number of edits kept on the undo stack.
pub const DEFAULT_UNDO_DEPTH: usize = 100;

/// Two stacks of committed edits, each capped at `depth`.
///
/// The manager only stores edits; [`crate::Graph::undo`] and
/// [`crate::Graph::redo`] replay them. A depth of zero disables recording.
#[derive(Debug, Clone)]
pub struct UndoManager {
    undo: VecDeque<ChangeSet>,
    redo: VecDeque<ChangeSet>,
    depth: usize,
}

impl Default for UndoManager {
    fn default() -> Self {
        Self::new(DEFAULT_UNDO_DEPTH)
    }
}

impl UndoManager {
    pub fn new(depth: usize) -> Self {
        Self {
            undo: VecDeque::new(),
            redo: VecDeque::new(),
            depth,
        }
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Records a freshly committed edit. Clears the redo stack.
    pub fn record(&mut self, edit: ChangeSet) {
        if self.depth == 0 || edit.is_empty() {
            return;
        }
        self.redo.clear();
        push_capped(&mut self.undo, edit, self.depth);
        trace!(undo_len = self.undo.len(); "Recorded edit");
    }

    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    pub fn undo_len(&self) -> usize {
        self.undo.len()
    }

    pub fn redo_len(&self) -> usize {
        self.redo.len()
    }

    /// Drops the whole history.
    pub fn clear(&mut self) {
        self.undo.clear();
        self.redo.clear();
    }

    pub(crate) fn pop_undo(&mut self) -> Option<ChangeSet> {
        self.undo.pop_back()
    }

    pub(crate) fn pop_redo(&mut self) -> Option<ChangeSet> {
        self.redo.pop_back()
    }

    /// Puts an undone edit on the redo stack.
    pub(crate) fn push_redo(&mut self, edit: ChangeSet) {
        push_capped(&mut self.redo, edit, self.depth);
    }

    /// Puts a redone edit back on the undo stack without touching redo.
    pub(crate) fn push_undo(&mut self, edit: ChangeSet) {
        push_capped(&mut self.undo, edit, self.depth);
    }
}

fn push_capped(stack: &mut VecDeque<ChangeSet>, edit: ChangeSet, depth: usize) {
    stack.push_back(edit);
    while stack.len() > depth {
        stack.pop_front();
    }
}

#[cfg(test)]
mod tests {
    use trellis_core::identifier::Id;

    use super::*;
    use crate::model::Change;

    fn edit(name: &str) -> ChangeSet {
        ChangeSet::new(vec![Change::VisibilityChanged {
            cell: Id::new(name),
            previous: true,
            current: false,
        }])
    }

    #[test]
    fn test_depth_cap_drops_oldest() {
        let mut manager = UndoManager::new(2);
        manager.record(edit("a"));
        manager.record(edit("b"));
        manager.record(edit("c"));

        assert_eq!(manager.undo_len(), 2);
        assert_eq!(manager.pop_undo(), Some(edit("c")));
        assert_eq!(manager.pop_undo(), Some(edit("b")));
        assert_eq!(manager.pop_undo(), None);
    }

    #[test]
    fn test_record_clears_redo() {
        let mut manager = UndoManager::default();
        manager.record(edit("a"));
        let undone = manager.pop_undo().expect("recorded");
        manager.push_redo(undone);
        assert!(manager.can_redo());

        manager.record(edit("b"));
        assert!(!manager.can_redo());
        assert_eq!(manager.undo_len(), 1);
    }

    #[test]
    fn test_zero_depth_disables_recording() {
        let mut manager = UndoManager::new(0);
        manager.record(edit("a"));
        assert!(!manager.can_undo());
    }

    #[test]
    fn test_empty_edits_are_ignored() {
        let mut manager = UndoManager::default();
        manager.record(ChangeSet::default());
        assert!(!manager.can_undo());
    }
}
