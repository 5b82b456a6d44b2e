//! Undo/redo history management.
//!
//! Each project owns one [`HistoryManager`]. Entries hold inverse edits: the
//! undo stack holds the edits that revert past changes, the redo stack holds
//! the edits that reapply undone changes.

use crate::command::Edit;
use std::collections::VecDeque;

/// One step of history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    /// The edit to apply when this entry is replayed.
    pub edit: Edit,

    /// The project's saved flag after replaying this entry.
    pub restores_saved: bool,

    /// A brief description of the change this entry belongs to.
    /// Used for status messages when undoing/redoing.
    pub description: String,
}

impl HistoryEntry {
    pub fn new(edit: Edit, restores_saved: bool, description: impl Into<String>) -> Self {
        Self {
            edit,
            restores_saved,
            description: description.into(),
        }
    }
}

/// Manages undo/redo history for one project.
///
/// The manager maintains two stacks:
/// - `undo_stack`: inverse edits that revert past changes
/// - `redo_stack`: edits that reapply undone changes
///
/// When a new change is recorded the redo stack is cleared (history is
/// linear). An optional limit drops the oldest entries first.
#[derive(Debug, Clone, Default)]
pub struct HistoryManager {
    /// Most recent last.
    undo_stack: VecDeque<HistoryEntry>,

    /// Most recent last.
    redo_stack: VecDeque<HistoryEntry>,

    limit: Option<usize>,

    /// Bumped whenever the project's contents change.
    revision: u64,
}

impl HistoryManager {
    /// Creates an empty history. `limit` bounds each stack; `None` keeps
    /// everything.
    pub fn new(limit: Option<usize>) -> Self {
        Self {
            undo_stack: VecDeque::new(),
            redo_stack: VecDeque::new(),
            limit,
            revision: 0,
        }
    }

    /// Records the inverse of a change that was just applied.
    ///
    /// The redo stack is cleared since a new branch of history starts here.
    pub fn record(&mut self, entry: HistoryEntry) {
        self.redo_stack.clear();
        self.push_undo_preserve_redo(entry);
        self.touch();
    }

    /// Pushes an entry to the undo stack WITHOUT clearing the redo stack.
    ///
    /// Used while redoing: the redo stack still holds the remaining steps.
    pub fn push_undo_preserve_redo(&mut self, entry: HistoryEntry) {
        self.undo_stack.push_back(entry);
        Self::enforce_limit(&mut self.undo_stack, self.limit);
    }

    /// Pops the most recent undo entry.
    pub fn pop_undo(&mut self) -> Option<HistoryEntry> {
        self.undo_stack.pop_back()
    }

    /// Pushes an entry to the redo stack.
    pub fn push_redo(&mut self, entry: HistoryEntry) {
        self.redo_stack.push_back(entry);
        Self::enforce_limit(&mut self.redo_stack, self.limit);
    }

    /// Pops the most recent redo entry.
    pub fn pop_redo(&mut self) -> Option<HistoryEntry> {
        self.redo_stack.pop_back()
    }

    /// Notes that the project was just saved: the current state is the saved
    /// one, so every other reachable state is unsaved.
    pub fn mark_saved(&mut self) {
        for entry in self.undo_stack.iter_mut().chain(self.redo_stack.iter_mut()) {
            entry.restores_saved = false;
        }
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_count(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_count(&self) -> usize {
        self.redo_stack.len()
    }

    /// Description of the change the next undo would revert.
    pub fn undo_description(&self) -> Option<&str> {
        self.undo_stack.back().map(|e| e.description.as_str())
    }

    /// Description of the change the next redo would reapply.
    pub fn redo_description(&self) -> Option<&str> {
        self.redo_stack.back().map(|e| e.description.as_str())
    }

    pub fn limit(&self) -> Option<usize> {
        self.limit
    }

    /// Returns a counter that changes whenever the project's contents do.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub(crate) fn touch(&mut self) {
        self.revision = self.revision.wrapping_add(1);
    }

    fn enforce_limit(stack: &mut VecDeque<HistoryEntry>, limit: Option<usize>) {
        if let Some(limit) = limit {
            while stack.len() > limit {
                stack.pop_front();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(description: &str) -> HistoryEntry {
        HistoryEntry::new(
            Edit::SetActivePattern { pattern: None },
            false,
            description,
        )
    }

    #[test]
    fn test_history_push_and_pop() {
        let mut history = HistoryManager::new(None);
        history.record(entry("Test action"));

        assert!(history.can_undo());
        assert!(!history.can_redo());
        assert_eq!(history.undo_count(), 1);
        assert_eq!(history.undo_description(), Some("Test action"));

        let restored = history.pop_undo().unwrap();
        assert_eq!(restored.description, "Test action");
        assert!(!history.can_undo());
    }

    #[test]
    fn test_history_limit() {
        let limit = 8;
        let mut history = HistoryManager::new(Some(limit));

        for i in 0..limit + 5 {
            history.record(entry(&format!("Action {}", i)));
        }

        assert_eq!(history.undo_count(), limit);
        let last = history.pop_undo().unwrap();
        assert_eq!(last.description, format!("Action {}", limit + 4));
    }

    #[test]
    fn test_unbounded_by_default() {
        let mut history = HistoryManager::default();
        for i in 0..1000 {
            history.record(entry(&format!("Action {}", i)));
        }
        assert_eq!(history.undo_count(), 1000);
        assert_eq!(history.limit(), None);
    }

    #[test]
    fn test_redo_cleared_on_new_action() {
        let mut history = HistoryManager::new(None);
        history.record(entry("Action 1"));

        let undone = history.pop_undo().unwrap();
        history.push_redo(undone);
        assert!(history.can_redo());

        history.record(entry("Action 2"));
        assert!(!history.can_redo());
    }

    #[test]
    fn test_multi_level_undo_redo() {
        let mut history = HistoryManager::new(None);
        for i in 0..4 {
            history.record(entry(&format!("Action {}", i)));
        }

        for _ in 0..4 {
            let undone = history.pop_undo().unwrap();
            history.push_redo(undone);
        }
        assert_eq!(history.undo_count(), 0);
        assert_eq!(history.redo_count(), 4);
        assert_eq!(history.redo_description(), Some("Action 0"));

        for _ in 0..4 {
            let redone = history.pop_redo().unwrap();
            history.push_undo_preserve_redo(redone);
        }
        assert_eq!(history.undo_count(), 4);
        assert_eq!(history.redo_count(), 0);
    }

    #[test]
    fn test_mark_saved_clears_restore_flags() {
        let mut history = HistoryManager::new(None);
        history.record(HistoryEntry::new(
            Edit::SetActivePattern { pattern: None },
            true,
            "a",
        ));
        history.push_redo(HistoryEntry::new(
            Edit::SetActivePattern { pattern: None },
            true,
            "b",
        ));

        history.mark_saved();
        assert!(!history.pop_undo().unwrap().restores_saved);
        assert!(!history.pop_redo().unwrap().restores_saved);
    }

    #[test]
    fn test_revision_advances_on_record() {
        let mut history = HistoryManager::new(None);
        let start = history.revision();
        history.record(entry("a"));
        assert_ne!(history.revision(), start);

        let before_save = history.revision();
        history.mark_saved();
        assert_eq!(history.revision(), before_save);
    }
}
