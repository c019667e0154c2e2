//! Linear undo/redo over full document snapshots.

/// One committed state.
#[derive(Debug, Clone)]
pub struct HistoryEntry<S> {
    /// Short description of the operation that produced this state.
    pub label: String,
    /// The state after the operation.
    pub state: S,
}

/// Ordered list of snapshots with a cursor.
///
/// Entry 0 is the initial state. `commit` truncates everything after the
/// cursor before appending; nothing else ever drops an entry.
#[derive(Debug, Clone)]
pub struct HistoryManager<S> {
    /// All entries, oldest first.
    entries: Vec<HistoryEntry<S>>,
    /// Index of the entry matching the live state.
    cursor: usize,
}

impl<S: Clone> HistoryManager<S> {
    /// Start a history whose only entry is `initial`.
    pub fn new(initial: S) -> Self {
        Self {
            entries: vec![HistoryEntry { label: "Initial".to_string(), state: initial }],
            cursor: 0,
        }
    }

    /// Record a new state after a committed operation.
    pub fn commit(&mut self, label: impl Into<String>, state: S) {
        let label = label.into();
        let dropped = self.entries.len() - (self.cursor + 1);
        self.entries.truncate(self.cursor + 1);
        self.entries.push(HistoryEntry { label, state });
        self.cursor += 1;
        log::debug!(
            "History commit '{}' (cursor {}, dropped {} redo entries)",
            self.entries[self.cursor].label,
            self.cursor,
            dropped
        );
    }

    /// Step back. Returns the state to restore.
    pub fn undo(&mut self) -> Option<&S> {
        if self.cursor == 0 {
            return None;
        }
        log::debug!("Undo '{}'", self.entries[self.cursor].label);
        self.cursor -= 1;
        Some(&self.entries[self.cursor].state)
    }

    /// Step forward. Returns the state to restore.
    pub fn redo(&mut self) -> Option<&S> {
        if self.cursor + 1 >= self.entries.len() {
            return None;
        }
        self.cursor += 1;
        log::debug!("Redo '{}'", self.entries[self.cursor].label);
        Some(&self.entries[self.cursor].state)
    }

    pub fn can_undo(&self) -> bool {
        self.cursor > 0
    }

    pub fn can_redo(&self) -> bool {
        self.cursor + 1 < self.entries.len()
    }

    /// State at the cursor.
    pub fn current(&self) -> &S {
        &self.entries[self.cursor].state
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Label of the operation `undo` would revert.
    pub fn undo_label(&self) -> Option<&str> {
        (self.cursor > 0).then(|| self.entries[self.cursor].label.as_str())
    }

    /// Label of the operation `redo` would re-apply.
    pub fn redo_label(&self) -> Option<&str> {
        self.entries.get(self.cursor + 1).map(|e| e.label.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_history_cannot_undo() {
        let mut h = HistoryManager::new(0);
        assert!(!h.can_undo());
        assert!(!h.can_redo());
        assert!(h.undo().is_none());
        assert_eq!(*h.current(), 0);
    }

    #[test]
    fn test_n_commits_n_undos() {
        let mut h = HistoryManager::new(0);
        for i in 1..=5 {
            h.commit(format!("step {i}"), i);
        }
        for _ in 0..5 {
            assert!(h.undo().is_some());
        }
        assert_eq!(*h.current(), 0);
        assert!(!h.can_undo());
        assert!(h.can_redo());
    }

    #[test]
    fn test_commit_truncates_redo_tail() {
        let mut h = HistoryManager::new(0);
        h.commit("a", 1);
        h.commit("b", 2);
        h.commit("c", 3);
        h.undo();
        h.undo();
        h.commit("d", 4);
        assert_eq!(h.len(), 3);
        assert!(!h.can_redo());
        assert_eq!(h.undo().copied(), Some(1));
        assert_eq!(h.undo().copied(), Some(0));
        assert!(h.undo().is_none());
    }

    #[test]
    fn test_redo_walks_forward() {
        let mut h = HistoryManager::new("s0");
        h.commit("one", "s1");
        h.undo();
        assert_eq!(h.redo_label(), Some("one"));
        assert_eq!(h.redo().copied(), Some("s1"));
        assert!(h.redo().is_none());
        assert_eq!(h.undo_label(), Some("one"));
    }
}
