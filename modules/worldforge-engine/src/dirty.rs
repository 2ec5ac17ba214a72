/// Visible save-state indicator for the active document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SaveStatus {
    #[default]
    Idle,
    /// In-memory state has diverged from the last persisted copy.
    Unsaved,
    /// The last flush landed.
    Saved,
    /// The last flush failed; it is not re-queued.
    Failed,
}

/// Dirty flag for the active document. One per session.
#[derive(Debug, Default)]
pub struct DirtyTracker {
    dirty: bool,
    status: SaveStatus,
}

impl DirtyTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Side-effect only, idempotent, never fails.
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
        self.status = SaveStatus::Unsaved;
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn status(&self) -> SaveStatus {
        self.status
    }

    /// Record the outcome of a flush attempt. The dirty flag clears on
    /// success and failure alike: a failed auto-save is dropped after one
    /// attempt, surfaced only through the status indicator.
    pub fn settle(&mut self, succeeded: bool) {
        self.dirty = false;
        self.status = if succeeded {
            SaveStatus::Saved
        } else {
            SaveStatus::Failed
        };
    }

    /// Record a failed explicit save without consuming the dirty flag.
    pub fn note_failure(&mut self) {
        self.status = SaveStatus::Failed;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mark_dirty_is_idempotent() {
        let mut tracker = DirtyTracker::new();
        assert!(!tracker.is_dirty());
        tracker.mark_dirty();
        tracker.mark_dirty();
        assert!(tracker.is_dirty());
        assert_eq!(tracker.status(), SaveStatus::Unsaved);
    }

    #[test]
    fn settle_clears_dirty_on_success_and_failure() {
        let mut tracker = DirtyTracker::new();
        tracker.mark_dirty();
        tracker.settle(true);
        assert!(!tracker.is_dirty());
        assert_eq!(tracker.status(), SaveStatus::Saved);

        tracker.mark_dirty();
        tracker.settle(false);
        assert!(!tracker.is_dirty());
        assert_eq!(tracker.status(), SaveStatus::Failed);
    }

    #[test]
    fn note_failure_keeps_dirty() {
        let mut tracker = DirtyTracker::new();
        tracker.mark_dirty();
        tracker.note_failure();
        assert!(tracker.is_dirty());
        assert_eq!(tracker.status(), SaveStatus::Failed);
    }
}
