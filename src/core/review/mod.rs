//! # Review Module
//!
//! Per-category decision state machine over a scan's issue list.
//!
//! A session walks one category's issues with a cursor; every decision is
//! undoable until a deletion is committed. Undo restores by item identity,
//! not by stored position, so it stays correct while the list mutates.
//! All operations are invoked sequentially by a single caller.

use crate::core::issue::{Decision, Issue, IssueCategory};
use serde::{Deserialize, Serialize};

/// Observable state of a review session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ReviewState {
    /// The cursor points at an undecided position
    Reviewing,
    /// Every issue has been decided; the list is non-empty
    AllReviewed,
    /// A deletion commit succeeded
    DeletionSuccess { count: usize, bytes: u64 },
    /// The external delete operation failed
    DeletionError(String),
}

/// Decision state machine for one category's issues
pub struct ReviewSession {
    issues: Vec<Issue>,
    category: IssueCategory,
    cursor: usize,
    state: ReviewState,
    undo_stack: Vec<(String, Decision)>,
}

impl ReviewSession {
    /// Build a session over one category's slice of a scan's issues
    pub fn new(issues: Vec<Issue>, category: IssueCategory) -> Self {
        let mut session = Self {
            issues,
            category,
            cursor: 0,
            state: ReviewState::Reviewing,
            undo_stack: Vec::new(),
        };
        session.update_state();
        session
    }

    pub fn category(&self) -> IssueCategory {
        self.category
    }

    pub fn issues(&self) -> &[Issue] {
        &self.issues
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn state(&self) -> &ReviewState {
        &self.state
    }

    /// The issue under the cursor, if any remains
    pub fn current_issue(&self) -> Option<&Issue> {
        self.issues.get(self.cursor)
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    /// Issues currently marked for deletion
    pub fn marked_for_deletion(&self) -> impl Iterator<Item = &Issue> {
        self.issues
            .iter()
            .filter(|issue| issue.decision == Decision::Delete)
    }

    /// Bytes freed if the marked issues were deleted
    pub fn total_freeable(&self) -> u64 {
        self.marked_for_deletion().map(|issue| issue.file_size).sum()
    }

    /// True iff the list is non-empty and the cursor ran past its end
    pub fn is_all_reviewed(&self) -> bool {
        !self.issues.is_empty() && self.cursor >= self.issues.len()
    }

    /// Decide the current issue and advance the cursor.
    ///
    /// No-op when the cursor is already past the end.
    pub fn decide(&mut self, decision: Decision) {
        let Some(issue) = self.issues.get_mut(self.cursor) else {
            return;
        };
        self.undo_stack
            .push((issue.item_id.clone(), issue.decision));
        issue.decision = decision;
        self.cursor += 1;
        self.update_state();
    }

    /// Revert the most recent decision.
    ///
    /// The item is located by identifier, never by a remembered position,
    /// and the cursor moves back to the item's current index - possibly
    /// jumping over positions that were merely skipped.
    pub fn undo(&mut self) {
        let Some((item_id, previous_decision)) = self.undo_stack.pop() else {
            return;
        };
        let Some(index) = self
            .issues
            .iter()
            .position(|issue| issue.item_id == item_id)
        else {
            return;
        };
        self.issues[index].decision = previous_decision;
        self.cursor = index;
        self.update_state();
    }

    /// Remove every issue marked for deletion and enter the success state.
    ///
    /// The undo stack is cleared unconditionally - its identifier and
    /// position references are meaningless once items are removed. The
    /// cursor clamps to the last valid index of the shrunken list.
    pub fn commit_deletion(&mut self) {
        let count = self.marked_for_deletion().count();
        let bytes = self.total_freeable();

        self.issues.retain(|issue| issue.decision != Decision::Delete);
        self.undo_stack.clear();
        self.cursor = self.cursor.min(self.issues.len().saturating_sub(1));
        self.state = ReviewState::DeletionSuccess { count, bytes };
    }

    /// Record that the external delete operation failed.
    ///
    /// Decisions and the undo stack stay untouched so the user can retry.
    pub fn handle_deletion_error(&mut self, message: impl Into<String>) {
        self.state = ReviewState::DeletionError(message.into());
    }

    /// Leave a terminal state and re-derive reviewing/all-reviewed
    pub fn reset_state(&mut self) {
        self.update_state();
    }

    fn update_state(&mut self) {
        self.state = if self.is_all_reviewed() {
            ReviewState::AllReviewed
        } else {
            ReviewState::Reviewing
        };
    }
}
