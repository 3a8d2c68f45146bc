//! Row selection over the filtered view.
//!
//! Indices are filtered-view positions (1-based; 0 is the header). They are
//! positional, so the set is cleared whenever the view is rebuilt.
//! Out-of-range indices are ignored rather than rejected: selection clicks
//! can race a re-render, and a stale click must not fail the caller.

use std::collections::BTreeSet;

use serde::Serialize;

/// Header checkbox state derived from the selection count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckState {
    Unchecked,
    Checked,
    Indeterminate,
}

impl CheckState {
    pub fn from_counts(selected: usize, total: usize) -> Self {
        if selected == 0 {
            CheckState::Unchecked
        } else if selected == total && total > 0 {
            CheckState::Checked
        } else {
            CheckState::Indeterminate
        }
    }

    /// The checkbox renders checked for both `Checked` and `Indeterminate`.
    pub fn is_checked(self) -> bool {
        !matches!(self, CheckState::Unchecked)
    }

    pub fn is_indeterminate(self) -> bool {
        matches!(self, CheckState::Indeterminate)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionTracker {
    selected: BTreeSet<usize>,
}

impl SelectionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or remove `index`. `view_len` counts the header.
    pub fn set(&mut self, index: usize, selected: bool, view_len: usize) {
        if !Self::in_range(index, view_len) {
            return;
        }
        if selected {
            self.selected.insert(index);
        } else {
            self.selected.remove(&index);
        }
    }

    /// Flip `index`. Returns the new state, or `None` if out of range.
    pub fn toggle(&mut self, index: usize, view_len: usize) -> Option<bool> {
        if !Self::in_range(index, view_len) {
            return None;
        }
        if self.selected.remove(&index) {
            Some(false)
        } else {
            self.selected.insert(index);
            Some(true)
        }
    }

    /// Select every data row of the view.
    pub fn select_all(&mut self, view_len: usize) {
        self.selected = (1..view_len).collect();
    }

    pub fn clear(&mut self) {
        self.selected.clear();
    }

    /// Replace the selection, keeping only in-range indices.
    pub fn restore<I: IntoIterator<Item = usize>>(&mut self, indices: I, view_len: usize) {
        self.selected = indices
            .into_iter()
            .filter(|&i| Self::in_range(i, view_len))
            .collect();
    }

    pub fn contains(&self, index: usize) -> bool {
        self.selected.contains(&index)
    }

    pub fn count(&self) -> usize {
        self.selected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    /// Selected indices, ascending.
    pub fn indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.selected.iter().copied()
    }

    pub fn to_vec(&self) -> Vec<usize> {
        self.selected.iter().copied().collect()
    }

    /// Tri-state header checkbox for a view with `view_len` rows (header included).
    pub fn check_state(&self, view_len: usize) -> CheckState {
        CheckState::from_counts(self.count(), view_len.saturating_sub(1))
    }

    fn in_range(index: usize, view_len: usize) -> bool {
        index >= 1 && index < view_len
    }
}

/// Selection operations exposed by the store.
pub trait Selectable {
    fn set_row_selected(&mut self, index: usize, selected: bool);
    fn toggle_row(&mut self, index: usize) -> Option<bool>;
    fn select_all(&mut self);
    fn deselect_all(&mut self);
    fn selection(&self) -> &SelectionTracker;
    fn check_state(&self) -> CheckState;
}
