//! Column visibility - a projection over header indices.
//!
//! Hidden columns are skipped by the renderer and the exporters. The table
//! itself is never touched: hiding a column removes nothing from `original`
//! or the filtered view.

use std::collections::BTreeSet;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnVisibility {
    hidden: BTreeSet<usize>,
    width: usize,
}

impl ColumnVisibility {
    /// All `width` columns visible.
    pub fn new(width: usize) -> Self {
        Self { hidden: BTreeSet::new(), width }
    }

    /// Defaults for a freshly loaded header: columns whose trimmed name is in
    /// `hidden_names` start hidden, everything else is visible.
    pub fn seed(header: &[String], hidden_names: &[String]) -> Self {
        let hidden = header
            .iter()
            .enumerate()
            .filter(|(_, name)| hidden_names.iter().any(|h| h.trim() == name.trim()))
            .map(|(i, _)| i)
            .collect();
        Self { hidden, width: header.len() }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    /// Show or hide one column. Returns false (no change) if out of range.
    pub fn set_visible(&mut self, col: usize, visible: bool) -> bool {
        if col >= self.width {
            return false;
        }
        if visible {
            self.hidden.remove(&col)
        } else {
            self.hidden.insert(col)
        }
    }

    /// Replace the hidden set, dropping out-of-range indices.
    pub fn restore<I: IntoIterator<Item = usize>>(&mut self, hidden: I) {
        let width = self.width;
        self.hidden = hidden.into_iter().filter(|&c| c < width).collect();
    }

    pub fn show_all(&mut self) {
        self.hidden.clear();
    }

    pub fn is_hidden(&self, col: usize) -> bool {
        self.hidden.contains(&col)
    }

    pub fn hidden_count(&self) -> usize {
        self.hidden.len()
    }

    /// Hidden column indices, ascending.
    pub fn hidden_columns(&self) -> Vec<usize> {
        self.hidden.iter().copied().collect()
    }

    /// Visible column indices in table order.
    pub fn visible_columns(&self) -> Vec<usize> {
        (0..self.width).filter(|c| !self.hidden.contains(c)).collect()
    }

    /// Project one row onto the visible columns, preserving column order.
    pub fn project(&self, row: &[String]) -> Vec<String> {
        row.iter()
            .enumerate()
            .filter(|(i, _)| !self.hidden.contains(i))
            .map(|(_, v)| v.clone())
            .collect()
    }
}
