//! TabularStore - the single owner of table state.
//!
//! Holds the original table, the filtered view (row ids into the original),
//! the active filters, the row selection, and the dirty flag. Nothing else
//! writes the table or the view.
//!
//! View indexing: index 0 is the header, `1..view_len()` are data rows in
//! filtered order. `view_len()` is therefore `len(filtered)` including the
//! header row.
//!
//! Key invariants:
//! - The view is recomputed from the original in full on every filter change
//! - Recomputing the view clears the selection in the same call
//! - Every edit resolves view index -> RowId -> original row
//! - A failed load leaves every field untouched

use std::collections::BTreeMap;

use crate::error::{IndexError, LoadError};
use crate::filter::{FilterEngine, FilterSpec, Filterable};
use crate::selection::{CheckState, Selectable, SelectionTracker};
use crate::snapshot::{now_timestamp, DraftSnapshot};
use crate::table::{Matrix, RowId, Table};
use crate::visibility::ColumnVisibility;

#[derive(Debug, Clone, Default)]
pub struct TabularStore {
    table: Table,
    view: Vec<RowId>,
    filters: BTreeMap<usize, FilterSpec>,
    selection: SelectionTracker,
    dirty: bool,
    loaded: bool,
    /// Bumped every time the view is reassigned wholesale.
    generation: u64,
}

impl TabularStore {
    pub fn new() -> Self {
        Self::default()
    }

    // -------------------------------------------------------------------------
    // Loading
    // -------------------------------------------------------------------------

    /// Replace the table with a parsed matrix. All-or-nothing.
    pub fn load(&mut self, matrix: Matrix) -> Result<(), LoadError> {
        let table = Table::from_matrix(matrix)?;
        self.install(table);
        Ok(())
    }

    /// Install a fully prepared table (load-time column work already done).
    /// Filters, selection, and the dirty flag are reset.
    pub fn install(&mut self, table: Table) {
        log::info!(
            "loaded table: {} data rows x {} columns",
            table.row_count(),
            table.width()
        );
        self.table = table;
        self.filters.clear();
        self.dirty = false;
        self.loaded = true;
        self.refilter();
    }

    /// Restore a saved session: table, filters, and selection.
    ///
    /// Filters on columns the table does not have are dropped. The selection
    /// is restored after the view is rebuilt; since the view is a pure
    /// function of table + filters, saved indices address the same rows.
    pub fn restore_snapshot(&mut self, snapshot: DraftSnapshot) -> Result<(), LoadError> {
        let table = Table::from_matrix(snapshot.data)?;
        let width = table.width();

        let mut filters = snapshot.filters;
        filters.retain(|&col, _| {
            let keep = col < width;
            if !keep {
                log::warn!("draft filter on column {col} dropped (table has {width} columns)");
            }
            keep
        });

        self.table = table;
        self.filters = filters;
        self.dirty = false;
        self.loaded = true;
        self.refilter();
        let view_len = self.view_len();
        self.selection.restore(snapshot.selected, view_len);
        Ok(())
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    // -------------------------------------------------------------------------
    // Read access
    // -------------------------------------------------------------------------

    pub fn original(&self) -> &Table {
        &self.table
    }

    pub fn header(&self) -> &[String] {
        self.table.header()
    }

    pub fn width(&self) -> usize {
        self.table.width()
    }

    /// Length of the filtered view including the header (0 before any load).
    pub fn view_len(&self) -> usize {
        if self.loaded {
            self.view.len() + 1
        } else {
            0
        }
    }

    /// Data rows in the filtered view.
    pub fn visible_row_count(&self) -> usize {
        self.view.len()
    }

    /// Row ids of the filtered view, in order (header excluded).
    pub fn view_ids(&self) -> &[RowId] {
        &self.view
    }

    /// Row id behind a filtered-view index (`1..view_len()`).
    pub fn row_id_at(&self, index: usize) -> Option<RowId> {
        index.checked_sub(1).and_then(|i| self.view.get(i).copied())
    }

    /// Filtered-view row; index 0 is the header.
    pub fn filtered_row(&self, index: usize) -> Option<&[String]> {
        if !self.loaded {
            return None;
        }
        if index == 0 {
            return Some(self.table.header());
        }
        self.table.row(self.row_id_at(index)?)
    }

    /// The filtered view materialized as a matrix (header first).
    pub fn filtered_matrix(&self) -> Matrix {
        self.collect_rows(self.view.iter().copied())
    }

    /// Header plus the selected rows, in view order.
    pub fn selected_matrix(&self) -> Matrix {
        let ids: Vec<RowId> = self
            .selection
            .indices()
            .filter_map(|i| self.row_id_at(i))
            .collect();
        self.collect_rows(ids)
    }

    fn collect_rows<I: IntoIterator<Item = RowId>>(&self, ids: I) -> Matrix {
        if !self.loaded {
            return Vec::new();
        }
        let mut out = vec![self.table.header().to_vec()];
        out.extend(
            ids.into_iter()
                .filter_map(|id| self.table.row(id))
                .map(|r| r.to_vec()),
        );
        out
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    // -------------------------------------------------------------------------
    // Mutation
    // -------------------------------------------------------------------------

    /// Write `value` (trimmed) into a data cell addressed by view position.
    ///
    /// The write goes to the original row behind the view index, so the
    /// filtered view and the original can never disagree. Header edits are
    /// rejected as out of range.
    pub fn edit_cell(&mut self, row: usize, col: usize, value: &str) -> Result<(), IndexError> {
        let Some(id) = self.row_id_at(row) else {
            return Err(IndexError::Row { index: row, len: self.view_len() });
        };
        if col >= self.table.width() {
            return Err(IndexError::Column { index: col, len: self.table.width() });
        }
        self.table.set_cell(id, col, value.trim().to_string());
        self.dirty = true;
        Ok(())
    }

    /// Mark the current state as persisted.
    pub fn mark_saved(&mut self) {
        self.dirty = false;
    }

    /// Snapshot for draft persistence.
    pub fn export_snapshot(&self, visibility: &ColumnVisibility) -> DraftSnapshot {
        DraftSnapshot {
            data: self.table.to_matrix(),
            filters: self.filters.clone(),
            hidden_columns: visibility.hidden_columns(),
            selected: self.selection.to_vec(),
            timestamp: now_timestamp(),
        }
    }

    /// Rebuild the view from the original and clear the selection.
    fn refilter(&mut self) {
        self.view = FilterEngine::evaluate(&self.table, &self.filters);
        self.selection.clear();
        self.generation += 1;
    }
}

impl Filterable for TabularStore {
    fn apply_filter(&mut self, col: usize, spec: Option<FilterSpec>) -> Result<(), IndexError> {
        if col >= self.table.width() {
            return Err(IndexError::Column { index: col, len: self.table.width() });
        }
        match spec {
            Some(spec) => {
                self.filters.insert(col, spec);
            }
            None => {
                self.filters.remove(&col);
            }
        }
        self.refilter();
        Ok(())
    }

    fn clear_all_filters(&mut self) {
        self.filters.clear();
        self.refilter();
    }

    fn filters(&self) -> &BTreeMap<usize, FilterSpec> {
        &self.filters
    }
}

impl Selectable for TabularStore {
    fn set_row_selected(&mut self, index: usize, selected: bool) {
        let len = self.view_len();
        self.selection.set(index, selected, len);
    }

    fn toggle_row(&mut self, index: usize) -> Option<bool> {
        let len = self.view_len();
        self.selection.toggle(index, len)
    }

    fn select_all(&mut self) {
        let len = self.view_len();
        self.selection.select_all(len);
    }

    fn deselect_all(&mut self) {
        self.selection.clear();
    }

    fn selection(&self) -> &SelectionTracker {
        &self.selection
    }

    fn check_state(&self) -> CheckState {
        self.selection.check_state(self.view_len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn m(rows: &[&[&str]]) -> Matrix {
        rows.iter()
            .map(|r| r.iter().map(|s| s.to_string()).collect())
            .collect()
    }

    fn loaded(rows: &[&[&str]]) -> TabularStore {
        let mut s = TabularStore::new();
        s.load(m(rows)).unwrap();
        s
    }

    #[test]
    fn test_load_derives_identity_view() {
        let s = loaded(&[&["id"], &["1"], &["2"]]);
        assert_eq!(s.view_len(), 3);
        assert_eq!(s.filtered_matrix(), m(&[&["id"], &["1"], &["2"]]));
        assert!(!s.is_dirty());
        assert!(s.selection().is_empty());
    }

    #[test]
    fn test_failed_load_keeps_previous_table() {
        let mut s = loaded(&[&["id"], &["1"]]);
        s.edit_cell(1, 0, "9").unwrap();
        assert_eq!(s.load(vec![]), Err(LoadError::EmptyInput));
        assert_eq!(s.load(m(&[&["only"]])), Err(LoadError::HeaderOnly));
        assert_eq!(s.filtered_row(1).unwrap(), &["9"]);
        assert!(s.is_dirty());
    }

    #[test]
    fn test_and_fixture() {
        let mut s = loaded(&[&["id", "status"], &["1", "a"], &["2", "b"], &["3", "a"]]);
        s.apply_filter(0, Some(FilterSpec::quick(["1", "3"]))).unwrap();
        s.apply_filter(1, Some(FilterSpec::quick(["a"]))).unwrap();
        assert_eq!(
            s.filtered_matrix(),
            m(&[&["id", "status"], &["1", "a"], &["3", "a"]])
        );
        assert_eq!(s.active_filter_count(), 2);
    }

    #[test]
    fn test_edit_through_filtered_view_hits_original_row() {
        let mut s = loaded(&[&["id", "note"], &["1", ""], &["2", ""], &["3", ""]]);
        s.apply_filter(0, Some(FilterSpec::quick(["3"]))).unwrap();
        s.edit_cell(1, 1, "  checked  ").unwrap();

        assert_eq!(s.filtered_row(1).unwrap(), &["3", "checked"]);
        assert_eq!(s.original().cell(RowId(2), 1), Some("checked"));
        assert_eq!(s.original().cell(RowId(0), 1), Some(""));
        assert!(s.is_dirty());

        s.clear_all_filters();
        assert_eq!(s.filtered_row(3).unwrap(), &["3", "checked"]);
    }

    #[test]
    fn test_edit_out_of_range() {
        let mut s = loaded(&[&["id"], &["1"]]);
        assert_eq!(s.edit_cell(0, 0, "x"), Err(IndexError::Row { index: 0, len: 2 }));
        assert_eq!(s.edit_cell(2, 0, "x"), Err(IndexError::Row { index: 2, len: 2 }));
        assert_eq!(s.edit_cell(1, 1, "x"), Err(IndexError::Column { index: 1, len: 1 }));
        assert!(!s.is_dirty());
    }

    #[test]
    fn test_filter_change_clears_selection() {
        let mut s = loaded(&[&["v"], &["a"], &["b"], &["c"]]);
        s.select_all();
        assert_eq!(s.check_state(), CheckState::Checked);
        s.apply_filter(0, Some(FilterSpec::quick(["a", "c"]))).unwrap();
        assert!(s.selection().is_empty());
        assert_eq!(s.check_state(), CheckState::Unchecked);

        s.toggle_row(2);
        s.apply_filter(0, None).unwrap();
        assert!(s.selection().is_empty());
    }

    #[test]
    fn test_filter_on_missing_column_rejected() {
        let mut s = loaded(&[&["v"], &["a"]]);
        s.toggle_row(1);
        assert_eq!(
            s.apply_filter(3, Some(FilterSpec::quick(["a"]))),
            Err(IndexError::Column { index: 3, len: 1 })
        );
        // Rejected calls leave view and selection alone
        assert_eq!(s.selection().count(), 1);
    }

    #[test]
    fn test_selected_matrix_in_view_order() {
        let mut s = loaded(&[&["v"], &["a"], &["b"], &["c"]]);
        s.set_row_selected(3, true);
        s.set_row_selected(1, true);
        s.set_row_selected(7, true);
        assert_eq!(s.selected_matrix(), m(&[&["v"], &["a"], &["c"]]));
        assert_eq!(s.check_state(), CheckState::Indeterminate);
    }

    #[test]
    fn test_generation_bumps_on_view_rebuild() {
        let mut s = loaded(&[&["v"], &["a"]]);
        let g = s.generation();
        s.apply_filter(0, Some(FilterSpec::quick(["a"]))).unwrap();
        assert!(s.generation() > g);
        let g = s.generation();
        s.edit_cell(1, 0, "b").unwrap();
        assert_eq!(s.generation(), g);
    }

    #[test]
    fn test_snapshot_roundtrip_restores_view_and_selection() {
        let mut s = loaded(&[&["id", "status"], &["1", "a"], &["2", "b"], &["3", "a"]]);
        s.apply_filter(1, Some(FilterSpec::quick(["a"]))).unwrap();
        s.set_row_selected(2, true);
        s.edit_cell(2, 0, "3x").unwrap();

        let mut vis = ColumnVisibility::new(2);
        vis.set_visible(0, false);
        let snap = s.export_snapshot(&vis);
        assert_eq!(snap.hidden_columns, vec![0]);
        assert_eq!(snap.selected, vec![2]);

        let mut restored = TabularStore::new();
        restored.restore_snapshot(snap).unwrap();
        assert_eq!(restored.filtered_matrix(), s.filtered_matrix());
        assert_eq!(restored.selection().to_vec(), vec![2]);
        assert!(!restored.is_dirty());
    }

    #[test]
    fn test_restore_drops_out_of_range_filters() {
        let mut filters = BTreeMap::new();
        filters.insert(5, FilterSpec::quick(["x"]));
        let snap = DraftSnapshot {
            data: m(&[&["v"], &["a"]]),
            filters,
            hidden_columns: vec![],
            selected: vec![1, 4],
            timestamp: "t".into(),
        };
        let mut s = TabularStore::new();
        s.restore_snapshot(snap).unwrap();
        assert!(s.filters().is_empty());
        assert_eq!(s.selection().to_vec(), vec![1]);
    }

    #[test]
    fn test_unloaded_store_is_inert() {
        let mut s = TabularStore::new();
        assert_eq!(s.view_len(), 0);
        assert!(s.filtered_row(0).is_none());
        assert!(s.filtered_matrix().is_empty());
        s.select_all();
        assert!(s.selection().is_empty());
    }
}
