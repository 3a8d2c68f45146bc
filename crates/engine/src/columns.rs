//! Metadata columns: which columns are editable, which are injected at load,
//! and load-time population of the identifier column.
//!
//! Classification is by header NAME, never by position: column order is not
//! stable across files, and injected columns land at the end.

use serde::Serialize;

use crate::table::{RowId, Table};

/// How a column's cells are presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CellKind {
    /// Interactive input control.
    Input,
    ReadOnly,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnPolicy {
    /// Column names rendered as inputs.
    pub editable: Vec<String>,
    /// Column names appended at load time when the file lacks them.
    pub inject: Vec<String>,
}

impl Default for ColumnPolicy {
    fn default() -> Self {
        let names = vec!["Barcode".to_string(), "Notes".to_string(), "Status".to_string()];
        Self {
            editable: names.clone(),
            inject: names,
        }
    }
}

impl ColumnPolicy {
    pub fn is_editable(&self, name: &str) -> bool {
        let name = name.trim();
        self.editable.iter().any(|e| e.trim() == name)
    }

    pub fn kind_of(&self, name: &str) -> CellKind {
        if self.is_editable(name) {
            CellKind::Input
        } else {
            CellKind::ReadOnly
        }
    }

    /// Kind of every header column, by index.
    pub fn classify(&self, header: &[String]) -> Vec<CellKind> {
        header.iter().map(|h| self.kind_of(h)).collect()
    }

    /// Append each configured column missing from `table`. Returns the names
    /// actually added, in order.
    pub fn inject_into(&self, table: &mut Table) -> Vec<String> {
        let mut added = Vec::new();
        for name in &self.inject {
            let name = name.trim();
            if name.is_empty() || table.column_index(name).is_some() {
                continue;
            }
            table.push_column(name);
            added.push(name.to_string());
        }
        added
    }
}

// =============================================================================
// Identifier synthesis
// =============================================================================

/// Produces a value for one row from its other cells.
pub trait RowFormatter {
    /// `row` is the full row, `header` the column names. Return `None` to
    /// leave the target cell empty.
    fn format(&self, header: &[String], row: &[String]) -> Option<String>;
}

/// Concatenates the trimmed values of named source columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConcatFormatter {
    pub sources: Vec<String>,
    pub separator: String,
}

impl ConcatFormatter {
    pub fn new<I, S>(sources: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            sources: sources.into_iter().map(Into::into).collect(),
            separator: String::new(),
        }
    }

    pub fn with_separator(mut self, separator: impl Into<String>) -> Self {
        self.separator = separator.into();
        self
    }
}

impl RowFormatter for ConcatFormatter {
    fn format(&self, header: &[String], row: &[String]) -> Option<String> {
        let parts: Vec<&str> = self
            .sources
            .iter()
            .filter_map(|src| header.iter().position(|h| h.trim() == src.trim()))
            .filter_map(|col| row.get(col))
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
            .collect();
        if parts.is_empty() {
            None
        } else {
            Some(parts.join(&self.separator))
        }
    }
}

/// Fill empty cells of `col` using `formatter`. Non-empty cells are kept.
/// Returns the number of cells filled.
pub fn populate_column(table: &mut Table, col: usize, formatter: &dyn RowFormatter) -> usize {
    if col >= table.width() {
        return 0;
    }

    let header = table.header().to_vec();
    let updates: Vec<(RowId, String)> = table
        .row_ids()
        .filter_map(|id| {
            let row = table.row(id)?;
            if !row[col].trim().is_empty() {
                return None;
            }
            formatter.format(&header, row).map(|v| (id, v))
        })
        .collect();

    let filled = updates.len();
    for (id, value) in updates {
        table.set_cell(id, col, value);
    }
    filled
}
