//! Table storage: a header row plus an arena of data rows.
//!
//! Data rows are addressed by [`RowId`], assigned once at load time and never
//! reused. Views (the filtered row list, selections, validation findings) hold
//! ids, not copies, so an edit made through any view lands on the single
//! backing row.
//!
//! Key invariants:
//! - Every row has exactly `header.len()` cells
//! - Rows are never removed or reordered after construction
//! - `RowId(n)` is the n-th data row of the loaded matrix

use serde::{Deserialize, Serialize};

use crate::error::LoadError;

/// Raw rectangular-or-ragged string matrix as produced by a parser.
/// Row 0 is the header.
pub type Matrix = Vec<Vec<String>>;

/// Stable identity of a data row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RowId(pub u32);

impl RowId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    header: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    /// Build a table from a parsed matrix.
    ///
    /// Ragged rows are padded with empty cells. A data row wider than the
    /// header extends the header with generated `Column N` names, so no cell
    /// is ever dropped.
    pub fn from_matrix(matrix: Matrix) -> Result<Self, LoadError> {
        let mut rows = matrix.into_iter();
        let Some(mut header) = rows.next() else {
            return Err(LoadError::EmptyInput);
        };
        let mut data: Vec<Vec<String>> = rows.collect();
        if data.is_empty() {
            return Err(LoadError::HeaderOnly);
        }

        let width = data
            .iter()
            .map(|r| r.len())
            .max()
            .unwrap_or(0)
            .max(header.len());

        while header.len() < width {
            header.push(format!("Column {}", header.len() + 1));
        }
        for row in &mut data {
            row.resize(width, String::new());
        }

        Ok(Self { header, rows: data })
    }

    pub fn header(&self) -> &[String] {
        &self.header
    }

    /// Number of columns.
    pub fn width(&self) -> usize {
        self.header.len()
    }

    /// Number of data rows (header excluded).
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn row(&self, id: RowId) -> Option<&[String]> {
        self.rows.get(id.index()).map(|r| r.as_slice())
    }

    pub fn cell(&self, id: RowId, col: usize) -> Option<&str> {
        self.rows.get(id.index())?.get(col).map(|s| s.as_str())
    }

    /// All row ids in load order.
    pub fn row_ids(&self) -> impl Iterator<Item = RowId> + '_ {
        (0..self.rows.len()).map(|i| RowId(i as u32))
    }

    /// First column whose trimmed header equals `name`.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        let name = name.trim();
        self.header.iter().position(|h| h.trim() == name)
    }

    /// Header followed by every data row, in load order.
    pub fn to_matrix(&self) -> Matrix {
        let mut out = Vec::with_capacity(self.rows.len() + 1);
        out.push(self.header.clone());
        out.extend(self.rows.iter().cloned());
        out
    }

    // -------------------------------------------------------------------------
    // Mutators (crate-internal; TabularStore owns installed tables)
    // -------------------------------------------------------------------------

    /// Overwrite one cell. Returns false if the id or column is out of range.
    pub(crate) fn set_cell(&mut self, id: RowId, col: usize, value: String) -> bool {
        match self.rows.get_mut(id.index()).and_then(|r| r.get_mut(col)) {
            Some(cell) => {
                *cell = value;
                true
            }
            None => false,
        }
    }

    /// Append an empty column named `name`. Returns its index.
    pub(crate) fn push_column(&mut self, name: &str) -> usize {
        self.header.push(name.to_string());
        for row in &mut self.rows {
            row.push(String::new());
        }
        self.header.len() - 1
    }
}
