//! Identifier validation overlay
//!
//! Computes an advisory status for every non-empty cell of the identifier
//! ("barcode") column. Findings never block filtering, editing, export, or
//! saving, and computing them never fails: a table without the column
//! simply yields an empty report.
//!
//! ## Rules
//!
//! - Empty (after trim): no status at all
//! - Length outside `min_length..=max_length` characters: **Error**
//! - Contains the placeholder character: **Warning**
//! - Same trimmed value on any other row (case-sensitive): **Error**
//!
//! Errors take precedence over warnings; every triggered rule contributes a
//! reason.

use rustc_hash::FxHashMap;
use serde::Serialize;

use crate::table::{RowId, Table};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BarcodeRules {
    /// Header name of the identifier column.
    pub column: String,
    pub min_length: usize,
    pub max_length: usize,
    /// Character marking an unresolved position.
    pub placeholder: char,
}

impl Default for BarcodeRules {
    fn default() -> Self {
        Self {
            column: "Barcode".to_string(),
            min_length: 16,
            max_length: 17,
            placeholder: 'X',
        }
    }
}

/// Combined status of one cell. Ordered by severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BarcodeStatus {
    Valid,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowValidation {
    pub status: BarcodeStatus,
    /// Human-readable reasons, one per triggered rule.
    pub reasons: Vec<String>,
    /// Number of OTHER rows holding the same value.
    pub duplicates: usize,
}

impl RowValidation {
    fn escalate(&mut self, status: BarcodeStatus, reason: String) {
        self.status = self.status.max(status);
        self.reasons.push(reason);
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ValidationSummary {
    pub valid: usize,
    pub warning: usize,
    pub error: usize,
}

#[derive(Debug, Clone, Default)]
pub struct ValidationReport {
    column: Option<usize>,
    rows: FxHashMap<RowId, RowValidation>,
}

impl ValidationReport {
    /// Index of the identifier column, if the table has one.
    pub fn column(&self) -> Option<usize> {
        self.column
    }

    /// Finding for a row; `None` when the cell is empty or the column absent.
    pub fn get(&self, id: RowId) -> Option<&RowValidation> {
        self.rows.get(&id)
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn summary(&self) -> ValidationSummary {
        let mut s = ValidationSummary::default();
        for v in self.rows.values() {
            match v.status {
                BarcodeStatus::Valid => s.valid += 1,
                BarcodeStatus::Warning => s.warning += 1,
                BarcodeStatus::Error => s.error += 1,
            }
        }
        s
    }

    pub fn has_errors(&self) -> bool {
        self.rows.values().any(|v| v.status == BarcodeStatus::Error)
    }
}

/// Read-only validator over a table.
pub struct ValidationOverlay;

impl ValidationOverlay {
    /// Validate the identifier column across every data row of `table`.
    ///
    /// Duplicates are counted over the whole table, not only the rows a
    /// filter currently shows.
    pub fn compute(table: &Table, rules: &BarcodeRules) -> ValidationReport {
        let Some(col) = table.column_index(&rules.column) else {
            return ValidationReport::default();
        };

        let mut counts: FxHashMap<&str, usize> = FxHashMap::default();
        for id in table.row_ids() {
            let value = table.cell(id, col).unwrap_or("").trim();
            if !value.is_empty() {
                *counts.entry(value).or_insert(0) += 1;
            }
        }

        let mut rows = FxHashMap::default();
        for id in table.row_ids() {
            let value = table.cell(id, col).unwrap_or("").trim();
            let duplicates = counts.get(value).map_or(0, |c| c.saturating_sub(1));
            if let Some(finding) = Self::check_value(value, rules, duplicates) {
                rows.insert(id, finding);
            }
        }

        ValidationReport { column: Some(col), rows }
    }

    /// Validate a single value given how many other rows share it.
    pub fn check_value(value: &str, rules: &BarcodeRules, duplicates: usize) -> Option<RowValidation> {
        let value = value.trim();
        if value.is_empty() {
            return None;
        }

        let mut finding = RowValidation {
            status: BarcodeStatus::Valid,
            reasons: Vec::new(),
            duplicates,
        };

        let len = value.chars().count();
        if len < rules.min_length || len > rules.max_length {
            finding.escalate(
                BarcodeStatus::Error,
                format!(
                    "length {len} is outside {}-{} characters",
                    rules.min_length, rules.max_length
                ),
            );
        }

        if value.contains(rules.placeholder) {
            finding.escalate(
                BarcodeStatus::Warning,
                format!("contains placeholder character '{}'", rules.placeholder),
            );
        }

        if duplicates > 0 {
            finding.escalate(
                BarcodeStatus::Error,
                format!("duplicate value: {duplicates} other row(s) use it"),
            );
        }

        Some(finding)
    }
}
