//! Column filters - the row view layer
//!
//! A filter set maps column index -> [`FilterSpec`]. Evaluating it against
//! the original table yields the filtered view: the ordered list of data
//! [`RowId`]s that pass. The header is not part of that list; it is always
//! present at view index 0.
//!
//! Key invariants:
//! - A row passes iff EVERY column filter passes (AND, never OR)
//! - Row order in the view is load order
//! - Unknown advanced kinds pass every row (fail open) and are logged
//! - Comparisons run on trimmed cell text

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::error::IndexError;
use crate::table::{RowId, Table};

// =============================================================================
// FilterSpec: one column's predicate
// =============================================================================

/// Advanced (single-predicate) filter operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdvancedKind {
    Equals,
    Contains,
    StartsWith,
    EndsWith,
    NotEquals,
    NotContains,
    IsEmpty,
    IsNotEmpty,
    /// Any kind this build does not understand (e.g. from a newer draft).
    #[serde(other)]
    Unknown,
}

impl AdvancedKind {
    /// Parse the wire / CLI name of a kind. Unrecognised names map to `Unknown`.
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "equals" | "eq" => Self::Equals,
            "contains" => Self::Contains,
            "starts_with" => Self::StartsWith,
            "ends_with" => Self::EndsWith,
            "not_equals" | "ne" => Self::NotEquals,
            "not_contains" => Self::NotContains,
            "is_empty" => Self::IsEmpty,
            "is_not_empty" => Self::IsNotEmpty,
            _ => Self::Unknown,
        }
    }

    /// Kinds that ignore the comparison value.
    pub fn is_unary(self) -> bool {
        matches!(self, Self::IsEmpty | Self::IsNotEmpty)
    }
}

/// Per-column filter predicate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum FilterSpec {
    /// Checklist filter: trimmed cell must equal one of the values exactly.
    #[serde(rename_all = "camelCase")]
    Quick { selected_values: BTreeSet<String> },

    /// Operator filter against a single comparison value.
    #[serde(rename_all = "camelCase")]
    Advanced {
        kind: AdvancedKind,
        #[serde(default)]
        value: String,
        #[serde(default)]
        case_sensitive: bool,
    },
}

impl FilterSpec {
    pub fn quick<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        FilterSpec::Quick {
            selected_values: values.into_iter().map(Into::into).collect(),
        }
    }

    pub fn advanced(kind: AdvancedKind, value: impl Into<String>, case_sensitive: bool) -> Self {
        FilterSpec::Advanced {
            kind,
            value: value.into(),
            case_sensitive,
        }
    }

    /// Check a single cell against this predicate.
    ///
    /// For bulk evaluation prefer [`FilterEngine::evaluate`], which prepares
    /// each predicate once per pass.
    pub fn matches(&self, cell: &str) -> bool {
        CompiledFilter::compile(self).passes(cell)
    }
}

// =============================================================================
// CompiledFilter: predicate with needles normalized once per pass
// =============================================================================

enum CompiledFilter<'a> {
    Quick(HashSet<&'a str>),
    Text {
        kind: AdvancedKind,
        needle: String,
        case_sensitive: bool,
    },
    Empty,
    NotEmpty,
    PassAll,
}

impl<'a> CompiledFilter<'a> {
    fn compile(spec: &'a FilterSpec) -> Self {
        match spec {
            FilterSpec::Quick { selected_values } => {
                CompiledFilter::Quick(selected_values.iter().map(|v| v.trim()).collect())
            }
            FilterSpec::Advanced { kind, value, case_sensitive } => match kind {
                AdvancedKind::IsEmpty => CompiledFilter::Empty,
                AdvancedKind::IsNotEmpty => CompiledFilter::NotEmpty,
                AdvancedKind::Unknown => CompiledFilter::PassAll,
                _ => {
                    let trimmed = value.trim();
                    CompiledFilter::Text {
                        kind: *kind,
                        needle: if *case_sensitive {
                            trimmed.to_string()
                        } else {
                            trimmed.to_lowercase()
                        },
                        case_sensitive: *case_sensitive,
                    }
                }
            },
        }
    }

    fn passes(&self, cell: &str) -> bool {
        let cell = cell.trim();
        match self {
            CompiledFilter::Quick(values) => values.contains(cell),
            CompiledFilter::Empty => cell.is_empty(),
            CompiledFilter::NotEmpty => !cell.is_empty(),
            CompiledFilter::PassAll => true,
            CompiledFilter::Text { kind, needle, case_sensitive } => {
                let lowered;
                let haystack = if *case_sensitive {
                    cell
                } else {
                    lowered = cell.to_lowercase();
                    lowered.as_str()
                };
                let needle = needle.as_str();
                match kind {
                    AdvancedKind::Equals => haystack == needle,
                    AdvancedKind::NotEquals => haystack != needle,
                    AdvancedKind::Contains => haystack.contains(needle),
                    AdvancedKind::NotContains => !haystack.contains(needle),
                    AdvancedKind::StartsWith => haystack.starts_with(needle),
                    AdvancedKind::EndsWith => haystack.ends_with(needle),
                    // Unary and unknown kinds never compile to Text
                    AdvancedKind::IsEmpty
                    | AdvancedKind::IsNotEmpty
                    | AdvancedKind::Unknown => true,
                }
            }
        }
    }
}

// =============================================================================
// FilterEngine
// =============================================================================

/// Stateless evaluator: derives the filtered view from the original table.
pub struct FilterEngine;

impl FilterEngine {
    /// Data rows of `table` passing every filter, in load order.
    ///
    /// Filters on columns beyond the table width compare against the empty
    /// string. Callers that accept user input validate columns first.
    pub fn evaluate(table: &Table, filters: &BTreeMap<usize, FilterSpec>) -> Vec<RowId> {
        if filters.is_empty() {
            return table.row_ids().collect();
        }

        let compiled: Vec<(usize, CompiledFilter<'_>)> = filters
            .iter()
            .map(|(&col, spec)| {
                if let FilterSpec::Advanced { kind: AdvancedKind::Unknown, .. } = spec {
                    log::warn!("column {col}: unknown filter kind, passing all rows");
                }
                (col, CompiledFilter::compile(spec))
            })
            .collect();

        let rows: Vec<RowId> = table
            .row_ids()
            .filter(|&id| {
                compiled
                    .iter()
                    .all(|(col, f)| f.passes(table.cell(id, *col).unwrap_or("")))
            })
            .collect();

        log::debug!(
            "filtered {} of {} rows with {} column filter(s)",
            rows.len(),
            table.row_count(),
            compiled.len()
        );
        rows
    }

    /// Distinct trimmed values of `col` over every data row, with counts.
    ///
    /// Sorted by count descending; equal counts keep first-appearance order.
    /// Feeds the quick-filter checklist. Returns empty for an unknown column.
    pub fn unique_values(table: &Table, col: usize) -> Vec<UniqueValueEntry> {
        if col >= table.width() {
            return Vec::new();
        }

        let mut positions: HashMap<&str, usize> = HashMap::new();
        let mut entries: Vec<UniqueValueEntry> = Vec::new();

        for id in table.row_ids() {
            let value = table.cell(id, col).unwrap_or("").trim();
            match positions.get(value) {
                Some(&pos) => entries[pos].count += 1,
                None => {
                    positions.insert(value, entries.len());
                    entries.push(UniqueValueEntry {
                        value: value.to_string(),
                        count: 1,
                    });
                }
            }
        }

        // Stable: ties stay in first-seen order
        entries.sort_by(|a, b| b.count.cmp(&a.count));
        entries
    }
}

/// Entry in a column's distinct-value list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UniqueValueEntry {
    pub value: String,
    pub count: usize,
}

// =============================================================================
// Filterable: the filter surface of the store
// =============================================================================

/// Operations that change the active filter set.
///
/// Every mutation re-derives the filtered view and clears the selection as
/// one step; no caller can observe the new view with the old selection.
pub trait Filterable {
    /// Set (`Some`) or clear (`None`) one column's filter.
    fn apply_filter(&mut self, col: usize, spec: Option<FilterSpec>) -> Result<(), IndexError>;

    /// Remove every column filter.
    fn clear_all_filters(&mut self);

    /// Active filters keyed by column.
    fn filters(&self) -> &BTreeMap<usize, FilterSpec>;

    fn active_filter_count(&self) -> usize {
        self.filters().len()
    }

    fn is_filtered(&self) -> bool {
        !self.filters().is_empty()
    }
}

// =============================================================================
// Tests
// =============================================================================
