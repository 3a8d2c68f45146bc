//! Draft snapshot - the persisted shape of an editing session.
//!
//! Plain data, no behavior. Wire format (JSON):
//!
//! ```json
//! { "data": [["h1","h2"],["a","b"]],
//!   "filters": { "1": { "type": "quick", "selectedValues": ["b"] } },
//!   "hiddenColumns": [0],
//!   "selected": [1],
//!   "timestamp": "2026-01-31T12:00:00Z" }
//! ```

use std::collections::BTreeMap;

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::filter::FilterSpec;
use crate::table::Matrix;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftSnapshot {
    /// Header + every data row of the original table.
    pub data: Matrix,
    #[serde(default)]
    pub filters: BTreeMap<usize, FilterSpec>,
    #[serde(default)]
    pub hidden_columns: Vec<usize>,
    /// Filtered-view indices selected at save time.
    #[serde(default)]
    pub selected: Vec<usize>,
    /// ISO 8601, UTC.
    pub timestamp: String,
}

impl DraftSnapshot {
    /// Data rows, header excluded.
    pub fn row_count(&self) -> usize {
        self.data.len().saturating_sub(1)
    }
}

/// Current UTC time, ISO 8601 with a `Z` suffix.
pub fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Opaque identifier assigned by a draft store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DraftId(pub String);

impl DraftId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for DraftId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Listing entry for a saved draft.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftSummary {
    pub id: DraftId,
    pub name: String,
    pub timestamp: String,
    #[serde(default)]
    pub rows: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::AdvancedKind;

    #[test]
    fn test_json_keys_and_numeric_filter_keys() {
        let mut filters = BTreeMap::new();
        filters.insert(2, FilterSpec::advanced(AdvancedKind::IsEmpty, "", false));
        let snap = DraftSnapshot {
            data: vec![vec!["h".into()], vec!["v".into()]],
            filters,
            hidden_columns: vec![0],
            selected: vec![1],
            timestamp: "2026-01-31T12:00:00Z".into(),
        };
        let json = serde_json::to_value(&snap).unwrap();
        assert_eq!(json["hiddenColumns"][0], 0);
        assert_eq!(json["filters"]["2"]["kind"], "is_empty");

        let back: DraftSnapshot = serde_json::from_value(json).unwrap();
        assert_eq!(back, snap);
        assert_eq!(back.row_count(), 1);
    }

    #[test]
    fn test_missing_optional_fields_default() {
        let json = r#"{"data":[["a"],["1"]],"timestamp":"t"}"#;
        let snap: DraftSnapshot = serde_json::from_str(json).unwrap();
        assert!(snap.filters.is_empty());
        assert!(snap.hidden_columns.is_empty());
        assert!(snap.selected.is_empty());
    }

    #[test]
    fn test_timestamp_is_utc_iso() {
        let ts = now_timestamp();
        assert!(ts.ends_with('Z'));
        assert!(chrono::DateTime::parse_from_rfc3339(&ts).is_ok());
    }
}
