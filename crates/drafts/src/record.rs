//! Stored draft record, shared by the file store and the HTTP wire format.

use serde::{Deserialize, Serialize};
use sheetdesk_engine::{DraftId, DraftSnapshot, DraftSummary};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DraftRecord {
    pub id: DraftId,
    pub name: String,
    pub snapshot: DraftSnapshot,
}

impl DraftRecord {
    pub fn summary(&self) -> DraftSummary {
        DraftSummary {
            id: self.id.clone(),
            name: self.name.clone(),
            timestamp: self.snapshot.timestamp.clone(),
            rows: self.snapshot.row_count(),
        }
    }
}

/// Newest first; ties by name.
pub(crate) fn sort_summaries(summaries: &mut [DraftSummary]) {
    summaries.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then_with(|| a.name.cmp(&b.name)));
}
