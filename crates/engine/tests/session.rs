// End-to-end tests of EditorSession with in-memory capabilities.
// Run with: cargo test -p sheetdesk-engine --test session

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::rc::Rc;

use sheetdesk_engine::columns::{ColumnPolicy, ConcatFormatter};
use sheetdesk_engine::render::{CollectingSink, RenderOutcome};
use sheetdesk_engine::validation::BarcodeStatus;
use sheetdesk_engine::*;

// ---------------------------------------------------------------------------
// Fakes
// ---------------------------------------------------------------------------

/// Comma-separated lines, no quoting.
struct LineParser;

impl TabularParser for LineParser {
    fn parse(&self, bytes: &[u8], _hint: FormatHint) -> Result<Matrix, ParseError> {
        let text = std::str::from_utf8(bytes).map_err(|e| ParseError::Corrupt(e.to_string()))?;
        let rows: Matrix = text
            .lines()
            .filter(|l| !l.is_empty())
            .map(|l| l.split(',').map(String::from).collect())
            .collect();
        if rows.is_empty() {
            return Err(ParseError::NoDataRows);
        }
        Ok(rows)
    }
}

/// Tab-separated lines, so tests can read exports back as text.
struct TsvExporter;

impl TabularExporter for TsvExporter {
    fn export(&self, table: &[Vec<String>]) -> Result<Vec<u8>, String> {
        Ok(table
            .iter()
            .map(|r| r.join("\t"))
            .collect::<Vec<_>>()
            .join("\n")
            .into_bytes())
    }

    fn extension(&self) -> &'static str {
        "tsv"
    }
}

#[derive(Default)]
struct MemoryDrafts {
    drafts: RefCell<BTreeMap<String, (String, DraftSnapshot)>>,
    next: Cell<u32>,
    offline: Cell<bool>,
}

impl DraftStore for MemoryDrafts {
    fn save(&self, name: &str, snapshot: &DraftSnapshot) -> Result<DraftId, RemoteError> {
        if self.offline.get() {
            return Err(RemoteError::new(503, "service unavailable"));
        }
        self.next.set(self.next.get() + 1);
        let id = format!("d{}", self.next.get());
        self.drafts
            .borrow_mut()
            .insert(id.clone(), (name.to_string(), snapshot.clone()));
        Ok(DraftId(id))
    }

    fn load(&self, id: &DraftId) -> Result<DraftSnapshot, RemoteError> {
        if self.offline.get() {
            return Err(RemoteError::new(503, "service unavailable"));
        }
        self.drafts
            .borrow()
            .get(id.as_str())
            .map(|(_, s)| s.clone())
            .ok_or_else(|| RemoteError::not_found(format!("no draft {id}")))
    }

    fn list(&self) -> Result<Vec<DraftSummary>, RemoteError> {
        Ok(self
            .drafts
            .borrow()
            .iter()
            .map(|(id, (name, s))| DraftSummary {
                id: DraftId(id.clone()),
                name: name.clone(),
                timestamp: s.timestamp.clone(),
                rows: s.row_count(),
            })
            .collect())
    }

    fn delete(&self, id: &DraftId) -> Result<(), RemoteError> {
        self.drafts
            .borrow_mut()
            .remove(id.as_str())
            .map(|_| ())
            .ok_or_else(|| RemoteError::not_found(format!("no draft {id}")))
    }
}

/// Lets a test keep a handle on the drafts it hands to a session.
struct Shared(Rc<MemoryDrafts>);

impl DraftStore for Shared {
    fn save(&self, name: &str, snapshot: &DraftSnapshot) -> Result<DraftId, RemoteError> {
        self.0.save(name, snapshot)
    }

    fn load(&self, id: &DraftId) -> Result<DraftSnapshot, RemoteError> {
        self.0.load(id)
    }

    fn list(&self) -> Result<Vec<DraftSummary>, RemoteError> {
        self.0.list()
    }

    fn delete(&self, id: &DraftId) -> Result<(), RemoteError> {
        self.0.delete(id)
    }
}

fn session() -> (EditorSession, Rc<MemoryDrafts>) {
    let drafts = Rc::new(MemoryDrafts::default());
    let session = EditorSession::new(
        Box::new(LineParser),
        Box::new(TsvExporter),
        Box::new(Shared(drafts.clone())),
    );
    (session, drafts)
}

const INVENTORY: &str = "site,lot,qty\nAB,0001,5\nCD,0002,7\nAB,0003,9\n";

fn exported_lines(bytes: Vec<u8>) -> Vec<Vec<String>> {
    String::from_utf8(bytes)
        .unwrap()
        .lines()
        .map(|l| l.split('\t').map(String::from).collect())
        .collect()
}

// ---------------------------------------------------------------------------
// Load
// ---------------------------------------------------------------------------

#[test]
fn load_injects_metadata_columns() {
    let (mut s, _) = session();
    let summary = s.load_file(INVENTORY.as_bytes(), "inventory.csv").unwrap();
    assert_eq!(summary.rows, 3);
    assert_eq!(summary.columns, 6);
    assert_eq!(summary.injected_columns, vec!["Barcode", "Notes", "Status"]);
    assert_eq!(s.store().header()[3], "Barcode");
    assert_eq!(s.filename(), Some("inventory.csv"));
    assert!(!s.is_dirty());
}

#[test]
fn load_populates_identifier_from_sources() {
    let drafts = Rc::new(MemoryDrafts::default());
    let mut s = EditorSession::new(Box::new(LineParser), Box::new(TsvExporter), Box::new(Shared(drafts)))
        .with_formatter(Box::new(ConcatFormatter::new(["site", "lot"])));
    let summary = s.load_file(INVENTORY.as_bytes(), "inventory.csv").unwrap();
    assert_eq!(summary.populated_cells, 3);
    assert_eq!(s.store().filtered_row(1).unwrap()[3], "AB0001");
}

#[test]
fn failed_load_keeps_previous_session() {
    let (mut s, _) = session();
    s.load_file(INVENTORY.as_bytes(), "inventory.csv").unwrap();
    s.edit_cell(1, 2, "50").unwrap();

    assert_eq!(
        s.load_file(b"only,a,header\n", "next.csv"),
        Err(LoadError::HeaderOnly)
    );
    assert!(matches!(
        s.load_file(b"x", "next.pdf"),
        Err(LoadError::Parse(ParseError::UnsupportedFormat(_)))
    ));
    assert_eq!(
        s.load_file(b"", "empty.csv"),
        Err(LoadError::Parse(ParseError::NoDataRows))
    );

    assert_eq!(s.filename(), Some("inventory.csv"));
    assert_eq!(s.store().filtered_row(1).unwrap()[2], "50");
    assert!(s.is_dirty());
}

#[test]
fn columns_classified_by_name() {
    let (mut s, _) = session();
    s.load_file(b"Status,id\nnew,1\n", "t.csv").unwrap();
    let snap = s.render_snapshot();
    let kinds: Vec<_> = snap.columns().iter().map(|c| (c.name.as_str(), c.kind)).collect();
    assert_eq!(kinds[0], ("Status", columns::CellKind::Input));
    assert_eq!(kinds[1], ("id", columns::CellKind::ReadOnly));
}

// ---------------------------------------------------------------------------
// Filter / select / edit
// ---------------------------------------------------------------------------

#[test]
fn selection_cleared_by_filter_and_visibility_change() {
    let (mut s, _) = session();
    s.load_file(INVENTORY.as_bytes(), "inventory.csv").unwrap();

    s.select_all();
    assert_eq!(s.check_state(), CheckState::Checked);
    s.apply_filter(0, Some(FilterSpec::quick(["AB"]))).unwrap();
    assert_eq!(s.check_state(), CheckState::Unchecked);

    s.toggle_row(1);
    assert_eq!(s.check_state(), CheckState::Indeterminate);
    s.set_column_visibility(2, false);
    assert_eq!(s.check_state(), CheckState::Unchecked);

    // No-op visibility change leaves selection alone
    s.toggle_row(2);
    s.set_column_visibility(2, false);
    assert_eq!(s.store().selection().to_vec(), vec![2]);
}

#[test]
fn edit_under_filter_persists_after_clear() {
    let (mut s, _) = session();
    s.load_file(INVENTORY.as_bytes(), "inventory.csv").unwrap();
    let notes = s.resolve_column("Notes").unwrap();

    s.apply_filter(1, Some(FilterSpec::advanced(AdvancedKind::EndsWith, "3", false)))
        .unwrap();
    assert_eq!(s.store().visible_row_count(), 1);
    s.edit_cell(1, notes, " recount ").unwrap();

    s.clear_all_filters();
    assert_eq!(s.store().filtered_row(3).unwrap()[notes], "recount");
    assert_eq!(s.store().filtered_row(1).unwrap()[notes], "");
}

#[test]
fn apply_filter_rejects_unknown_column() {
    let (mut s, _) = session();
    s.load_file(INVENTORY.as_bytes(), "inventory.csv").unwrap();
    assert!(matches!(
        s.apply_filter(99, None),
        Err(IndexError::Column { index: 99, .. })
    ));
}

#[test]
fn unique_values_feed_quick_filter() {
    let (mut s, _) = session();
    s.load_file(INVENTORY.as_bytes(), "inventory.csv").unwrap();
    let values = s.unique_values(0);
    assert_eq!(values[0].value, "AB");
    assert_eq!(values[0].count, 2);
    assert_eq!(values[1].value, "CD");
}

#[test]
fn resolve_column_by_name_or_index() {
    let (mut s, _) = session();
    s.load_file(INVENTORY.as_bytes(), "inventory.csv").unwrap();
    assert_eq!(s.resolve_column("qty"), Some(2));
    assert_eq!(s.resolve_column("1"), Some(1));
    assert_eq!(s.resolve_column("42"), None);
    assert_eq!(s.resolve_column("nope"), None);
}

// ---------------------------------------------------------------------------
// Render / validate
// ---------------------------------------------------------------------------

#[test]
fn render_follows_filter_and_hidden_columns() {
    let (mut s, _) = session();
    s.load_file(INVENTORY.as_bytes(), "inventory.csv").unwrap();
    s.apply_filter(0, Some(FilterSpec::quick(["AB"]))).unwrap();
    s.set_column_visibility(1, false);

    let mut sink = CollectingSink::default();
    assert_eq!(s.render_blocking(&mut sink), RenderOutcome::Completed { rows: 2 });
    assert_eq!(sink.columns.len(), 5);
    let qty: Vec<&str> = sink.rows.iter().map(|r| r.cells[1].value.as_str()).collect();
    assert_eq!(qty, vec!["5", "9"]);
}

#[test]
fn validation_sees_edits() {
    let (mut s, _) = session();
    s.load_file(INVENTORY.as_bytes(), "inventory.csv").unwrap();
    let barcode = s.resolve_column("Barcode").unwrap();

    s.edit_cell(1, barcode, "ABCDEFGHIJKLMNOP").unwrap();
    s.edit_cell(2, barcode, "ABCDEFGHIJKLMNOP").unwrap();
    s.edit_cell(3, barcode, "ABCDEFGHIJKLMNOX").unwrap();

    let report = s.validate();
    let ids = s.store().view_ids().to_vec();
    assert_eq!(report.get(ids[0]).unwrap().status, BarcodeStatus::Error);
    assert_eq!(report.get(ids[1]).unwrap().duplicates, 1);
    assert_eq!(report.get(ids[2]).unwrap().status, BarcodeStatus::Warning);
    assert!(report.has_errors());

    // Lookup by filtered index follows the current view
    s.apply_filter(1, Some(FilterSpec::quick(["0003"]))).unwrap();
    let finding = s.row_validation(&report, 1).unwrap();
    assert_eq!(finding.status, BarcodeStatus::Warning);
    assert!(s.row_validation(&report, 2).is_none());
}

// ---------------------------------------------------------------------------
// Export
// ---------------------------------------------------------------------------

#[test]
fn export_all_omits_hidden_columns() {
    let (mut s, _) = session();
    s.load_file(INVENTORY.as_bytes(), "inventory.csv").unwrap();
    s.set_column_visibility(0, false);
    s.set_column_visibility(2, false);

    let lines = exported_lines(s.export_all().unwrap());
    assert_eq!(lines.len(), 4);
    assert_eq!(lines[0], vec!["lot", "Barcode", "Notes", "Status"]);
    assert_eq!(lines[2][0], "0002");
    assert!(lines.iter().all(|l| l.len() == 4));
    assert_eq!(s.store().width(), 6);
}

#[test]
fn export_selected_requires_selection() {
    let (mut s, _) = session();
    assert_eq!(s.export_all(), Err(ExportError::NothingLoaded));
    s.load_file(INVENTORY.as_bytes(), "inventory.csv").unwrap();
    assert_eq!(s.export_selected(), Err(ExportError::NothingSelected));

    s.set_row_selected(3, true);
    s.set_row_selected(1, true);
    let lines = exported_lines(s.export_selected().unwrap());
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[1][1], "0001");
    assert_eq!(lines[2][1], "0003");
}

// ---------------------------------------------------------------------------
// Drafts
// ---------------------------------------------------------------------------

#[test]
fn draft_roundtrip_restores_full_session() {
    let (mut s, drafts) = session();
    s.load_file(INVENTORY.as_bytes(), "inventory.csv").unwrap();
    s.apply_filter(0, Some(FilterSpec::quick(["AB"]))).unwrap();
    s.set_column_visibility(5, false);
    s.edit_cell(2, 4, "late").unwrap();
    s.set_row_selected(2, true);
    assert!(s.is_dirty());

    let id = s.save_draft("monday").unwrap();
    assert!(!s.is_dirty());
    assert_eq!(drafts.list().unwrap()[0].name, "monday");

    let (mut other, _) = session();
    let mut other_drafts_session = EditorSession::new(
        Box::new(LineParser),
        Box::new(TsvExporter),
        Box::new(Shared(drafts.clone())),
    );
    other_drafts_session.load_draft(&id).unwrap();
    assert_eq!(other_drafts_session.store().filtered_matrix(), s.store().filtered_matrix());
    assert_eq!(other_drafts_session.visibility().hidden_columns(), vec![5]);
    assert_eq!(other_drafts_session.store().selection().to_vec(), vec![2]);
    assert!(!other_drafts_session.is_dirty());

    // A session with an empty store cannot see the draft
    assert!(matches!(
        other.load_draft(&id),
        Err(SessionError::Remote(RemoteError { status: 404, .. }))
    ));
}

#[test]
fn failed_save_keeps_dirty_and_state() {
    let (mut s, drafts) = session();
    s.load_file(INVENTORY.as_bytes(), "inventory.csv").unwrap();
    s.edit_cell(1, 0, "ZZ").unwrap();
    drafts.offline.set(true);

    let err = s.save_draft("x").unwrap_err();
    assert_eq!(err.status, 503);
    assert!(s.is_dirty());
    assert_eq!(s.store().filtered_row(1).unwrap()[0], "ZZ");

    assert!(s.load_draft(&DraftId("d1".into())).is_err());
    assert_eq!(s.filename(), Some("inventory.csv"));
}

#[test]
fn delete_draft_removes_listing() {
    let (mut s, _) = session();
    s.load_file(INVENTORY.as_bytes(), "inventory.csv").unwrap();
    let id = s.save_draft("a").unwrap();
    s.delete_draft(&id).unwrap();
    assert!(s.list_drafts().unwrap().is_empty());
    assert!(s.delete_draft(&id).unwrap_err().is_not_found());
}

#[test]
fn column_policy_can_disable_injection() {
    let drafts = Rc::new(MemoryDrafts::default());
    let mut s = EditorSession::new(Box::new(LineParser), Box::new(TsvExporter), Box::new(Shared(drafts)))
        .with_column_policy(ColumnPolicy { editable: vec!["qty".into()], inject: vec![] });
    let summary = s.load_file(INVENTORY.as_bytes(), "inventory.csv").unwrap();
    assert!(summary.injected_columns.is_empty());
    assert_eq!(summary.columns, 3);
}
