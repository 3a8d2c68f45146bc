//! EditorSession - the coordinating surface a host drives.
//!
//! Composes the store, column visibility, renderer, and validation with the
//! injected capabilities (parser, exporter, draft store). Every operation a
//! host UI or CLI can invoke lives here; components never reach each other
//! through globals.
//!
//! Error policy:
//! - Loads are all-or-nothing: a failed load keeps the previous session
//! - Edits reject out-of-range indices with `IndexError`
//! - Selection calls ignore out-of-range indices
//! - Remote failures never touch local state (a failed save stays dirty)

use crate::capabilities::{DraftStore, FormatHint, TabularExporter, TabularParser};
use crate::columns::{populate_column, ColumnPolicy, RowFormatter};
use crate::error::{ExportError, IndexError, LoadError, RemoteError, SessionError};
use crate::filter::{FilterEngine, FilterSpec, Filterable, UniqueValueEntry};
use crate::render::{IncrementalRenderer, RenderConfig, RenderOutcome, RenderSink, RenderSnapshot, Renderable};
use crate::selection::{CheckState, Selectable};
use crate::snapshot::{DraftId, DraftSummary};
use crate::store::TabularStore;
use crate::table::{Matrix, Table};
use crate::validation::{BarcodeRules, RowValidation, ValidationOverlay, ValidationReport};
use crate::visibility::ColumnVisibility;

/// Result of a successful file load.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct LoadSummary {
    pub filename: String,
    /// Data rows (header excluded).
    pub rows: usize,
    pub columns: usize,
    /// Metadata columns appended because the file lacked them.
    pub injected_columns: Vec<String>,
    /// Identifier cells filled at load time.
    pub populated_cells: usize,
}

pub struct EditorSession {
    store: TabularStore,
    visibility: ColumnVisibility,
    renderer: IncrementalRenderer,
    policy: ColumnPolicy,
    rules: BarcodeRules,
    default_hidden: Vec<String>,
    formatter: Option<Box<dyn RowFormatter>>,
    parser: Box<dyn TabularParser>,
    exporter: Box<dyn TabularExporter>,
    drafts: Box<dyn DraftStore>,
    filename: Option<String>,
}

impl EditorSession {
    pub fn new(
        parser: Box<dyn TabularParser>,
        exporter: Box<dyn TabularExporter>,
        drafts: Box<dyn DraftStore>,
    ) -> Self {
        Self {
            store: TabularStore::new(),
            visibility: ColumnVisibility::default(),
            renderer: IncrementalRenderer::default(),
            policy: ColumnPolicy::default(),
            rules: BarcodeRules::default(),
            default_hidden: Vec::new(),
            formatter: None,
            parser,
            exporter,
            drafts,
            filename: None,
        }
    }

    pub fn with_render_config(mut self, config: RenderConfig) -> Self {
        self.renderer = IncrementalRenderer::new(config);
        self
    }

    pub fn with_column_policy(mut self, policy: ColumnPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_barcode_rules(mut self, rules: BarcodeRules) -> Self {
        self.rules = rules;
        self
    }

    /// Formatter used to fill empty identifier cells at load time.
    pub fn with_formatter(mut self, formatter: Box<dyn RowFormatter>) -> Self {
        self.formatter = Some(formatter);
        self
    }

    /// Column names hidden by default after each file load.
    pub fn with_default_hidden(mut self, names: Vec<String>) -> Self {
        self.default_hidden = names;
        self
    }

    /// Swap the exporter (e.g. CSV vs spreadsheet output).
    pub fn set_exporter(&mut self, exporter: Box<dyn TabularExporter>) {
        self.exporter = exporter;
    }

    // -------------------------------------------------------------------------
    // Accessors
    // -------------------------------------------------------------------------

    pub fn store(&self) -> &TabularStore {
        &self.store
    }

    pub fn visibility(&self) -> &ColumnVisibility {
        &self.visibility
    }

    pub fn renderer(&self) -> &IncrementalRenderer {
        &self.renderer
    }

    pub fn policy(&self) -> &ColumnPolicy {
        &self.policy
    }

    pub fn filename(&self) -> Option<&str> {
        self.filename.as_deref()
    }

    pub fn is_dirty(&self) -> bool {
        self.store.is_dirty()
    }

    /// Resolve a column by header name or by numeric index.
    pub fn resolve_column(&self, name_or_index: &str) -> Option<usize> {
        self.store.original().column_index(name_or_index).or_else(|| {
            name_or_index
                .trim()
                .parse::<usize>()
                .ok()
                .filter(|&c| c < self.store.width())
        })
    }

    // -------------------------------------------------------------------------
    // Loading
    // -------------------------------------------------------------------------

    /// Parse, prepare, and install a file.
    pub fn load_file(&mut self, bytes: &[u8], filename: &str) -> Result<LoadSummary, LoadError> {
        let hint = FormatHint::from_filename(filename)?;
        let matrix = self.parser.parse(bytes, hint)?;
        let summary = self.load_matrix(matrix, filename)?;
        log::info!(
            "{}: {} rows, {} columns, injected {:?}",
            summary.filename,
            summary.rows,
            summary.columns,
            summary.injected_columns
        );
        Ok(summary)
    }

    /// Install an already parsed matrix with the load-time column work.
    pub fn load_matrix(&mut self, matrix: Matrix, filename: &str) -> Result<LoadSummary, LoadError> {
        let mut table = Table::from_matrix(matrix)?;
        let injected_columns = self.policy.inject_into(&mut table);

        let populated_cells = match (&self.formatter, table.column_index(&self.rules.column)) {
            (Some(formatter), Some(col)) => populate_column(&mut table, col, formatter.as_ref()),
            _ => 0,
        };

        let summary = LoadSummary {
            filename: filename.to_string(),
            rows: table.row_count(),
            columns: table.width(),
            injected_columns,
            populated_cells,
        };

        self.visibility = ColumnVisibility::seed(table.header(), &self.default_hidden);
        self.store.install(table);
        self.filename = Some(filename.to_string());
        self.renderer.invalidate();
        Ok(summary)
    }

    // -------------------------------------------------------------------------
    // Filtering
    // -------------------------------------------------------------------------

    /// Set or clear one column's filter. Clears the selection.
    pub fn apply_filter(&mut self, col: usize, spec: Option<FilterSpec>) -> Result<(), IndexError> {
        self.store.apply_filter(col, spec)?;
        self.renderer.invalidate();
        Ok(())
    }

    pub fn clear_all_filters(&mut self) {
        self.store.clear_all_filters();
        self.renderer.invalidate();
    }

    /// Checklist values for a column's quick filter.
    pub fn unique_values(&self, col: usize) -> Vec<UniqueValueEntry> {
        FilterEngine::unique_values(self.store.original(), col)
    }

    // -------------------------------------------------------------------------
    // Editing
    // -------------------------------------------------------------------------

    pub fn edit_cell(&mut self, row: usize, col: usize, value: &str) -> Result<(), IndexError> {
        self.store.edit_cell(row, col, value)
    }

    // -------------------------------------------------------------------------
    // Columns
    // -------------------------------------------------------------------------

    /// Show or hide a column. A change re-renders the table, which
    /// invalidates the selection.
    pub fn set_column_visibility(&mut self, col: usize, visible: bool) {
        if self.visibility.set_visible(col, visible) {
            self.store.deselect_all();
            self.renderer.invalidate();
        }
    }

    // -------------------------------------------------------------------------
    // Selection
    // -------------------------------------------------------------------------

    pub fn select_all(&mut self) {
        self.store.select_all();
    }

    pub fn deselect_all(&mut self) {
        self.store.deselect_all();
    }

    pub fn toggle_row(&mut self, index: usize) -> Option<bool> {
        self.store.toggle_row(index)
    }

    pub fn set_row_selected(&mut self, index: usize, selected: bool) {
        self.store.set_row_selected(index, selected);
    }

    pub fn check_state(&self) -> CheckState {
        self.store.check_state()
    }

    // -------------------------------------------------------------------------
    // Rendering and validation
    // -------------------------------------------------------------------------

    pub fn render_snapshot(&self) -> RenderSnapshot {
        self.store.render_snapshot(&self.visibility, &self.policy)
    }

    /// Render the current view into `sink`, yielding between batches.
    pub async fn render<S: RenderSink + ?Sized>(&self, sink: &mut S) -> RenderOutcome {
        self.renderer.render(self.render_snapshot(), sink).await
    }

    pub fn render_blocking<S: RenderSink + ?Sized>(&self, sink: &mut S) -> RenderOutcome {
        self.renderer.render_blocking(self.render_snapshot(), sink)
    }

    pub fn validate(&self) -> ValidationReport {
        ValidationOverlay::compute(self.store.original(), &self.rules)
    }

    /// Finding for the row at filtered `index`, if it has one.
    pub fn row_validation<'r>(&self, report: &'r ValidationReport, index: usize) -> Option<&'r RowValidation> {
        report.get(self.store.row_id_at(index)?)
    }

    // -------------------------------------------------------------------------
    // Export
    // -------------------------------------------------------------------------

    /// Every row of the filtered view, hidden columns omitted.
    pub fn export_all(&self) -> Result<Vec<u8>, ExportError> {
        if !self.store.is_loaded() {
            return Err(ExportError::NothingLoaded);
        }
        self.encode(self.store.filtered_matrix())
    }

    /// Selected rows only, hidden columns omitted.
    pub fn export_selected(&self) -> Result<Vec<u8>, ExportError> {
        if !self.store.is_loaded() {
            return Err(ExportError::NothingLoaded);
        }
        if self.store.selection().is_empty() {
            return Err(ExportError::NothingSelected);
        }
        self.encode(self.store.selected_matrix())
    }

    fn encode(&self, matrix: Matrix) -> Result<Vec<u8>, ExportError> {
        let projected: Matrix = matrix.iter().map(|r| self.visibility.project(r)).collect();
        self.exporter.export(&projected).map_err(ExportError::Export)
    }

    pub fn export_extension(&self) -> &'static str {
        self.exporter.extension()
    }

    // -------------------------------------------------------------------------
    // Drafts
    // -------------------------------------------------------------------------

    /// Persist the session. Clears the dirty flag only on success.
    pub fn save_draft(&mut self, name: &str) -> Result<DraftId, RemoteError> {
        let snapshot = self.store.export_snapshot(&self.visibility);
        match self.drafts.save(name, &snapshot) {
            Ok(id) => {
                self.store.mark_saved();
                log::info!("saved draft '{name}' as {id}");
                Ok(id)
            }
            Err(e) => {
                log::warn!("saving draft '{name}' failed: {e}");
                Err(e)
            }
        }
    }

    /// Replace the session with a saved draft. On any failure the current
    /// session is kept.
    pub fn load_draft(&mut self, id: &DraftId) -> Result<(), SessionError> {
        let snapshot = self.drafts.load(id).inspect_err(|e| {
            log::warn!("loading draft {id} failed: {e}");
        })?;
        let hidden = snapshot.hidden_columns.clone();

        let mut store = TabularStore::new();
        store.restore_snapshot(snapshot)?;

        let mut visibility = ColumnVisibility::new(store.width());
        visibility.restore(hidden);

        self.store = store;
        self.visibility = visibility;
        self.filename = Some(format!("draft:{id}"));
        self.renderer.invalidate();
        Ok(())
    }

    pub fn list_drafts(&self) -> Result<Vec<DraftSummary>, RemoteError> {
        self.drafts.list()
    }

    pub fn delete_draft(&self, id: &DraftId) -> Result<(), RemoteError> {
        self.drafts.delete(id)
    }
}
