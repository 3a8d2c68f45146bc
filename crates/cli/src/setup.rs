// Session setup shared by every command: settings mapping, input loading,
// and the filter / hide / edit / select flags applied on top of a load.

use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::Args;
use sheetdesk_config::Settings;
use sheetdesk_drafts::{open_store, DraftBackend, FileDraftStore};
use sheetdesk_engine::columns::{ColumnPolicy, ConcatFormatter};
use sheetdesk_engine::render::RenderConfig;
use sheetdesk_engine::validation::BarcodeRules;
use sheetdesk_engine::{AdvancedKind, DraftStore, EditorSession, FilterSpec, LoadSummary};
use sheetdesk_io::{CsvExporter, FileParser};

use crate::exit_codes::{load_exit_code, remote_exit_code};
use crate::CliError;

/// Input file plus the edits applied to it before the command runs.
///
/// Flags apply in a fixed order: columns are hidden or shown, then filters
/// narrow the view, then `--set` edits address rows of that view, and
/// `--rows` selects last (any filter or visibility change clears selection).
#[derive(Args, Debug, Clone, Default)]
pub struct TableArgs {
    /// Input file (.csv, .tsv, .txt, .xlsx, .xlsm, .xls, .ods)
    pub file: PathBuf,

    /// Checklist filter: COLUMN=VALUE[,VALUE...] (repeatable)
    #[arg(long = "quick", value_name = "COLUMN=VALUES")]
    pub quick: Vec<String>,

    /// Operator filter: COLUMN:KIND[:VALUE] (repeatable).
    /// KIND: equals, contains, starts_with, ends_with, not_equals,
    /// not_contains, is_empty, is_not_empty
    #[arg(long = "where", value_name = "COLUMN:KIND[:VALUE]")]
    pub r#where: Vec<String>,

    /// Make --where comparisons case-sensitive
    #[arg(long)]
    pub case_sensitive: bool,

    /// Hide a column by name or index (repeatable)
    #[arg(long = "hide", value_name = "COLUMN")]
    pub hide: Vec<String>,

    /// Show a column hidden by settings (repeatable)
    #[arg(long = "show", value_name = "COLUMN")]
    pub show: Vec<String>,

    /// Edit a cell: ROW:COLUMN=VALUE, ROW is 1-based in the filtered view
    #[arg(long = "set", value_name = "ROW:COLUMN=VALUE")]
    pub set: Vec<String>,

    /// Select rows of the filtered view: "all" or a list like 1,3,5-8
    #[arg(long, value_name = "ROWS")]
    pub rows: Option<String>,
}

/// Which rows `--rows` picks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowSelection {
    All,
    Indices(Vec<usize>),
}

/// Settings and draft location for one invocation.
pub struct Context {
    pub settings: Settings,
    pub backend: DraftBackend,
}

impl Context {
    pub fn new(settings: Settings, drafts_dir: Option<PathBuf>) -> Self {
        let backend = match (drafts_dir, settings.drafts_api_base.clone()) {
            (Some(dir), _) => DraftBackend::Directory(dir),
            (None, Some(api_base)) => DraftBackend::Remote { api_base: Some(api_base) },
            (None, None) => DraftBackend::Directory(settings.drafts_dir()),
        };
        Self { settings, backend }
    }

    /// Session wired to the configured draft store.
    pub fn session(&self) -> Result<EditorSession, CliError> {
        let drafts = open_store(&self.backend).map_err(|e| {
            CliError::new(remote_exit_code(&e), e.to_string())
                .with_hint("run `sheetdesk login --token <TOKEN> --api-base <URL>`, or pass --drafts-dir")
        })?;
        Ok(self.build(drafts))
    }

    /// Session for commands that never touch drafts.
    pub fn local_session(&self) -> EditorSession {
        self.build(Box::new(FileDraftStore::new(self.settings.drafts_dir())))
    }

    fn build(&self, drafts: Box<dyn DraftStore>) -> EditorSession {
        let s = &self.settings;
        let session = EditorSession::new(Box::new(FileParser), Box::new(CsvExporter::comma()), drafts)
            .with_render_config(render_config(s))
            .with_column_policy(ColumnPolicy {
                editable: s.editable_columns.clone(),
                inject: s.inject_columns.clone(),
            })
            .with_barcode_rules(barcode_rules(s))
            .with_default_hidden(s.hidden_columns.clone());

        if s.barcode_source_columns.is_empty() {
            session
        } else {
            session.with_formatter(Box::new(ConcatFormatter::new(s.barcode_source_columns.clone())))
        }
    }
}

pub fn render_config(s: &Settings) -> RenderConfig {
    RenderConfig {
        batch_size: s.render_batch_size.max(1),
        yield_every: s.render_yield_every.max(1),
        yield_threshold: s.render_yield_threshold,
        yield_delay: Duration::from_millis(s.render_yield_delay_ms),
    }
}

pub fn barcode_rules(s: &Settings) -> BarcodeRules {
    BarcodeRules {
        column: s.barcode_column.clone(),
        min_length: s.barcode_min_length,
        max_length: s.barcode_max_length,
        placeholder: s.barcode_placeholder,
    }
}

// ============================================================================
// Loading and applying flags
// ============================================================================

pub fn load_input(session: &mut EditorSession, path: &Path) -> Result<LoadSummary, CliError> {
    let bytes = std::fs::read(path)
        .map_err(|e| CliError::io(format!("{}: {e}", path.display())))?;
    let filename = path.to_string_lossy();
    session
        .load_file(&bytes, &filename)
        .map_err(|e| CliError::new(load_exit_code(&e), format!("{}: {e}", path.display())))
}

/// Load `args.file` and apply every flag. Returns the load summary.
pub fn open_table(session: &mut EditorSession, args: &TableArgs) -> Result<LoadSummary, CliError> {
    let summary = load_input(session, &args.file)?;
    apply_flags(session, args)?;
    Ok(summary)
}

pub fn apply_flags(session: &mut EditorSession, args: &TableArgs) -> Result<(), CliError> {
    for name in &args.show {
        let col = column(session, name)?;
        session.set_column_visibility(col, true);
    }
    for name in &args.hide {
        let col = column(session, name)?;
        session.set_column_visibility(col, false);
    }

    for raw in &args.quick {
        let (name, values) = parse_quick(raw)?;
        let col = column(session, &name)?;
        session
            .apply_filter(col, Some(FilterSpec::quick(values)))
            .map_err(|e| CliError::args(e.to_string()))?;
    }
    for raw in &args.r#where {
        let (name, kind, value) = parse_where(raw)?;
        if kind == AdvancedKind::Unknown {
            log::warn!("unknown filter kind in '{raw}'; the filter passes every row");
        }
        let col = column(session, &name)?;
        session
            .apply_filter(col, Some(FilterSpec::advanced(kind, value, args.case_sensitive)))
            .map_err(|e| CliError::args(e.to_string()))?;
    }

    for raw in &args.set {
        let (row, name, value) = parse_edit(raw)?;
        let col = column(session, &name)?;
        session
            .edit_cell(row, col, &value)
            .map_err(|e| CliError::args(format!("--set {raw}: {e}")))?;
    }

    match args.rows.as_deref().map(parse_rows).transpose()? {
        Some(RowSelection::All) => session.select_all(),
        Some(RowSelection::Indices(indices)) => {
            for index in indices {
                session.set_row_selected(index, true);
            }
        }
        None => {}
    }
    Ok(())
}

pub fn column(session: &EditorSession, name: &str) -> Result<usize, CliError> {
    session.resolve_column(name).ok_or_else(|| {
        let header = session.store().header().join(", ");
        CliError::args(format!("unknown column '{name}'"))
            .with_hint(format!("columns are: {header}"))
    })
}

// ============================================================================
// Flag parsing
// ============================================================================

/// `COLUMN=a,b,c`
pub fn parse_quick(raw: &str) -> Result<(String, Vec<String>), CliError> {
    let (name, values) = raw
        .split_once('=')
        .ok_or_else(|| CliError::args(format!("--quick '{raw}': expected COLUMN=VALUE[,VALUE...]")))?;
    let values = values.split(',').map(|v| v.trim().to_string()).collect();
    Ok((name.trim().to_string(), values))
}

/// `COLUMN:KIND` or `COLUMN:KIND:VALUE`. The value may itself contain `:`.
pub fn parse_where(raw: &str) -> Result<(String, AdvancedKind, String), CliError> {
    let mut parts = raw.splitn(3, ':');
    let name = parts.next().unwrap_or_default().trim();
    let kind = parts.next().map(AdvancedKind::from_name);
    let value = parts.next().unwrap_or_default();

    match kind {
        Some(kind) if !name.is_empty() => {
            if !kind.is_unary() && kind != AdvancedKind::Unknown && value.is_empty() {
                log::debug!("--where '{raw}' compares against an empty value");
            }
            Ok((name.to_string(), kind, value.to_string()))
        }
        _ => Err(CliError::args(format!("--where '{raw}': expected COLUMN:KIND[:VALUE]"))
            .with_hint("e.g. --where Status:is_empty or --where site:starts_with:AB")),
    }
}

/// `ROW:COLUMN=VALUE`
pub fn parse_edit(raw: &str) -> Result<(usize, String, String), CliError> {
    let usage = || CliError::args(format!("--set '{raw}': expected ROW:COLUMN=VALUE"));
    let (target, value) = raw.split_once('=').ok_or_else(usage)?;
    let (row, name) = target.split_once(':').ok_or_else(usage)?;
    let row = row.trim().parse::<usize>().map_err(|_| usage())?;
    Ok((row, name.trim().to_string(), value.to_string()))
}

/// `all`, or comma-separated indices and inclusive ranges (`1,3,5-8`).
pub fn parse_rows(raw: &str) -> Result<RowSelection, CliError> {
    if raw.trim().eq_ignore_ascii_case("all") {
        return Ok(RowSelection::All);
    }
    let bad = |part: &str| CliError::args(format!("--rows: invalid row '{part}'"));

    let mut indices = Vec::new();
    for part in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        match part.split_once('-') {
            Some((start, end)) => {
                let start: usize = start.trim().parse().map_err(|_| bad(part))?;
                let end: usize = end.trim().parse().map_err(|_| bad(part))?;
                if start > end {
                    return Err(bad(part));
                }
                indices.extend(start..=end);
            }
            None => indices.push(part.parse().map_err(|_| bad(part))?),
        }
    }
    Ok(RowSelection::Indices(indices))
}
