// sheetdesk CLI - headless table editing: filter, edit, validate, export, drafts

mod exit_codes;
mod setup;
mod table_view;

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use serde_json::json;
use sheetdesk_config::Settings;
use sheetdesk_drafts::{delete_auth, save_auth, DraftCredentials};
use sheetdesk_engine::validation::{BarcodeStatus, ValidationSummary};
use sheetdesk_engine::{
    DraftId, EditorSession, ExportError, Filterable, RemoteError, Selectable, SessionError,
    TabularExporter,
};
use sheetdesk_io::{exporter_for_path, CsvExporter, XlsxExporter};

use exit_codes::{
    export_exit_code, remote_exit_code, session_exit_code, EXIT_ERROR, EXIT_EXPORT_FAILED,
    EXIT_SUCCESS, EXIT_USAGE, EXIT_VALIDATION_ERRORS,
};
use setup::{column, open_table, Context, TableArgs};
use table_view::{write_aligned, TextTable};

#[derive(Parser)]
#[command(name = "sheetdesk")]
#[command(about = "Filter, edit, validate, and export tabular files from the command line")]
#[command(version)]
#[command(subcommand_required = false)]
struct Cli {
    /// Log debug output to stderr (RUST_LOG overrides)
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    /// Settings file (default: <config dir>/sheetdesk/settings.json)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Keep drafts in this directory instead of the configured store
    #[arg(long, global = true, value_name = "DIR", env = "SHEETDESK_DRAFTS_DIR")]
    drafts_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Summarize a file after load: columns, injected columns, filters, selection
    #[command(after_help = "\
Examples:
  sheetdesk inspect lots.csv
  sheetdesk inspect lots.xlsx --quick site=AB --json")]
    Inspect {
        #[command(flatten)]
        table: TableArgs,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the filtered view as a text table
    #[command(after_help = "\
Examples:
  sheetdesk view lots.csv --where Status:is_empty
  sheetdesk view lots.csv --hide owner --rows 1-3 --limit 20

Markers: x = selected, ! = barcode error, ? = barcode warning, * = input column")]
    View {
        #[command(flatten)]
        table: TableArgs,

        /// Show at most N rows
        #[arg(long, value_name = "N")]
        limit: Option<usize>,

        /// Skip barcode markers
        #[arg(long)]
        no_validation: bool,
    },

    /// Write the filtered view (or the selected rows) to a file
    #[command(after_help = "\
Examples:
  sheetdesk export lots.csv -o open.xlsx --where Status:is_empty
  sheetdesk export lots.csv -o picked.csv --rows 2,4 --selected
  sheetdesk export lots.xlsx -o - --format tsv --hide owner")]
    Export {
        #[command(flatten)]
        table: TableArgs,

        /// Output path, or - for stdout
        #[arg(long, short = 'o', value_name = "PATH")]
        output: PathBuf,

        /// Output format (default: from the output extension; csv for stdout)
        #[arg(long, value_enum)]
        format: Option<ExportFormat>,

        /// Export only the rows picked with --rows
        #[arg(long)]
        selected: bool,

        /// Suppress the summary on stderr
        #[arg(long, short = 'q')]
        quiet: bool,
    },

    /// Check the barcode column of the filtered view
    #[command(after_help = "\
Exit codes:
  0  no errors (warnings allowed)
  3  at least one barcode error")]
    Validate {
        #[command(flatten)]
        table: TableArgs,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List the distinct values of a column with counts
    Values {
        /// Input file
        file: PathBuf,

        /// Column name or index
        column: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Save, list, show, export, and delete drafts
    Draft {
        #[command(subcommand)]
        command: DraftCommands,
    },

    /// Store a token for the remote draft service
    Login {
        /// Bearer token
        #[arg(long, env = "SHEETDESK_TOKEN", hide_env_values = true)]
        token: String,

        /// Service base URL (default: drafts.apiBase from settings)
        #[arg(long, value_name = "URL")]
        api_base: Option<String>,
    },

    /// Remove stored draft service credentials
    Logout,
}

#[derive(Subcommand)]
enum DraftCommands {
    /// Load a file, apply flags, and save the session as a draft
    #[command(after_help = "\
Examples:
  sheetdesk draft save lots.csv --name monday --quick site=AB --set 1:Notes=late")]
    Save {
        #[command(flatten)]
        table: TableArgs,

        /// Draft name
        #[arg(long)]
        name: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List saved drafts, newest first
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Restore a draft and print its view
    Show {
        id: String,

        /// Show at most N rows
        #[arg(long, value_name = "N")]
        limit: Option<usize>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Restore a draft and write its view to a file
    Export {
        id: String,

        /// Output path, or - for stdout
        #[arg(long, short = 'o', value_name = "PATH")]
        output: PathBuf,

        #[arg(long, value_enum)]
        format: Option<ExportFormat>,

        /// Export only the rows selected when the draft was saved
        #[arg(long)]
        selected: bool,
    },

    /// Delete a draft
    Delete { id: String },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum ExportFormat {
    Csv,
    Tsv,
    Xlsx,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let settings = match &cli.config {
        Some(path) => Settings::load_from(path),
        None => Settings::load(),
    };
    let ctx = Context::new(settings, cli.drafts_dir);

    let result = match cli.command {
        None => {
            // No subcommand = show help
            eprintln!("Usage: sheetdesk <command> [options]");
            eprintln!("       sheetdesk --help for more information");
            Ok(EXIT_SUCCESS)
        }
        Some(Commands::Inspect { table, json }) => cmd_inspect(&ctx, &table, json),
        Some(Commands::View { table, limit, no_validation }) => {
            cmd_view(&ctx, &table, limit, no_validation)
        }
        Some(Commands::Export { table, output, format, selected, quiet }) => {
            cmd_export(&ctx, &table, &output, format, selected, quiet)
        }
        Some(Commands::Validate { table, json }) => cmd_validate(&ctx, &table, json),
        Some(Commands::Values { file, column, json }) => cmd_values(&ctx, &file, &column, json),
        Some(Commands::Draft { command }) => match command {
            DraftCommands::Save { table, name, json } => cmd_draft_save(&ctx, &table, &name, json),
            DraftCommands::List { json } => cmd_draft_list(&ctx, json),
            DraftCommands::Show { id, limit, json } => cmd_draft_show(&ctx, &id, limit, json),
            DraftCommands::Export { id, output, format, selected } => {
                cmd_draft_export(&ctx, &id, &output, format, selected)
            }
            DraftCommands::Delete { id } => cmd_draft_delete(&ctx, &id),
        },
        Some(Commands::Login { token, api_base }) => cmd_login(&ctx, token, api_base),
        Some(Commands::Logout) => cmd_logout(),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp(None)
        .init();
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn new(code: u8, msg: impl Into<String>) -> Self {
        Self { code, message: msg.into(), hint: None }
    }

    pub fn args(msg: impl Into<String>) -> Self {
        Self::new(EXIT_USAGE, msg)
    }

    pub fn io(msg: impl Into<String>) -> Self {
        Self::new(EXIT_ERROR, msg)
    }

    pub fn remote(err: RemoteError) -> Self {
        let code = remote_exit_code(&err);
        let hint = match err.status {
            401 | 403 => Some("run `sheetdesk login --token <TOKEN>` to refresh credentials".to_string()),
            404 => Some("run `sheetdesk draft list` to see saved drafts".to_string()),
            _ => None,
        };
        Self { code, message: err.to_string(), hint }
    }

    pub fn session(err: SessionError) -> Self {
        match err {
            SessionError::Remote(e) => Self::remote(e),
            other => Self::new(session_exit_code(&other), other.to_string()),
        }
    }

    pub fn export(err: ExportError) -> Self {
        let hint = match err {
            ExportError::NothingSelected => Some("pick rows with --rows, e.g. --rows 1,3 or --rows all".to_string()),
            _ => None,
        };
        Self { code: export_exit_code(&err), message: err.to_string(), hint }
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

type CmdResult = Result<u8, CliError>;

fn print_json(value: &serde_json::Value) -> Result<(), CliError> {
    let text = serde_json::to_string_pretty(value).map_err(|e| CliError::io(e.to_string()))?;
    println!("{text}");
    Ok(())
}

// ============================================================================
// inspect
// ============================================================================

fn cmd_inspect(ctx: &Context, table: &TableArgs, json: bool) -> CmdResult {
    let mut session = ctx.local_session();
    let summary = open_table(&mut session, table)?;

    let store = session.store();
    let visibility = session.visibility();
    let policy = session.policy();
    let columns: Vec<serde_json::Value> = store
        .header()
        .iter()
        .enumerate()
        .map(|(i, name)| {
            json!({
                "index": i,
                "name": name,
                "kind": policy.kind_of(name),
                "hidden": visibility.is_hidden(i),
            })
        })
        .collect();
    let validation = session.validate().summary();

    if json {
        print_json(&json!({
            "file": summary.filename,
            "rows": summary.rows,
            "visible_rows": store.visible_row_count(),
            "columns": columns,
            "injected_columns": summary.injected_columns,
            "populated_cells": summary.populated_cells,
            "active_filters": store.active_filter_count(),
            "selected": store.selection().count(),
            "check_state": store.check_state(),
            "dirty": session.is_dirty(),
            "validation": validation,
        }))?;
        return Ok(EXIT_SUCCESS);
    }

    let names = |hidden: bool| {
        store
            .header()
            .iter()
            .enumerate()
            .filter(|(i, _)| visibility.is_hidden(*i) == hidden)
            .map(|(_, n)| n.clone())
            .collect::<Vec<String>>()
    };

    println!("file:      {}", summary.filename);
    println!("rows:      {} ({} visible)", summary.rows, store.visible_row_count());
    println!("columns:   {}", names(false).join(", "));
    if visibility.hidden_count() > 0 {
        println!("hidden:    {}", names(true).join(", "));
    }
    if !summary.injected_columns.is_empty() {
        println!("injected:  {}", summary.injected_columns.join(", "));
    }
    if summary.populated_cells > 0 {
        println!("populated: {} barcode cells", summary.populated_cells);
    }
    println!("filters:   {}", store.active_filter_count());
    println!("selected:  {}", store.selection().count());
    println!(
        "barcodes:  {} valid, {} warnings, {} errors",
        validation.valid, validation.warning, validation.error
    );
    Ok(EXIT_SUCCESS)
}

// ============================================================================
// view
// ============================================================================

fn cmd_view(ctx: &Context, table: &TableArgs, limit: Option<usize>, no_validation: bool) -> CmdResult {
    let mut session = ctx.local_session();
    open_table(&mut session, table)?;
    print_table(&session, limit, !no_validation)?;
    Ok(EXIT_SUCCESS)
}

fn print_table(session: &EditorSession, limit: Option<usize>, markers: bool) -> Result<(), CliError> {
    let report = markers.then(|| session.validate());
    let mut sink = TextTable::new(report.as_ref(), limit);
    session.render_blocking(&mut sink);

    let mut out = io::stdout().lock();
    sink.write_to(&mut out).map_err(|e| CliError::io(e.to_string()))
}

// ============================================================================
// export
// ============================================================================

fn exporter_for(output: &Path, format: Option<ExportFormat>) -> Box<dyn TabularExporter> {
    match format {
        Some(ExportFormat::Csv) => Box::new(CsvExporter::comma()),
        Some(ExportFormat::Tsv) => Box::new(CsvExporter::tab()),
        Some(ExportFormat::Xlsx) => Box::new(XlsxExporter::default()),
        None if output == Path::new("-") => Box::new(CsvExporter::comma()),
        None => exporter_for_path(output),
    }
}

/// Encode with the exporter for `output` and write. Returns rows written.
fn write_export(
    session: &mut EditorSession,
    output: &Path,
    format: Option<ExportFormat>,
    selected: bool,
) -> Result<usize, CliError> {
    session.set_exporter(exporter_for(output, format));
    let (bytes, rows) = if selected {
        (session.export_selected(), session.store().selection().count())
    } else {
        (session.export_all(), session.store().visible_row_count())
    };
    let bytes = bytes.map_err(CliError::export)?;

    let written = if output == Path::new("-") {
        io::stdout().lock().write_all(&bytes)
    } else {
        std::fs::write(output, &bytes)
    };
    written.map_err(|e| CliError::new(EXIT_EXPORT_FAILED, format!("{}: {e}", output.display())))?;
    Ok(rows)
}

fn cmd_export(
    ctx: &Context,
    table: &TableArgs,
    output: &Path,
    format: Option<ExportFormat>,
    selected: bool,
    quiet: bool,
) -> CmdResult {
    let mut session = ctx.local_session();
    open_table(&mut session, table)?;
    let rows = write_export(&mut session, output, format, selected)?;
    if !quiet && output != Path::new("-") {
        eprintln!("wrote {rows} rows to {}", output.display());
    }
    Ok(EXIT_SUCCESS)
}

// ============================================================================
// validate
// ============================================================================

fn cmd_validate(ctx: &Context, table: &TableArgs, json: bool) -> CmdResult {
    let mut session = ctx.local_session();
    open_table(&mut session, table)?;

    let report = session.validate();
    let Some(col) = report.column() else {
        let name = &ctx.settings.barcode_column;
        if json {
            print_json(&json!({ "column": null, "summary": ValidationSummary::default(), "rows": [] }))?;
        } else {
            println!("no '{name}' column; nothing to validate");
        }
        return Ok(EXIT_SUCCESS);
    };

    let store = session.store();
    let mut summary = ValidationSummary::default();
    let mut findings = Vec::new();
    for index in 1..=store.visible_row_count() {
        let Some(finding) = session.row_validation(&report, index) else {
            continue;
        };
        match finding.status {
            BarcodeStatus::Valid => summary.valid += 1,
            BarcodeStatus::Warning => summary.warning += 1,
            BarcodeStatus::Error => summary.error += 1,
        }
        let value = store.filtered_row(index).and_then(|r| r.get(col)).cloned().unwrap_or_default();
        findings.push((index, value, finding));
    }

    if json {
        let rows: Vec<serde_json::Value> = findings
            .iter()
            .map(|(index, value, f)| {
                json!({
                    "row": index,
                    "value": value,
                    "status": f.status,
                    "reasons": f.reasons,
                    "duplicates": f.duplicates,
                })
            })
            .collect();
        print_json(&json!({
            "column": store.header()[col],
            "summary": summary,
            "rows": rows,
        }))?;
    } else {
        let lines: Vec<Vec<String>> = findings
            .iter()
            .filter(|(_, _, f)| f.status != BarcodeStatus::Valid)
            .map(|(index, value, f)| {
                let status = match f.status {
                    BarcodeStatus::Error => "error",
                    _ => "warning",
                };
                vec![index.to_string(), value.clone(), status.to_string(), f.reasons.join("; ")]
            })
            .collect();
        let mut out = io::stdout().lock();
        if !lines.is_empty() {
            let header = ["row", "value", "status", "reason"].map(String::from);
            write_aligned(&mut out, &header, &lines).map_err(|e| CliError::io(e.to_string()))?;
        }
        writeln!(
            out,
            "{} valid, {} warnings, {} errors",
            summary.valid, summary.warning, summary.error
        )
        .map_err(|e| CliError::io(e.to_string()))?;
    }

    Ok(if summary.error > 0 { EXIT_VALIDATION_ERRORS } else { EXIT_SUCCESS })
}

// ============================================================================
// values
// ============================================================================

fn cmd_values(ctx: &Context, file: &Path, column_name: &str, json: bool) -> CmdResult {
    let mut session = ctx.local_session();
    setup::load_input(&mut session, file)?;
    let col = column(&session, column_name)?;
    let values = session.unique_values(col);

    if json {
        let value = serde_json::to_value(&values).map_err(|e| CliError::io(e.to_string()))?;
        print_json(&value)?;
    } else {
        for entry in &values {
            let shown = if entry.value.is_empty() { "(blank)" } else { entry.value.as_str() };
            println!("{:>6}  {shown}", entry.count);
        }
    }
    Ok(EXIT_SUCCESS)
}

// ============================================================================
// drafts
// ============================================================================

fn cmd_draft_save(ctx: &Context, table: &TableArgs, name: &str, json: bool) -> CmdResult {
    let mut session = ctx.session()?;
    open_table(&mut session, table)?;
    let id = session.save_draft(name).map_err(CliError::remote)?;

    if json {
        print_json(&json!({
            "id": id,
            "name": name,
            "rows": session.store().original().row_count(),
        }))?;
    } else {
        println!("{id}");
    }
    Ok(EXIT_SUCCESS)
}

fn cmd_draft_list(ctx: &Context, json: bool) -> CmdResult {
    let session = ctx.session()?;
    let drafts = session.list_drafts().map_err(CliError::remote)?;

    if json {
        let value = serde_json::to_value(&drafts).map_err(|e| CliError::io(e.to_string()))?;
        print_json(&value)?;
        return Ok(EXIT_SUCCESS);
    }

    if drafts.is_empty() {
        println!("no drafts");
        return Ok(EXIT_SUCCESS);
    }
    let header = ["id", "name", "rows", "saved"].map(String::from);
    let lines: Vec<Vec<String>> = drafts
        .iter()
        .map(|d| vec![d.id.to_string(), d.name.clone(), d.rows.to_string(), d.timestamp.clone()])
        .collect();
    write_aligned(&mut io::stdout().lock(), &header, &lines).map_err(|e| CliError::io(e.to_string()))?;
    Ok(EXIT_SUCCESS)
}

fn restore_draft(ctx: &Context, id: &str) -> Result<EditorSession, CliError> {
    let mut session = ctx.session()?;
    session.load_draft(&DraftId(id.to_string())).map_err(CliError::session)?;
    Ok(session)
}

fn cmd_draft_show(ctx: &Context, id: &str, limit: Option<usize>, json: bool) -> CmdResult {
    let session = restore_draft(ctx, id)?;
    let store = session.store();

    if json {
        let hidden: Vec<&str> = session
            .visibility()
            .hidden_columns()
            .into_iter()
            .filter_map(|c| store.header().get(c).map(String::as_str))
            .collect();
        print_json(&json!({
            "id": id,
            "rows": store.original().row_count(),
            "visible_rows": store.visible_row_count(),
            "columns": store.header(),
            "hidden_columns": hidden,
            "filters": store.filters(),
            "selected": store.selection().to_vec(),
        }))?;
        return Ok(EXIT_SUCCESS);
    }

    print_table(&session, limit, true)?;
    Ok(EXIT_SUCCESS)
}

fn cmd_draft_export(
    ctx: &Context,
    id: &str,
    output: &Path,
    format: Option<ExportFormat>,
    selected: bool,
) -> CmdResult {
    let mut session = restore_draft(ctx, id)?;
    let rows = write_export(&mut session, output, format, selected)?;
    if output != Path::new("-") {
        eprintln!("wrote {rows} rows to {}", output.display());
    }
    Ok(EXIT_SUCCESS)
}

fn cmd_draft_delete(ctx: &Context, id: &str) -> CmdResult {
    let session = ctx.session()?;
    session.delete_draft(&DraftId(id.to_string())).map_err(CliError::remote)?;
    println!("deleted {id}");
    Ok(EXIT_SUCCESS)
}

// ============================================================================
// login / logout
// ============================================================================

fn cmd_login(ctx: &Context, token: String, api_base: Option<String>) -> CmdResult {
    let api_base = api_base.or_else(|| ctx.settings.drafts_api_base.clone());
    if api_base.is_none() {
        return Err(CliError::args("no draft service URL")
            .with_hint("pass --api-base or set drafts.apiBase in settings.json"));
    }
    let path = save_auth(&DraftCredentials::new(token, api_base)).map_err(CliError::io)?;
    println!("credentials saved to {}", path.display());
    Ok(EXIT_SUCCESS)
}

fn cmd_logout() -> CmdResult {
    delete_auth().map_err(CliError::io)?;
    println!("logged out");
    Ok(EXIT_SUCCESS)
}
