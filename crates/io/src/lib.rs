// File I/O: concrete parsers and exporters for the engine's capabilities

pub mod csv;
pub mod xlsx;

use std::path::Path;

use sheetdesk_engine::{FormatHint, Matrix, ParseError, TabularExporter, TabularParser};

/// Dispatches on the format hint: delimited text or spreadsheet.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileParser;

impl TabularParser for FileParser {
    fn parse(&self, bytes: &[u8], hint: FormatHint) -> Result<Matrix, ParseError> {
        match hint {
            FormatHint::Csv => csv::parse(bytes),
            FormatHint::Spreadsheet => xlsx::parse(bytes),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct CsvExporter {
    pub delimiter: u8,
}

impl CsvExporter {
    pub fn comma() -> Self {
        Self { delimiter: b',' }
    }

    pub fn tab() -> Self {
        Self { delimiter: b'\t' }
    }
}

impl Default for CsvExporter {
    fn default() -> Self {
        Self::comma()
    }
}

impl TabularExporter for CsvExporter {
    fn export(&self, table: &[Vec<String>]) -> Result<Vec<u8>, String> {
        csv::export(table, self.delimiter)
    }

    fn extension(&self) -> &'static str {
        if self.delimiter == b'\t' {
            "tsv"
        } else {
            "csv"
        }
    }
}

#[derive(Debug, Clone)]
pub struct XlsxExporter {
    pub sheet_name: String,
}

impl Default for XlsxExporter {
    fn default() -> Self {
        Self {
            sheet_name: "Sheet1".to_string(),
        }
    }
}

impl TabularExporter for XlsxExporter {
    fn export(&self, table: &[Vec<String>]) -> Result<Vec<u8>, String> {
        xlsx::export(table, &self.sheet_name)
    }

    fn extension(&self) -> &'static str {
        "xlsx"
    }
}

/// Pick an exporter from an output path's extension. Anything that is not
/// `.csv` or `.tsv` is written as xlsx.
pub fn exporter_for_path(path: &Path) -> Box<dyn TabularExporter> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match ext.as_deref() {
        Some("csv") => Box::new(CsvExporter::comma()),
        Some("tsv") => Box::new(CsvExporter::tab()),
        _ => Box::new(XlsxExporter::default()),
    }
}

/// Read a file from disk and parse it according to its extension.
pub fn read_path(path: &Path) -> Result<Matrix, ParseError> {
    let name = path.to_string_lossy();
    let hint = FormatHint::from_filename(&name)?;
    let bytes = std::fs::read(path).map_err(|e| ParseError::Corrupt(format!("{}: {e}", path.display())))?;
    FileParser.parse(&bytes, hint)
}
