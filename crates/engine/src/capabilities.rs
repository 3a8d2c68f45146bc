//! Capabilities the engine consumes but does not implement.
//!
//! File decoding and encoding live in `sheetdesk-io`; draft persistence in
//! `sheetdesk-drafts`. The session holds them as trait objects so hosts and
//! tests can swap implementations.

use std::path::Path;

use crate::error::{ParseError, RemoteError};
use crate::snapshot::{DraftId, DraftSnapshot, DraftSummary};
use crate::table::Matrix;

/// Input format hint derived from a file name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatHint {
    Csv,
    Spreadsheet,
}

impl FormatHint {
    /// Map a file name's extension to a hint.
    pub fn from_filename(filename: &str) -> Result<Self, ParseError> {
        let ext = Path::new(filename)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "csv" | "tsv" | "txt" => Ok(FormatHint::Csv),
            "xlsx" | "xlsm" | "xlsb" | "xls" | "ods" => Ok(FormatHint::Spreadsheet),
            "" => Err(ParseError::UnsupportedFormat(format!("'{filename}' has no extension"))),
            other => Err(ParseError::UnsupportedFormat(format!(".{other}"))),
        }
    }
}

/// Decodes raw file bytes into a matrix (row 0 = header).
pub trait TabularParser {
    fn parse(&self, bytes: &[u8], hint: FormatHint) -> Result<Matrix, ParseError>;
}

/// Encodes a matrix into file bytes, keeping the given column order.
pub trait TabularExporter {
    fn export(&self, table: &[Vec<String>]) -> Result<Vec<u8>, String>;

    /// Conventional file extension of the output, without the dot.
    fn extension(&self) -> &'static str;
}

/// Remote or local store of named session snapshots.
pub trait DraftStore {
    fn save(&self, name: &str, snapshot: &DraftSnapshot) -> Result<DraftId, RemoteError>;
    fn load(&self, id: &DraftId) -> Result<DraftSnapshot, RemoteError>;
    fn list(&self) -> Result<Vec<DraftSummary>, RemoteError>;
    fn delete(&self, id: &DraftId) -> Result<(), RemoteError>;
}
