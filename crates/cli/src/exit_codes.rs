//! CLI Exit Code Registry
//!
//! This is the single source of truth for all CLI exit codes.
//! Exit codes are part of the shell contract; scripts rely on them.
//!
//! # Exit Code Ranges
//!
//! | Range   | Domain           | Description                              |
//! |---------|------------------|------------------------------------------|
//! | 0       | Universal        | Success                                  |
//! | 1       | Universal        | General error (unspecified)              |
//! | 2       | Universal        | CLI usage error (bad args, bad index)    |
//! | 3       | validate         | Validation found error-level findings    |
//! | 10-19   | load             | Reading and parsing input files          |
//! | 20-29   | export           | Encoding and writing output              |
//! | 30-39   | drafts           | Draft store failures                     |
//!
//! # Adding New Exit Codes
//!
//! 1. Add the constant in the appropriate range
//! 2. Document what triggers it
//! 3. Update the table above
//! 4. Wire it into the relevant command's error handling

use sheetdesk_engine::{ExportError, LoadError, ParseError, RemoteError, SessionError};

// =============================================================================
// Universal (0-2)
// =============================================================================

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
/// Avoid using this; prefer a specific error code.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, unknown column, row index out of range.
pub const EXIT_USAGE: u8 = 2;

// =============================================================================
// Validate (3)
// =============================================================================

/// `validate` found at least one error-level barcode.
/// Like `diff(1)`, the command itself succeeded.
pub const EXIT_VALIDATION_ERRORS: u8 = 3;

// =============================================================================
// Load (10-19)
// =============================================================================

/// File extension is not a supported tabular format.
pub const EXIT_LOAD_UNSUPPORTED: u8 = 10;

/// File could not be read or decoded.
pub const EXIT_LOAD_CORRUPT: u8 = 11;

/// File holds no data rows (empty, header only, or no sheets).
pub const EXIT_LOAD_EMPTY: u8 = 12;

// =============================================================================
// Export (20-29)
// =============================================================================

/// Selected-rows export with an empty selection.
pub const EXIT_EXPORT_NOTHING_SELECTED: u8 = 20;

/// Encoder failed or output could not be written.
pub const EXIT_EXPORT_FAILED: u8 = 21;

// =============================================================================
// Drafts (30-39)
// =============================================================================

/// No credentials, or the service rejected them (401/403).
pub const EXIT_DRAFT_AUTH: u8 = 30;

/// Draft id does not exist (404).
pub const EXIT_DRAFT_NOT_FOUND: u8 = 31;

/// Network or local I/O failure (no HTTP status).
pub const EXIT_DRAFT_NETWORK: u8 = 32;

/// Service rejected the request or failed (any other status).
pub const EXIT_DRAFT_SERVER: u8 = 33;

/// Draft contents could not be restored (empty or header-only table).
pub const EXIT_DRAFT_INVALID: u8 = 34;

// =============================================================================
// Mapping
// =============================================================================

pub fn load_exit_code(err: &LoadError) -> u8 {
    match err {
        LoadError::EmptyInput | LoadError::HeaderOnly => EXIT_LOAD_EMPTY,
        LoadError::Parse(ParseError::UnsupportedFormat(_)) => EXIT_LOAD_UNSUPPORTED,
        LoadError::Parse(ParseError::Corrupt(_)) => EXIT_LOAD_CORRUPT,
        LoadError::Parse(ParseError::NoSheets | ParseError::NoDataRows) => EXIT_LOAD_EMPTY,
    }
}

pub fn export_exit_code(err: &ExportError) -> u8 {
    match err {
        ExportError::NothingSelected => EXIT_EXPORT_NOTHING_SELECTED,
        ExportError::NothingLoaded => EXIT_USAGE,
        ExportError::Export(_) => EXIT_EXPORT_FAILED,
    }
}

pub fn remote_exit_code(err: &RemoteError) -> u8 {
    match err.status {
        0 => EXIT_DRAFT_NETWORK,
        401 | 403 => EXIT_DRAFT_AUTH,
        404 => EXIT_DRAFT_NOT_FOUND,
        _ => EXIT_DRAFT_SERVER,
    }
}

pub fn session_exit_code(err: &SessionError) -> u8 {
    match err {
        SessionError::Remote(e) => remote_exit_code(e),
        SessionError::Load(_) => EXIT_DRAFT_INVALID,
    }
}
