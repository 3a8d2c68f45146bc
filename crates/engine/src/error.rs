use std::fmt;

/// Failure decoding raw file bytes into a matrix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// Bytes could not be decoded as the hinted format.
    Corrupt(String),
    /// Spreadsheet container holds no worksheets.
    NoSheets,
    /// File decoded but contained no rows at all.
    NoDataRows,
    /// File name / hint does not map to a supported format.
    UnsupportedFormat(String),
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Corrupt(msg) => write!(f, "file is corrupt or unreadable: {msg}"),
            Self::NoSheets => write!(f, "workbook contains no sheets"),
            Self::NoDataRows => write!(f, "file contains no rows"),
            Self::UnsupportedFormat(what) => write!(f, "unsupported file format: {what}"),
        }
    }
}

impl std::error::Error for ParseError {}

/// Failure installing a new table. The previously loaded table is kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadError {
    /// Matrix has zero rows.
    EmptyInput,
    /// Matrix has a header row and nothing else.
    HeaderOnly,
    /// The parser rejected the bytes.
    Parse(ParseError),
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyInput => write!(f, "no rows to load"),
            Self::HeaderOnly => write!(f, "file has a header row but no data rows"),
            Self::Parse(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for LoadError {}

impl From<ParseError> for LoadError {
    fn from(e: ParseError) -> Self {
        LoadError::Parse(e)
    }
}

/// Row or column reference outside the current filtered view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexError {
    /// `index` is not a data row of the filtered view (valid: `1..len`).
    Row { index: usize, len: usize },
    /// `index` is not a column of the header (valid: `0..len`).
    Column { index: usize, len: usize },
}

impl fmt::Display for IndexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Row { index, len } => {
                write!(f, "row {index} out of range (data rows are 1..{len})")
            }
            Self::Column { index, len } => {
                write!(f, "column {index} out of range (table has {len} columns)")
            }
        }
    }
}

impl std::error::Error for IndexError {}

/// Failure producing export bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportError {
    /// `export_selected` was called with an empty selection.
    NothingSelected,
    /// No table has been loaded yet.
    NothingLoaded,
    /// The exporter backend failed.
    Export(String),
}

impl fmt::Display for ExportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NothingSelected => write!(f, "no rows selected"),
            Self::NothingLoaded => write!(f, "no table loaded"),
            Self::Export(msg) => write!(f, "export failed: {msg}"),
        }
    }
}

impl std::error::Error for ExportError {}

/// Failure reported by a draft store. `status` is the HTTP status, or 0 when
/// the request never produced one (transport, local I/O).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteError {
    pub status: u16,
    pub message: String,
}

impl RemoteError {
    pub fn new(status: u16, message: impl Into<String>) -> Self {
        Self { status, message: message.into() }
    }

    /// Transport-level failure with no status code.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(0, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(404, message)
    }

    pub fn is_not_found(&self) -> bool {
        self.status == 404
    }
}

impl fmt::Display for RemoteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.status == 0 {
            write!(f, "draft store error: {}", self.message)
        } else {
            write!(f, "draft store error (HTTP {}): {}", self.status, self.message)
        }
    }
}

impl std::error::Error for RemoteError {}

/// Failure of a coordinated session operation that crosses components.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    Load(LoadError),
    Remote(RemoteError),
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Load(e) => write!(f, "{e}"),
            Self::Remote(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for SessionError {}

impl From<LoadError> for SessionError {
    fn from(e: LoadError) -> Self {
        SessionError::Load(e)
    }
}

impl From<RemoteError> for SessionError {
    fn from(e: RemoteError) -> Self {
        SessionError::Remote(e)
    }
}
