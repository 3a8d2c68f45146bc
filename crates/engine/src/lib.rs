pub mod capabilities;
pub mod columns;
pub mod error;
pub mod filter;
pub mod render;
pub mod selection;
pub mod session;
pub mod snapshot;
pub mod store;
pub mod table;
pub mod validation;
pub mod visibility;

pub use capabilities::{DraftStore, FormatHint, TabularExporter, TabularParser};
pub use error::{ExportError, IndexError, LoadError, ParseError, RemoteError, SessionError};
pub use filter::{AdvancedKind, FilterEngine, FilterSpec, Filterable};
pub use selection::{CheckState, Selectable, SelectionTracker};
pub use session::{EditorSession, LoadSummary};
pub use snapshot::{DraftId, DraftSnapshot, DraftSummary};
pub use store::TabularStore;
pub use table::{Matrix, RowId, Table};
