//! Draft stores for the engine's `DraftStore` capability.
//!
//! `HttpDraftStore` talks to the remote CRUD service; `FileDraftStore` keeps
//! drafts as JSON files in a directory for offline use and tests. Both report
//! failures as `RemoteError { status, message }`.

mod auth;
mod http;
mod local;
mod record;

use std::path::PathBuf;

use sheetdesk_engine::{DraftStore, RemoteError};

pub use auth::{auth_file_path, delete_auth, load_auth, load_auth_from, save_auth, save_auth_to, DraftCredentials};
pub use http::HttpDraftStore;
pub use local::FileDraftStore;
pub use record::DraftRecord;

/// Where drafts live for this run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DraftBackend {
    Remote { api_base: Option<String> },
    Directory(PathBuf),
}

/// Build the store for a backend. Remote stores use saved credentials.
pub fn open_store(backend: &DraftBackend) -> Result<Box<dyn DraftStore>, RemoteError> {
    match backend {
        DraftBackend::Remote { api_base } => {
            let store = HttpDraftStore::from_saved_auth(api_base.as_deref())?;
            log::debug!("drafts: remote store at {}", store.api_base());
            Ok(Box::new(store))
        }
        DraftBackend::Directory(dir) => {
            log::debug!("drafts: local store in {}", dir.display());
            Ok(Box::new(FileDraftStore::new(dir.clone())))
        }
    }
}
