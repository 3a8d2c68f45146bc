//! Directory-backed draft store: one `<id>.json` file per draft.
//!
//! Failures use the same `RemoteError` shape as the HTTP store. Missing
//! drafts are 404, malformed ids 400, and I/O faults status 0.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use sheetdesk_engine::{DraftId, DraftSnapshot, DraftStore, DraftSummary, RemoteError};

use crate::record::{sort_summaries, DraftRecord};

#[derive(Debug, Clone)]
pub struct FileDraftStore {
    dir: PathBuf,
}

impl FileDraftStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, id: &DraftId) -> Result<PathBuf, RemoteError> {
        let raw = id.as_str();
        let valid = !raw.is_empty()
            && raw.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(RemoteError::new(400, format!("invalid draft id '{raw}'")));
        }
        Ok(self.dir.join(format!("{raw}.json")))
    }

    fn read_record(&self, path: &Path) -> Result<DraftRecord, RemoteError> {
        let contents = fs::read_to_string(path).map_err(|e| io_error(path, e))?;
        serde_json::from_str(&contents)
            .map_err(|e| RemoteError::transport(format!("{}: {e}", path.display())))
    }
}

fn io_error(path: &Path, e: std::io::Error) -> RemoteError {
    if e.kind() == ErrorKind::NotFound {
        RemoteError::not_found(format!("no draft at {}", path.display()))
    } else {
        RemoteError::transport(format!("{}: {e}", path.display()))
    }
}

impl DraftStore for FileDraftStore {
    fn save(&self, name: &str, snapshot: &DraftSnapshot) -> Result<DraftId, RemoteError> {
        fs::create_dir_all(&self.dir).map_err(|e| io_error(&self.dir, e))?;

        let record = DraftRecord {
            id: DraftId(uuid::Uuid::new_v4().simple().to_string()),
            name: name.to_string(),
            snapshot: snapshot.clone(),
        };
        let path = self.path_for(&record.id)?;
        let json = serde_json::to_string_pretty(&record)
            .map_err(|e| RemoteError::transport(e.to_string()))?;

        // Atomic replace
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, json).map_err(|e| io_error(&tmp, e))?;
        fs::rename(&tmp, &path).map_err(|e| io_error(&path, e))?;

        log::debug!("draft '{name}' written to {}", path.display());
        Ok(record.id)
    }

    fn load(&self, id: &DraftId) -> Result<DraftSnapshot, RemoteError> {
        let path = self.path_for(id)?;
        Ok(self.read_record(&path)?.snapshot)
    }

    fn list(&self) -> Result<Vec<DraftSummary>, RemoteError> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(io_error(&self.dir, e)),
        };

        let mut summaries = Vec::new();
        for entry in entries {
            let path = entry.map_err(|e| io_error(&self.dir, e))?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            match self.read_record(&path) {
                Ok(record) => summaries.push(record.summary()),
                Err(e) => log::warn!("skipping unreadable draft: {e}"),
            }
        }

        sort_summaries(&mut summaries);
        Ok(summaries)
    }

    fn delete(&self, id: &DraftId) -> Result<(), RemoteError> {
        let path = self.path_for(id)?;
        fs::remove_file(&path).map_err(|e| io_error(&path, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn snapshot(rows: usize, timestamp: &str) -> DraftSnapshot {
        let mut data = vec![vec!["Barcode".to_string()]];
        data.extend((0..rows).map(|i| vec![format!("B{i}")]));
        DraftSnapshot {
            data,
            filters: BTreeMap::new(),
            hidden_columns: Vec::new(),
            selected: Vec::new(),
            timestamp: timestamp.to_string(),
        }
    }

    #[test]
    fn test_save_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileDraftStore::new(dir.path().join("drafts"));
        let snap = snapshot(3, "2026-01-01T00:00:00Z");

        let id = store.save("first", &snap).unwrap();
        assert_eq!(store.load(&id).unwrap(), snap);
        assert!(dir.path().join("drafts").join(format!("{id}.json")).exists());
    }

    #[test]
    fn test_list_newest_first_with_rows() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileDraftStore::new(dir.path());
        store.save("old", &snapshot(1, "2026-01-01T00:00:00Z")).unwrap();
        store.save("new", &snapshot(4, "2026-02-01T00:00:00Z")).unwrap();
        fs::write(dir.path().join("junk.json"), "{").unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let list = store.list().unwrap();
        let names: Vec<&str> = list.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["new", "old"]);
        assert_eq!(list[0].rows, 4);
    }

    #[test]
    fn test_list_missing_dir_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileDraftStore::new(dir.path().join("never-created"));
        assert!(store.list().unwrap().is_empty());
    }

    #[test]
    fn test_missing_and_invalid_ids() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileDraftStore::new(dir.path());

        let missing = DraftId("abc123".into());
        assert!(store.load(&missing).unwrap_err().is_not_found());
        assert!(store.delete(&missing).unwrap_err().is_not_found());

        let traversal = DraftId("../etc/passwd".into());
        assert_eq!(store.load(&traversal).unwrap_err().status, 400);
    }

    #[test]
    fn test_delete_removes_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileDraftStore::new(dir.path());
        let id = store.save("gone", &snapshot(1, "2026-01-01T00:00:00Z")).unwrap();
        store.delete(&id).unwrap();
        assert!(store.list().unwrap().is_empty());
    }
}
