//! Token storage for the remote draft service.
//!
//! Reads/writes ~/.config/sheetdesk/auth.json (0600 on Unix).

use std::path::{Path, PathBuf};
use serde::{Deserialize, Serialize};

/// Credentials for the remote draft service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DraftCredentials {
    /// Bearer token
    pub token: String,
    /// API base URL saved at login; settings may override it
    #[serde(default)]
    pub api_base: Option<String>,
}

impl DraftCredentials {
    pub fn new(token: String, api_base: Option<String>) -> Self {
        Self { token, api_base }
    }
}

/// Returns the path to the auth credentials file.
pub fn auth_file_path() -> Option<PathBuf> {
    dirs::config_dir().map(|c| c.join("sheetdesk/auth.json"))
}

/// Load saved credentials. None if nothing is saved or the file is invalid.
pub fn load_auth() -> Option<DraftCredentials> {
    load_auth_from(&auth_file_path()?)
}

pub fn load_auth_from(path: &Path) -> Option<DraftCredentials> {
    let contents = std::fs::read_to_string(path).ok()?;
    match serde_json::from_str(&contents) {
        Ok(creds) => Some(creds),
        Err(e) => {
            log::warn!("ignoring invalid {}: {e}", path.display());
            None
        }
    }
}

/// Save credentials, creating the parent directory if needed.
pub fn save_auth(creds: &DraftCredentials) -> Result<PathBuf, String> {
    let path = auth_file_path().ok_or("Could not determine config directory")?;
    save_auth_to(creds, &path)?;
    Ok(path)
}

pub fn save_auth_to(creds: &DraftCredentials, path: &Path) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| format!("Failed to create config directory: {}", e))?;
    }

    let contents = serde_json::to_string_pretty(creds)
        .map_err(|e| format!("Failed to serialize credentials: {}", e))?;

    std::fs::write(path, &contents)
        .map_err(|e| format!("Failed to write auth file: {}", e))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let permissions = std::fs::Permissions::from_mode(0o600);
        std::fs::set_permissions(path, permissions)
            .map_err(|e| format!("Failed to set file permissions: {}", e))?;
    }

    Ok(())
}

/// Delete saved credentials. Missing file is not an error.
pub fn delete_auth() -> Result<(), String> {
    let Some(path) = auth_file_path() else {
        return Ok(());
    };
    if path.exists() {
        std::fs::remove_file(&path)
            .map_err(|e| format!("Failed to delete auth file: {}", e))?;
    }
    Ok(())
}
