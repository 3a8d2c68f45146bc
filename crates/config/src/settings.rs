// Application settings
// Loaded from ~/.config/sheetdesk/settings.json

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    // Rendering
    #[serde(rename = "render.batchSize")]
    pub render_batch_size: usize,

    #[serde(rename = "render.yieldEvery")]
    pub render_yield_every: usize,

    #[serde(rename = "render.yieldThreshold")]
    pub render_yield_threshold: usize,

    #[serde(rename = "render.yieldDelayMs")]
    pub render_yield_delay_ms: u64,

    // Columns
    #[serde(rename = "columns.editable")]
    pub editable_columns: Vec<String>,

    #[serde(rename = "columns.inject")]
    pub inject_columns: Vec<String>,

    #[serde(rename = "columns.hidden")]
    pub hidden_columns: Vec<String>,

    // Barcode validation
    #[serde(rename = "barcode.column")]
    pub barcode_column: String,

    #[serde(rename = "barcode.minLength")]
    pub barcode_min_length: usize,

    #[serde(rename = "barcode.maxLength")]
    pub barcode_max_length: usize,

    #[serde(rename = "barcode.placeholder")]
    pub barcode_placeholder: char,

    #[serde(rename = "barcode.sourceColumns")]
    pub barcode_source_columns: Vec<String>,

    // Drafts
    #[serde(rename = "drafts.apiBase")]
    pub drafts_api_base: Option<String>, // None = local directory store

    #[serde(rename = "drafts.directory")]
    pub drafts_directory: Option<PathBuf>,
}

fn metadata_columns() -> Vec<String> {
    ["Barcode", "Notes", "Status"].into_iter().map(String::from).collect()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            // Rendering
            render_batch_size: 50,
            render_yield_every: 4,
            render_yield_threshold: 500,
            render_yield_delay_ms: 0,
            // Columns
            editable_columns: metadata_columns(),
            inject_columns: metadata_columns(),
            hidden_columns: Vec::new(),
            // Barcode
            barcode_column: "Barcode".to_string(),
            barcode_min_length: 16,
            barcode_max_length: 17,
            barcode_placeholder: 'X',
            barcode_source_columns: Vec::new(),
            // Drafts
            drafts_api_base: None,
            drafts_directory: None,
        }
    }
}

impl Settings {
    /// Get the settings file path
    pub fn config_path() -> PathBuf {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("sheetdesk");
        config_dir.join("settings.json")
    }

    /// Directory used by the local draft store when none is configured.
    pub fn default_drafts_dir() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("sheetdesk")
            .join("drafts")
    }

    /// Configured draft directory, or the default one.
    pub fn drafts_dir(&self) -> PathBuf {
        self.drafts_directory
            .clone()
            .unwrap_or_else(Self::default_drafts_dir)
    }

    /// Load settings from disk, falling back to defaults
    pub fn load() -> Self {
        let path = Self::config_path();

        if !path.exists() {
            let settings = Self::default();
            settings.create_default_file(&path);
            return settings;
        }

        Self::load_from(&path)
    }

    /// Load settings from a specific file. Unreadable or malformed files
    /// yield defaults.
    pub fn load_from(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(contents) => Self::parse(&contents).unwrap_or_else(|e| {
                log::warn!("error parsing {}: {e}; using default settings", path.display());
                Self::default()
            }),
            Err(e) => {
                log::warn!("error reading {}: {e}", path.display());
                Self::default()
            }
        }
    }

    /// Parse settings JSON, ignoring lines that start with `//`.
    pub fn parse(contents: &str) -> Result<Self, serde_json::Error> {
        let cleaned: String = contents
            .lines()
            .filter(|line| !line.trim().starts_with("//"))
            .collect::<Vec<_>>()
            .join("\n");
        serde_json::from_str(&cleaned)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), String> {
        // Ensure directory exists
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| e.to_string())?;
        }

        let json = serde_json::to_string_pretty(self)
            .map_err(|e| e.to_string())?;

        fs::write(path, json).map_err(|e| e.to_string())
    }

    /// Create default settings file with comments
    fn create_default_file(&self, path: &Path) {
        // Ensure directory exists
        if let Some(parent) = path.parent() {
            if let Err(e) = fs::create_dir_all(parent) {
                log::warn!("error creating config directory: {e}");
                return;
            }
        }

        if let Err(e) = fs::write(path, DEFAULT_CONFIG) {
            log::warn!("error writing default settings.json: {e}");
        }
    }
}

const DEFAULT_CONFIG: &str = r#"{
    // Table rendering: rows per batch, and yielding on large tables
    "render.batchSize": 50,
    "render.yieldEvery": 4,
    "render.yieldThreshold": 500,
    "render.yieldDelayMs": 0,

    // Editable metadata columns, appended at load when missing
    "columns.editable": ["Barcode", "Notes", "Status"],
    "columns.inject": ["Barcode", "Notes", "Status"],
    // Column names hidden after each load
    "columns.hidden": [],

    // Barcode validation (length bounds are inclusive)
    "barcode.column": "Barcode",
    "barcode.minLength": 16,
    "barcode.maxLength": 17,
    "barcode.placeholder": "X",
    // Columns concatenated into empty barcodes at load
    "barcode.sourceColumns": [],

    // Drafts: null apiBase keeps drafts in a local directory
    "drafts.apiBase": null,
    "drafts.directory": null
}
"#;
