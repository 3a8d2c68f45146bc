//! Remote draft service client.
//!
//! Blocking reqwest client (no Tokio runtime required). Wire contract:
//!
//! - `POST   {base}/api/drafts`       body `{name, snapshot}` -> `{id}`
//! - `GET    {base}/api/drafts`       -> `[{id, name, timestamp, rows}]`
//! - `GET    {base}/api/drafts/{id}`  -> `{id, name, snapshot}` or a bare snapshot
//! - `DELETE {base}/api/drafts/{id}`
//!
//! Every non-2xx response becomes `RemoteError { status, message }` with the
//! server's error text when it sends one.

use std::time::Duration;

use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::Url;
use sheetdesk_engine::{DraftId, DraftSnapshot, DraftStore, DraftSummary, RemoteError};

use crate::auth::{load_auth, DraftCredentials};
use crate::record::sort_summaries;

#[derive(Clone)]
pub struct HttpDraftStore {
    http: Client,
    api_base: String,
    token: Option<String>,
}

impl HttpDraftStore {
    /// Client for `api_base`. A missing token sends unauthenticated requests.
    pub fn new(api_base: impl Into<String>, token: Option<String>) -> Result<Self, RemoteError> {
        let http = Client::builder()
            .user_agent(format!("sheetdesk/{}", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| RemoteError::transport(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            http,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            token,
        })
    }

    /// Client using saved credentials. `api_base` overrides the saved base.
    pub fn from_saved_auth(api_base: Option<&str>) -> Result<Self, RemoteError> {
        let creds = load_auth();
        Self::from_credentials(creds.as_ref(), api_base)
    }

    pub fn from_credentials(
        creds: Option<&DraftCredentials>,
        api_base: Option<&str>,
    ) -> Result<Self, RemoteError> {
        let base = api_base
            .map(String::from)
            .or_else(|| creds.and_then(|c| c.api_base.clone()))
            .ok_or_else(|| RemoteError::new(401, "no draft service configured; run `sheetdesk login` first"))?;
        Self::new(base, creds.map(|c| c.token.clone()))
    }

    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    fn drafts_url(&self, id: Option<&DraftId>) -> Result<Url, RemoteError> {
        let mut url = Url::parse(&format!("{}/api/drafts", self.api_base))
            .map_err(|e| RemoteError::transport(format!("invalid API base '{}': {e}", self.api_base)))?;
        if let Some(id) = id {
            url.path_segments_mut()
                .map_err(|_| RemoteError::transport(format!("API base '{}' cannot hold a path", self.api_base)))?
                .push(id.as_str());
        }
        Ok(url)
    }

    fn send(&self, request: RequestBuilder) -> Result<Response, RemoteError> {
        let request = match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        };
        let response = request
            .send()
            .map_err(|e| RemoteError::transport(format!("network error: {e}")))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().unwrap_or_default();
        let message = error_message(&body)
            .or_else(|| status.canonical_reason().map(String::from))
            .unwrap_or_else(|| "request failed".to_string());
        log::debug!("draft service returned {}: {message}", status.as_u16());
        Err(RemoteError::new(status.as_u16(), message))
    }

    fn json(response: Response) -> Result<serde_json::Value, RemoteError> {
        response
            .json()
            .map_err(|e| RemoteError::transport(format!("invalid response: {e}")))
    }
}

/// `{"error": "..."}`, `{"error": {"message": "..."}}`, `{"message": "..."}`,
/// or the raw body text.
fn error_message(body: &str) -> Option<String> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return None;
    }
    let Ok(json) = serde_json::from_str::<serde_json::Value>(trimmed) else {
        return Some(trimmed.to_string());
    };
    json["error"]["message"]
        .as_str()
        .or_else(|| json["error"].as_str())
        .or_else(|| json["message"].as_str())
        .map(String::from)
        .or_else(|| Some(trimmed.to_string()))
}

/// Ids may come back as numbers or strings.
fn json_id(json: &serde_json::Value) -> Option<DraftId> {
    json["id"]
        .as_i64()
        .map(|n| n.to_string())
        .or_else(|| json["id"].as_str().map(String::from))
        .map(DraftId)
}

fn parse_summary(entry: &serde_json::Value) -> Option<DraftSummary> {
    Some(DraftSummary {
        id: json_id(entry)?,
        name: entry["name"].as_str().unwrap_or_default().to_string(),
        timestamp: entry["timestamp"]
            .as_str()
            .or_else(|| entry["updatedAt"].as_str())
            .unwrap_or_default()
            .to_string(),
        rows: entry["rows"].as_u64().unwrap_or(0) as usize,
    })
}

impl DraftStore for HttpDraftStore {
    fn save(&self, name: &str, snapshot: &DraftSnapshot) -> Result<DraftId, RemoteError> {
        let url = self.drafts_url(None)?;
        let body = serde_json::json!({ "name": name, "snapshot": snapshot });
        let json = Self::json(self.send(self.http.post(url).json(&body))?)?;
        json_id(&json).ok_or_else(|| RemoteError::transport("missing id in response"))
    }

    fn load(&self, id: &DraftId) -> Result<DraftSnapshot, RemoteError> {
        let url = self.drafts_url(Some(id))?;
        let json = Self::json(self.send(self.http.get(url))?)?;
        let snapshot = match json {
            serde_json::Value::Object(mut map) if map.contains_key("snapshot") => {
                map.remove("snapshot").unwrap_or_default()
            }
            other => other,
        };
        serde_json::from_value(snapshot)
            .map_err(|e| RemoteError::transport(format!("invalid draft {id}: {e}")))
    }

    fn list(&self) -> Result<Vec<DraftSummary>, RemoteError> {
        let url = self.drafts_url(None)?;
        let json = Self::json(self.send(self.http.get(url))?)?;
        let entries = json
            .as_array()
            .or_else(|| json["drafts"].as_array())
            .ok_or_else(|| RemoteError::transport("expected a list of drafts"))?;

        let mut summaries: Vec<DraftSummary> = entries.iter().filter_map(parse_summary).collect();
        sort_summaries(&mut summaries);
        Ok(summaries)
    }

    fn delete(&self, id: &DraftId) -> Result<(), RemoteError> {
        let url = self.drafts_url(Some(id))?;
        self.send(self.http.delete(url)).map(|_| ())
    }
}
