use std::fmt;
use std::time::Duration;

use printshop_schemas::Document;
use serde_json::Value;

use crate::{decode_document, DocumentStore, StoreError};

pub const DEFAULT_JSONBIN_BASE_URL: &str = "https://api.jsonbin.io/v3";

/// Hosted JSON bin holding the whole shop document.
///
/// The API key is passed in by the caller; it is never logged or printed.
#[derive(Clone)]
pub struct JsonBinStore {
    http: reqwest::Client,
    base_url: String,
    bin_id: String,
    api_key: String,
}

impl fmt::Debug for JsonBinStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JsonBinStore")
            .field("base_url", &self.base_url)
            .field("bin_id", &self.bin_id)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

impl JsonBinStore {
    pub fn new(
        base_url: impl Into<String>,
        bin_id: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, StoreError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| StoreError::Transport(format!("http client build failed: {e}")))?;
        Ok(Self {
            http,
            base_url: base_url.into(),
            bin_id: bin_id.into(),
            api_key: api_key.into(),
        })
    }

    fn bin_url(&self) -> String {
        format!("{}/b/{}", self.base_url.trim_end_matches('/'), self.bin_id)
    }

    fn latest_url(&self) -> String {
        format!("{}/latest", self.bin_url())
    }
}

#[async_trait::async_trait]
impl DocumentStore for JsonBinStore {
    fn backend_name(&self) -> &'static str {
        "jsonbin"
    }

    async fn fetch(&self) -> Result<Document, StoreError> {
        let resp = self
            .http
            .get(self.latest_url())
            .header("X-Master-Key", &self.api_key)
            .header("X-Bin-Meta", "false")
            .send()
            .await
            .map_err(|e| StoreError::Transport(format!("jsonbin request failed: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(StoreError::Status {
                status: status.as_u16(),
                message: error_message(resp).await,
            });
        }

        let body: Value = resp
            .json()
            .await
            .map_err(|e| StoreError::Decode(format!("jsonbin response json decode failed: {e}")))?;
        decode_document(body)
    }

    async fn replace(&self, doc: &Document) -> Result<(), StoreError> {
        let body =
            serde_json::to_vec(doc).map_err(|e| StoreError::Encode(e.to_string()))?;

        let resp = self
            .http
            .put(self.bin_url())
            .header("X-Master-Key", &self.api_key)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map_err(|e| StoreError::Transport(format!("jsonbin request failed: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(StoreError::Status {
                status: status.as_u16(),
                message: error_message(resp).await,
            });
        }
        Ok(())
    }
}

/// JSONBin reports failures as `{"message": "..."}`; fall back to raw text.
async fn error_message(resp: reqwest::Response) -> String {
    let text = resp.text().await.unwrap_or_default();
    match serde_json::from_str::<Value>(&text) {
        Ok(Value::Object(map)) => match map.get("message").and_then(Value::as_str) {
            Some(m) => m.to_string(),
            None => text,
        },
        _ if text.trim().is_empty() => "unknown".to_string(),
        _ => text,
    }
}
