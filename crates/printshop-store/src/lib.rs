//! printshop-store
//!
//! Document store boundary. The remote store only supports whole-document
//! replace, so every mutation in the shop is load → mutate in memory → save.
//! There is no partial update and no concurrency token: across processes the
//! last save wins.
//!
//! - [`DocumentStore`]: pluggable backend trait
//! - [`JsonBinStore`]: hosted JSON bin over HTTP
//! - [`MemoryStore`]: in-process backend for tests and local runs
//! - [`StoreClient`]: the degrade-never-fail `load` / best-effort `save` contract

mod jsonbin;
mod memory;

use std::fmt;
use std::sync::Arc;

use printshop_schemas::Document;
use serde_json::Value;
use tracing::{debug, warn};

pub use jsonbin::{JsonBinStore, DEFAULT_JSONBIN_BASE_URL};
pub use memory::MemoryStore;

// ---------------------------------------------------------------------------
// StoreError
// ---------------------------------------------------------------------------

/// Why a fetch or replace did not complete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Request never produced a response (connect, TLS, timeout).
    Transport(String),
    /// Store answered with a non-success HTTP status.
    Status { status: u16, message: String },
    /// Response body is not a usable document.
    Decode(String),
    /// Document could not be encoded for upload.
    Encode(String),
    /// Backend is switched off (memory store failure injection).
    Unavailable(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Transport(m) => write!(f, "store transport error: {m}"),
            StoreError::Status { status, message } => {
                write!(f, "store http error status={status} message={message}")
            }
            StoreError::Decode(m) => write!(f, "store document decode failed: {m}"),
            StoreError::Encode(m) => write!(f, "store document encode failed: {m}"),
            StoreError::Unavailable(m) => write!(f, "store unavailable: {m}"),
        }
    }
}

impl std::error::Error for StoreError {}

// ---------------------------------------------------------------------------
// DocumentStore
// ---------------------------------------------------------------------------

/// Whole-document persistence backend.
#[async_trait::async_trait]
pub trait DocumentStore: Send + Sync {
    fn backend_name(&self) -> &'static str;

    /// Current remote document, with missing keys defaulted.
    async fn fetch(&self) -> Result<Document, StoreError>;

    /// Overwrite the remote document in full.
    async fn replace(&self, doc: &Document) -> Result<(), StoreError>;
}

/// Decode a stored JSON value into a [`Document`].
///
/// Accepts the bare document, a `{"record": <document>}` metadata envelope,
/// and `null` (a freshly created, empty bin).
pub fn decode_document(value: Value) -> Result<Document, StoreError> {
    let value = match value {
        Value::Null => return Ok(Document::default()),
        Value::Object(mut map)
            if map.contains_key("record")
                && !map.contains_key("orders")
                && !map.contains_key("settings") =>
        {
            map.remove("record").unwrap_or(Value::Null)
        }
        other => other,
    };
    if value.is_null() {
        return Ok(Document::default());
    }
    let doc: Document =
        serde_json::from_value(value).map_err(|e| StoreError::Decode(e.to_string()))?;
    for bad in &doc.unreadable_orders {
        warn!(
            order_id = bad.id().unwrap_or("<none>"),
            error = %bad.error,
            "stored order does not decode; kept as-is"
        );
    }
    Ok(doc)
}

// ---------------------------------------------------------------------------
// StoreClient
// ---------------------------------------------------------------------------

/// Cloneable handle implementing the shop's storage contract on top of any
/// [`DocumentStore`].
#[derive(Clone)]
pub struct StoreClient {
    backend: Arc<dyn DocumentStore>,
}

impl fmt::Debug for StoreClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreClient")
            .field("backend", &self.backend.backend_name())
            .finish()
    }
}

impl StoreClient {
    pub fn new(backend: Arc<dyn DocumentStore>) -> Self {
        Self { backend }
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.backend_name()
    }

    /// Checked load; callers that must know whether the document is real use this.
    pub async fn fetch(&self) -> Result<Document, StoreError> {
        self.backend.fetch().await
    }

    /// Checked overwrite; callers that must report an unpersisted write use this.
    pub async fn replace(&self, doc: &Document) -> Result<(), StoreError> {
        self.backend.replace(doc).await
    }

    /// Current document, or an empty one when the store cannot be read.
    pub async fn load(&self) -> Document {
        match self.backend.fetch().await {
            Ok(doc) => doc,
            Err(e) => {
                warn!(
                    backend = self.backend_name(),
                    error = %e,
                    "store load failed; continuing with an empty document"
                );
                Document::default()
            }
        }
    }

    /// Best-effort overwrite. Failures are logged and swallowed; the return
    /// value says whether the document reached the store.
    pub async fn save(&self, doc: &Document) -> bool {
        match self.backend.replace(doc).await {
            Ok(()) => {
                debug!(
                    backend = self.backend_name(),
                    orders = doc.orders.len(),
                    filaments = doc.settings.filaments.len(),
                    "document saved"
                );
                true
            }
            Err(e) => {
                warn!(
                    backend = self.backend_name(),
                    error = %e,
                    "store save failed; update lost"
                );
                false
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use printshop_schemas::{Money, Order, OrderStatus};
    use serde_json::json;

    fn sample_document() -> Document {
        let mut order: Order = serde_json::from_value(json!({
            "id": "AB12CD34",
            "link": "http://example/model1",
            "color": "Red",
            "created_at": "2026-03-01T12:30:00Z"
        }))
        .unwrap();
        order.status = OrderStatus::WaitingForApproval;
        order.print_price = Money::from_units(25);
        order.material_fee = Money::from_micros(4_500_000);
        order.delivery_time = "3 days".into();
        let mut doc = Document::empty();
        doc.orders.push(order);
        doc.settings.filaments = vec!["Red".into(), "Blue".into(), "Blue".into()];
        doc
    }

    #[test]
    fn decode_accepts_bare_enveloped_and_null() {
        let bare = decode_document(json!({ "orders": [], "settings": { "filaments": ["Red"] } }))
            .unwrap();
        assert_eq!(bare.settings.filaments, vec!["Red"]);

        let wrapped = decode_document(json!({
            "record": { "settings": { "filaments": ["Red"] } },
            "metadata": { "id": "bin" }
        }))
        .unwrap();
        assert_eq!(wrapped, bare);

        assert_eq!(decode_document(Value::Null).unwrap(), Document::default());
        assert_eq!(
            decode_document(json!({ "record": null })).unwrap(),
            Document::default()
        );
    }

    #[test]
    fn decode_rejects_non_document_shapes() {
        assert!(matches!(
            decode_document(json!([1, 2, 3])),
            Err(StoreError::Decode(_))
        ));
        assert!(matches!(
            decode_document(json!({ "orders": "nope" })),
            Err(StoreError::Decode(_))
        ));
    }

    #[tokio::test]
    async fn one_bad_order_does_not_hide_the_rest() {
        let mem = MemoryStore::with_raw(json!({
            "orders": [
                { "id": "GOOD0001", "link": "http://example/a", "status": "Printing" },
                { "id": "BAD00001", "link": "http://example/b", "print_price": "$25" }
            ],
            "settings": { "filaments": ["Red", "Blue"] }
        }));
        let before = mem.raw();
        let client = StoreClient::new(Arc::new(mem.clone()));

        let doc = client.fetch().await.unwrap();
        assert_eq!(doc.orders.len(), 1);
        assert_eq!(doc.orders[0].id, "GOOD0001");
        assert_eq!(doc.unreadable_orders.len(), 1);
        assert_eq!(doc.settings.filaments, vec!["Red", "Blue"]);

        assert!(client.save(&doc).await);
        assert_eq!(mem.raw()["orders"][1], before["orders"][1]);
        assert_eq!(client.load().await, doc);
    }

    #[tokio::test]
    async fn load_degrades_to_empty_document() {
        let mem = MemoryStore::with_document(&sample_document());
        mem.set_fail_fetch(true);
        let client = StoreClient::new(Arc::new(mem.clone()));

        assert!(client.fetch().await.is_err());
        assert_eq!(client.load().await, Document::default());
    }

    #[tokio::test]
    async fn save_failure_is_swallowed() {
        let mem = MemoryStore::new();
        mem.set_fail_replace(true);
        let client = StoreClient::new(Arc::new(mem.clone()));

        assert!(!client.save(&sample_document()).await);
        assert!(matches!(
            client.replace(&sample_document()).await,
            Err(StoreError::Unavailable(_))
        ));
        assert_eq!(mem.replace_count(), 0);
        assert_eq!(client.load().await, Document::default());
    }

    #[tokio::test]
    async fn save_then_load_is_idempotent() {
        let client = StoreClient::new(Arc::new(MemoryStore::new()));
        let doc = sample_document();

        assert!(client.save(&doc).await);
        let first = client.load().await;
        assert_eq!(first, doc);

        assert!(client.save(&first).await);
        let second = client.load().await;
        assert_eq!(second, first);
    }
}
