use std::sync::{Arc, Mutex, MutexGuard};

use printshop_schemas::Document;
use serde_json::Value;

use crate::{decode_document, DocumentStore, StoreError};

#[derive(Debug, Default)]
struct Inner {
    raw: Value,
    fail_fetch: bool,
    fail_replace: bool,
    fetch_count: usize,
    replace_count: usize,
}

/// In-process document store.
///
/// Holds the stored JSON exactly as a remote bin would, so decoding quirks
/// (missing keys, `null` values) are exercised the same way. Clones share
/// state; outages can be switched on to test the degraded paths.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_document(doc: &Document) -> Self {
        Self::with_raw(serde_json::to_value(doc).unwrap_or(Value::Null))
    }

    /// Seed with arbitrary stored JSON.
    pub fn with_raw(raw: Value) -> Self {
        let store = Self::default();
        store.lock().raw = raw;
        store
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// What a save last wrote (or the seed).
    pub fn raw(&self) -> Value {
        self.lock().raw.clone()
    }

    pub fn set_fail_fetch(&self, fail: bool) {
        self.lock().fail_fetch = fail;
    }

    pub fn set_fail_replace(&self, fail: bool) {
        self.lock().fail_replace = fail;
    }

    pub fn fetch_count(&self) -> usize {
        self.lock().fetch_count
    }

    /// Successful replaces only.
    pub fn replace_count(&self) -> usize {
        self.lock().replace_count
    }
}

#[async_trait::async_trait]
impl DocumentStore for MemoryStore {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn fetch(&self) -> Result<Document, StoreError> {
        let raw = {
            let mut inner = self.lock();
            inner.fetch_count += 1;
            if inner.fail_fetch {
                return Err(StoreError::Unavailable("memory store fetch disabled".into()));
            }
            inner.raw.clone()
        };
        decode_document(raw)
    }

    async fn replace(&self, doc: &Document) -> Result<(), StoreError> {
        let raw = serde_json::to_value(doc).map_err(|e| StoreError::Encode(e.to_string()))?;
        let mut inner = self.lock();
        if inner.fail_replace {
            return Err(StoreError::Unavailable("memory store replace disabled".into()));
        }
        inner.raw = raw;
        inner.replace_count += 1;
        Ok(())
    }
}
