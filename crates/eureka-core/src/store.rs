/// Typed key/value storage.
///
/// `KeyValueStore` is the raw string seam (Redis in production, `MemoryStore` for per-session
/// state and tests). `Repository` layers typed records on top of it. Every value is written as
/// an envelope `{"version": N, "record": ...}` and a read whose stored version differs from
/// `Record::SCHEMA_VERSION` is treated as absent, so a format change never decodes stale data.
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::CommonError;

#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Option<String>;
    async fn set(&self, key: &str, value: &str) -> bool;
    async fn delete(&self, key: &str) -> bool;
}

/// In-process store. Used for session-scoped handoff data and when Redis is not configured.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Option<String> {
        self.entries.lock().ok()?.get(key).cloned()
    }

    async fn set(&self, key: &str, value: &str) -> bool {
        match self.entries.lock() {
            Ok(mut entries) => {
                entries.insert(key.to_string(), value.to_string());
                true
            }
            Err(_) => false,
        }
    }

    async fn delete(&self, key: &str) -> bool {
        match self.entries.lock() {
            Ok(mut entries) => entries.remove(key).is_some(),
            Err(_) => false,
        }
    }
}

/// A value that can be persisted through a `Repository`.
pub trait Record: Serialize + DeserializeOwned + Send + Sync {
    /// Bump whenever the serialized shape changes.
    const SCHEMA_VERSION: u32;
}

#[derive(Serialize)]
struct EnvelopeRef<'a, R> {
    version: u32,
    record: &'a R,
}

#[derive(Deserialize)]
struct Envelope {
    version: u32,
    record: serde_json::Value,
}

#[derive(Clone)]
pub struct Repository {
    store: Arc<dyn KeyValueStore>,
}

impl Repository {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Read and decode `key`. Missing, undecodable and version-mismatched values all read as `None`.
    pub async fn get<R: Record>(&self, key: &str) -> Option<R> {
        let raw = self.store.get(key).await?;
        decode::<R>(key, &raw)
            .inspect_err(|e| warn!(error = %e, key, "stored record unreadable"))
            .ok()
    }

    pub async fn set<R: Record>(&self, key: &str, record: &R) -> bool {
        let encoded = match encode(record) {
            Ok(encoded) => encoded,
            Err(e) => {
                warn!(error = %e, key, "record encoding failed");
                return false;
            }
        };
        self.store.set(key, &encoded).await
    }

    pub async fn delete(&self, key: &str) -> bool {
        self.store.delete(key).await
    }
}

fn encode<R: Record>(record: &R) -> Result<String, CommonError> {
    Ok(serde_json::to_string(&EnvelopeRef {
        version: R::SCHEMA_VERSION,
        record,
    })?)
}

fn decode<R: Record>(key: &str, raw: &str) -> Result<R, CommonError> {
    let envelope: Envelope = serde_json::from_str(raw)?;
    if envelope.version != R::SCHEMA_VERSION {
        return Err(CommonError::SchemaMismatch {
            key: key.to_string(),
            found: envelope.version,
            expected: R::SCHEMA_VERSION,
        });
    }
    Ok(serde_json::from_value(envelope.record)?)
}
