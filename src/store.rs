use crate::utils::{slugify, truncate_bytes};
use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

/// Short-lived key/value store bridging preview and commit.
///
/// `set` always overwrites so a retried preview simply replaces the previous
/// payload.
#[async_trait]
pub trait TransientStore: Send + Sync {
    async fn set(&self, key: &str, value: Map<String, Value>, ttl: Duration);
    async fn get(&self, key: &str) -> Option<Map<String, Value>>;
    async fn delete(&self, key: &str);
}

/// Key under which a staged response lives:
/// `<namespace>-response-for-<backend-id>-<slugified-url>`, cut to
/// `max_len` bytes.
pub fn staging_key(namespace: &str, backend_id: i64, url: &str, max_len: usize) -> String {
    let key = format!("{namespace}-response-for-{backend_id}-{}", slugify(url));
    truncate_bytes(&key, max_len)
}

#[derive(Debug, Clone)]
struct Entry {
    value: Map<String, Value>,
    expires_at: Instant,
}

/// In-process [`TransientStore`] with lazy expiry.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Arc<DashMap<String, Entry>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl TransientStore for MemoryStore {
    async fn set(&self, key: &str, value: Map<String, Value>, ttl: Duration) {
        debug!(key = %key, ttl_secs = ttl.as_secs(), "Staging value");
        self.entries.insert(
            key.to_string(),
            Entry {
                value,
                expires_at: Instant::now() + ttl,
            },
        );
    }

    async fn get(&self, key: &str) -> Option<Map<String, Value>> {
        let entry = self.entries.get(key)?.clone();
        if Instant::now() >= entry.expires_at {
            debug!(key = %key, "Staged value expired");
            self.entries.remove(key);
            return None;
        }
        Some(entry.value)
    }

    async fn delete(&self, key: &str) {
        self.entries.remove(key);
    }
}
