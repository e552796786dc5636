use crate::label::Label;
use crate::EmbedError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

/// Persisted shape of an [`Embed`](crate::Embed).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredEmbed {
    pub id: Option<i64>,
    pub url: String,
    pub backend_id: i64,
    pub embed_type: Option<Label>,
    pub provider: Option<Label>,
    pub response_cache: Option<Map<String, Value>>,
    pub response_last_updated: Option<DateTime<Utc>>,
}

/// Storage collaborator for embeds. `save` must be atomic: either the whole
/// row is written or nothing is.
#[async_trait]
pub trait EmbedRepository: Send + Sync {
    /// Insert when `id` is `None`, update otherwise. Returns the stored row
    /// with its id.
    async fn save(&self, embed: StoredEmbed) -> Result<StoredEmbed, EmbedError>;
    async fn get(&self, id: i64) -> Result<Option<StoredEmbed>, EmbedError>;
    async fn find_by_url(&self, url: &str) -> Result<Option<StoredEmbed>, EmbedError>;
    async fn delete(&self, id: i64) -> Result<bool, EmbedError>;
}

#[derive(Debug, Default)]
struct Rows {
    next_id: i64,
    rows: BTreeMap<i64, StoredEmbed>,
    writes: usize,
}

/// In-memory repository; the uniqueness check and the write happen under
/// one lock.
#[derive(Debug, Clone, Default)]
pub struct MemoryRepository {
    inner: Arc<Mutex<Rows>>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.inner.lock().await.rows.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.lock().await.rows.is_empty()
    }

    /// Number of successful saves since creation.
    pub async fn writes(&self) -> usize {
        self.inner.lock().await.writes
    }
}

#[async_trait]
impl EmbedRepository for MemoryRepository {
    async fn save(&self, mut embed: StoredEmbed) -> Result<StoredEmbed, EmbedError> {
        let mut inner = self.inner.lock().await;

        let duplicate = inner
            .rows
            .values()
            .any(|row| row.url == embed.url && row.id != embed.id);
        if duplicate {
            return Err(EmbedError::StorageError(format!(
                "an embed with url {:?} already exists",
                embed.url
            )));
        }

        let id = match embed.id {
            Some(id) if inner.rows.contains_key(&id) => id,
            Some(id) => {
                return Err(EmbedError::StorageError(format!("embed {id} does not exist")));
            }
            None => {
                inner.next_id += 1;
                inner.next_id
            }
        };
        embed.id = Some(id);
        inner.rows.insert(id, embed.clone());
        inner.writes += 1;
        debug!(id, url = %embed.url, "Saved embed");
        Ok(embed)
    }

    async fn get(&self, id: i64) -> Result<Option<StoredEmbed>, EmbedError> {
        Ok(self.inner.lock().await.rows.get(&id).cloned())
    }

    async fn find_by_url(&self, url: &str) -> Result<Option<StoredEmbed>, EmbedError> {
        Ok(self
            .inner
            .lock()
            .await
            .rows
            .values()
            .find(|row| row.url == url)
            .cloned())
    }

    async fn delete(&self, id: i64) -> Result<bool, EmbedError> {
        Ok(self.inner.lock().await.rows.remove(&id).is_some())
    }
}
