use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

/// A normalized classification label such as an embed type (`video`) or a
/// provider (`YouTube`). Labels are unique by name within their registry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Label {
    pub id: u64,
    pub name: String,
}

impl std::fmt::Display for Label {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// Get-or-create store for labels, populated automatically by responses.
#[derive(Debug, Clone)]
pub struct LabelRegistry {
    kind: &'static str,
    labels: Arc<DashMap<String, Label>>,
    next_id: Arc<AtomicU64>,
}

impl LabelRegistry {
    pub fn new(kind: &'static str) -> Self {
        Self {
            kind,
            labels: Arc::new(DashMap::new()),
            next_id: Arc::new(AtomicU64::new(1)),
        }
    }

    pub fn kind(&self) -> &'static str {
        self.kind
    }

    pub fn get_or_create(&self, name: &str) -> Label {
        self.labels
            .entry(name.to_string())
            .or_insert_with(|| {
                let id = self.next_id.fetch_add(1, Ordering::Relaxed);
                debug!(kind = self.kind, name = %name, id, "Created label");
                Label {
                    id,
                    name: name.to_string(),
                }
            })
            .clone()
    }

    pub fn get(&self, name: &str) -> Option<Label> {
        self.labels.get(name).map(|entry| entry.clone())
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Number of labels ever created, used to observe registry churn.
    pub fn created(&self) -> u64 {
        self.next_id.load(Ordering::Relaxed) - 1
    }
}
