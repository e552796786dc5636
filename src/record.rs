use crate::backends::Backend;
use crate::registry::BackendRegistry;
use crate::{EmbedError, Response};
use regex::Regex;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;

fn default_priority() -> u16 {
    1
}

/// A registration record as it appears in configuration or storage.
#[derive(Debug, Clone, Deserialize)]
pub struct BackendRecordConfig {
    pub id: i64,
    pub name: String,
    /// Locator of the backend code in the [`BackendRegistry`].
    pub slug: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Searched (not fully matched) against URLs during auto-assignment.
    pub regex: String,
    /// Higher wins.
    #[serde(default = "default_priority")]
    pub priority: u16,
}

impl BackendRecordConfig {
    pub fn new(id: i64, name: &str, slug: &str, regex: &str, priority: u16) -> Self {
        Self {
            id,
            name: name.to_string(),
            slug: slug.to_string(),
            description: None,
            regex: regex.to_string(),
            priority,
        }
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }
}

/// A loaded registration record bound to its backend implementation.
///
/// Exists only when the slug resolved and the regex compiled.
pub struct BackendRecord {
    id: i64,
    name: String,
    slug: String,
    description: Option<String>,
    regex: Regex,
    priority: u16,
    backend: Arc<dyn Backend>,
}

impl BackendRecord {
    pub fn load(config: &BackendRecordConfig, registry: &BackendRegistry) -> Result<Self, EmbedError> {
        let backend = registry.resolve(&config.slug).map_err(|e| match e {
            EmbedError::NotFound(msg) => {
                EmbedError::Configuration(format!("Backends must have a code module: {msg}"))
            }
            other => other,
        })?;

        let regex = Regex::new(&config.regex).map_err(|e| {
            EmbedError::Configuration(format!(
                "Backend {:?} has an invalid regex: {e}",
                config.slug
            ))
        })?;

        Ok(Self {
            id: config.id,
            name: config.name.clone(),
            slug: config.slug.clone(),
            description: config.description.clone(),
            regex,
            priority: config.priority,
            backend,
        })
    }

    pub fn id(&self) -> i64 {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn slug(&self) -> &str {
        &self.slug
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn regex(&self) -> &Regex {
        &self.regex
    }

    pub fn priority(&self) -> u16 {
        self.priority
    }

    pub fn backend(&self) -> &Arc<dyn Backend> {
        &self.backend
    }

    pub fn matches(&self, url: &str) -> bool {
        self.regex.is_match(url)
    }

    // Forwarded backend operations.

    pub async fn call(&self, url: &str) -> Result<Option<Response>, EmbedError> {
        self.backend.call(url).await
    }

    pub fn wrap_response_data(&self, data: Option<Map<String, Value>>, fresh: bool) -> Response {
        self.backend.wrap_response_data(data, fresh)
    }
}

impl PartialEq for BackendRecord {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for BackendRecord {}

impl fmt::Debug for BackendRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendRecord")
            .field("id", &self.id)
            .field("slug", &self.slug)
            .field("regex", &self.regex.as_str())
            .field("priority", &self.priority)
            .finish()
    }
}

impl fmt::Display for BackendRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (priority: {}; regex: {})",
            self.name,
            self.priority,
            self.regex.as_str()
        )
    }
}
