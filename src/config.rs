use crate::backends::OEMBED_DEFAULT_ENDPOINT;
use crate::record::BackendRecordConfig;
use crate::EmbedError;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_NAMESPACE: &str = "embeds";
pub const DEFAULT_STAGING_TTL_SECS: u64 = 300;
/// memcached's key length ceiling
pub const DEFAULT_MAX_KEY_LENGTH: usize = 250;

pub const SECRET_KEY_ENV: &str = "EMBEDS_SECRET_KEY";
pub const OEMBED_KEY_ENV: &str = "EMBEDLY_KEY";

/// Settings for the oEmbed provider backend.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OEmbedConfig {
    pub api_key: Option<String>,
    pub endpoint: String,
    pub timeout_secs: u64,
    pub user_agent: String,
}

impl Default for OEmbedConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            endpoint: OEMBED_DEFAULT_ENDPOINT.to_string(),
            timeout_secs: 10,
            user_agent: "url_embeds/0.1.0".to_string(),
        }
    }
}

impl OEmbedConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Top-level configuration, usually loaded from JSON.
///
/// ```ignore
/// let config = EmbedsConfig::from_json_file("embeds.json")?
///     .with_env_overrides()
///     .with_backend(BackendRecordConfig::new(1, "Default", "default", ".*", 1));
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EmbedsConfig {
    pub namespace: String,
    pub staging_ttl_secs: u64,
    pub max_key_length: usize,
    pub secret_key: String,
    pub oembed: OEmbedConfig,
    pub backends: Vec<BackendRecordConfig>,
}

impl Default for EmbedsConfig {
    fn default() -> Self {
        Self {
            namespace: DEFAULT_NAMESPACE.to_string(),
            staging_ttl_secs: DEFAULT_STAGING_TTL_SECS,
            max_key_length: DEFAULT_MAX_KEY_LENGTH,
            secret_key: String::new(),
            oembed: OEmbedConfig::default(),
            backends: Vec::new(),
        }
    }
}

impl EmbedsConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json_str(json: &str) -> Result<Self, EmbedError> {
        serde_json::from_str(json)
            .map_err(|e| EmbedError::Configuration(format!("invalid embeds config: {e}")))
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, EmbedError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            EmbedError::Configuration(format!("cannot read {}: {e}", path.display()))
        })?;
        debug!(path = %path.display(), "Loading embeds config");
        Self::from_json_str(&json)
    }

    /// Apply `EMBEDS_SECRET_KEY` and `EMBEDLY_KEY` when they are set.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(secret) = std::env::var(SECRET_KEY_ENV) {
            debug!("Found embeds secret key in environment");
            self.secret_key = secret;
        }
        if let Ok(key) = std::env::var(OEMBED_KEY_ENV) {
            debug!("Found oEmbed API key in environment");
            self.oembed.api_key = Some(key);
        }
        self
    }

    /// The stock registration records: Twitter first, then the oEmbed
    /// provider for common media hosts, and the default backend for
    /// everything else.
    pub fn builtin_backends() -> Vec<BackendRecordConfig> {
        vec![
            BackendRecordConfig::new(1, "Default", "default", ".*", 1)
                .with_description("Uses only the URL. Works for anything."),
            BackendRecordConfig::new(
                2,
                "oEmbed",
                "oembed",
                r"^https?://(www\.)?(youtube\.com|youtu\.be|vimeo\.com|flickr\.com|secure\.flickr\.com|soundcloud\.com)/",
                5,
            )
            .with_description("Metadata from the hosted oEmbed provider API."),
            BackendRecordConfig::new(
                3,
                "Twitter",
                "twitter",
                r"^https?://(www\.|mobile\.)?(twitter\.com|x\.com)/",
                10,
            )
            .with_description("Boilerplate tweet markup, no metadata."),
        ]
    }

    pub fn with_builtin_backends(mut self) -> Self {
        self.backends = Self::builtin_backends();
        self
    }

    pub fn with_backend(mut self, backend: BackendRecordConfig) -> Self {
        self.backends.push(backend);
        self
    }

    pub fn with_secret_key(mut self, secret_key: impl Into<String>) -> Self {
        self.secret_key = secret_key.into();
        self
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    pub fn with_staging_ttl(mut self, ttl: Duration) -> Self {
        self.staging_ttl_secs = ttl.as_secs();
        self
    }

    pub fn with_max_key_length(mut self, max_key_length: usize) -> Self {
        self.max_key_length = max_key_length;
        self
    }

    pub fn with_oembed(mut self, oembed: OEmbedConfig) -> Self {
        self.oembed = oembed;
        self
    }

    pub fn staging_ttl(&self) -> Duration {
        Duration::from_secs(self.staging_ttl_secs)
    }
}
