use super::Backend;
use crate::config::OEmbedConfig;
use crate::{EmbedError, Response, ResponseKind};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Map, Value};
use tracing::{debug, error, instrument, warn};
use url::Url;

pub const OEMBED_DEFAULT_ENDPOINT: &str = "https://api.embed.ly/1/oembed";

/// Client for a hosted oEmbed provider API (Embedly-compatible).
///
/// A successful call returns the provider payload, e.g.
/// `{"type": "video", "provider_name": "Vimeo", "html": "<iframe ...>", ...}`.
/// HTTP failures come back as an invalid response shaped like
/// `{"type": "error", "error_code": 400, "error": true}` so callers can show
/// what went wrong; only transport failures are raised.
#[derive(Clone)]
pub struct OEmbedBackend {
    client: Client,
    endpoint: Url,
    api_key: String,
}

impl std::fmt::Debug for OEmbedBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OEmbedBackend")
            .field("endpoint", &self.endpoint.as_str())
            .finish_non_exhaustive()
    }
}

impl OEmbedBackend {
    /// Missing configuration fails here, never at call time.
    pub fn new(config: &OEmbedConfig) -> Result<Self, EmbedError> {
        let client = Client::builder()
            .timeout(config.timeout())
            .user_agent(config.user_agent.as_str())
            .pool_max_idle_per_host(10)
            .build()
            .map_err(|e| {
                error!(error = %e, "Failed to create HTTP client");
                EmbedError::Configuration(format!("Failed to initialize HTTP client: {e}"))
            })?;
        Self::with_client(client, config)
    }

    pub fn with_client(client: Client, config: &OEmbedConfig) -> Result<Self, EmbedError> {
        let api_key = config
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .ok_or_else(|| {
                EmbedError::Configuration(
                    "the oEmbed backend requires an API key (oembed.api_key or EMBEDLY_KEY)"
                        .to_string(),
                )
            })?
            .to_string();

        let endpoint = Url::parse(&config.endpoint).map_err(|e| {
            EmbedError::Configuration(format!(
                "invalid oEmbed endpoint {:?}: {e}",
                config.endpoint
            ))
        })?;

        debug!(endpoint = %endpoint, "oEmbed backend initialized");
        Ok(Self {
            client,
            endpoint,
            api_key,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    fn transport_error(url: &str, e: reqwest::Error) -> EmbedError {
        let message = if e.is_timeout() {
            format!("oEmbed request timed out: {e}")
        } else if e.is_connect() {
            format!("Could not connect to the oEmbed provider: {e}")
        } else {
            format!("oEmbed request failed: {e}")
        };
        warn!(error = %e, url = %url, "oEmbed transport failure");
        EmbedError::invalid_response(message)
    }
}

fn error_payload(error_code: Option<u16>, message: Option<String>) -> Map<String, Value> {
    let mut data = Map::new();
    data.insert("type".into(), Value::String("error".into()));
    data.insert("error".into(), Value::Bool(true));
    if let Some(code) = error_code {
        data.insert("error_code".into(), Value::from(code));
    }
    if let Some(message) = message {
        data.insert("error_message".into(), Value::String(message));
    }
    data
}

#[async_trait]
impl Backend for OEmbedBackend {
    fn name(&self) -> &str {
        "oembed"
    }

    #[instrument(level = "debug", skip(self), err)]
    async fn call(&self, url: &str) -> Result<Option<Response>, EmbedError> {
        if url.is_empty() {
            return Ok(None);
        }
        debug!(url = %url, "oEmbed call");

        let response = self
            .client
            .get(self.endpoint.clone())
            .query(&[("key", self.api_key.as_str()), ("url", url)])
            .send()
            .await
            .map_err(|e| Self::transport_error(url, e))?;

        let status = response.status();
        let data = if status.is_success() {
            match response.json::<Value>().await {
                Ok(Value::Object(map)) => map,
                Ok(other) => error_payload(
                    None,
                    Some(format!("unexpected oEmbed payload: {other}")),
                ),
                Err(e) if e.is_timeout() => return Err(Self::transport_error(url, e)),
                Err(e) => error_payload(None, Some(format!("undecodable oEmbed payload: {e}"))),
            }
        } else {
            let message = response
                .json::<Value>()
                .await
                .ok()
                .and_then(|body| {
                    body.get("error_message")
                        .and_then(Value::as_str)
                        .map(String::from)
                });
            error_payload(Some(status.as_u16()), message)
        };

        let response = self.wrap_response_data(Some(data), true);
        if !response.is_valid() {
            warn!(url = %url, status = %status, data = ?response.data(), "oEmbed error response");
        }
        Ok(Some(response))
    }

    fn wrap_response_data(&self, data: Option<Map<String, Value>>, fresh: bool) -> Response {
        Response::new(ResponseKind::OEmbed, data, fresh)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(api_key: Option<&str>) -> OEmbedConfig {
        OEmbedConfig {
            api_key: api_key.map(String::from),
            ..OEmbedConfig::default()
        }
    }

    #[test]
    fn test_requires_api_key() {
        assert!(matches!(
            OEmbedBackend::new(&config(None)),
            Err(EmbedError::Configuration(_))
        ));
        assert!(matches!(
            OEmbedBackend::new(&config(Some("  "))),
            Err(EmbedError::Configuration(_))
        ));
        assert!(OEmbedBackend::new(&config(Some("key"))).is_ok());
    }

    #[test]
    fn test_rejects_bad_endpoint() {
        let config = OEmbedConfig {
            endpoint: "not a url".into(),
            ..config(Some("key"))
        };
        assert!(matches!(
            OEmbedBackend::new(&config),
            Err(EmbedError::Configuration(_))
        ));
    }

    #[test]
    fn test_error_payload_is_invalid() {
        let backend = OEmbedBackend::new(&config(Some("key"))).unwrap();
        let response = backend.wrap_response_data(Some(error_payload(Some(400), None)), true);
        assert!(!response.is_valid());
        assert_eq!(response.get("error_code"), Some(&Value::from(400)));
    }

    #[tokio::test]
    async fn test_empty_url_skips_network() {
        let backend = OEmbedBackend::new(&config(Some("key"))).unwrap();
        assert!(backend.call("").await.unwrap().is_none());
    }
}
