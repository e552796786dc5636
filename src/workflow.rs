//! Two-step preview-before-commit workflow
//!
//! `stage` fetches a response once, parks the payload in the transient store
//! and hands back a keyed hash of the submitted form. `commit` checks the
//! hash, picks the payload back up and saves the embed without calling the
//! backend again.

use crate::config::EmbedsConfig;
use crate::error::FormErrors;
use crate::record::BackendRecord;
use crate::repository::EmbedRepository;
use crate::selector::Catalog;
use crate::store::{staging_key, TransientStore};
use crate::{Embed, EmbedError, Response};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use sha2::Sha256;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument, warn};
use url::Url;

type HmacSha256 = Hmac<Sha256>;

pub const DUPLICATE_URL_MESSAGE: &str = "Embed with this Url already exists.";

pub const INVALID_RESPONSE_MESSAGE: &str =
    "Invalid response from the Backend API. Check the URL for typos and/or try a different Backend.";

/// What an operator submits: a URL and optionally a backend record id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbedForm {
    pub url: String,
    #[serde(default)]
    pub backend: Option<i64>,
}

impl EmbedForm {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            backend: None,
        }
    }

    pub fn with_backend(mut self, backend_id: i64) -> Self {
        self.backend = Some(backend_id);
        self
    }
}

#[derive(Debug, Clone)]
pub struct StagingConfig {
    pub namespace: String,
    pub ttl: Duration,
    pub max_key_length: usize,
    pub secret_key: String,
}

impl From<&EmbedsConfig> for StagingConfig {
    fn from(config: &EmbedsConfig) -> Self {
        Self {
            namespace: config.namespace.clone(),
            ttl: config.staging_ttl(),
            max_key_length: config.max_key_length,
            secret_key: config.secret_key.clone(),
        }
    }
}

/// Details of a failed fetch, for display next to the form.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseDiagnostic {
    pub exception: String,
    pub message: String,
    pub data: Map<String, Value>,
}

impl ResponseDiagnostic {
    fn from_error(error: &EmbedError) -> Self {
        let (exception, message, data) = match error {
            EmbedError::InvalidResponse { message, data } => {
                ("InvalidResponse", message.clone(), data.clone())
            }
            EmbedError::MissingBackend => ("MissingBackend", error.to_string(), None),
            other => ("BackendError", other.to_string(), None),
        };
        let data = data.unwrap_or_else(|| {
            let mut data = Map::new();
            data.insert("data".into(), Value::String(message.clone()));
            data
        });
        Self {
            exception: exception.to_string(),
            message,
            data,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Rejection {
    pub form: EmbedForm,
    pub errors: FormErrors,
    pub response_error: Option<ResponseDiagnostic>,
}

#[derive(Debug, Clone)]
pub struct StagedPreview {
    /// The submitted form with the auto-assigned backend filled in.
    pub form: EmbedForm,
    pub response: Response,
    /// The fetched response matches what the embed already had. Advisory only.
    pub duplicate_response: bool,
    pub security_hash: String,
    pub staging_key: String,
}

#[derive(Debug, Clone)]
pub enum StageOutcome {
    Preview(StagedPreview),
    Rejected(Rejection),
}

impl StageOutcome {
    pub fn is_preview(&self) -> bool {
        matches!(self, StageOutcome::Preview(_))
    }
}

struct CleanedForm {
    url: String,
    backend: Arc<BackendRecord>,
}

impl CleanedForm {
    fn resolved(&self) -> EmbedForm {
        EmbedForm {
            url: self.url.clone(),
            backend: Some(self.backend.id()),
        }
    }
}

#[derive(Clone)]
pub struct PreviewWorkflow {
    catalog: Arc<Catalog>,
    store: Arc<dyn TransientStore>,
    repository: Arc<dyn EmbedRepository>,
    config: StagingConfig,
    mac: HmacSha256,
}

impl PreviewWorkflow {
    pub fn new(
        catalog: Arc<Catalog>,
        store: Arc<dyn TransientStore>,
        repository: Arc<dyn EmbedRepository>,
        config: StagingConfig,
    ) -> Result<Self, EmbedError> {
        if config.secret_key.is_empty() {
            return Err(EmbedError::Configuration(
                "a secret key is required to sign previews".to_string(),
            ));
        }
        let mac = HmacSha256::new_from_slice(config.secret_key.as_bytes())
            .map_err(|e| EmbedError::Configuration(format!("unusable secret key: {e}")))?;
        Ok(Self {
            catalog,
            store,
            repository,
            config,
            mac,
        })
    }

    pub fn staging_key(&self, backend: &BackendRecord, url: &str) -> String {
        staging_key(
            &self.config.namespace,
            backend.id(),
            url,
            self.config.max_key_length,
        )
    }

    /// Keyed hash over the form fields, hex encoded.
    pub fn security_hash(&self, form: &EmbedForm) -> String {
        let mut mac = self.mac.clone();
        mac.update(Self::hash_input(form).as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    fn hash_input(form: &EmbedForm) -> String {
        json!([["url", form.url], ["backend", form.backend]]).to_string()
    }

    fn verify_hash(&self, form: &EmbedForm, security_hash: &str) -> Result<(), EmbedError> {
        let expected = hex::decode(security_hash).map_err(|_| EmbedError::SecurityCheckFailed)?;
        let mut mac = self.mac.clone();
        mac.update(Self::hash_input(form).as_bytes());
        mac.verify_slice(&expected)
            .map_err(|_| EmbedError::SecurityCheckFailed)
    }

    fn clean(&self, form: &EmbedForm) -> Result<CleanedForm, FormErrors> {
        let mut errors = FormErrors::new();
        let url = form.url.trim();

        if url.is_empty() {
            errors.add_field("url", "This field is required.");
        } else {
            match Url::parse(url) {
                Ok(parsed)
                    if matches!(parsed.scheme(), "http" | "https")
                        && parsed.host_str().is_some() => {}
                _ => errors.add_field("url", "Enter a valid URL."),
            }
        }

        let backend = match form.backend {
            Some(id) => {
                let backend = self.catalog.selector().get(id);
                if backend.is_none() {
                    errors.add_field(
                        "backend",
                        "Select a valid choice. That choice is not one of the available choices.",
                    );
                }
                backend
            }
            None if errors.is_empty() => {
                let backend = self.catalog.selector().choose(Some(url));
                if backend.is_none() {
                    errors.add_field("backend", "No backend matches this URL.");
                }
                backend
            }
            None => None,
        };

        match backend {
            Some(backend) if errors.is_empty() => Ok(CleanedForm {
                url: url.to_string(),
                backend,
            }),
            _ => Err(errors),
        }
    }

    /// The URL column is unique; another stored embed with the same URL
    /// fails as a form error so nothing is fetched for it.
    async fn validate_unique_url(
        &self,
        url: &str,
        existing_id: Option<i64>,
    ) -> Result<(), EmbedError> {
        match self.repository.find_by_url(url).await? {
            Some(row) if row.id != existing_id => {
                debug!(url = %url, id = ?row.id, "Embed URL already stored");
                let mut errors = FormErrors::new();
                errors.add_field("url", DUPLICATE_URL_MESSAGE);
                Err(EmbedError::InvalidForm(errors))
            }
            _ => Ok(()),
        }
    }

    fn reject_response(&self, form: EmbedForm, error: EmbedError) -> StageOutcome {
        error.log();
        let mut errors = FormErrors::new();
        errors.add_non_field(INVALID_RESPONSE_MESSAGE);
        StageOutcome::Rejected(Rejection {
            form,
            errors,
            response_error: Some(ResponseDiagnostic::from_error(&error)),
        })
    }

    /// Phase one: validate, fetch and stage. Nothing is persisted.
    #[instrument(level = "debug", skip(self, existing))]
    pub async fn stage(&self, form: EmbedForm, existing: Option<&Embed>) -> StageOutcome {
        let cleaned = match self.clean(&form) {
            Ok(cleaned) => cleaned,
            Err(errors) => {
                debug!(errors = %errors, "Embed form rejected");
                return StageOutcome::Rejected(Rejection {
                    form,
                    errors,
                    response_error: None,
                });
            }
        };
        let resolved = cleaned.resolved();

        let existing_id = existing.and_then(Embed::id);
        match self.validate_unique_url(&cleaned.url, existing_id).await {
            Ok(()) => {}
            Err(EmbedError::InvalidForm(errors)) => {
                return StageOutcome::Rejected(Rejection {
                    form: resolved,
                    errors,
                    response_error: None,
                });
            }
            Err(error) => {
                error.log();
                let mut errors = FormErrors::new();
                errors.add_non_field(error.to_string());
                return StageOutcome::Rejected(Rejection {
                    form: resolved,
                    errors,
                    response_error: None,
                });
            }
        }

        let mut candidate = existing
            .cloned()
            .unwrap_or_else(|| Embed::new(self.catalog.clone()));
        candidate.set_url(cleaned.url.clone());
        candidate.set_backend(Some(cleaned.backend.clone()));

        let response = match candidate.get_response().await {
            Ok(Some(response)) if response.is_valid() => response,
            Ok(Some(response)) => {
                let error = EmbedError::InvalidResponse {
                    message: "the backend returned an error payload".to_string(),
                    data: Some(response.into_data()),
                };
                return self.reject_response(resolved, error);
            }
            Ok(None) => {
                let error = EmbedError::invalid_response("the backend returned no data");
                return self.reject_response(resolved, error);
            }
            Err(error) => return self.reject_response(resolved, error),
        };

        let duplicate_response = candidate.response() == Some(&response);

        let key = self.staging_key(&cleaned.backend, &cleaned.url);
        self.store
            .set(&key, response.data().clone(), self.config.ttl)
            .await;
        debug!(key = %key, duplicate_response, "Staged response for preview");

        StageOutcome::Preview(StagedPreview {
            security_hash: self.security_hash(&resolved),
            form: resolved,
            response,
            duplicate_response,
            staging_key: key,
        })
    }

    /// Phase two: verify the hash and save the staged response.
    ///
    /// Fails without writing anything when the hash does not match or the
    /// staged payload is gone.
    #[instrument(level = "debug", skip(self, security_hash, existing))]
    pub async fn commit(
        &self,
        form: EmbedForm,
        security_hash: &str,
        existing: Option<Embed>,
    ) -> Result<Embed, EmbedError> {
        let cleaned = self.clean(&form).map_err(EmbedError::InvalidForm)?;
        if let Err(e) = self.verify_hash(&cleaned.resolved(), security_hash) {
            warn!(url = %cleaned.url, "Rejected commit with a bad security hash");
            return Err(e);
        }
        self.validate_unique_url(&cleaned.url, existing.as_ref().and_then(Embed::id))
            .await?;

        let mut embed = existing.unwrap_or_else(|| Embed::new(self.catalog.clone()));
        embed.set_url(cleaned.url.clone());
        embed.set_backend(Some(cleaned.backend.clone()));

        let key = self.staging_key(&cleaned.backend, &cleaned.url);
        let data = self.store.get(&key).await.ok_or_else(|| {
            let error = EmbedError::StagedResponseMissing(key.clone());
            error.log();
            error
        })?;

        embed.set_response(cleaned.backend.wrap_response_data(Some(data), true));
        embed.save(self.repository.as_ref()).await?;
        self.store.delete(&key).await;

        debug!(id = ?embed.id(), key = %key, "Committed staged response");
        Ok(embed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OEmbedConfig;
    use crate::record::BackendRecordConfig;
    use crate::registry::BackendRegistry;
    use crate::repository::MemoryRepository;
    use crate::selector::BackendSelector;
    use crate::store::MemoryStore;

    fn workflow() -> PreviewWorkflow {
        let registry = BackendRegistry::builtin(&OEmbedConfig::default());
        let selector = BackendSelector::load(
            &[BackendRecordConfig::new(1, "Default", "default", ".*", 1)],
            &registry,
        )
        .unwrap();
        PreviewWorkflow::new(
            Arc::new(Catalog::new(selector)),
            Arc::new(MemoryStore::new()),
            Arc::new(MemoryRepository::new()),
            StagingConfig::from(&EmbedsConfig::default().with_secret_key("s3cret")),
        )
        .unwrap()
    }

    #[test]
    fn test_requires_secret() {
        let result = PreviewWorkflow::new(
            Arc::new(Catalog::new(BackendSelector::default())),
            Arc::new(MemoryStore::new()),
            Arc::new(MemoryRepository::new()),
            StagingConfig::from(&EmbedsConfig::default()),
        );
        assert!(matches!(result, Err(EmbedError::Configuration(_))));
    }

    #[test]
    fn test_security_hash_is_keyed_and_stable() {
        let workflow = workflow();
        let form = EmbedForm::new("http://www.example.com").with_backend(1);
        let hash = workflow.security_hash(&form);
        assert_eq!(hash.len(), 64);
        assert_eq!(hash, workflow.security_hash(&form));
        assert!(workflow.verify_hash(&form, &hash).is_ok());

        let other = EmbedForm::new("http://www.example.org").with_backend(1);
        assert_ne!(hash, workflow.security_hash(&other));
        assert!(workflow.verify_hash(&other, &hash).is_err());
        assert!(workflow.verify_hash(&form, "not-hex").is_err());
    }

    #[test]
    fn test_clean_rejects_bad_urls() {
        let workflow = workflow();
        for url in ["", "   ", "not a url", "ftp://example.com/file"] {
            let errors = workflow.clean(&EmbedForm::new(url)).err().unwrap();
            assert!(!errors.field("url").is_empty(), "{url:?}");
        }
    }

    #[test]
    fn test_clean_rejects_unknown_backend() {
        let workflow = workflow();
        let errors = workflow
            .clean(&EmbedForm::new("http://www.example.com").with_backend(9))
            .err()
            .unwrap();
        assert_eq!(errors.field("backend").len(), 1);
    }

    #[test]
    fn test_clean_auto_assigns_backend() {
        let workflow = workflow();
        let cleaned = workflow
            .clean(&EmbedForm::new(" http://www.example.com "))
            .ok()
            .unwrap();
        assert_eq!(cleaned.url, "http://www.example.com");
        assert_eq!(cleaned.resolved().backend, Some(1));
    }

    #[test]
    fn test_diagnostic_without_payload_wraps_message() {
        let diagnostic =
            ResponseDiagnostic::from_error(&EmbedError::invalid_response("dns failure"));
        assert_eq!(diagnostic.exception, "InvalidResponse");
        assert_eq!(diagnostic.data.get("data"), Some(&Value::from("dns failure")));
    }
}
