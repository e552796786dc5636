use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;
use tracing::{debug, error, warn};

#[derive(Debug, Error)]
pub enum EmbedError {
    #[error("Improperly configured: {0}")]
    Configuration(String),

    #[error("Backend not found: {0}")]
    NotFound(String),

    #[error("Invalid response: {message}")]
    InvalidResponse {
        message: String,
        data: Option<Map<String, Value>>,
    },

    #[error("Embed has no backend assigned")]
    MissingBackend,

    #[error("Security hash check failed")]
    SecurityCheckFailed,

    #[error("Staged response is missing or expired: {0}")]
    StagedResponseMissing(String),

    #[error("Invalid form: {0}")]
    InvalidForm(FormErrors),

    #[error("Storage error: {0}")]
    StorageError(String),
}

impl EmbedError {
    /// Shorthand for an invalid response that only carries an error message.
    pub fn invalid_response(message: impl Into<String>) -> Self {
        EmbedError::InvalidResponse {
            message: message.into(),
            data: None,
        }
    }

    pub fn is_invalid_response(&self) -> bool {
        matches!(self, EmbedError::InvalidResponse { .. })
    }

    pub fn log(&self) {
        match self {
            EmbedError::Configuration(e) => {
                error!(error = %e, "Embed backend configuration is invalid");
            }
            EmbedError::NotFound(e) => {
                warn!(error = %e, "Backend lookup failed");
            }
            EmbedError::InvalidResponse { message, data } => {
                warn!(error = %message, data = ?data, "Backend returned an invalid response");
            }
            EmbedError::MissingBackend => {
                warn!("Embed has no backend assigned");
            }
            EmbedError::SecurityCheckFailed => {
                warn!("Preview security hash did not match");
            }
            EmbedError::StagedResponseMissing(key) => {
                warn!(key = %key, "Staged response missing at commit");
            }
            EmbedError::InvalidForm(errors) => {
                debug!(errors = %errors, "Embed form failed validation");
            }
            EmbedError::StorageError(e) => {
                error!(error = %e, "Embed storage operation failed");
            }
        }
    }
}

/// Validation messages collected while cleaning an embed form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormErrors {
    pub fields: BTreeMap<String, Vec<String>>,
    pub non_field: Vec<String>,
}

impl FormErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_field(&mut self, field: &str, message: impl Into<String>) {
        self.fields
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn add_non_field(&mut self, message: impl Into<String>) {
        self.non_field.push(message.into());
    }

    pub fn field(&self, field: &str) -> &[String] {
        self.fields.get(field).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.non_field.is_empty()
    }
}

impl fmt::Display for FormErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        for (field, messages) in &self.fields {
            parts.push(format!("{field}: {}", messages.join(" ")));
        }
        parts.extend(self.non_field.iter().cloned());
        write!(f, "{}", parts.join("; "))
    }
}
