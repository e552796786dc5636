//! Embeddable media for URLs.
//!
//! A URL is matched against registered backend records, the chosen backend
//! fetches an oEmbed-style payload, and the result is cached on an [`Embed`]
//! together with its type and provider. [`PreviewWorkflow`] lets an operator
//! look at the fetched response before anything is saved.

pub mod backends;
mod config;
mod embed;
mod error;
mod label;
#[cfg(feature = "logging")]
mod logging;
mod record;
mod registry;
mod repository;
mod response;
mod selector;
mod service;
mod store;
mod utils;
mod workflow;

pub use backends::{Backend, DefaultBackend, OEmbedBackend, TwitterBackend};
pub use config::{
    EmbedsConfig, OEmbedConfig, DEFAULT_MAX_KEY_LENGTH, DEFAULT_NAMESPACE,
    DEFAULT_STAGING_TTL_SECS, OEMBED_KEY_ENV, SECRET_KEY_ENV,
};
pub use embed::Embed;
pub use error::{EmbedError, FormErrors};
pub use label::{Label, LabelRegistry};
#[cfg(feature = "logging")]
pub use logging::{log_embed_card, log_error_card, setup_logging, LogConfig, LogLevelGuard};
pub use record::{BackendRecord, BackendRecordConfig};
pub use registry::{BackendFactory, BackendRegistry};
pub use repository::{EmbedRepository, MemoryRepository, StoredEmbed};
pub use response::{Response, ResponseKind};
pub use selector::{BackendSelector, Catalog};
pub use service::EmbedService;
pub use store::{staging_key, MemoryStore, TransientStore};
pub use utils::{slugify, truncate_str};
pub use workflow::{
    EmbedForm, PreviewWorkflow, Rejection, ResponseDiagnostic, StageOutcome, StagedPreview,
    StagingConfig, DUPLICATE_URL_MESSAGE, INVALID_RESPONSE_MESSAGE,
};
