//! Backend implementations
//!
//! A backend turns a URL into a [`Response`]. Each backend decides whether it
//! talks to the network and how its payload is validated.

mod default;
mod oembed;
mod twitter;

pub use default::DefaultBackend;
pub use oembed::{OEmbedBackend, OEMBED_DEFAULT_ENDPOINT};
pub use twitter::{TwitterBackend, TWITTER_SCRIPT_TAG};

use crate::{EmbedError, Response};
use async_trait::async_trait;
use serde_json::{Map, Value};

#[async_trait]
pub trait Backend: Send + Sync {
    fn name(&self) -> &str;

    /// Fetch a fresh response for `url`. An empty URL means there is nothing
    /// to embed and yields `Ok(None)`.
    async fn call(&self, url: &str) -> Result<Option<Response>, EmbedError>;

    /// Wrap a payload (from the network or from storage) in this backend's
    /// response type.
    fn wrap_response_data(&self, data: Option<Map<String, Value>>, fresh: bool) -> Response;
}
