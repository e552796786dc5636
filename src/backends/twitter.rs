use super::Backend;
use crate::{EmbedError, Response, ResponseKind};
use async_trait::async_trait;
use serde_json::{Map, Value};
use tracing::debug;

/// Boilerplate embed markup; `{url}` is replaced with the tweet URL.
pub const TWITTER_SCRIPT_TAG: &str = "<blockquote class=\"twitter-tweet\">\
<a href=\"{url}\"></a></blockquote>\
<script async src=\"https://platform.twitter.com/widgets.js\" charset=\"utf-8\"></script>";

/// Wraps a tweet URL in the standard widget markup.
///
/// The Twitter API requires OAuth, so this backend never calls it. It cannot
/// provide metadata, only something a template can render.
#[derive(Debug, Clone, Default)]
pub struct TwitterBackend;

impl TwitterBackend {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Backend for TwitterBackend {
    fn name(&self) -> &str {
        "twitter"
    }

    async fn call(&self, url: &str) -> Result<Option<Response>, EmbedError> {
        if url.is_empty() {
            return Ok(None);
        }
        debug!(url = %url, "Building Twitter embed markup");

        let mut data = Map::new();
        data.insert("type".into(), Value::String("rich".into()));
        data.insert("provider_name".into(), Value::String("Twitter".into()));
        data.insert(
            "provider_url".into(),
            Value::String("https://twitter.com/".into()),
        );
        data.insert(
            "html".into(),
            Value::String(TWITTER_SCRIPT_TAG.replace("{url}", url)),
        );
        Ok(Some(self.wrap_response_data(Some(data), true)))
    }

    fn wrap_response_data(&self, data: Option<Map<String, Value>>, fresh: bool) -> Response {
        Response::new(ResponseKind::Twitter, data, fresh)
    }
}
