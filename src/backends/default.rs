use super::Backend;
use crate::{EmbedError, Response, ResponseKind};
use async_trait::async_trait;
use serde_json::{Map, Value};

/// Uses the only thing we can count on: the URL itself.
#[derive(Debug, Clone, Default)]
pub struct DefaultBackend;

impl DefaultBackend {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Backend for DefaultBackend {
    fn name(&self) -> &str {
        "default"
    }

    async fn call(&self, url: &str) -> Result<Option<Response>, EmbedError> {
        if url.is_empty() {
            return Ok(None);
        }
        let mut data = Map::new();
        data.insert("url".to_string(), Value::String(url.to_string()));
        Ok(Some(self.wrap_response_data(Some(data), true)))
    }

    fn wrap_response_data(&self, data: Option<Map<String, Value>>, fresh: bool) -> Response {
        Response::new(ResponseKind::Default, data, fresh)
    }
}
