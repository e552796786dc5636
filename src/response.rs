use crate::label::{Label, LabelRegistry};
use serde_json::{Map, Value};
use std::sync::OnceLock;

const TYPE_FIELD: &str = "type";
const PROVIDER_FIELD: &str = "provider_name";

/// Which backend family produced a response. Decides validity and how
/// image fields are read from the payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseKind {
    Default,
    OEmbed,
    Twitter,
}

/// Normalized wrapper around a backend's raw payload.
///
/// Equality only looks at the payload: a fresh response and one rebuilt from
/// storage with the same data are interchangeable.
#[derive(Debug, Clone)]
pub struct Response {
    kind: ResponseKind,
    data: Map<String, Value>,
    fresh: bool,
    embed_type: OnceLock<Option<Label>>,
    provider: OnceLock<Option<Label>>,
}

impl PartialEq for Response {
    fn eq(&self, other: &Self) -> bool {
        self.data == other.data
    }
}

impl Response {
    pub fn new(kind: ResponseKind, data: Option<Map<String, Value>>, fresh: bool) -> Self {
        Self {
            kind,
            data: data.unwrap_or_default(),
            fresh,
            embed_type: OnceLock::new(),
            provider: OnceLock::new(),
        }
    }

    pub fn kind(&self) -> ResponseKind {
        self.kind
    }

    pub fn data(&self) -> &Map<String, Value> {
        &self.data
    }

    pub fn into_data(self) -> Map<String, Value> {
        self.data
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    /// True only when produced by a live backend call.
    pub fn is_fresh(&self) -> bool {
        self.fresh
    }

    pub fn is_valid(&self) -> bool {
        match self.kind {
            ResponseKind::Default | ResponseKind::Twitter => true,
            ResponseKind::OEmbed => {
                let is_error = self.data.is_empty()
                    || self.data.get("error").is_some_and(is_truthy)
                    || self.data.get(TYPE_FIELD).and_then(Value::as_str) == Some("error");
                !is_error
            }
        }
    }

    /// Raw value of the `type` field, if it is a non-empty string.
    pub fn type_name(&self) -> Option<&str> {
        self.non_empty_str(TYPE_FIELD)
    }

    pub fn provider_name(&self) -> Option<&str> {
        self.non_empty_str(PROVIDER_FIELD)
    }

    /// The content type label, created in `registry` on first access.
    pub fn embed_type(&self, registry: &LabelRegistry) -> Option<Label> {
        self.embed_type
            .get_or_init(|| self.type_name().map(|name| registry.get_or_create(name)))
            .clone()
    }

    pub fn provider(&self, registry: &LabelRegistry) -> Option<Label> {
        self.provider
            .get_or_init(|| {
                self.provider_name()
                    .map(|name| registry.get_or_create(name))
            })
            .clone()
    }

    // Presentational accessors. Absent fields read as an empty string so
    // templates never see a null.

    pub fn title(&self) -> String {
        self.field("title")
    }

    pub fn author_name(&self) -> String {
        self.field("author_name")
    }

    pub fn author_url(&self) -> String {
        self.field("author_url")
    }

    pub fn image_url(&self) -> String {
        match self.kind {
            ResponseKind::OEmbed => self.field_by_type("url", "thumbnail_url"),
            _ => self.field("thumbnail_url"),
        }
    }

    pub fn image_height(&self) -> String {
        match self.kind {
            ResponseKind::OEmbed => self.field_by_type("height", "thumbnail_height"),
            _ => self.field("thumbnail_height"),
        }
    }

    pub fn image_width(&self) -> String {
        match self.kind {
            ResponseKind::OEmbed => self.field_by_type("width", "thumbnail_width"),
            _ => self.field("thumbnail_width"),
        }
    }

    pub fn render(&self) -> String {
        self.field("html")
    }

    fn field(&self, key: &str) -> String {
        match self.data.get(key) {
            None | Some(Value::Null) => String::new(),
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
        }
    }

    /// Photos carry the image in the main fields, links and videos in the
    /// thumbnail fields. Anything else has no image.
    fn field_by_type(&self, photo_key: &str, thumbnail_key: &str) -> String {
        let Some(type_name) = self.type_name() else {
            return String::new();
        };
        match type_name.to_lowercase().as_str() {
            "photo" => self.field(photo_key),
            "link" | "video" => self.field(thumbnail_key),
            _ => String::new(),
        }
    }

    fn non_empty_str(&self, key: &str) -> Option<&str> {
        self.data
            .get(key)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}
