use crate::backends::{Backend, DefaultBackend, OEmbedBackend, TwitterBackend};
use crate::config::OEmbedConfig;
use crate::EmbedError;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

pub type BackendFactory = Arc<dyn Fn() -> Result<Arc<dyn Backend>, EmbedError> + Send + Sync>;

/// Maps backend identifiers to factories.
///
/// Populated once at startup; lookups accept arbitrary strings and fail with
/// [`EmbedError::NotFound`] rather than panicking.
#[derive(Clone, Default)]
pub struct BackendRegistry {
    factories: HashMap<String, BackendFactory>,
}

impl BackendRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the `default`, `twitter` and `oembed` backends. `embedly`
    /// is accepted as an alias for `oembed`.
    pub fn builtin(oembed: &OEmbedConfig) -> Self {
        let mut registry = Self::new();
        registry.register("default", || Ok(Arc::new(DefaultBackend::new()) as Arc<dyn Backend>));
        registry.register("twitter", || Ok(Arc::new(TwitterBackend::new()) as Arc<dyn Backend>));

        let oembed = oembed.clone();
        let factory: BackendFactory =
            Arc::new(move || Ok(Arc::new(OEmbedBackend::new(&oembed)?) as Arc<dyn Backend>));
        registry.register_factory("oembed", factory.clone());
        registry.register_factory("embedly", factory);
        registry
    }

    pub fn register<F>(&mut self, name: &str, factory: F)
    where
        F: Fn() -> Result<Arc<dyn Backend>, EmbedError> + Send + Sync + 'static,
    {
        self.register_factory(name, Arc::new(factory));
    }

    pub fn register_factory(&mut self, name: &str, factory: BackendFactory) {
        let key = name.trim().to_lowercase();
        if self.factories.insert(key.clone(), factory).is_some() {
            warn!(name = %key, "Replacing registered backend factory");
        }
    }

    pub fn contains(&self, identifier: &str) -> bool {
        self.factories.contains_key(&normalize_identifier(identifier))
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Build the backend registered under `identifier`.
    ///
    /// Accepts a short name in any case (`twitter`, `Twitter`), the type name
    /// (`TwitterBackend`) or a qualified path whose last segment is one of
    /// those (`embeds.backends.twitter`, `url_embeds::backends::TwitterBackend`).
    pub fn resolve(&self, identifier: &str) -> Result<Arc<dyn Backend>, EmbedError> {
        let key = normalize_identifier(identifier);
        if key.is_empty() {
            return Err(EmbedError::NotFound(
                "empty backend identifier".to_string(),
            ));
        }

        let factory = self
            .factories
            .get(&key)
            .ok_or_else(|| EmbedError::NotFound(format!("no backend named {identifier:?}")))?;

        debug!(identifier = %identifier, name = %key, "Resolving backend");
        factory()
    }
}

fn normalize_identifier(identifier: &str) -> String {
    let last = identifier
        .trim()
        .rsplit(|c: char| c == '.' || c == ':' || c == '/')
        .next()
        .unwrap_or_default()
        .to_lowercase();

    match last.strip_suffix("backend") {
        Some(stem) if !stem.is_empty() => stem.to_string(),
        _ => last,
    }
}
