use crate::label::Label;
use crate::record::BackendRecord;
use crate::repository::{EmbedRepository, StoredEmbed};
use crate::selector::Catalog;
use crate::{EmbedError, Response};
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, instrument};

/// A URL bound to the backend that knows how to embed it.
///
/// The type, provider, response cache and timestamp are a projection of the
/// current [`Response`]. Changing the URL or the backend drops them.
#[derive(Clone)]
pub struct Embed {
    catalog: Arc<Catalog>,
    id: Option<i64>,
    url: String,
    backend: Option<Arc<BackendRecord>>,
    response: Option<Response>,
    embed_type: Option<Label>,
    provider: Option<Label>,
    response_cache: Option<Map<String, Value>>,
    response_last_updated: Option<DateTime<Utc>>,
}

impl Embed {
    pub fn new(catalog: Arc<Catalog>) -> Self {
        Self {
            catalog,
            id: None,
            url: String::new(),
            backend: None,
            response: None,
            embed_type: None,
            provider: None,
            response_cache: None,
            response_last_updated: None,
        }
    }

    /// New embed for `url`, with a backend auto-assigned when one matches.
    pub fn with_url(catalog: Arc<Catalog>, url: impl Into<String>) -> Self {
        let mut embed = Self::new(catalog);
        embed.set_url(url);
        embed
    }

    /// Rebuild an embed from storage. The cached payload is wrapped as a
    /// stale response so the stored derived fields stay as they are.
    pub fn from_stored(catalog: Arc<Catalog>, stored: StoredEmbed) -> Result<Self, EmbedError> {
        let backend = catalog.selector().get(stored.backend_id).ok_or_else(|| {
            EmbedError::NotFound(format!("backend record {} is not loaded", stored.backend_id))
        })?;
        let response = stored
            .response_cache
            .clone()
            .map(|data| backend.wrap_response_data(Some(data), false));

        Ok(Self {
            catalog,
            id: stored.id,
            url: stored.url,
            backend: Some(backend),
            response,
            embed_type: stored.embed_type,
            provider: stored.provider,
            response_cache: stored.response_cache,
            response_last_updated: stored.response_last_updated,
        })
    }

    pub fn id(&self) -> Option<i64> {
        self.id
    }

    pub fn is_new(&self) -> bool {
        self.id.is_none()
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn backend(&self) -> Option<&Arc<BackendRecord>> {
        self.backend.as_ref()
    }

    pub fn response(&self) -> Option<&Response> {
        self.response.as_ref()
    }

    pub fn embed_type(&self) -> Option<&Label> {
        self.embed_type.as_ref()
    }

    pub fn provider(&self) -> Option<&Label> {
        self.provider.as_ref()
    }

    pub fn response_cache(&self) -> Option<&Map<String, Value>> {
        self.response_cache.as_ref()
    }

    pub fn response_last_updated(&self) -> Option<DateTime<Utc>> {
        self.response_last_updated
    }

    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    pub fn set_url(&mut self, url: impl Into<String>) {
        let url = url.into();
        if !self.url.is_empty() && self.url != url {
            self.invalidate_derived();
        }
        self.url = url;
        self.auto_assign_backend();
    }

    pub fn set_backend(&mut self, backend: Option<Arc<BackendRecord>>) {
        let changed = match &self.backend {
            Some(previous) => backend.as_deref() != Some(previous.as_ref()),
            None => false,
        };
        if changed {
            self.invalidate_derived();
        }
        self.backend = backend;
    }

    /// Only unsaved embeds with a URL and no backend get one assigned.
    pub fn auto_assign_backend(&mut self) {
        if self.url.is_empty() || self.id.is_some() || self.backend.is_some() {
            return;
        }
        self.backend = self.catalog.selector().choose(Some(&self.url));
    }

    /// Adopt `response`. Derived fields are only rewritten from a valid,
    /// fresh response; a structurally equal response is ignored.
    pub fn set_response(&mut self, response: Response) {
        if self.response.as_ref() == Some(&response) {
            return;
        }

        if response.is_valid() && response.is_fresh() {
            self.embed_type = response.embed_type(self.catalog.types());
            self.provider = response.provider(self.catalog.providers());
            let data = response.data().clone();
            if self.response_cache.as_ref() != Some(&data) {
                self.response_last_updated = Some(Utc::now());
            }
            self.response_cache = Some(data);
        }
        self.response = Some(response);
    }

    /// Clear everything that depends on the response data.
    pub fn invalidate_derived(&mut self) {
        self.response = None;
        self.embed_type = None;
        self.provider = None;
        self.response_cache = None;
        self.response_last_updated = None;
    }

    /// Ask the backend for a new response without touching this embed.
    pub async fn get_response(&self) -> Result<Option<Response>, EmbedError> {
        let backend = self.backend.as_ref().ok_or(EmbedError::MissingBackend)?;
        backend.call(&self.url).await
    }

    /// Fetch a fresh response and keep it if it is valid and differs from
    /// the current one. Returns whether anything changed.
    #[instrument(level = "debug", skip(self), fields(url = %self.url))]
    pub async fn update_response(&mut self) -> Result<bool, EmbedError> {
        match self.get_response().await? {
            Some(response) if response.is_valid() && self.response.as_ref() != Some(&response) => {
                self.set_response(response);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    /// Persist through `repository`.
    ///
    /// A new embed gets a backend auto-assigned and one attempt at fetching a
    /// response; an invalid response does not prevent the save.
    pub async fn save(&mut self, repository: &dyn EmbedRepository) -> Result<(), EmbedError> {
        if self.id.is_none() {
            self.auto_assign_backend();
            if self.backend.is_none() {
                return Err(EmbedError::MissingBackend);
            }
            if self.response.is_none() {
                match self.update_response().await {
                    Ok(_) => {}
                    Err(e) if e.is_invalid_response() => {
                        debug!(url = %self.url, error = %e, "Saving embed without response data");
                    }
                    Err(e) => return Err(e),
                }
            }
        }

        let stored = repository.save(self.to_stored()?).await?;
        self.id = stored.id;
        Ok(())
    }

    pub fn to_stored(&self) -> Result<StoredEmbed, EmbedError> {
        let backend = self.backend.as_ref().ok_or(EmbedError::MissingBackend)?;
        Ok(StoredEmbed {
            id: self.id,
            url: self.url.clone(),
            backend_id: backend.id(),
            embed_type: self.embed_type.clone(),
            provider: self.provider.clone(),
            response_cache: self.response_cache.clone(),
            response_last_updated: self.response_last_updated,
        })
    }
}

impl fmt::Debug for Embed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Embed")
            .field("id", &self.id)
            .field("url", &self.url)
            .field("backend", &self.backend.as_ref().map(|b| b.slug()))
            .field("embed_type", &self.embed_type)
            .field("provider", &self.provider)
            .field("response_last_updated", &self.response_last_updated)
            .finish()
    }
}

impl fmt::Display for Embed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.id {
            _ if !self.url.is_empty() => write!(f, "Embed-{}", self.url),
            Some(id) => write!(f, "Embed-{id}"),
            None => write!(f, "Embed-new"),
        }
    }
}
