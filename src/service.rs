use crate::config::EmbedsConfig;
use crate::registry::BackendRegistry;
use crate::repository::{EmbedRepository, MemoryRepository};
use crate::selector::{BackendSelector, Catalog};
use crate::store::{MemoryStore, TransientStore};
use crate::workflow::{EmbedForm, PreviewWorkflow, StageOutcome, StagingConfig};
use crate::{Embed, EmbedError};
use std::sync::Arc;
use tracing::{debug, instrument};

/// EmbedService wires the catalog, storage and preview workflow together
/// from an [`EmbedsConfig`]. All backend records are loaded up front, so a
/// bad slug or a missing API key fails here.
#[derive(Clone)]
pub struct EmbedService {
    catalog: Arc<Catalog>,
    repository: Arc<dyn EmbedRepository>,
    store: Arc<dyn TransientStore>,
    staging: StagingConfig,
    workflow: PreviewWorkflow,
}

impl EmbedService {
    pub fn new(config: &EmbedsConfig, registry: &BackendRegistry) -> Result<Self, EmbedError> {
        debug!(
            backends = config.backends.len(),
            namespace = %config.namespace,
            "Initializing EmbedService"
        );
        let selector = BackendSelector::load(&config.backends, registry)?;
        let catalog = Arc::new(Catalog::new(selector));
        let repository: Arc<dyn EmbedRepository> = Arc::new(MemoryRepository::new());
        let store: Arc<dyn TransientStore> = Arc::new(MemoryStore::new());
        let staging = StagingConfig::from(config);
        let workflow = PreviewWorkflow::new(
            catalog.clone(),
            store.clone(),
            repository.clone(),
            staging.clone(),
        )?;

        Ok(Self {
            catalog,
            repository,
            store,
            staging,
            workflow,
        })
    }

    /// Service using the built-in backends and the config's oEmbed settings.
    pub fn with_builtin_backends(config: &EmbedsConfig) -> Result<Self, EmbedError> {
        Self::new(config, &BackendRegistry::builtin(&config.oembed))
    }

    pub fn with_repository(mut self, repository: Arc<dyn EmbedRepository>) -> Result<Self, EmbedError> {
        self.repository = repository;
        self.rebuild_workflow()?;
        Ok(self)
    }

    pub fn with_store(mut self, store: Arc<dyn TransientStore>) -> Result<Self, EmbedError> {
        self.store = store;
        self.rebuild_workflow()?;
        Ok(self)
    }

    fn rebuild_workflow(&mut self) -> Result<(), EmbedError> {
        self.workflow = PreviewWorkflow::new(
            self.catalog.clone(),
            self.store.clone(),
            self.repository.clone(),
            self.staging.clone(),
        )?;
        Ok(())
    }

    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    pub fn workflow(&self) -> &PreviewWorkflow {
        &self.workflow
    }

    pub fn embed_for_url(&self, url: &str) -> Embed {
        Embed::with_url(self.catalog.clone(), url)
    }

    pub async fn load(&self, id: i64) -> Result<Option<Embed>, EmbedError> {
        self.repository
            .get(id)
            .await?
            .map(|stored| Embed::from_stored(self.catalog.clone(), stored))
            .transpose()
    }

    pub async fn load_by_url(&self, url: &str) -> Result<Option<Embed>, EmbedError> {
        self.repository
            .find_by_url(url)
            .await?
            .map(|stored| Embed::from_stored(self.catalog.clone(), stored))
            .transpose()
    }

    pub async fn save(&self, embed: &mut Embed) -> Result<(), EmbedError> {
        embed.save(self.repository.as_ref()).await
    }

    /// Re-fetch a stored embed and save it only if the response changed.
    #[instrument(level = "debug", skip(self))]
    pub async fn refresh(&self, id: i64) -> Result<bool, EmbedError> {
        let mut embed = self
            .load(id)
            .await?
            .ok_or_else(|| EmbedError::StorageError(format!("embed {id} does not exist")))?;
        let changed = embed.update_response().await?;
        if changed {
            self.save(&mut embed).await?;
        }
        debug!(id, changed, "Refreshed embed");
        Ok(changed)
    }

    pub async fn stage(&self, form: EmbedForm, existing: Option<&Embed>) -> StageOutcome {
        self.workflow.stage(form, existing).await
    }

    pub async fn commit(
        &self,
        form: EmbedForm,
        security_hash: &str,
        existing: Option<Embed>,
    ) -> Result<Embed, EmbedError> {
        self.workflow.commit(form, security_hash, existing).await
    }
}
