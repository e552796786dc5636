use crate::label::LabelRegistry;
use crate::record::{BackendRecord, BackendRecordConfig};
use crate::registry::BackendRegistry;
use crate::EmbedError;
use std::sync::Arc;
use tracing::debug;

/// Picks a backend for a URL from the registration records.
///
/// Records are tried by descending priority; equal priorities fall back to
/// the lowest record id. The first regex that matches anywhere in the URL wins.
#[derive(Debug, Clone, Default)]
pub struct BackendSelector {
    records: Vec<Arc<BackendRecord>>,
}

impl BackendSelector {
    pub fn new(records: impl IntoIterator<Item = Arc<BackendRecord>>) -> Self {
        let mut records: Vec<_> = records.into_iter().collect();
        records.sort_by(|a, b| {
            b.priority()
                .cmp(&a.priority())
                .then_with(|| a.id().cmp(&b.id()))
        });
        Self { records }
    }

    /// Load and validate every record up front.
    pub fn load(
        configs: &[BackendRecordConfig],
        registry: &BackendRegistry,
    ) -> Result<Self, EmbedError> {
        let mut records = Vec::with_capacity(configs.len());
        for config in configs {
            if records.iter().any(|r: &Arc<BackendRecord>| r.id() == config.id) {
                return Err(EmbedError::Configuration(format!(
                    "duplicate backend record id {}",
                    config.id
                )));
            }
            if records.iter().any(|r: &Arc<BackendRecord>| r.slug() == config.slug) {
                return Err(EmbedError::Configuration(format!(
                    "duplicate backend slug {:?}",
                    config.slug
                )));
            }
            records.push(Arc::new(BackendRecord::load(config, registry)?));
        }
        Ok(Self::new(records))
    }

    pub fn choose(&self, url: Option<&str>) -> Option<Arc<BackendRecord>> {
        let url = url.filter(|u| !u.is_empty())?;
        let chosen = self.records.iter().find(|record| record.matches(url)).cloned();
        match &chosen {
            Some(record) => debug!(url = %url, backend = %record.slug(), "Auto-assigned backend"),
            None => debug!(url = %url, "No backend matches URL"),
        }
        chosen
    }

    pub fn get(&self, id: i64) -> Option<Arc<BackendRecord>> {
        self.records.iter().find(|r| r.id() == id).cloned()
    }

    pub fn by_slug(&self, slug: &str) -> Option<Arc<BackendRecord>> {
        self.records.iter().find(|r| r.slug() == slug).cloned()
    }

    /// Records in selection order.
    pub fn records(&self) -> &[Arc<BackendRecord>] {
        &self.records
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Everything an embed needs to resolve backends and labels, shared between
/// embeds, the workflow and the service.
#[derive(Debug, Clone)]
pub struct Catalog {
    selector: BackendSelector,
    types: LabelRegistry,
    providers: LabelRegistry,
}

impl Catalog {
    pub fn new(selector: BackendSelector) -> Self {
        Self {
            selector,
            types: LabelRegistry::new("type"),
            providers: LabelRegistry::new("provider"),
        }
    }

    pub fn selector(&self) -> &BackendSelector {
        &self.selector
    }

    pub fn types(&self) -> &LabelRegistry {
        &self.types
    }

    pub fn providers(&self) -> &LabelRegistry {
        &self.providers
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OEmbedConfig;

    fn selector(records: &[(i64, &str, &str, u16)]) -> BackendSelector {
        let configs: Vec<_> = records
            .iter()
            .map(|(id, slug, regex, priority)| {
                BackendRecordConfig::new(*id, slug, slug, regex, *priority)
            })
            .collect();
        BackendSelector::load(&configs, &BackendRegistry::builtin(&OEmbedConfig::default())).unwrap()
    }

    #[test]
    fn test_higher_priority_wins() {
        let selector = selector(&[(1, "default", "a.*", 1), (2, "twitter", "b.*", 5)]);
        let chosen = selector.choose(Some("ab123")).unwrap();
        assert_eq!(chosen.slug(), "twitter");
    }

    #[test]
    fn test_falls_through_to_lower_priority() {
        let selector = selector(&[(1, "default", "a.*", 1), (2, "twitter", "b.*", 5)]);
        assert_eq!(selector.choose(Some("a123")).unwrap().slug(), "default");
    }

    #[test]
    fn test_no_match_or_no_url() {
        let selector = selector(&[(1, "default", "^x", 1)]);
        assert!(selector.choose(Some("ab123")).is_none());
        assert!(selector.choose(Some("")).is_none());
        assert!(selector.choose(None).is_none());
        assert!(BackendSelector::default().choose(Some("x")).is_none());
    }

    #[test]
    fn test_catch_all_priorities() {
        let selector = selector(&[(1, "default", ".*", 5), (2, "twitter", ".*", 6)]);
        assert_eq!(selector.choose(Some("http://anything")).unwrap().id(), 2);
    }

    #[test]
    fn test_equal_priority_lowest_id_wins() {
        let selector = selector(&[(7, "twitter", ".*", 3), (4, "default", ".*", 3)]);
        assert_eq!(selector.choose(Some("http://anything")).unwrap().id(), 4);
    }

    #[test]
    fn test_duplicate_records_rejected() {
        let registry = BackendRegistry::builtin(&OEmbedConfig::default());
        let dup_id = [
            BackendRecordConfig::new(1, "a", "default", ".*", 1),
            BackendRecordConfig::new(1, "b", "twitter", ".*", 1),
        ];
        assert!(BackendSelector::load(&dup_id, &registry).is_err());
        let dup_slug = [
            BackendRecordConfig::new(1, "a", "default", ".*", 1),
            BackendRecordConfig::new(2, "b", "default", ".*", 1),
        ];
        assert!(BackendSelector::load(&dup_slug, &registry).is_err());
    }

    #[test]
    fn test_lookup_by_id_and_slug() {
        let selector = selector(&[(1, "default", ".*", 1), (2, "twitter", "twitter", 10)]);
        assert_eq!(selector.get(2).unwrap().slug(), "twitter");
        assert_eq!(selector.by_slug("default").unwrap().id(), 1);
        assert!(selector.get(99).is_none());
    }
}
