use std::time::Duration;
use url_embeds::{
    BackendRecordConfig, BackendRegistry, EmbedError, EmbedService, EmbedsConfig, OEmbedConfig,
    DEFAULT_MAX_KEY_LENGTH, DEFAULT_NAMESPACE,
};

#[test]
fn test_load_from_json() {
    let config = EmbedsConfig::from_json_str(
        r#"{
            "namespace": "media",
            "staging_ttl_secs": 120,
            "secret_key": "s3cret",
            "oembed": {"api_key": "abc", "timeout_secs": 3},
            "backends": [
                {"id": 1, "name": "Default", "slug": "default", "regex": ".*"},
                {"id": 2, "name": "Twitter", "slug": "twitter", "regex": "twitter", "priority": 10,
                 "description": "Tweets"}
            ]
        }"#,
    )
    .unwrap();

    assert_eq!(config.namespace, "media");
    assert_eq!(config.staging_ttl(), Duration::from_secs(120));
    assert_eq!(config.max_key_length, DEFAULT_MAX_KEY_LENGTH);
    assert_eq!(config.oembed.api_key.as_deref(), Some("abc"));
    assert_eq!(config.oembed.timeout(), Duration::from_secs(3));
    assert_eq!(config.backends.len(), 2);
    assert_eq!(config.backends[0].priority, 1);
    assert_eq!(config.backends[1].description.as_deref(), Some("Tweets"));
}

#[test]
fn test_empty_json_uses_defaults() {
    let config = EmbedsConfig::from_json_str("{}").unwrap();
    assert_eq!(config.namespace, DEFAULT_NAMESPACE);
    assert!(config.secret_key.is_empty());
    assert!(config.backends.is_empty());
}

#[test]
fn test_malformed_json_is_a_configuration_error() {
    assert!(matches!(
        EmbedsConfig::from_json_str("{\"backends\": 3}"),
        Err(EmbedError::Configuration(_))
    ));
    assert!(matches!(
        EmbedsConfig::from_json_file("/nonexistent/embeds.json"),
        Err(EmbedError::Configuration(_))
    ));
}

#[test]
fn test_service_requires_secret_key() {
    let config = EmbedsConfig::default().with_backend(BackendRecordConfig::new(
        1, "Default", "default", ".*", 1,
    ));
    let result = EmbedService::new(&config, &BackendRegistry::builtin(&OEmbedConfig::default()));
    assert!(matches!(result, Err(EmbedError::Configuration(_))));
}

#[test]
fn test_service_rejects_unknown_backend_slug() {
    let config = EmbedsConfig::default()
        .with_secret_key("s3cret")
        .with_backend(BackendRecordConfig::new(1, "Ghost", "ghost", ".*", 1));
    match EmbedService::with_builtin_backends(&config) {
        Err(EmbedError::Configuration(message)) => assert!(message.contains("code module")),
        Err(e) => panic!("Expected Configuration error, got: {e:?}"),
        Ok(_) => panic!("Expected Configuration error"),
    }
}

#[test]
fn test_service_rejects_duplicate_records() {
    let config = EmbedsConfig::default()
        .with_secret_key("s3cret")
        .with_backend(BackendRecordConfig::new(1, "Default", "default", ".*", 1))
        .with_backend(BackendRecordConfig::new(1, "Twitter", "twitter", "twitter", 10));
    assert!(EmbedService::with_builtin_backends(&config).is_err());
}

#[test]
fn test_builtin_backends_need_oembed_key() {
    let config = EmbedsConfig::default()
        .with_secret_key("s3cret")
        .with_builtin_backends();
    assert!(matches!(
        EmbedService::with_builtin_backends(&config),
        Err(EmbedError::Configuration(_))
    ));

    let config = config.with_oembed(OEmbedConfig {
        api_key: Some("abc".to_string()),
        ..OEmbedConfig::default()
    });
    let service = EmbedService::with_builtin_backends(&config).unwrap();
    let selector = service.catalog().selector();
    assert_eq!(selector.records().len(), 3);

    let slug = |url: &str| selector.choose(Some(url)).map(|r| r.slug().to_string());
    assert_eq!(
        slug("https://twitter.com/rustlang/status/1").as_deref(),
        Some("twitter")
    );
    assert_eq!(
        slug("https://www.youtube.com/watch?v=1").as_deref(),
        Some("oembed")
    );
    assert_eq!(slug("http://www.example.com").as_deref(), Some("default"));
    assert_eq!(slug(""), None);
}
