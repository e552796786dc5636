use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use serde_json::{json, Map, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Runtime;
use url_embeds::{
    staging_key, Backend, BackendRecordConfig, BackendRegistry, BackendSelector, MemoryStore,
    OEmbedConfig, TransientStore, TwitterBackend,
};

const SAMPLE_URLS: &[&str] = &[
    "https://twitter.com/rustlang/status/1",
    "https://www.youtube.com/watch?v=dQw4w9WgXcQ",
    "https://vimeo.com/76979871",
    "http://www.example.com/some/long/path?with=query&and=more",
    "https://unmatched.example.org/page",
];

fn selector(records: usize) -> BackendSelector {
    let mut registry = BackendRegistry::builtin(&OEmbedConfig::default());
    let mut configs = vec![BackendRecordConfig::new(1, "Default", "default", ".*", 1)];
    for i in 0..records as i64 {
        // Slugs are unique per record, so each host gets its own registry entry.
        let slug = format!("host{i}");
        registry.register(&slug, || Ok(Arc::new(TwitterBackend::new()) as Arc<dyn Backend>));
        configs.push(BackendRecordConfig::new(
            i + 2,
            &format!("Host {i}"),
            &slug,
            &format!(r"^https?://(www\.)?host{i}\.example\.net/"),
            (i % 20) as u16 + 2,
        ));
    }
    BackendSelector::load(&configs, &registry).unwrap()
}

fn bench_choose(c: &mut Criterion) {
    let mut group = c.benchmark_group("selector_choose");
    group
        .sample_size(100)
        .measurement_time(Duration::from_secs(5))
        .warm_up_time(Duration::from_secs(1));

    for &records in &[3usize, 30, 300] {
        let selector = selector(records);
        group.bench_with_input(BenchmarkId::new("records", records), &selector, |b, s| {
            b.iter(|| {
                for url in SAMPLE_URLS {
                    black_box(s.choose(Some(black_box(url))));
                }
            });
        });
    }
    group.finish();
}

fn bench_staging(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let store = MemoryStore::new();
    let payload: Map<String, Value> = json!({
        "type": "video",
        "provider_name": "Vimeo",
        "html": "<iframe src=\"https://player.vimeo.com/video/76979871\"></iframe>"
    })
    .as_object()
    .cloned()
    .unwrap();

    c.bench_function("staging_key", |b| {
        b.iter(|| {
            for url in SAMPLE_URLS {
                black_box(staging_key("embeds", 2, black_box(url), 250));
            }
        })
    });

    c.bench_function("stage_and_fetch", |b| {
        b.to_async(&rt).iter(|| async {
            let key = staging_key("embeds", 2, SAMPLE_URLS[2], 250);
            store
                .set(&key, payload.clone(), Duration::from_secs(300))
                .await;
            black_box(store.get(&key).await);
        })
    });
}

criterion_group!(benches, bench_choose, bench_staging);
criterion_main!(benches);
