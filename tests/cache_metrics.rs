mod support;

use std::collections::HashSet;
use std::num::NonZeroU32;
use std::sync::Arc;

use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
};
use metrics_util::debugging::DebuggingRecorder;
use tower::ServiceExt;
use yatube::cache::{CacheConfig, CacheError, FragmentCache, FragmentKey};
use yatube::infra::app::{AppOptions, ApplicationContext, Repositories};
use yatube::infra::memory::MemoryRepositories;
use yatube::infra::telemetry;

use support::{app_with, publish, user};

struct UnavailableCache;

impl FragmentCache for UnavailableCache {
    fn get(&self, _key: &FragmentKey) -> Result<Option<String>, CacheError> {
        Err(CacheError::unavailable("offline"))
    }

    fn set(
        &self,
        _key: FragmentKey,
        _fragment: String,
        _ttl: std::time::Duration,
    ) -> Result<(), CacheError> {
        Err(CacheError::unavailable("offline"))
    }

    fn generation(&self) -> Result<u64, CacheError> {
        Err(CacheError::unavailable("offline"))
    }

    fn fill(
        &self,
        _key: FragmentKey,
        _fragment: String,
        _ttl: std::time::Duration,
        _generation: u64,
    ) -> Result<bool, CacheError> {
        Err(CacheError::unavailable("offline"))
    }

    fn touch(&self, _key: &FragmentKey, _ttl: std::time::Duration) -> Result<bool, CacheError> {
        Ok(false)
    }

    fn invalidate(&self, _key: &FragmentKey) -> Result<(), CacheError> {
        Ok(())
    }

    fn clear(&self) -> Result<(), CacheError> {
        Ok(())
    }
}

#[tokio::test]
async fn fragment_cache_paths_emit_expected_metric_keys() {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    recorder
        .install()
        .expect("debug metrics recorder should install in this test process");
    telemetry::describe_metrics();

    let options = AppOptions {
        cache: CacheConfig {
            capacity: 1,
            ..CacheConfig::default()
        },
        page_size: NonZeroU32::MIN,
        ..AppOptions::default()
    };
    let app = app_with(&options);
    let leo = user(&app, "leo").await;
    publish(&app, &leo, "older", None).await;
    publish(&app, &leo, "newer", None).await;

    let router = app.router();
    // miss, hit, then a second page that evicts the first.
    for uri in ["/?page=1", "/?page=1", "/?page=2"] {
        let request = Request::builder()
            .method(Method::GET)
            .uri(uri)
            .body(Body::empty())
            .expect("request should build");
        let response = router
            .clone()
            .oneshot(request)
            .await
            .expect("router should respond");
        assert_eq!(response.status(), StatusCode::OK);
    }

    let failing = ApplicationContext::with_fragments(
        Repositories::shared(Arc::new(MemoryRepositories::new())),
        &AppOptions::default(),
        Arc::new(UnavailableCache),
    );
    failing
        .feed
        .index_fragment(1)
        .await
        .expect("feed renders without cache");

    let names: HashSet<String> = snapshotter
        .snapshot()
        .into_vec()
        .into_iter()
        .map(|(composite_key, _, _, _)| composite_key.key().name().to_string())
        .collect();

    let expected = [
        "yatube_fragment_cache_hit_total",
        "yatube_fragment_cache_miss_total",
        "yatube_fragment_cache_evict_total",
        "yatube_fragment_cache_clear_total",
        "yatube_fragment_cache_error_total",
    ];

    for metric in expected {
        assert!(names.contains(metric), "missing metric: {metric}");
    }
}
