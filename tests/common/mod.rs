use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use cpm_registry::api::AppState;
use cpm_registry::archive::ArchiveStore;
use cpm_registry::build_router;
use cpm_registry::catalog::CatalogActor;
use cpm_registry::config::Config;
use cpm_registry::open_catalog;
use cpm_registry::service::Registry;
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;
use tower::util::ServiceExt;

pub struct TestApp {
    pub router: Router,
    pub data_path: PathBuf,
}

/// App backed by an empty catalog in a fresh temporary directory
pub async fn setup_test_app() -> TestApp {
    setup(false).await
}

/// App backed by a catalog seeded with the demo packages
pub async fn setup_seeded_test_app() -> TestApp {
    setup(true).await
}

async fn setup(seed_demo: bool) -> TestApp {
    let temp_dir = TempDir::new().unwrap();
    let temp_path = temp_dir.path().to_path_buf();

    // Don't drop temp_dir - leak it so it persists for the test
    std::mem::forget(temp_dir);

    let mut config = Config::default();
    config.storage.data_path = temp_path.clone();
    config.catalog.seed_demo = seed_demo;

    let archives = ArchiveStore::new(&config.storage.data_path);
    archives.ensure_layout().await.unwrap();

    let store = open_catalog(&config).unwrap();
    let (actor, catalog) = CatalogActor::new(store);
    actor.spawn().unwrap();

    let state = Arc::new(AppState {
        registry: Registry::new(catalog),
        archives,
        config,
    });

    TestApp {
        router: build_router(state),
        data_path: temp_path,
    }
}

/// Send a GET request and decode the JSON body
pub async fn get_json(app: &Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let response = app
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null);
    (status, json)
}

/// POST a package publish request
pub async fn publish(app: &Router, body: serde_json::Value) -> (StatusCode, serde_json::Value) {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/packages/upload")
                .header("Content-Type", "application/json")
                .body(Body::from(serde_json::to_vec(&body).unwrap()))
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null);
    (status, json)
}
