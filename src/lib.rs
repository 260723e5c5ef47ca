pub mod api;
pub mod archive;
pub mod catalog;
pub mod config;
pub mod error;
pub mod models;
pub mod repo;
pub mod service;

use api::{AppState, create_api_router};
use archive::ArchiveStore;
use axum::{Router, routing::get};
use catalog::{CatalogActor, CatalogStore};
use config::Config;
use repo::serve_archive;
use service::Registry;
use std::io::IsTerminal;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa_rapidoc::RapiDoc;

/// Initialize the tracing subscriber for logging
/// Uses journald when running as a service (no terminal), fmt when running interactively
pub fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "cpm_registry=info,tower_http=warn".into());

    if std::io::stdout().is_terminal() {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
        return;
    }

    match tracing_journald::layer() {
        Ok(journald) => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(journald)
                .init();
        }
        Err(e) => {
            // No journald (e.g. inside a container), fall back to plain output
            tracing_subscriber::fmt().with_env_filter(env_filter).init();
            tracing::warn!(error = %e, "Failed to connect to journald, logging to stdout");
        }
    }
}

/// Open the catalog database, seeding the demo packages on first creation
pub fn open_catalog(config: &Config) -> error::Result<CatalogStore> {
    let path = config.storage.database_path();
    let mut store = CatalogStore::open(&path, config.catalog.version_ordering)?;

    if store.is_fresh() {
        tracing::info!(path = %path.display(), "Created new catalog database");
        if config.catalog.seed_demo {
            let seeded = store.seed_demo()?;
            tracing::info!(seeded, "Seeded catalog with demo packages");
        }
    }

    Ok(store)
}

/// Build the full HTTP application: registry API, archive downloads and docs
pub fn build_router(state: Arc<AppState>) -> Router {
    let (api_router, api_doc) = create_api_router(state.clone()).split_for_parts();

    // Archive downloads are served from the blob store, outside the API document
    let archive_routes = Router::new()
        .route("/packages/{name}/{version}/archive", get(serve_archive))
        .with_state(state);

    let doc_routes = Router::new()
        .merge(RapiDoc::with_openapi("/api-docs/openapi.json", api_doc).path("/api-docs"));

    Router::new()
        .merge(api_router)
        .merge(archive_routes)
        .merge(doc_routes)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Run the registry service
pub async fn run_service(
    config_path: Option<&str>,
    host: Option<String>,
    port: Option<u16>,
) -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    tracing::info!("cpm-registry version {}", env!("CARGO_PKG_VERSION"));

    // An explicitly requested config file must load; otherwise defaults are fine
    let mut config = match Config::load(config_path) {
        Ok(config) => config,
        Err(e) if config_path.is_some() => return Err(e.into()),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to load config, using defaults");
            Config::default()
        }
    };
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }

    tracing::info!("Starting server with config: {:?}", config);

    let archives = ArchiveStore::new(&config.storage.data_path);
    archives.ensure_layout().await?;

    let store = open_catalog(&config)?;
    let (catalog_actor, catalog) = CatalogActor::new(store);
    let actor_thread = catalog_actor.spawn()?;

    let stats = catalog.stats().await?;
    tracing::info!(
        packages = stats.packages,
        versions = stats.versions,
        "Catalog ready"
    );

    let state = Arc::new(AppState {
        registry: Registry::new(catalog.clone()),
        archives,
        config: config.clone(),
    });

    let app = build_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("Server listening on http://{}", addr);
    tracing::info!("Package database: {}", config.storage.database_path().display());
    tracing::info!("Packages directory: {}", config.storage.data_path.join("packages").display());
    tracing::info!("Endpoints:");
    tracing::info!("  GET  /packages/search?q=<query>");
    tracing::info!("  GET  /packages/<name>/versions");
    tracing::info!("  GET  /packages/<name>/<version>");
    tracing::info!("  GET  /packages/<name>/<version>/metadata");
    tracing::info!("  GET  /packages/<name>/<version>/archive");
    tracing::info!("  POST /packages/upload");
    tracing::info!("API documentation available at http://{}/api-docs", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // In-flight requests are done; close the catalog connection
    catalog.shutdown().await;
    match tokio::task::spawn_blocking(move || actor_thread.join()).await {
        Ok(Ok(())) => tracing::info!("Catalog closed"),
        Ok(Err(_)) => tracing::error!("Catalog actor panicked"),
        Err(e) => tracing::error!(error = %e, "Failed to wait for catalog actor"),
    }

    Ok(())
}

/// Wait for Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, shutting down server");
}
