use crate::archive::ArchiveStore;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::models::{
    DownloadResult, NewPackageVersion, PackageSummary, PackageVersion, PublishResult,
    SearchQuery, SearchResult, VersionEntry, VersionsResult,
};
use crate::service::Registry;
use axum::{
    Json,
    extract::{Path as AxumPath, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use std::sync::Arc;
use utoipa::OpenApi;
use utoipa_axum::router::OpenApiRouter;
use utoipa_axum::routes;

pub struct AppState {
    pub registry: Registry,
    pub archives: ArchiveStore,
    pub config: Config,
}

/// Search packages by name or description
#[utoipa::path(
    get,
    path = "/packages/search",
    params(
        ("q" = Option<String>, Query, description = "Case-sensitive substring of a package name or description; omit to list every package")
    ),
    responses(
        (status = 200, description = "Matching packages, most downloaded first", body = SearchResult),
        (status = 500, description = "Internal server error")
    ),
    tag = "packages"
)]
pub async fn search_packages(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<SearchResult>> {
    let query = query.q.unwrap_or_default();
    let result = state.registry.search(&query).await?;
    Ok(Json(result))
}

/// List the published versions of a package
#[utoipa::path(
    get,
    path = "/packages/{name}/versions",
    params(
        ("name" = String, Path, description = "Package name")
    ),
    responses(
        (status = 200, description = "Versions, most recently published first (empty for unknown packages)", body = VersionsResult),
        (status = 500, description = "Internal server error")
    ),
    tag = "packages"
)]
pub async fn list_versions(
    State(state): State<Arc<AppState>>,
    AxumPath(name): AxumPath<String>,
) -> Result<Json<VersionsResult>> {
    let result = state.registry.list_versions(&name).await?;
    Ok(Json(result))
}

/// Download a package version
///
/// Counts the download and returns where the archive can be fetched.
#[utoipa::path(
    get,
    path = "/packages/{name}/{version}",
    params(
        ("name" = String, Path, description = "Package name"),
        ("version" = String, Path, description = "Package version")
    ),
    responses(
        (status = 200, description = "Download location", body = DownloadResult),
        (status = 500, description = "Internal server error")
    ),
    tag = "packages"
)]
pub async fn download_package(
    State(state): State<Arc<AppState>>,
    AxumPath((name, version)): AxumPath<(String, String)>,
) -> Result<Json<DownloadResult>> {
    let result = state.registry.download(&name, &version).await?;
    tracing::info!(package = %name, version = %version, "Package download requested");
    Ok(Json(result))
}

/// Get the full metadata record of a package version
#[utoipa::path(
    get,
    path = "/packages/{name}/{version}/metadata",
    params(
        ("name" = String, Path, description = "Package name"),
        ("version" = String, Path, description = "Package version")
    ),
    responses(
        (status = 200, description = "Package version metadata", body = PackageVersion),
        (status = 404, description = "Package version not found"),
        (status = 500, description = "Internal server error")
    ),
    tag = "packages"
)]
pub async fn package_metadata(
    State(state): State<Arc<AppState>>,
    AxumPath((name, version)): AxumPath<(String, String)>,
) -> Result<Json<PackageVersion>> {
    state
        .registry
        .metadata(&name, &version)
        .await?
        .map(Json)
        .ok_or_else(|| Error::PackageNotFound {
            pkgname: format!("{name} {version}"),
        })
}

/// Publish a package version
#[utoipa::path(
    post,
    path = "/packages/upload",
    request_body = NewPackageVersion,
    responses(
        (status = 201, description = "Package published (re-publishing an existing version also succeeds)", body = PublishResult),
        (status = 400, description = "Missing package name or version"),
        (status = 500, description = "Internal server error")
    ),
    tag = "packages"
)]
pub async fn publish_package(
    State(state): State<Arc<AppState>>,
    Json(record): Json<NewPackageVersion>,
) -> Result<impl IntoResponse> {
    let result = state.registry.publish(record).await?;
    Ok((StatusCode::CREATED, Json(result)))
}

#[derive(OpenApi)]
#[openapi(
    info(title = "CPM Registry", description = "Package metadata registry"),
    components(
        schemas(PackageVersion, NewPackageVersion, PackageSummary, VersionEntry)
    ),
    tags(
        (name = "packages", description = "Package search, download and publishing")
    )
)]
pub struct ApiDoc;

/// Create the API router with all routes
pub fn create_api_router(state: Arc<AppState>) -> OpenApiRouter {
    OpenApiRouter::with_openapi(ApiDoc::openapi())
        .routes(routes!(search_packages))
        .routes(routes!(list_versions))
        .routes(routes!(download_package))
        .routes(routes!(package_metadata))
        .routes(routes!(publish_package))
        .with_state(state)
}
