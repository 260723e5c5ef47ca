use axum::{
    extract::{Path, State},
    http::{StatusCode, header},
    response::IntoResponse,
};
use std::sync::Arc;

use crate::api::AppState;
use crate::error::Result;

/// Serve a package archive from the blob store.
/// This is the target of the `download_url` handed out by the download endpoint.
pub async fn serve_archive(
    State(state): State<Arc<AppState>>,
    Path((name, version)): Path<(String, String)>,
) -> Result<impl IntoResponse> {
    let Some(data) = state.archives.read_archive(&name, &version).await? else {
        tracing::debug!(package = %name, version = %version, "Archive not in blob store");
        return Ok((StatusCode::NOT_FOUND, "Archive not found").into_response());
    };

    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, "application/gzip")],
        data,
    )
        .into_response())
}
