//! Blob file handlers.
//!
//! ```text
//! PUT    /api/files/{name}   - Upload or replace (Admin policy)
//! GET    /api/files/{name}   - Download (User policy)
//! HEAD   /api/files/{name}   - Existence check (User policy)
//! DELETE /api/files/{name}   - Delete (Admin policy)
//! ```

use super::{
    AppState,
    response::{ApiResponse, ApiResult},
};
use axum::{
    Json,
    body::Bytes,
    extract::{Path, State},
    http::{StatusCode, header},
    response::IntoResponse,
};

pub async fn upload_file(
    State(state): State<AppState>,
    Path(name): Path<String>,
    body: Bytes,
) -> ApiResult<Json<ApiResponse>> {
    state.blobs.upload(&name, &body).await?;
    tracing::info!(blob = %name, bytes = body.len(), "Blob uploaded");
    Ok(Json(ApiResponse::success()))
}

pub async fn download_file(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let data = state.blobs.download(&name).await?;
    Ok(([(header::CONTENT_TYPE, "application/octet-stream")], data))
}

/// `200` when the blob exists, `404` otherwise, never a body
pub async fn file_exists(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> ApiResult<StatusCode> {
    if state.blobs.exists(&name).await? {
        Ok(StatusCode::OK)
    } else {
        Ok(StatusCode::NOT_FOUND)
    }
}

pub async fn delete_file(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> ApiResult<Json<ApiResponse>> {
    state.blobs.delete(&name).await?;
    tracing::info!(blob = %name, "Blob deleted");
    Ok(Json(ApiResponse::success()))
}
