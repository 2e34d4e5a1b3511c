//! Announcement handlers.
//!
//! Listing needs the `User` policy; reading one, creating, editing and
//! deleting need `Admin`. Unexpected failures answer `400 {"status": false}`.

use super::{
    AppState,
    extract::JsonBody,
    middleware::AuthenticatedUser,
    response::{ApiError, ApiResponse, ApiResponseObject, ApiResult},
};
use admission::announcements::{Announcement, NewAnnouncement};
use axum::{
    Json,
    extract::{Extension, Path, State},
    http::{StatusCode, header},
    response::IntoResponse,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct AnnouncementPayload {
    pub title: String,
    pub body: String,
    #[serde(alias = "publishDate")]
    pub publish_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct AnnouncementUpdatePayload {
    pub id: Uuid,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub body: String,
    #[serde(default, alias = "publishDate")]
    pub publish_date: Option<DateTime<Utc>>,
}

/// All announcements, newest first
pub async fn list_announcements(State(state): State<AppState>) -> ApiResult<Json<Vec<Announcement>>> {
    Ok(Json(state.announcements.list().await?))
}

pub async fn get_announcement(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Announcement>> {
    let id = parse_id(&id)?;
    Ok(Json(state.announcements.get(id).await?))
}

/// Publish an announcement authored by the caller
///
/// Returns `201 Created` with a `Location` header pointing at the new
/// announcement.
pub async fn create_announcement(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    JsonBody(payload): JsonBody<AnnouncementPayload>,
) -> ApiResult<impl IntoResponse> {
    let created = state
        .announcements
        .create(NewAnnouncement {
            admin_id: user.claims().id.to_string(),
            publish_date: payload.publish_date.unwrap_or_else(Utc::now),
            title: payload.title,
            body: payload.body,
        })
        .await?;

    let location = format!("/api/announcements/{}", created.id);
    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, location)],
        Json(ApiResponseObject::new(created)),
    ))
}

/// Replace title, body and publish date of an existing announcement
pub async fn update_announcement(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<AnnouncementUpdatePayload>,
) -> ApiResult<Json<ApiResponseObject<Announcement>>> {
    let existing = state.announcements.get(payload.id).await?;
    let updated = state
        .announcements
        .update(Announcement {
            publish_date: payload.publish_date.unwrap_or(existing.publish_date),
            title: payload.title,
            body: payload.body,
            ..existing
        })
        .await?;

    Ok(Json(ApiResponseObject::new(updated)))
}

pub async fn delete_announcement(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<ApiResponse>> {
    let id = parse_id(&id)?;
    state.announcements.delete(id).await?;
    Ok(Json(ApiResponse::success()))
}

fn parse_id(id: &str) -> ApiResult<Uuid> {
    Uuid::parse_str(id).map_err(|_| ApiError::new(StatusCode::BAD_REQUEST, ApiResponse::failure()))
}
