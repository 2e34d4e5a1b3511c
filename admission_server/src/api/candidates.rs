//! Candidate and repartition handlers.
//!
//! ```text
//! GET    /api/candidates              - List (Admin policy)
//! POST   /api/candidates              - Register (Admin policy)
//! PUT    /api/candidates              - Edit (Admin policy)
//! GET    /api/candidates/{id}         - Read one (Admin policy)
//! DELETE /api/candidates/{id}         - Delete with repartition (Admin policy)
//! GET    /api/repartitions            - List, `?candidate_id=` filter (User policy)
//! POST   /api/repartitions            - Assign a classroom (Admin policy)
//! PUT    /api/repartitions            - Move (Admin policy)
//! GET    /api/repartitions/{id}       - Read one (User policy)
//! DELETE /api/repartitions/{id}       - Delete (Admin policy)
//! ```

use super::{
    AppState,
    extract::JsonBody,
    response::{ApiError, ApiResponse, ApiResponseObject, ApiResult},
};
use admission::candidates::{Candidate, NewCandidate, NewRepartition, Repartition};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::{StatusCode, header},
    response::IntoResponse,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CandidatePayload {
    #[serde(alias = "firstName")]
    pub first_name: String,
    #[serde(alias = "lastName")]
    pub last_name: String,
    pub email: String,
    #[serde(alias = "highSchool")]
    pub high_school: String,
    #[serde(alias = "examSubject")]
    pub exam_subject: String,
}

#[derive(Debug, Deserialize)]
pub struct CandidateUpdatePayload {
    pub id: Uuid,
    #[serde(flatten)]
    pub fields: CandidatePayload,
}

#[derive(Debug, Deserialize)]
pub struct RepartitionPayload {
    #[serde(alias = "candidateId")]
    pub candidate_id: Uuid,
    #[serde(default)]
    pub classroom: String,
    #[serde(alias = "examDate")]
    pub exam_date: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct RepartitionUpdatePayload {
    pub id: Uuid,
    #[serde(flatten)]
    pub fields: RepartitionPayload,
}

#[derive(Debug, Default, Deserialize)]
pub struct RepartitionFilter {
    #[serde(alias = "candidateId")]
    pub candidate_id: Option<Uuid>,
}

pub async fn list_candidates(State(state): State<AppState>) -> ApiResult<Json<Vec<Candidate>>> {
    Ok(Json(state.candidates.list_candidates().await?))
}

pub async fn get_candidate(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Candidate>> {
    let id = parse_id(&id)?;
    Ok(Json(state.candidates.get_candidate(id).await?))
}

/// Returns `201 Created` with a `Location` header
pub async fn create_candidate(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<CandidatePayload>,
) -> ApiResult<impl IntoResponse> {
    let created = state
        .candidates
        .create_candidate(NewCandidate {
            first_name: payload.first_name,
            last_name: payload.last_name,
            email: payload.email,
            high_school: payload.high_school,
            exam_subject: payload.exam_subject,
        })
        .await?;

    let location = format!("/api/candidates/{}", created.id);
    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, location)],
        Json(ApiResponseObject::new(created)),
    ))
}

pub async fn update_candidate(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<CandidateUpdatePayload>,
) -> ApiResult<Json<ApiResponseObject<Candidate>>> {
    let existing = state.candidates.get_candidate(payload.id).await?;
    let fields = payload.fields;
    let updated = state
        .candidates
        .update_candidate(Candidate {
            first_name: fields.first_name,
            last_name: fields.last_name,
            email: fields.email,
            high_school: fields.high_school,
            exam_subject: fields.exam_subject,
            ..existing
        })
        .await?;

    Ok(Json(ApiResponseObject::new(updated)))
}

pub async fn delete_candidate(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<ApiResponse>> {
    let id = parse_id(&id)?;
    state.candidates.delete_candidate(id).await?;
    Ok(Json(ApiResponse::success()))
}

pub async fn list_repartitions(
    State(state): State<AppState>,
    Query(filter): Query<RepartitionFilter>,
) -> ApiResult<Json<Vec<Repartition>>> {
    Ok(Json(state.candidates.list_repartitions(filter.candidate_id).await?))
}

pub async fn get_repartition(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Repartition>> {
    let id = parse_id(&id)?;
    Ok(Json(state.candidates.get_repartition(id).await?))
}

/// Returns `201 Created`, or `409` when the candidate is already seated
pub async fn create_repartition(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<RepartitionPayload>,
) -> ApiResult<impl IntoResponse> {
    let created = state
        .candidates
        .assign(NewRepartition {
            candidate_id: payload.candidate_id,
            classroom: payload.classroom,
            exam_date: payload.exam_date,
        })
        .await?;

    let location = format!("/api/repartitions/{}", created.id);
    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, location)],
        Json(ApiResponseObject::new(created)),
    ))
}

pub async fn update_repartition(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<RepartitionUpdatePayload>,
) -> ApiResult<Json<ApiResponseObject<Repartition>>> {
    let fields = payload.fields;
    let updated = state
        .candidates
        .update_repartition(Repartition {
            id: payload.id,
            candidate_id: fields.candidate_id,
            classroom: fields.classroom,
            exam_date: fields.exam_date,
        })
        .await?;

    Ok(Json(ApiResponseObject::new(updated)))
}

pub async fn delete_repartition(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<ApiResponse>> {
    let id = parse_id(&id)?;
    state.candidates.delete_repartition(id).await?;
    Ok(Json(ApiResponse::success()))
}

fn parse_id(id: &str) -> ApiResult<Uuid> {
    Uuid::parse_str(id).map_err(|_| ApiError::bad_request("Invalid id"))
}
