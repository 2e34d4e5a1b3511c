//! HTTP API for the admission platform.
//!
//! # Modules
//!
//! - [`account`]: Registration, confirmation, recovery, password change, login
//! - [`announcements`]: Announcement CRUD
//! - [`candidates`]: Exam candidates and classroom repartition
//! - [`files`]: Blob storage
//! - [`middleware`]: Claim-based authorization for protected routes
//! - [`rate_limiter`]: Per-account limits on credential endpoints
//!
//! # Endpoints
//!
//! ```text
//! GET    /health                                  - Health check (public)
//! POST   /api/auth/login                          - Login (public)
//! POST   /api/account/create_account              - Register (public)
//! GET    /api/account/confirm-email               - Confirm email (public)
//! POST   /api/account/password_recovery_s1        - Start recovery (public)
//! PUT    /api/account/password_recovery_s2        - Finish recovery (public)
//! PUT    /api/account/change_password/{email}     - Change password (User)
//! GET    /api/account/admin                       - Capability check (Admin)
//! GET    /api/announcements                       - List (User)
//! POST   /api/announcements                       - Create (Admin)
//! PUT    /api/announcements                       - Update (Admin)
//! GET    /api/announcements/{id}                  - Read one (Admin)
//! DELETE /api/announcements/{id}                  - Delete (Admin)
//! GET    /api/candidates                          - List (Admin)
//! POST   /api/candidates                          - Register (Admin)
//! PUT    /api/candidates                          - Edit (Admin)
//! GET    /api/candidates/{id}                     - Read one (Admin)
//! DELETE /api/candidates/{id}                     - Delete (Admin)
//! GET    /api/repartitions                        - List (User)
//! POST   /api/repartitions                        - Assign (Admin)
//! PUT    /api/repartitions                        - Move (Admin)
//! GET    /api/repartitions/{id}                   - Read one (User)
//! DELETE /api/repartitions/{id}                   - Delete (Admin)
//! PUT    /api/files/{name}                        - Upload (Admin)
//! GET    /api/files/{name}                        - Download (User)
//! HEAD   /api/files/{name}                        - Exists (User)
//! DELETE /api/files/{name}                        - Delete (Admin)
//! ```
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use admission_server::api::{create_router, AppState};
//! # async fn example(state: AppState) -> Result<(), Box<dyn std::error::Error>> {
//! let app = create_router(state);
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
//! axum::serve(listener, app).await?;
//! # Ok(())
//! # }
//! ```
//!
//! # CORS
//!
//! CORS is configured permissively so the browser client can be served from
//! any origin. Restrict it at the reverse proxy in production.

pub mod account;
pub mod announcements;
pub mod candidates;
pub mod extract;
pub mod files;
pub mod middleware;
pub mod rate_limiter;
pub mod request_id;
pub mod response;

use admission::announcements::AnnouncementManager;
use admission::auth::{AuthManager, Policy};
use admission::candidates::CandidateManager;
use admission::storage::BlobStorage;
use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{MethodRouter, delete, get, head, post, put},
};
use middleware::PolicyGate;
use rate_limiter::KeyedRateLimiter;
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

/// Application state shared across all HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    pub auth_manager: Arc<AuthManager>,
    pub announcements: Arc<AnnouncementManager>,
    pub candidates: Arc<CandidateManager>,
    pub blobs: Arc<dyn BlobStorage>,
    pub rate_limiter: Arc<KeyedRateLimiter>,
    /// Redirect target after a successful email confirmation
    pub post_confirmation_url: String,
}

/// Create the complete API router with all endpoints and middleware.
pub fn create_router(state: AppState) -> Router {
    let account_routes = Router::new()
        .route("/create_account", post(account::create_account))
        .route("/confirm-email", get(account::confirm_email))
        .route("/password_recovery_s1", post(account::password_recovery_initiate))
        .route("/password_recovery_s2", put(account::password_recovery_complete))
        .route(
            "/change_password/{email}",
            guarded(&state, Policy::User, put(account::change_password)),
        )
        .route("/admin", guarded(&state, Policy::Admin, get(account::admin_check)));

    let announcement_routes = Router::new().route(
        "/{id}",
        guarded(&state, Policy::Admin, get(announcements::get_announcement))
            .merge(guarded(&state, Policy::Admin, delete(announcements::delete_announcement))),
    );

    let candidate_routes = Router::new().route(
        "/{id}",
        guarded(&state, Policy::Admin, get(candidates::get_candidate))
            .merge(guarded(&state, Policy::Admin, delete(candidates::delete_candidate))),
    );

    let repartition_routes = Router::new().route(
        "/{id}",
        guarded(&state, Policy::User, get(candidates::get_repartition))
            .merge(guarded(&state, Policy::Admin, delete(candidates::delete_repartition))),
    );

    let file_routes = Router::new().route(
        "/{name}",
        guarded(&state, Policy::User, get(files::download_file))
            .merge(guarded(&state, Policy::User, head(files::file_exists)))
            .merge(guarded(&state, Policy::Admin, put(files::upload_file)))
            .merge(guarded(&state, Policy::Admin, delete(files::delete_file))),
    );

    Router::new()
        .route("/health", get(health_check))
        .route("/api/auth/login", post(account::login))
        .nest("/api/account", account_routes)
        .route(
            "/api/announcements",
            guarded(&state, Policy::User, get(announcements::list_announcements))
                .merge(guarded(&state, Policy::Admin, post(announcements::create_announcement)))
                .merge(guarded(&state, Policy::Admin, put(announcements::update_announcement))),
        )
        .nest("/api/announcements", announcement_routes)
        .route(
            "/api/candidates",
            guarded(&state, Policy::Admin, get(candidates::list_candidates))
                .merge(guarded(&state, Policy::Admin, post(candidates::create_candidate)))
                .merge(guarded(&state, Policy::Admin, put(candidates::update_candidate))),
        )
        .nest("/api/candidates", candidate_routes)
        .route(
            "/api/repartitions",
            guarded(&state, Policy::User, get(candidates::list_repartitions))
                .merge(guarded(&state, Policy::Admin, post(candidates::create_repartition)))
                .merge(guarded(&state, Policy::Admin, put(candidates::update_repartition))),
        )
        .nest("/api/repartitions", repartition_routes)
        .nest("/api/files", file_routes)
        .layer(axum::middleware::from_fn(request_id::request_id_middleware))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Wrap a method router so it only runs when `policy` is satisfied
fn guarded(state: &AppState, policy: Policy, route: MethodRouter<AppState>) -> MethodRouter<AppState> {
    let gate = PolicyGate {
        auth_manager: state.auth_manager.clone(),
        policy,
    };
    route.route_layer(axum::middleware::from_fn_with_state(gate, middleware::authorize))
}

/// Health check endpoint for monitoring and load balancers.
///
/// Returns `200 OK` when the credential store answers, `503` otherwise.
///
/// ```bash
/// curl http://localhost:8080/health
/// # {"status":"healthy","version":"1.0.0","database":true,"timestamp":"2026-10-16T10:30:00Z"}
/// ```
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let db_healthy = match state.auth_manager.health_check().await {
        Ok(()) => true,
        Err(e) => {
            tracing::error!(error = %e, "Health check failed");
            false
        }
    };

    let status_code = if db_healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let response = json!({
        "status": if db_healthy { "healthy" } else { "unhealthy" },
        "version": env!("CARGO_PKG_VERSION"),
        "database": db_healthy,
        "timestamp": chrono::Utc::now().to_rfc3339(),
    });

    (status_code, Json(response))
}
