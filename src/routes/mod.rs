//! Router assembly.
//!
//! SYSTEM CONTEXT
//! ==============
//! Binds the JSON API the dashboard clients call. Every route except login and
//! `/healthz` requires a session cookie (`AuthUser`).
//! Errors leave as `{"error": "<message>"}` with a status picked by the
//! per-module `*_error_to_status` helpers.

pub mod auth;
pub mod claims;
pub mod comments;
pub mod dashboard;
pub mod documents;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::http::StatusCode;
use axum::response::Json;
use axum::routing::{delete, get, post, put};
use serde_json::json;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::backend::BackendError;
use crate::state::AppState;

/// Multipart overhead allowed on top of the per-file cap.
const UPLOAD_BODY_SLACK: u64 = 64 * 1024;
/// Files accepted in one upload request.
pub(crate) const MAX_FILES_PER_UPLOAD: u64 = 10;

/// Error response body shared by every handler.
pub(crate) type ApiError = (StatusCode, Json<serde_json::Value>);

pub(crate) fn api_error(status: StatusCode, message: impl std::fmt::Display) -> ApiError {
    let message = message.to_string();
    if status.is_server_error() {
        tracing::error!(status = status.as_u16(), error = %message, "request failed");
    }
    (status, Json(json!({ "error": message })))
}

/// Status for a failure that reached a backend.
pub(crate) fn backend_status(err: &BackendError) -> StatusCode {
    match err {
        BackendError::Unreachable { .. } => StatusCode::SERVICE_UNAVAILABLE,
        BackendError::NotFound(_) => StatusCode::NOT_FOUND,
        BackendError::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

pub(crate) fn upload_body_limit(max_upload_bytes: u64) -> usize {
    let limit = max_upload_bytes
        .saturating_mul(MAX_FILES_PER_UPLOAD)
        .saturating_add(UPLOAD_BODY_SLACK);
    usize::try_from(limit).unwrap_or(usize::MAX)
}

/// Full application router.
pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);
    let body_limit = upload_body_limit(state.config.max_upload_bytes);

    Router::new()
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/logout", post(auth::logout))
        .route("/api/auth/me", get(auth::me))
        .route("/dashboard", get(dashboard::dashboard_redirect))
        .route("/api/navigation", get(dashboard::navigation))
        .route("/api/claims", get(claims::list_claims).post(claims::create_claim))
        .route("/api/claims/{id}", get(claims::get_claim))
        .route("/api/claims/{id}/actions/{action}", post(claims::claim_action))
        .route("/api/claims/{id}/timeline", get(claims::timeline))
        .route(
            "/api/claims/{id}/liquidation",
            get(claims::get_liquidation).put(claims::put_liquidation),
        )
        .route(
            "/api/claims/{id}/validation",
            get(claims::get_validation).put(claims::put_validation),
        )
        .route("/api/claims/{id}/report.pdf", get(claims::report_pdf))
        .route(
            "/api/claims/{id}/documents",
            get(documents::list_documents)
                .post(documents::upload_documents)
                .layer(DefaultBodyLimit::max(body_limit)),
        )
        .route("/api/upload-rules", get(documents::upload_rules))
        .route("/api/documents/{id}", delete(documents::delete_document))
        .route("/api/documents/{id}/url", get(documents::signed_url))
        .route("/api/documents/{id}/download", get(documents::download))
        .route("/api/documents/{id}/validate", post(documents::request_validation))
        .route("/api/documents/{id}/validation", put(documents::record_validation))
        .route(
            "/api/claims/{id}/comments",
            get(comments::list_comments).post(comments::add_comment),
        )
        .route("/healthz", get(healthz))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
