//! Claim routes — list, create, detail, actions, and the derived views.

use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use axum::response::{IntoResponse, Json, Response};
use serde::Deserialize;
use uuid::Uuid;

use super::{ApiError, api_error, backend_status};
use crate::model::{Claim, ClaimStatus, LiquidationData, Role, TimelineEvent, TimelineEventKind, ValidationData};
use crate::routes::auth::AuthUser;
use crate::services::actions::ClaimAction;
use crate::services::claims::{self, ActionInput, ActionOutcome, ClaimDetail, ClaimError, NewClaim};
use crate::services::liquidation::{self, LiquidationView};
use crate::services::report::{self, REPORT_FILENAME, ReportError};
use crate::services::timeline;
use crate::services::validation::{self, ValidationView};
use crate::state::AppState;

pub(crate) fn claim_error_to_status(err: &ClaimError) -> StatusCode {
    match err {
        ClaimError::NotFound(_) => StatusCode::NOT_FOUND,
        ClaimError::Forbidden(_) | ClaimError::ActionForbidden { .. } => StatusCode::FORBIDDEN,
        ClaimError::InvalidTransition { .. } | ClaimError::Conflict { .. } => StatusCode::CONFLICT,
        ClaimError::InvalidAmount(_) | ClaimError::MissingReason | ClaimError::Invalid(_) => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        ClaimError::Backend(e) => backend_status(e),
    }
}

pub(crate) fn claim_error(err: ClaimError) -> ApiError {
    api_error(claim_error_to_status(&err), err)
}

pub(crate) fn report_error_to_status(err: &ReportError) -> StatusCode {
    match err {
        ReportError::NotApproved(_) => StatusCode::CONFLICT,
        ReportError::RendererUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        ReportError::Render(e) if e.is_unreachable() => StatusCode::SERVICE_UNAVAILABLE,
        ReportError::Render(_) => StatusCode::BAD_GATEWAY,
    }
}

/// Liquidation and validation aggregates are written by staff-side services.
pub(crate) fn require_staff(role: Role) -> Result<(), ApiError> {
    if role.is_staff() {
        Ok(())
    } else {
        Err(api_error(StatusCode::FORBIDDEN, "only analysts and admins can do this"))
    }
}

/// Calculation payloads that cannot be summarized or reported are refused
/// before they reach storage.
pub(crate) fn check_liquidation(data: &LiquidationData) -> Result<(), ApiError> {
    liquidation::validate(data).map_err(|e| api_error(StatusCode::UNPROCESSABLE_ENTITY, e))
}

/// Action bodies are optional; an empty body means no extra input.
pub(crate) fn parse_action_input(body: &[u8]) -> Result<ActionInput, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(ActionInput::default());
    }
    serde_json::from_slice(body).map_err(|e| api_error(StatusCode::BAD_REQUEST, format!("invalid action body: {e}")))
}

#[derive(Debug, Deserialize)]
pub struct ClaimsQuery {
    pub status: Option<String>,
}

// =============================================================================
// CLAIMS
// =============================================================================

/// `GET /api/claims?status=` — claims visible to the caller.
pub async fn list_claims(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<ClaimsQuery>,
) -> Result<Json<Vec<Claim>>, ApiError> {
    let status = match query.status.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        Some(raw) => Some(
            ClaimStatus::parse(raw)
                .ok_or_else(|| api_error(StatusCode::BAD_REQUEST, format!("unknown claim status: {raw}")))?,
        ),
        None => None,
    };
    let rows = claims::list(&state.pool, auth.user.viewer(), status)
        .await
        .map_err(claim_error)?;
    Ok(Json(rows))
}

/// `POST /api/claims` — open a draft claim.
pub async fn create_claim(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<NewClaim>,
) -> Result<(StatusCode, Json<Claim>), ApiError> {
    let claim = claims::create(&state.pool, auth.user.viewer(), body)
        .await
        .map_err(claim_error)?;
    Ok((StatusCode::CREATED, Json(claim)))
}

/// `GET /api/claims/:id` — full aggregate with the caller's available actions.
pub async fn get_claim(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(claim_id): Path<Uuid>,
) -> Result<Json<ClaimDetail>, ApiError> {
    let detail = claims::load(&state.pool, state.documents.as_ref(), auth.user.viewer(), claim_id)
        .await
        .map_err(claim_error)?;
    Ok(Json(detail))
}

/// `POST /api/claims/:id/actions/:action` — run a role-based action.
pub async fn claim_action(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((claim_id, action)): Path<(Uuid, String)>,
    body: Bytes,
) -> Result<Json<ActionOutcome>, ApiError> {
    let action = ClaimAction::parse(&action)
        .ok_or_else(|| api_error(StatusCode::BAD_REQUEST, format!("unknown action: {action}")))?;
    let input = parse_action_input(&body)?;
    let outcome = claims::apply_action(&state.pool, auth.user.viewer(), claim_id, action, &input)
        .await
        .map_err(claim_error)?;
    Ok(Json(outcome))
}

/// `GET /api/claims/:id/timeline`
pub async fn timeline(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(claim_id): Path<Uuid>,
) -> Result<Json<Vec<TimelineEvent>>, ApiError> {
    claims::authorize(&state.pool, auth.user.viewer(), claim_id)
        .await
        .map_err(claim_error)?;
    let events = timeline::list(&state.pool, claim_id)
        .await
        .map_err(|e| api_error(backend_status(&e), e))?;
    Ok(Json(events))
}

// =============================================================================
// LIQUIDATION + VALIDATION
// =============================================================================

/// `GET /api/claims/:id/liquidation` — stored pre-liquidation with display totals.
pub async fn get_liquidation(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(claim_id): Path<Uuid>,
) -> Result<Json<LiquidationView>, ApiError> {
    claims::authorize(&state.pool, auth.user.viewer(), claim_id)
        .await
        .map_err(claim_error)?;
    let data = liquidation::load(&state.pool, claim_id)
        .await
        .map_err(|e| api_error(backend_status(&e), e))?
        .ok_or_else(|| api_error(StatusCode::NOT_FOUND, "no liquidation has been calculated for this claim"))?;
    Ok(Json(LiquidationView::new(data)))
}

/// `PUT /api/claims/:id/liquidation` — store the calculation service's output.
pub async fn put_liquidation(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(claim_id): Path<Uuid>,
    Json(data): Json<LiquidationData>,
) -> Result<Json<LiquidationView>, ApiError> {
    require_staff(auth.user.role)?;
    check_liquidation(&data)?;
    claims::authorize(&state.pool, auth.user.viewer(), claim_id)
        .await
        .map_err(claim_error)?;
    liquidation::store(&state.pool, claim_id, &data)
        .await
        .map_err(|e| api_error(backend_status(&e), e))?;
    Ok(Json(LiquidationView::new(data)))
}

/// `GET /api/claims/:id/validation` — stored AI checks with overall status.
pub async fn get_validation(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(claim_id): Path<Uuid>,
) -> Result<Json<ValidationView>, ApiError> {
    claims::authorize(&state.pool, auth.user.viewer(), claim_id)
        .await
        .map_err(claim_error)?;
    let data = validation::load(&state.pool, claim_id)
        .await
        .map_err(|e| api_error(backend_status(&e), e))?
        .ok_or_else(|| api_error(StatusCode::NOT_FOUND, "no validation results for this claim"))?;
    Ok(Json(ValidationView::new(data)))
}

/// `PUT /api/claims/:id/validation` — store the validator's checks.
pub async fn put_validation(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(claim_id): Path<Uuid>,
    Json(data): Json<ValidationData>,
) -> Result<Json<ValidationView>, ApiError> {
    require_staff(auth.user.role)?;
    claims::authorize(&state.pool, auth.user.viewer(), claim_id)
        .await
        .map_err(claim_error)?;
    validation::store(&state.pool, claim_id, &data)
        .await
        .map_err(|e| api_error(backend_status(&e), e))?;
    timeline::record_best_effort(
        &state.pool,
        timeline::NewTimelineEvent::new(claim_id, TimelineEventKind::ValidationCompleted)
            .by(auth.user.id)
            .detail("checks", data.checks.len()),
    )
    .await;
    Ok(Json(ValidationView::new(data)))
}

// =============================================================================
// REPORT
// =============================================================================

/// `GET /api/claims/:id/report.pdf` — reimbursement PDF for an approved claim.
pub async fn report_pdf(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(claim_id): Path<Uuid>,
) -> Result<Response, ApiError> {
    let claim = claims::authorize(&state.pool, auth.user.viewer(), claim_id)
        .await
        .map_err(claim_error)?;
    let liquidation = liquidation::load(&state.pool, claim_id)
        .await
        .map_err(|e| api_error(backend_status(&e), e))?;

    let pdf = report::generate(
        state.renderer.as_deref(),
        &claim,
        liquidation.as_ref(),
        state.config.report_logo_url.as_deref(),
    )
    .await
    .map_err(|e| api_error(report_error_to_status(&e), e))?;

    Ok((
        [
            (CONTENT_TYPE, "application/pdf".to_string()),
            (CONTENT_DISPOSITION, format!("attachment; filename=\"{REPORT_FILENAME}\"")),
        ],
        pdf,
    )
        .into_response())
}

#[cfg(test)]
#[path = "claims_test.rs"]
mod tests;
