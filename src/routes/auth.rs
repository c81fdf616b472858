//! Auth routes — login form, session cookie, current user.

use axum::extract::{FromRef, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde_json::json;
use time::Duration;

use super::{api_error, backend_status};
use crate::backend::BackendError;
use crate::services::auth::{self as auth_svc, LoginError, LoginForm};
use crate::services::session::{self, SessionUser};
use crate::state::AppState;

pub(crate) const COOKIE_NAME: &str = "session_token";

pub(crate) fn session_cookie(token: String, secure: bool) -> Cookie<'static> {
    Cookie::build((COOKIE_NAME, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .build()
}

pub(crate) fn cleared_session_cookie(secure: bool) -> Cookie<'static> {
    Cookie::build((COOKIE_NAME, ""))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .max_age(Duration::ZERO)
        .build()
}

pub(crate) fn login_error_to_status(err: &LoginError) -> StatusCode {
    match err {
        LoginError::EmailRequired
        | LoginError::EmailInvalid
        | LoginError::PasswordRequired
        | LoginError::PasswordTooShort { .. }
        | LoginError::RoleRequired => StatusCode::UNPROCESSABLE_ENTITY,
        LoginError::InvalidCredentials => StatusCode::UNAUTHORIZED,
        LoginError::RoleMismatch(_) => StatusCode::FORBIDDEN,
        LoginError::Backend(e) => backend_status(e),
    }
}

fn field_errors(errors: &[LoginError]) -> serde_json::Value {
    let list: Vec<serde_json::Value> = errors
        .iter()
        .map(|e| json!({ "field": e.field(), "message": e.to_string() }))
        .collect();
    json!({ "error": "Please correct the highlighted fields", "errors": list })
}

// =============================================================================
// AUTH EXTRACTOR
// =============================================================================

/// Authenticated user extracted from the session cookie.
/// Use as a handler parameter to require authentication.
pub struct AuthUser {
    pub user: SessionUser,
    pub token: String,
}

impl<S> axum::extract::FromRequestParts<S> for AuthUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut axum::http::request::Parts, state: &S) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);
        let token = jar.get(COOKIE_NAME).map(Cookie::value).unwrap_or_default();
        if token.is_empty() {
            return Err(StatusCode::UNAUTHORIZED);
        }

        let app_state = AppState::from_ref(state);
        let user = session::validate_session(&app_state.pool, token)
            .await
            .map_err(|e| backend_status(&BackendError::from(e)))?
            .ok_or(StatusCode::UNAUTHORIZED)?;

        Ok(Self { user, token: token.to_owned() })
    }
}

// =============================================================================
// HANDLERS
// =============================================================================

/// `POST /api/auth/login` — validate the form, check credentials, set cookie.
///
/// Responds with the user and the role's landing route.
pub async fn login(State(state): State<AppState>, Json(form): Json<LoginForm>) -> Response {
    let credentials = match auth_svc::validate_form(&form) {
        Ok(c) => c,
        Err(errors) => return (StatusCode::UNPROCESSABLE_ENTITY, Json(field_errors(&errors))).into_response(),
    };

    let user = match auth_svc::authenticate(&state.pool, &credentials).await {
        Ok(u) => u,
        Err(e) => {
            let status = login_error_to_status(&e);
            return api_error(status, e).into_response();
        }
    };

    let token = match session::create_session(&state.pool, user.id).await {
        Ok(t) => t,
        Err(e) => {
            let err = BackendError::from(e);
            return api_error(backend_status(&err), err).into_response();
        }
    };

    let jar = CookieJar::new().add(session_cookie(token, state.config.cookie_secure));
    let redirect = user.role.landing_route();
    (jar, Json(json!({ "user": user, "redirect": redirect }))).into_response()
}

/// `GET /api/auth/me` — return current user.
pub async fn me(auth: AuthUser) -> Json<SessionUser> {
    Json(auth.user)
}

/// `POST /api/auth/logout` — delete session, clear cookie.
pub async fn logout(State(state): State<AppState>, auth: AuthUser) -> impl IntoResponse {
    if let Err(e) = session::delete_session(&state.pool, &auth.token).await {
        tracing::warn!(user_id = %auth.user.id, error = %e, "session delete failed");
    }

    let jar = CookieJar::new().add(cleared_session_cookie(state.config.cookie_secure));
    (jar, StatusCode::NO_CONTENT)
}

#[cfg(test)]
#[path = "auth_test.rs"]
mod tests;
