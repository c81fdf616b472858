use super::*;

#[test]
fn form_errors_are_unprocessable() {
    for err in [
        LoginError::EmailRequired,
        LoginError::EmailInvalid,
        LoginError::PasswordRequired,
        LoginError::PasswordTooShort { min: 6 },
        LoginError::RoleRequired,
    ] {
        assert_eq!(login_error_to_status(&err), StatusCode::UNPROCESSABLE_ENTITY, "{err}");
    }
}

#[test]
fn credential_errors_map_to_auth_statuses() {
    assert_eq!(login_error_to_status(&LoginError::InvalidCredentials), StatusCode::UNAUTHORIZED);
    assert_eq!(login_error_to_status(&LoginError::RoleMismatch("admin")), StatusCode::FORBIDDEN);
}

#[test]
fn unreachable_backend_is_service_unavailable() {
    let err = LoginError::Backend(BackendError::Unreachable { detail: "timeout".into() });
    assert_eq!(login_error_to_status(&err), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(err.to_string(), crate::backend::UNREACHABLE_MESSAGE);
}

#[test]
fn field_errors_list_each_field() {
    let body = field_errors(&[LoginError::EmailInvalid, LoginError::RoleRequired]);
    assert_eq!(body["errors"][0]["field"], "email");
    assert_eq!(body["errors"][1]["field"], "role");
    assert_eq!(body["errors"][1]["message"], "Select a role to continue");
}

#[test]
fn session_cookie_is_http_only() {
    let cookie = session_cookie("abc".into(), true);
    assert_eq!(cookie.name(), COOKIE_NAME);
    assert_eq!(cookie.value(), "abc");
    assert_eq!(cookie.http_only(), Some(true));
    assert_eq!(cookie.secure(), Some(true));
    assert_eq!(cookie.path(), Some("/"));
}

#[test]
fn cleared_cookie_expires_immediately() {
    let cookie = cleared_session_cookie(false);
    assert_eq!(cookie.value(), "");
    assert_eq!(cookie.max_age(), Some(Duration::ZERO));
    assert_eq!(cookie.secure(), Some(false));
}
