use super::*;

#[test]
fn unreachable_displays_user_facing_message() {
    let err = BackendError::Unreachable { detail: "connection refused".into() };
    assert_eq!(err.to_string(), UNREACHABLE_MESSAGE);
    assert!(err.is_unreachable());
}

#[test]
fn other_keeps_backend_message() {
    let err = BackendError::Other("duplicate key value violates unique constraint".into());
    assert_eq!(err.to_string(), "duplicate key value violates unique constraint");
    assert!(!err.is_unreachable());
}

#[test]
fn sqlx_pool_timeout_is_unreachable() {
    let err = BackendError::from(sqlx::Error::PoolTimedOut);
    assert!(err.is_unreachable());
}

#[test]
fn sqlx_pool_closed_is_unreachable() {
    let err = BackendError::from(sqlx::Error::PoolClosed);
    assert!(err.is_unreachable());
}

#[test]
fn sqlx_io_error_is_unreachable() {
    let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
    let err = BackendError::from(sqlx::Error::Io(io));
    assert!(err.is_unreachable());
}

#[test]
fn sqlx_row_not_found_maps_to_not_found() {
    let err = BackendError::from(sqlx::Error::RowNotFound);
    assert!(matches!(err, BackendError::NotFound(_)));
}

#[test]
fn sqlx_protocol_error_keeps_message() {
    let err = BackendError::from(sqlx::Error::Protocol("bad frame".into()));
    assert!(matches!(err, BackendError::Other(ref msg) if msg.contains("bad frame")));
}

#[tokio::test]
async fn reqwest_connect_failure_is_unreachable() {
    // Port 9 on localhost (discard) is closed in test environments.
    let err = reqwest::Client::new()
        .get("http://127.0.0.1:9/")
        .send()
        .await
        .expect_err("request to closed port should fail");
    assert!(BackendError::from(err).is_unreachable());
}
