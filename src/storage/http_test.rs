use super::*;

fn store() -> HttpObjectStore {
    let config = StorageConfig {
        base_url: "https://project.example.co/storage/v1".into(),
        service_key: "key".into(),
        bucket: "claim-documents".into(),
    };
    HttpObjectStore::new(&config, HttpTimeouts { request_secs: 5, connect_secs: 1 }).unwrap()
}

#[test]
fn object_url_joins_bucket_and_path() {
    let s = store();
    assert_eq!(
        s.object_url("abc/invoice/1-x.pdf"),
        "https://project.example.co/storage/v1/object/claim-documents/abc/invoice/1-x.pdf"
    );
    assert_eq!(
        s.object_url("/abc/invoice/1-x.pdf"),
        "https://project.example.co/storage/v1/object/claim-documents/abc/invoice/1-x.pdf"
    );
    assert_eq!(s.bucket(), "claim-documents");
}

#[test]
fn error_message_prefers_message_field() {
    let msg = error_message(StatusCode::BAD_REQUEST, r#"{"statusCode":"409","error":"Duplicate","message":"The resource already exists"}"#);
    assert_eq!(msg, "The resource already exists");
}

#[test]
fn error_message_falls_back_to_error_field() {
    let msg = error_message(StatusCode::FORBIDDEN, r#"{"error":"Unauthorized"}"#);
    assert_eq!(msg, "Unauthorized");
}

#[test]
fn error_message_uses_raw_body_when_not_json() {
    let msg = error_message(StatusCode::BAD_GATEWAY, "upstream exploded\n");
    assert_eq!(msg, "upstream exploded");
}

#[test]
fn error_message_empty_body_mentions_status() {
    let msg = error_message(StatusCode::INTERNAL_SERVER_ERROR, "");
    assert!(msg.contains("500"));
}

#[test]
fn signed_url_relative_path_is_made_absolute() {
    let url = parse_signed_url(
        "https://project.example.co/storage/v1",
        r#"{"signedURL":"/object/sign/claim-documents/a/b.pdf?token=t"}"#,
    )
    .unwrap();
    assert_eq!(url, "https://project.example.co/storage/v1/object/sign/claim-documents/a/b.pdf?token=t");
}

#[test]
fn signed_url_absolute_is_kept() {
    let url = parse_signed_url("https://x", r#"{"signedUrl":"https://cdn.example/a.pdf?token=t"}"#).unwrap();
    assert_eq!(url, "https://cdn.example/a.pdf?token=t");
}

#[test]
fn signed_url_garbage_errors() {
    assert!(parse_signed_url("https://x", "{}").is_err());
}
