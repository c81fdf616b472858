use std::collections::HashSet;

use super::*;
use crate::backend::UNREACHABLE_MESSAGE;
use crate::state::test_helpers::{MemoryDocumentRepo, MemoryObjectStore, dummy_document};

const PDF: &str = "application/pdf";
const DOCX: &str = "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

fn upload_req(claim_id: Uuid, name: &str, mime: &str, bytes: &[u8]) -> UploadRequest {
    UploadRequest {
        claim_id,
        category: DocumentCategory::Invoice,
        file_name: name.into(),
        mime_type: mime.into(),
        bytes: bytes.to_vec(),
        uploaded_by: None,
    }
}

// =============================================================================
// validate_file
// =============================================================================

#[test]
fn validate_accepts_every_allowed_type() {
    for mime in ALLOWED_MIME_TYPES {
        assert!(validate_file("f", mime, 1, MAX_FILE_BYTES).is_ok(), "{mime} should be accepted");
    }
}

#[test]
fn validate_mime_check_is_case_insensitive() {
    assert!(validate_file("scan.PNG", "Image/PNG", 10, MAX_FILE_BYTES).is_ok());
}

#[test]
fn validate_rejects_types_outside_allow_list() {
    for mime in ["image/gif", "text/plain", "application/zip", "application/x-msdownload", ""] {
        let err = validate_file("f", mime, 1, MAX_FILE_BYTES).unwrap_err();
        assert!(matches!(err, FileRejection::UnsupportedType { .. }), "{mime} should be rejected");
    }
}

#[test]
fn validate_accepts_exactly_the_cap() {
    assert!(validate_file("big.pdf", PDF, MAX_FILE_BYTES, MAX_FILE_BYTES).is_ok());
}

#[test]
fn validate_rejects_one_byte_over_the_cap() {
    let err = validate_file("big.pdf", PDF, MAX_FILE_BYTES + 1, MAX_FILE_BYTES).unwrap_err();
    assert_eq!(err, FileRejection::TooLarge { name: "big.pdf".into(), size: MAX_FILE_BYTES + 1, limit: MAX_FILE_BYTES });
}

#[test]
fn too_large_message_uses_readable_sizes() {
    let err = validate_file("scan.pdf", PDF, 15 * 1024 * 1024, MAX_FILE_BYTES).unwrap_err();
    assert_eq!(err.to_string(), "scan.pdf: file is 15 MB, larger than the 10 MB limit");
}

#[test]
fn validate_rejects_empty_files() {
    let err = validate_file("empty.pdf", PDF, 0, MAX_FILE_BYTES).unwrap_err();
    assert!(matches!(err, FileRejection::Empty { .. }));
}

#[test]
fn validate_checks_type_before_size() {
    let err = validate_file("huge.gif", "image/gif", MAX_FILE_BYTES * 2, MAX_FILE_BYTES).unwrap_err();
    assert!(matches!(err, FileRejection::UnsupportedType { .. }));
}

#[test]
fn accepted_extensions_match_file_input() {
    assert_eq!(ACCEPTED_EXTENSIONS, ".pdf,.jpg,.jpeg,.png,.doc,.docx");
}

// =============================================================================
// storage_path
// =============================================================================

#[test]
fn storage_path_layout() {
    let claim_id = Uuid::nil();
    let path = storage_path_at(claim_id, DocumentCategory::MedicalReport, "Informe.PDF", PDF, 1_700_000_000_123, "abc123xyz0");
    assert_eq!(path, "00000000-0000-0000-0000-000000000000/medical_report/1700000000123-abc123xyz0.pdf");
}

#[test]
fn storage_path_is_rooted_at_claim_and_category() {
    let claim_id = Uuid::new_v4();
    let path = storage_path(claim_id, DocumentCategory::Receipt, "ticket.jpg", "image/jpeg");
    let mut parts = path.splitn(3, '/');
    assert_eq!(parts.next(), Some(claim_id.to_string().as_str()));
    assert_eq!(parts.next(), Some("receipt"));
    let file = parts.next().unwrap();
    let (stem, ext) = file.rsplit_once('.').unwrap();
    assert_eq!(ext, "jpg");
    let (millis, suffix) = stem.split_once('-').unwrap();
    assert!(millis.parse::<i128>().is_ok());
    assert_eq!(suffix.len(), SUFFIX_LEN);
    assert!(suffix.bytes().all(|b| SUFFIX_ALPHABET.contains(&b)));
}

#[test]
fn identical_names_never_collide() {
    let claim_id = Uuid::new_v4();
    let paths: HashSet<String> = (0..1000)
        .map(|_| storage_path(claim_id, DocumentCategory::Invoice, "factura.pdf", PDF))
        .collect();
    assert_eq!(paths.len(), 1000);
}

#[test]
fn extension_falls_back_to_mime() {
    assert_eq!(extension_for("scan", "image/png"), "png");
    assert_eq!(extension_for("report.", DOCX), "docx");
    assert_eq!(extension_for("weird.p$f", PDF), "pdf");
    assert_eq!(extension_for("noext", "application/octet-stream"), "bin");
}

// =============================================================================
// upload_document
// =============================================================================

#[tokio::test]
async fn upload_stores_object_and_metadata() {
    let store = MemoryObjectStore::default();
    let repo = MemoryDocumentRepo::default();
    let claim_id = Uuid::new_v4();

    let doc = upload_document(&store, &repo, upload_req(claim_id, "factura.pdf", PDF, b"%PDF-1.7"), MAX_FILE_BYTES)
        .await
        .unwrap();

    assert_eq!(doc.claim_id, claim_id);
    assert_eq!(doc.status, DocumentStatus::Pending);
    assert_eq!(doc.size, 8);
    assert!(doc.storage_path.starts_with(&format!("{claim_id}/invoice/")));
    assert_eq!(store.paths(), vec![doc.storage_path.clone()]);
    assert_eq!(repo.len(), 1);
}

#[tokio::test]
async fn upload_rejected_file_touches_nothing() {
    let store = MemoryObjectStore::default();
    let repo = MemoryDocumentRepo::default();

    let err = upload_document(&store, &repo, upload_req(Uuid::new_v4(), "a.gif", "image/gif", b"GIF89a"), MAX_FILE_BYTES)
        .await
        .unwrap_err();

    assert!(matches!(err, DocumentError::Rejected(FileRejection::UnsupportedType { .. })));
    assert!(store.paths().is_empty());
    assert_eq!(repo.len(), 0);
}

#[tokio::test]
async fn upload_metadata_failure_removes_orphaned_object() {
    let store = MemoryObjectStore::default();
    let repo = MemoryDocumentRepo::default();
    *repo.fail_insert.lock().unwrap() = Some(BackendError::Other("insert failed".into()));

    let err = upload_document(&store, &repo, upload_req(Uuid::new_v4(), "f.pdf", PDF, b"x"), MAX_FILE_BYTES)
        .await
        .unwrap_err();

    assert!(matches!(err, DocumentError::Metadata(_)));
    assert!(store.paths().is_empty(), "compensating delete should remove the object");
    assert_eq!(store.removed.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn upload_cleanup_failure_still_reports_metadata_error() {
    let store = MemoryObjectStore::default();
    let repo = MemoryDocumentRepo::default();
    *repo.fail_insert.lock().unwrap() = Some(BackendError::Other("insert failed".into()));
    *store.fail_remove.lock().unwrap() = Some(BackendError::Other("remove failed".into()));

    let err = upload_document(&store, &repo, upload_req(Uuid::new_v4(), "f.pdf", PDF, b"x"), MAX_FILE_BYTES)
        .await
        .unwrap_err();

    assert!(matches!(err, DocumentError::Metadata(BackendError::Other(ref m)) if m == "insert failed"));
    assert_eq!(store.paths().len(), 1, "object stays orphaned when cleanup fails");
}

#[tokio::test]
async fn upload_unreachable_storage_surfaces_cannot_connect() {
    let store = MemoryObjectStore::default();
    let repo = MemoryDocumentRepo::default();
    *store.fail_upload.lock().unwrap() = Some(BackendError::Unreachable { detail: "refused".into() });

    let err = upload_document(&store, &repo, upload_req(Uuid::new_v4(), "f.pdf", PDF, b"x"), MAX_FILE_BYTES)
        .await
        .unwrap_err();

    assert!(err.is_unreachable());
    assert!(err.to_string().contains(UNREACHABLE_MESSAGE));
    assert_eq!(repo.len(), 0);
}

#[tokio::test]
async fn upload_many_processes_files_independently() {
    let store = MemoryObjectStore::default();
    let repo = MemoryDocumentRepo::default();
    let claim_id = Uuid::new_v4();

    let outcomes = upload_documents(
        &store,
        &repo,
        vec![
            upload_req(claim_id, "ok.pdf", PDF, b"a"),
            upload_req(claim_id, "bad.exe", "application/x-msdownload", b"b"),
            upload_req(claim_id, "ok.png", "image/png", b"c"),
        ],
        MAX_FILE_BYTES,
    )
    .await;

    assert_eq!(outcomes.len(), 3);
    assert!(outcomes[0].1.is_ok());
    assert!(outcomes[1].1.is_err());
    assert_eq!(outcomes[1].0, "bad.exe");
    assert!(outcomes[2].1.is_ok());
    assert_eq!(repo.len(), 2);
}

// =============================================================================
// delete_document
// =============================================================================

#[tokio::test]
async fn delete_removes_object_then_row() {
    let store = MemoryObjectStore::default();
    let repo = MemoryDocumentRepo::default();
    let doc = dummy_document(Uuid::new_v4(), "c/invoice/1-a.pdf");
    store.insert(&doc.storage_path, b"x");
    repo.seed(doc.clone());

    let deleted = delete_document(&store, &repo, doc.id).await.unwrap();

    assert_eq!(deleted.id, doc.id);
    assert!(store.paths().is_empty());
    assert_eq!(repo.len(), 0);
}

#[tokio::test]
async fn delete_unknown_document_is_not_found() {
    let store = MemoryObjectStore::default();
    let repo = MemoryDocumentRepo::default();
    let id = Uuid::new_v4();
    let err = delete_document(&store, &repo, id).await.unwrap_err();
    assert!(matches!(err, DocumentError::NotFound(got) if got == id));
}

#[tokio::test]
async fn delete_storage_failure_keeps_row() {
    let store = MemoryObjectStore::default();
    let repo = MemoryDocumentRepo::default();
    let doc = dummy_document(Uuid::new_v4(), "c/invoice/1-a.pdf");
    store.insert(&doc.storage_path, b"x");
    repo.seed(doc.clone());
    *store.fail_remove.lock().unwrap() = Some(BackendError::Other("permission denied".into()));

    let err = delete_document(&store, &repo, doc.id).await.unwrap_err();

    assert!(matches!(err, DocumentError::StorageDelete(_)));
    assert_eq!(repo.len(), 1);
}

#[tokio::test]
async fn delete_metadata_failure_names_metadata_stage() {
    let store = MemoryObjectStore::default();
    let repo = MemoryDocumentRepo::default();
    let doc = dummy_document(Uuid::new_v4(), "c/invoice/1-a.pdf");
    store.insert(&doc.storage_path, b"x");
    repo.seed(doc.clone());
    *repo.fail_delete.lock().unwrap() = Some(BackendError::Other("row locked".into()));

    let err = delete_document(&store, &repo, doc.id).await.unwrap_err();

    assert!(matches!(err, DocumentError::MetadataDelete(_)));
    let msg = err.to_string();
    assert!(msg.contains("metadata"), "message should name the metadata stage: {msg}");
    assert!(msg.contains("row locked"));
    assert!(store.paths().is_empty(), "storage deletion is not rolled back");
}

#[tokio::test]
async fn delete_proceeds_when_object_already_missing() {
    let store = MemoryObjectStore::default();
    let repo = MemoryDocumentRepo::default();
    let doc = dummy_document(Uuid::new_v4(), "c/invoice/gone.pdf");
    repo.seed(doc.clone());

    delete_document(&store, &repo, doc.id).await.unwrap();
    assert_eq!(repo.len(), 0);
}

// =============================================================================
// signed URLs + validation status
// =============================================================================

#[tokio::test]
async fn signed_url_is_attached() {
    let store = MemoryObjectStore::default();
    let doc = dummy_document(Uuid::new_v4(), "c/invoice/1-a.pdf");
    let doc = with_signed_url(&store, doc, 120).await.unwrap();
    assert_eq!(doc.url.as_deref(), Some("http://storage.test/sign/c/invoice/1-a.pdf?expires=120"));
}

#[tokio::test]
async fn request_validation_marks_processing() {
    let repo = MemoryDocumentRepo::default();
    let doc = dummy_document(Uuid::new_v4(), "p");
    repo.seed(doc.clone());

    let updated = request_validation(&repo, doc.id).await.unwrap();
    assert_eq!(updated.status, DocumentStatus::Processing);
}

#[tokio::test]
async fn record_validation_result_stores_verdict() {
    let repo = MemoryDocumentRepo::default();
    let doc = dummy_document(Uuid::new_v4(), "p");
    repo.seed(doc.clone());
    let ai = AiValidation { extracted_data: Default::default(), confidence: 93.0, issues: vec![] };

    let updated = record_validation_result(&repo, doc.id, DocumentStatus::Validated, &ai).await.unwrap();
    assert_eq!(updated.status, DocumentStatus::Validated);
    assert_eq!(updated.ai_validation, Some(ai));
}

#[tokio::test]
async fn record_validation_result_rejects_non_terminal_status() {
    let repo = MemoryDocumentRepo::default();
    let doc = dummy_document(Uuid::new_v4(), "p");
    repo.seed(doc.clone());
    let ai = AiValidation { extracted_data: Default::default(), confidence: 50.0, issues: vec![] };

    let err = record_validation_result(&repo, doc.id, DocumentStatus::Pending, &ai).await.unwrap_err();
    assert!(matches!(err, DocumentError::InvalidResultStatus("pending")));
}
