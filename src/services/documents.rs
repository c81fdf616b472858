//! Document service — upload, delete, signed access, and validation status.
//!
//! DESIGN
//! ======
//! A document lives in two places: the object in the storage bucket and its
//! metadata row in `claim_documents`. Both are reached through trait seams
//! (`ObjectStore`, `DocumentRepo`) so the two-store choreography can be
//! exercised without live backends.
//!
//! ERROR HANDLING
//! ==============
//! The two stores are not transactional. Upload writes the object first and
//! removes it again if the metadata insert fails; that cleanup is best effort
//! and an orphan is logged with its path when it fails too. Delete removes
//! the object first and the row second; a failure at the second step is
//! reported as a metadata-stage error and the object is not restored.

use std::path::Path;

use rand::Rng;
use sqlx::{PgPool, Row};
use time::OffsetDateTime;
use tracing::{info, warn};
use uuid::Uuid;

use crate::backend::BackendError;
use crate::format::format_file_size;
use crate::model::{AiValidation, Document, DocumentCategory, DocumentStatus};
use crate::storage::ObjectStore;

/// Per-file upload cap.
pub const MAX_FILE_BYTES: u64 = 10 * 1024 * 1024;

/// MIME types accepted for upload.
pub const ALLOWED_MIME_TYPES: [&str; 5] = [
    "application/pdf",
    "image/jpeg",
    "image/png",
    "application/msword",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
];

/// `accept` attribute for file pickers.
pub const ACCEPTED_EXTENSIONS: &str = ".pdf,.jpg,.jpeg,.png,.doc,.docx";

const SUFFIX_LEN: usize = 10;
const SUFFIX_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

// =============================================================================
// ERRORS
// =============================================================================

/// Why a file was refused before anything was uploaded.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FileRejection {
    #[error("{name}: file type {mime} is not allowed (accepted: PDF, JPG, PNG, DOC, DOCX)")]
    UnsupportedType { name: String, mime: String },
    #[error("{name}: file is {}, larger than the {} limit", size_label(.size), size_label(.limit))]
    TooLarge { name: String, size: u64, limit: u64 },
    #[error("{name}: file is empty")]
    Empty { name: String },
}

#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    #[error(transparent)]
    Rejected(#[from] FileRejection),
    #[error("document not found: {0}")]
    NotFound(Uuid),
    #[error("document upload failed: {0}")]
    Upload(BackendError),
    #[error("document uploaded but its metadata could not be saved: {0}")]
    Metadata(BackendError),
    #[error("document file could not be removed from storage: {0}")]
    StorageDelete(BackendError),
    #[error("document file was removed but metadata deletion failed: {0}")]
    MetadataDelete(BackendError),
    #[error("validation result must be validated or error, got {0}")]
    InvalidResultStatus(&'static str),
    #[error("{0}")]
    Backend(#[from] BackendError),
}

fn size_label(bytes: &u64) -> String {
    format_file_size(*bytes)
}

impl DocumentError {
    /// True when the failure was the backend being unreachable, at any stage.
    #[must_use]
    pub fn is_unreachable(&self) -> bool {
        match self {
            Self::Upload(e)
            | Self::Metadata(e)
            | Self::StorageDelete(e)
            | Self::MetadataDelete(e)
            | Self::Backend(e) => e.is_unreachable(),
            _ => false,
        }
    }
}

// =============================================================================
// VALIDATION + PATHS
// =============================================================================

/// Check a file against the MIME allow-list and the size cap.
///
/// A file exactly at `max_bytes` is accepted.
///
/// # Errors
///
/// Returns the first rule the file breaks.
pub fn validate_file(name: &str, mime: &str, size: u64, max_bytes: u64) -> Result<(), FileRejection> {
    let mime_normalized = mime.trim().to_ascii_lowercase();
    if !ALLOWED_MIME_TYPES.contains(&mime_normalized.as_str()) {
        return Err(FileRejection::UnsupportedType { name: name.to_string(), mime: mime.to_string() });
    }
    if size == 0 {
        return Err(FileRejection::Empty { name: name.to_string() });
    }
    if size > max_bytes {
        return Err(FileRejection::TooLarge { name: name.to_string(), size, limit: max_bytes });
    }
    Ok(())
}

/// Build a fresh storage path: `<claimId>/<category>/<millis>-<random>.<ext>`.
#[must_use]
pub fn storage_path(claim_id: Uuid, category: DocumentCategory, file_name: &str, mime: &str) -> String {
    let millis = OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000;
    storage_path_at(claim_id, category, file_name, mime, millis, &random_suffix())
}

fn storage_path_at(
    claim_id: Uuid,
    category: DocumentCategory,
    file_name: &str,
    mime: &str,
    millis: i128,
    suffix: &str,
) -> String {
    let ext = extension_for(file_name, mime);
    format!("{claim_id}/{}/{millis}-{suffix}.{ext}", category.as_str())
}

fn random_suffix() -> String {
    let mut rng = rand::rng();
    (0..SUFFIX_LEN)
        .map(|_| {
            let idx = rng.random_range(0..SUFFIX_ALPHABET.len());
            SUFFIX_ALPHABET[idx] as char
        })
        .collect()
}

/// Extension from the file name when it is sane, otherwise from the MIME type.
fn extension_for(file_name: &str, mime: &str) -> String {
    let from_name = Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .filter(|e| !e.is_empty() && e.len() <= 5 && e.chars().all(|c| c.is_ascii_alphanumeric()));
    if let Some(ext) = from_name {
        return ext;
    }

    match mime.trim().to_ascii_lowercase().as_str() {
        "application/pdf" => "pdf",
        "image/jpeg" => "jpg",
        "image/png" => "png",
        "application/msword" => "doc",
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document" => "docx",
        _ => "bin",
    }
    .to_string()
}

// =============================================================================
// METADATA REPOSITORY
// =============================================================================

/// Metadata for a row about to be inserted.
#[derive(Debug, Clone)]
pub struct NewDocument {
    pub claim_id: Uuid,
    pub name: String,
    pub mime_type: String,
    pub size: i64,
    pub category: DocumentCategory,
    pub storage_path: String,
    pub uploaded_by: Option<Uuid>,
}

#[async_trait::async_trait]
pub trait DocumentRepo: Send + Sync {
    async fn insert(&self, doc: NewDocument) -> Result<Document, BackendError>;

    async fn get(&self, id: Uuid) -> Result<Option<Document>, BackendError>;

    /// Documents for a claim, newest first.
    async fn list_for_claim(&self, claim_id: Uuid) -> Result<Vec<Document>, BackendError>;

    async fn delete(&self, id: Uuid) -> Result<(), BackendError>;

    /// Update status; `ai_validation` of `None` keeps the stored result.
    async fn set_status(
        &self,
        id: Uuid,
        status: DocumentStatus,
        ai_validation: Option<&AiValidation>,
    ) -> Result<Document, BackendError>;
}

/// `claim_documents` table access.
pub struct PgDocumentRepo {
    pool: PgPool,
}

impl PgDocumentRepo {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const DOCUMENT_COLUMNS: &str =
    "id, claim_id, name, mime_type, size_bytes, category, status, storage_path, uploaded_by, ai_validation, uploaded_at";

fn document_from_row(row: &sqlx::postgres::PgRow) -> Document {
    let status: String = row.get("status");
    let category: String = row.get("category");
    let ai: Option<serde_json::Value> = row.get("ai_validation");
    Document {
        id: row.get("id"),
        claim_id: row.get("claim_id"),
        name: row.get("name"),
        mime_type: row.get("mime_type"),
        size: row.get("size_bytes"),
        upload_date: row.get("uploaded_at"),
        status: DocumentStatus::parse(&status).unwrap_or(DocumentStatus::Pending),
        category: DocumentCategory::parse_or_other(&category),
        storage_path: row.get("storage_path"),
        uploaded_by: row.get("uploaded_by"),
        url: None,
        ai_validation: ai.and_then(|v| serde_json::from_value(v).ok()),
    }
}

#[async_trait::async_trait]
impl DocumentRepo for PgDocumentRepo {
    async fn insert(&self, doc: NewDocument) -> Result<Document, BackendError> {
        let row = sqlx::query(&format!(
            "INSERT INTO claim_documents (id, claim_id, name, mime_type, size_bytes, category, status, storage_path, uploaded_by)
             VALUES ($1, $2, $3, $4, $5, $6, 'pending', $7, $8)
             RETURNING {DOCUMENT_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(doc.claim_id)
        .bind(&doc.name)
        .bind(&doc.mime_type)
        .bind(doc.size)
        .bind(doc.category.as_str())
        .bind(&doc.storage_path)
        .bind(doc.uploaded_by)
        .fetch_one(&self.pool)
        .await?;
        Ok(document_from_row(&row))
    }

    async fn get(&self, id: Uuid) -> Result<Option<Document>, BackendError> {
        let row = sqlx::query(&format!("SELECT {DOCUMENT_COLUMNS} FROM claim_documents WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(document_from_row))
    }

    async fn list_for_claim(&self, claim_id: Uuid) -> Result<Vec<Document>, BackendError> {
        let rows = sqlx::query(&format!(
            "SELECT {DOCUMENT_COLUMNS} FROM claim_documents WHERE claim_id = $1 ORDER BY uploaded_at DESC"
        ))
        .bind(claim_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(document_from_row).collect())
    }

    async fn delete(&self, id: Uuid) -> Result<(), BackendError> {
        let result = sqlx::query("DELETE FROM claim_documents WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(BackendError::NotFound(id.to_string()));
        }
        Ok(())
    }

    async fn set_status(
        &self,
        id: Uuid,
        status: DocumentStatus,
        ai_validation: Option<&AiValidation>,
    ) -> Result<Document, BackendError> {
        let ai_json = ai_validation
            .map(serde_json::to_value)
            .transpose()
            .map_err(|e| BackendError::Other(e.to_string()))?;
        let row = sqlx::query(&format!(
            "UPDATE claim_documents
             SET status = $2, ai_validation = COALESCE($3, ai_validation)
             WHERE id = $1
             RETURNING {DOCUMENT_COLUMNS}"
        ))
        .bind(id)
        .bind(status.as_str())
        .bind(ai_json)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| BackendError::NotFound(id.to_string()))?;
        Ok(document_from_row(&row))
    }
}

// =============================================================================
// OPERATIONS
// =============================================================================

/// One file to upload.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub claim_id: Uuid,
    pub category: DocumentCategory,
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
    pub uploaded_by: Option<Uuid>,
}

/// Validate, store the object, then record its metadata.
///
/// # Errors
///
/// Returns `Rejected` before any I/O for disallowed files, `Upload` if the
/// object write fails, and `Metadata` if the row insert fails (after the
/// object has been removed again on a best-effort basis).
pub async fn upload_document(
    store: &dyn ObjectStore,
    repo: &dyn DocumentRepo,
    req: UploadRequest,
    max_bytes: u64,
) -> Result<Document, DocumentError> {
    let size = req.bytes.len() as u64;
    validate_file(&req.file_name, &req.mime_type, size, max_bytes)?;

    let path = storage_path(req.claim_id, req.category, &req.file_name, &req.mime_type);
    store
        .upload(&path, req.bytes, &req.mime_type)
        .await
        .map_err(DocumentError::Upload)?;

    let new_doc = NewDocument {
        claim_id: req.claim_id,
        name: req.file_name,
        mime_type: req.mime_type,
        size: i64::try_from(size).unwrap_or(i64::MAX),
        category: req.category,
        storage_path: path.clone(),
        uploaded_by: req.uploaded_by,
    };

    match repo.insert(new_doc).await {
        Ok(doc) => {
            info!(claim_id = %doc.claim_id, document_id = %doc.id, %path, size, "document uploaded");
            Ok(doc)
        }
        Err(e) => {
            if let Err(cleanup) = store.remove(&path).await {
                warn!(%path, error = %cleanup, "orphaned document object left in storage");
            }
            Err(DocumentError::Metadata(e))
        }
    }
}

/// Upload several files independently; one rejection does not stop the rest.
pub async fn upload_documents(
    store: &dyn ObjectStore,
    repo: &dyn DocumentRepo,
    requests: Vec<UploadRequest>,
    max_bytes: u64,
) -> Vec<(String, Result<Document, DocumentError>)> {
    let mut outcomes = Vec::with_capacity(requests.len());
    for req in requests {
        let name = req.file_name.clone();
        let result = upload_document(store, repo, req, max_bytes).await;
        if let Err(e) = &result {
            warn!(file = %name, error = %e, "document upload rejected");
        }
        outcomes.push((name, result));
    }
    outcomes
}

/// Remove the stored object, then the metadata row.
///
/// An object that is already gone from storage does not block removing the row.
///
/// # Errors
///
/// `NotFound` for unknown ids, `StorageDelete` if the object removal fails,
/// `MetadataDelete` if the row removal fails after the object is gone.
pub async fn delete_document(
    store: &dyn ObjectStore,
    repo: &dyn DocumentRepo,
    id: Uuid,
) -> Result<Document, DocumentError> {
    let doc = repo.get(id).await?.ok_or(DocumentError::NotFound(id))?;

    match store.remove(&doc.storage_path).await {
        Ok(()) => {}
        Err(BackendError::NotFound(_)) => {
            warn!(document_id = %id, path = %doc.storage_path, "document object already missing from storage");
        }
        Err(e) => return Err(DocumentError::StorageDelete(e)),
    }

    repo.delete(id).await.map_err(DocumentError::MetadataDelete)?;
    info!(claim_id = %doc.claim_id, document_id = %id, "document deleted");
    Ok(doc)
}

/// Look up a document or fail with `NotFound`.
///
/// # Errors
///
/// Returns a backend error if the lookup fails.
pub async fn get_document(repo: &dyn DocumentRepo, id: Uuid) -> Result<Document, DocumentError> {
    repo.get(id).await?.ok_or(DocumentError::NotFound(id))
}

/// Attach a time-limited URL to the document.
///
/// # Errors
///
/// Returns a backend error if signing fails.
pub async fn with_signed_url(
    store: &dyn ObjectStore,
    mut doc: Document,
    ttl_secs: u64,
) -> Result<Document, DocumentError> {
    doc.url = Some(store.signed_url(&doc.storage_path, ttl_secs).await?);
    Ok(doc)
}

/// Fetch the stored bytes.
///
/// # Errors
///
/// Returns a backend error if the download fails.
pub async fn download(store: &dyn ObjectStore, doc: &Document) -> Result<Vec<u8>, DocumentError> {
    Ok(store.download(&doc.storage_path).await?)
}

/// Mark a document as queued for the external validator.
///
/// # Errors
///
/// Returns `NotFound` for unknown ids or a backend error.
pub async fn request_validation(repo: &dyn DocumentRepo, id: Uuid) -> Result<Document, DocumentError> {
    let doc = get_document(repo, id).await?;
    if doc.status == DocumentStatus::Processing {
        return Ok(doc);
    }
    let doc = repo.set_status(id, DocumentStatus::Processing, None).await?;
    info!(claim_id = %doc.claim_id, document_id = %id, "document validation requested");
    Ok(doc)
}

/// Store the external validator's verdict.
///
/// # Errors
///
/// `InvalidResultStatus` unless `status` is `Validated` or `Error`.
pub async fn record_validation_result(
    repo: &dyn DocumentRepo,
    id: Uuid,
    status: DocumentStatus,
    result: &AiValidation,
) -> Result<Document, DocumentError> {
    if !matches!(status, DocumentStatus::Validated | DocumentStatus::Error) {
        return Err(DocumentError::InvalidResultStatus(status.as_str()));
    }
    get_document(repo, id).await?;
    let doc = repo.set_status(id, status, Some(result)).await?;
    info!(document_id = %id, status = status.as_str(), confidence = result.confidence, "document validation recorded");
    Ok(doc)
}

#[cfg(test)]
#[path = "documents_test.rs"]
mod tests;
