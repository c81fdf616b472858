//! Document routes — multipart upload, delete, signed access, validation.
//!
//! Every document route authorizes against the owning claim first, so an
//! affiliate can only reach documents on their own claims.

use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use axum::response::{IntoResponse, Json, Response};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use super::claims::{claim_error, require_staff};
use super::{ApiError, MAX_FILES_PER_UPLOAD, api_error, backend_status};
use crate::format::format_file_size;
use crate::model::{AiValidation, Claim, Document, DocumentCategory, DocumentStatus, TimelineEventKind};
use crate::routes::auth::AuthUser;
use crate::services::actions::{self, ClaimAction};
use crate::services::claims::{self, Viewer};
use crate::services::documents::{
    self as docs, ACCEPTED_EXTENSIONS, ALLOWED_MIME_TYPES, DocumentError, FileRejection, UploadRequest,
};
use crate::services::timeline::{self, NewTimelineEvent};
use crate::state::AppState;

pub(crate) fn document_error_to_status(err: &DocumentError) -> StatusCode {
    match err {
        DocumentError::Rejected(FileRejection::UnsupportedType { .. }) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
        DocumentError::Rejected(FileRejection::TooLarge { .. }) => StatusCode::PAYLOAD_TOO_LARGE,
        DocumentError::Rejected(FileRejection::Empty { .. }) => StatusCode::UNPROCESSABLE_ENTITY,
        DocumentError::NotFound(_) => StatusCode::NOT_FOUND,
        DocumentError::Upload(e) | DocumentError::StorageDelete(e) => {
            if e.is_unreachable() {
                StatusCode::SERVICE_UNAVAILABLE
            } else {
                StatusCode::BAD_GATEWAY
            }
        }
        DocumentError::Metadata(e) | DocumentError::MetadataDelete(e) => {
            if e.is_unreachable() {
                StatusCode::SERVICE_UNAVAILABLE
            } else {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
        DocumentError::InvalidResultStatus(_) => StatusCode::BAD_REQUEST,
        DocumentError::Backend(e) => backend_status(e),
    }
}

fn document_error(err: DocumentError) -> ApiError {
    api_error(document_error_to_status(&err), err)
}

/// Overall status of a multi-file upload.
///
/// All stored: 201. Some stored: 207. None stored: 503 when every failure
/// was the backend being unreachable, otherwise 422.
pub(crate) fn upload_status(outcomes: &[(String, Result<Document, DocumentError>)]) -> StatusCode {
    let stored = outcomes.iter().filter(|(_, r)| r.is_ok()).count();
    if stored == outcomes.len() {
        StatusCode::CREATED
    } else if stored > 0 {
        StatusCode::MULTI_STATUS
    } else if outcomes
        .iter()
        .all(|(_, r)| r.as_ref().err().is_some_and(DocumentError::is_unreachable))
    {
        StatusCode::SERVICE_UNAVAILABLE
    } else {
        StatusCode::UNPROCESSABLE_ENTITY
    }
}

/// `attachment` disposition with a header-safe quoted filename.
pub(crate) fn content_disposition(file_name: &str) -> String {
    let safe: String = file_name
        .chars()
        .map(|c| if c.is_ascii_graphic() || c == ' ' { c } else { '_' })
        .map(|c| if c == '"' || c == '\\' { '_' } else { c })
        .collect();
    let safe = if safe.trim().is_empty() { "document".to_string() } else { safe };
    format!("attachment; filename=\"{safe}\"")
}

/// Load a document and authorize the caller against its claim.
async fn authorized_document(state: &AppState, viewer: Viewer, id: Uuid) -> Result<(Document, Claim), ApiError> {
    let doc = docs::get_document(state.documents.as_ref(), id)
        .await
        .map_err(document_error)?;
    let claim = claims::authorize(&state.pool, viewer, doc.claim_id)
        .await
        .map_err(claim_error)?;
    Ok((doc, claim))
}

fn require_action(viewer: Viewer, action: ClaimAction, claim: &Claim) -> Result<(), ApiError> {
    if actions::is_allowed(viewer.role, action, claim.status) {
        Ok(())
    } else {
        Err(claim_error(claims::denial(viewer.role, action, claim.status)))
    }
}

/// File picker constraints for the upload form.
pub(crate) fn upload_rules_body(max_upload_bytes: u64) -> serde_json::Value {
    json!({
        "accept": ACCEPTED_EXTENSIONS,
        "allowedTypes": ALLOWED_MIME_TYPES,
        "maxBytes": max_upload_bytes,
        "maxSize": format_file_size(max_upload_bytes),
        "maxFiles": MAX_FILES_PER_UPLOAD,
    })
}

// =============================================================================
// HANDLERS
// =============================================================================

/// `GET /api/upload-rules`
pub async fn upload_rules(State(state): State<AppState>, _auth: AuthUser) -> Json<serde_json::Value> {
    Json(upload_rules_body(state.config.max_upload_bytes))
}

/// `GET /api/claims/:id/documents`
pub async fn list_documents(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(claim_id): Path<Uuid>,
) -> Result<Json<Vec<Document>>, ApiError> {
    claims::authorize(&state.pool, auth.user.viewer(), claim_id)
        .await
        .map_err(claim_error)?;
    let list = state
        .documents
        .list_for_claim(claim_id)
        .await
        .map_err(|e| api_error(backend_status(&e), e))?;
    Ok(Json(list))
}

/// `POST /api/claims/:id/documents` — multipart with a `category` field and
/// one or more `files` parts. Each file succeeds or fails on its own.
pub async fn upload_documents(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(claim_id): Path<Uuid>,
    mut multipart: Multipart,
) -> Result<Response, ApiError> {
    let viewer = auth.user.viewer();
    let claim = claims::authorize(&state.pool, viewer, claim_id)
        .await
        .map_err(claim_error)?;
    require_action(viewer, ClaimAction::UploadDocuments, &claim)?;

    let mut category = DocumentCategory::Other;
    let mut requests: Vec<UploadRequest> = Vec::new();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| api_error(e.status(), e.body_text()))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "category" => {
                let raw = field.text().await.map_err(|e| api_error(e.status(), e.body_text()))?;
                category = DocumentCategory::parse_or_other(&raw);
            }
            "files" | "file" => {
                if requests.len() as u64 >= MAX_FILES_PER_UPLOAD {
                    return Err(api_error(
                        StatusCode::BAD_REQUEST,
                        format!("at most {MAX_FILES_PER_UPLOAD} files per upload"),
                    ));
                }
                let file_name = field.file_name().unwrap_or("document").to_string();
                let mime_type = field.content_type().unwrap_or("application/octet-stream").to_string();
                let bytes = field.bytes().await.map_err(|e| api_error(e.status(), e.body_text()))?;
                requests.push(UploadRequest {
                    claim_id,
                    category,
                    file_name,
                    mime_type,
                    bytes: bytes.to_vec(),
                    uploaded_by: Some(auth.user.id),
                });
            }
            _ => {}
        }
    }

    if requests.is_empty() {
        return Err(api_error(StatusCode::BAD_REQUEST, "no files were sent"));
    }
    // The category part may arrive after the files.
    for req in &mut requests {
        req.category = category;
    }

    let outcomes = docs::upload_documents(
        state.storage.as_ref(),
        state.documents.as_ref(),
        requests,
        state.config.max_upload_bytes,
    )
    .await;
    let status = upload_status(&outcomes);

    let mut uploaded = Vec::new();
    let mut failed = Vec::new();
    for (name, result) in outcomes {
        match result {
            Ok(doc) => {
                timeline::record_best_effort(
                    &state.pool,
                    NewTimelineEvent::new(claim_id, TimelineEventKind::DocumentUploaded)
                        .by(auth.user.id)
                        .detail("document", &doc.name)
                        .detail("category", doc.category.as_str())
                        .attachment(doc.name.clone()),
                )
                .await;
                uploaded.push(doc);
            }
            Err(e) => failed.push(json!({ "file": name, "error": e.to_string() })),
        }
    }

    Ok((status, Json(json!({ "uploaded": uploaded, "failed": failed }))).into_response())
}

/// `DELETE /api/documents/:id` — remove object and metadata.
pub async fn delete_document(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let viewer = auth.user.viewer();
    let (_, claim) = authorized_document(&state, viewer, id).await?;
    require_action(viewer, ClaimAction::UploadDocuments, &claim)?;

    let doc = docs::delete_document(state.storage.as_ref(), state.documents.as_ref(), id)
        .await
        .map_err(document_error)?;
    timeline::record_best_effort(
        &state.pool,
        NewTimelineEvent::new(doc.claim_id, TimelineEventKind::DocumentDeleted)
            .by(auth.user.id)
            .detail("document", &doc.name),
    )
    .await;
    Ok(StatusCode::NO_CONTENT)
}

/// `GET /api/documents/:id/url` — time-limited download URL.
pub async fn signed_url(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let (doc, _) = authorized_document(&state, auth.user.viewer(), id).await?;
    let ttl = state.config.signed_url_ttl_secs;
    let doc = docs::with_signed_url(state.storage.as_ref(), doc, ttl)
        .await
        .map_err(document_error)?;
    Ok(Json(json!({ "url": doc.url, "expiresIn": ttl })))
}

/// `GET /api/documents/:id/download` — stream the stored bytes back.
pub async fn download(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Response, ApiError> {
    let (doc, _) = authorized_document(&state, auth.user.viewer(), id).await?;
    let bytes = docs::download(state.storage.as_ref(), &doc)
        .await
        .map_err(document_error)?;
    Ok((
        [(CONTENT_TYPE, doc.mime_type.clone()), (CONTENT_DISPOSITION, content_disposition(&doc.name))],
        bytes,
    )
        .into_response())
}

/// `POST /api/documents/:id/validate` — queue for the external validator.
pub async fn request_validation(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Document>, ApiError> {
    let viewer = auth.user.viewer();
    let (_, claim) = authorized_document(&state, viewer, id).await?;
    require_action(viewer, ClaimAction::RunValidation, &claim)?;

    let doc = docs::request_validation(state.documents.as_ref(), id)
        .await
        .map_err(document_error)?;
    timeline::record_best_effort(
        &state.pool,
        NewTimelineEvent::new(doc.claim_id, TimelineEventKind::ValidationRequested)
            .by(auth.user.id)
            .detail("document", &doc.name),
    )
    .await;
    Ok(Json(doc))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResultBody {
    pub status: String,
    pub ai_validation: AiValidation,
}

/// `PUT /api/documents/:id/validation` — validator callback with the verdict.
pub async fn record_validation(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    Json(body): Json<ValidationResultBody>,
) -> Result<Json<Document>, ApiError> {
    require_staff(auth.user.role)?;
    authorized_document(&state, auth.user.viewer(), id).await?;

    let status = DocumentStatus::parse(&body.status)
        .ok_or_else(|| api_error(StatusCode::BAD_REQUEST, format!("unknown document status: {}", body.status)))?;
    let doc = docs::record_validation_result(state.documents.as_ref(), id, status, &body.ai_validation)
        .await
        .map_err(document_error)?;
    timeline::record_best_effort(
        &state.pool,
        NewTimelineEvent::new(doc.claim_id, TimelineEventKind::ValidationCompleted)
            .by(auth.user.id)
            .detail("document", &doc.name)
            .detail("status", status.as_str())
            .detail("confidence", body.ai_validation.confidence),
    )
    .await;
    Ok(Json(doc))
}

#[cfg(test)]
#[path = "documents_test.rs"]
mod tests;
