//! Comment routes — threaded discussion on a claim.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Json;
use serde::Deserialize;
use uuid::Uuid;

use super::claims::claim_error;
use super::{ApiError, api_error, backend_status};
use crate::model::{Comment, CommentAuthor, TimelineEventKind};
use crate::routes::auth::AuthUser;
use crate::services::claims;
use crate::services::comments::{self, CommentError};
use crate::services::timeline::{self, NewTimelineEvent};
use crate::state::AppState;

pub(crate) fn comment_error_to_status(err: &CommentError) -> StatusCode {
    match err {
        CommentError::Empty | CommentError::TooLong { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        CommentError::ParentNotFound(_) => StatusCode::NOT_FOUND,
        CommentError::Backend(e) => backend_status(e),
    }
}

fn comment_error(err: CommentError) -> ApiError {
    api_error(comment_error_to_status(&err), err)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCommentBody {
    #[serde(default)]
    pub content: String,
    pub parent_id: Option<Uuid>,
    #[serde(default)]
    pub attachments: Vec<String>,
}

/// `GET /api/claims/:id/comments` — threaded, oldest first.
pub async fn list_comments(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(claim_id): Path<Uuid>,
) -> Result<Json<Vec<Comment>>, ApiError> {
    claims::authorize(&state.pool, auth.user.viewer(), claim_id)
        .await
        .map_err(claim_error)?;
    let thread = comments::list(&state.pool, claim_id).await.map_err(comment_error)?;
    Ok(Json(thread))
}

/// `POST /api/claims/:id/comments` — add a comment or a reply.
pub async fn add_comment(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(claim_id): Path<Uuid>,
    Json(body): Json<NewCommentBody>,
) -> Result<(StatusCode, Json<Comment>), ApiError> {
    claims::authorize(&state.pool, auth.user.viewer(), claim_id)
        .await
        .map_err(claim_error)?;

    let author = CommentAuthor { id: auth.user.id, name: auth.user.name.clone(), role: auth.user.role };
    let comment = comments::add(&state.pool, claim_id, &author, &body.content, body.parent_id, &body.attachments)
        .await
        .map_err(comment_error)?;

    let mut event = NewTimelineEvent::new(claim_id, TimelineEventKind::CommentAdded).by(auth.user.id);
    if let Some(parent) = body.parent_id {
        event = event.detail("replyTo", parent);
    }
    for name in &comment.attachments {
        event = event.attachment(name.clone());
    }
    timeline::record_best_effort(&state.pool, event).await;

    Ok((StatusCode::CREATED, Json(comment)))
}

#[cfg(test)]
#[path = "comments_test.rs"]
mod tests;
