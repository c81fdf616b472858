//! Claim comments — validation, threading, and storage.

use std::collections::{HashMap, HashSet};

use sqlx::{PgPool, Row};
use time::OffsetDateTime;
use tracing::info;
use uuid::Uuid;

use crate::backend::BackendError;
use crate::model::{Comment, CommentAuthor, Role};

pub const MAX_COMMENT_CHARS: usize = 2000;

#[derive(Debug, thiserror::Error)]
pub enum CommentError {
    #[error("Comment cannot be empty")]
    Empty,
    #[error("Comment must be at most {max} characters")]
    TooLong { max: usize },
    #[error("reply target not found: {0}")]
    ParentNotFound(Uuid),
    #[error("{0}")]
    Backend(#[from] BackendError),
}

impl From<sqlx::Error> for CommentError {
    fn from(err: sqlx::Error) -> Self {
        Self::Backend(err.into())
    }
}

/// Trim and check comment text. Re-run on every submit; nothing is stored on failure.
///
/// # Errors
///
/// `Empty` for blank input, `TooLong` past [`MAX_COMMENT_CHARS`].
pub fn validate_content(raw: &str) -> Result<String, CommentError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(CommentError::Empty);
    }
    if trimmed.chars().count() > MAX_COMMENT_CHARS {
        return Err(CommentError::TooLong { max: MAX_COMMENT_CHARS });
    }
    Ok(trimmed.to_string())
}

/// Flat comment as stored.
#[derive(Debug, Clone)]
pub struct CommentRow {
    pub id: Uuid,
    pub parent_id: Option<Uuid>,
    pub content: String,
    pub author: CommentAuthor,
    pub created_at: OffsetDateTime,
    pub attachments: Vec<String>,
}

/// Nest replies under their parents.
///
/// Roots and replies are each ordered oldest first. A reply whose parent is
/// not in `rows` is promoted to a root.
#[must_use]
pub fn build_thread(mut rows: Vec<CommentRow>) -> Vec<Comment> {
    rows.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
    let ids: HashSet<Uuid> = rows.iter().map(|r| r.id).collect();

    let mut roots = Vec::new();
    let mut children: HashMap<Uuid, Vec<CommentRow>> = HashMap::new();
    for row in rows {
        match row.parent_id {
            Some(parent) if ids.contains(&parent) && parent != row.id => {
                children.entry(parent).or_default().push(row);
            }
            _ => roots.push(row),
        }
    }

    roots
        .into_iter()
        .map(|row| attach_replies(row, &mut children))
        .collect()
}

fn attach_replies(row: CommentRow, children: &mut HashMap<Uuid, Vec<CommentRow>>) -> Comment {
    // Removing as we descend means each row is visited at most once.
    let replies = children
        .remove(&row.id)
        .unwrap_or_default()
        .into_iter()
        .map(|child| attach_replies(child, children))
        .collect();
    Comment {
        id: row.id,
        content: row.content,
        user: row.author,
        timestamp: row.created_at,
        attachments: row.attachments,
        replies,
    }
}

// =============================================================================
// PERSISTENCE
// =============================================================================

/// Threaded comments for a claim.
///
/// # Errors
///
/// Returns a backend error if the query fails.
pub async fn list(pool: &PgPool, claim_id: Uuid) -> Result<Vec<Comment>, CommentError> {
    let rows = sqlx::query(
        "SELECT c.id, c.parent_id, c.content, c.attachments, c.created_at,
                u.id AS user_id, u.name AS user_name, u.role AS user_role
         FROM claim_comments c
         JOIN user_profiles u ON u.id = c.user_id
         WHERE c.claim_id = $1",
    )
    .bind(claim_id)
    .fetch_all(pool)
    .await?;

    let flat = rows
        .iter()
        .map(|r| {
            let role: String = r.get("user_role");
            let attachments: serde_json::Value = r.get("attachments");
            CommentRow {
                id: r.get("id"),
                parent_id: r.get("parent_id"),
                content: r.get("content"),
                author: CommentAuthor {
                    id: r.get("user_id"),
                    name: r.get("user_name"),
                    role: Role::parse(&role).unwrap_or(Role::Affiliate),
                },
                created_at: r.get("created_at"),
                attachments: serde_json::from_value(attachments).unwrap_or_default(),
            }
        })
        .collect();

    Ok(build_thread(flat))
}

/// Validate and store a comment or reply.
///
/// # Errors
///
/// Validation errors, `ParentNotFound` when replying to a comment that is not
/// on this claim, or a backend error.
pub async fn add(
    pool: &PgPool,
    claim_id: Uuid,
    author: &CommentAuthor,
    content: &str,
    parent_id: Option<Uuid>,
    attachments: &[String],
) -> Result<Comment, CommentError> {
    let content = validate_content(content)?;

    if let Some(parent) = parent_id {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM claim_comments WHERE id = $1 AND claim_id = $2)")
                .bind(parent)
                .bind(claim_id)
                .fetch_one(pool)
                .await?;
        if !exists {
            return Err(CommentError::ParentNotFound(parent));
        }
    }

    let id = Uuid::new_v4();
    let attachments_json =
        serde_json::to_value(attachments).map_err(|e| CommentError::Backend(BackendError::Other(e.to_string())))?;
    let created_at: OffsetDateTime = sqlx::query_scalar(
        "INSERT INTO claim_comments (id, claim_id, parent_id, user_id, content, attachments)
         VALUES ($1, $2, $3, $4, $5, $6)
         RETURNING created_at",
    )
    .bind(id)
    .bind(claim_id)
    .bind(parent_id)
    .bind(author.id)
    .bind(&content)
    .bind(attachments_json)
    .fetch_one(pool)
    .await?;

    info!(%claim_id, comment_id = %id, reply = parent_id.is_some(), "comment added");
    Ok(Comment {
        id,
        content,
        user: author.clone(),
        timestamp: created_at,
        attachments: attachments.to_vec(),
        replies: Vec::new(),
    })
}

#[cfg(test)]
#[path = "comments_test.rs"]
mod tests;
