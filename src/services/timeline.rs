//! Claim timeline — append-only audit of what happened to a claim.

use std::collections::BTreeMap;

use sqlx::{PgPool, Row};
use tracing::warn;
use uuid::Uuid;

use crate::backend::BackendError;
use crate::model::{TimelineEvent, TimelineEventKind};

/// Event about to be appended.
#[derive(Debug, Clone)]
pub struct NewTimelineEvent {
    pub claim_id: Uuid,
    pub kind: TimelineEventKind,
    pub description: String,
    pub user_id: Option<Uuid>,
    pub details: BTreeMap<String, String>,
    pub attachments: Vec<String>,
}

impl NewTimelineEvent {
    /// Event with the default description for its kind.
    #[must_use]
    pub fn new(claim_id: Uuid, kind: TimelineEventKind) -> Self {
        Self {
            claim_id,
            kind,
            description: default_description(kind).to_string(),
            user_id: None,
            details: BTreeMap::new(),
            attachments: Vec::new(),
        }
    }

    #[must_use]
    pub fn by(mut self, user_id: Uuid) -> Self {
        self.user_id = Some(user_id);
        self
    }

    #[must_use]
    pub fn described(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    #[must_use]
    pub fn detail(mut self, key: &str, value: impl ToString) -> Self {
        self.details.insert(key.to_string(), value.to_string());
        self
    }

    #[must_use]
    pub fn attachment(mut self, name: impl Into<String>) -> Self {
        self.attachments.push(name.into());
        self
    }
}

#[must_use]
pub fn default_description(kind: TimelineEventKind) -> &'static str {
    match kind {
        TimelineEventKind::Created => "Claim created",
        TimelineEventKind::Submitted => "Claim submitted for review",
        TimelineEventKind::DocumentUploaded => "Document uploaded",
        TimelineEventKind::DocumentDeleted => "Document deleted",
        TimelineEventKind::ValidationRequested => "AI validation requested",
        TimelineEventKind::ValidationCompleted => "AI validation completed",
        TimelineEventKind::CommentAdded => "Comment added",
        TimelineEventKind::ReviewStarted => "Review started",
        TimelineEventKind::Approved => "Claim approved",
        TimelineEventKind::Rejected => "Claim rejected",
        TimelineEventKind::InfoRequested => "Additional information requested",
        TimelineEventKind::Reopened => "Claim reopened",
    }
}

/// Append an event.
///
/// # Errors
///
/// Returns a backend error if the insert fails.
pub async fn record(pool: &PgPool, event: NewTimelineEvent) -> Result<Uuid, BackendError> {
    let id = Uuid::new_v4();
    let details = serde_json::to_value(&event.details).map_err(|e| BackendError::Other(e.to_string()))?;
    let attachments = serde_json::to_value(&event.attachments).map_err(|e| BackendError::Other(e.to_string()))?;
    sqlx::query(
        "INSERT INTO claim_timeline (id, claim_id, kind, description, user_id, details, attachments)
         VALUES ($1, $2, $3, $4, $5, $6, $7)",
    )
    .bind(id)
    .bind(event.claim_id)
    .bind(event.kind.as_str())
    .bind(&event.description)
    .bind(event.user_id)
    .bind(details)
    .bind(attachments)
    .execute(pool)
    .await?;
    Ok(id)
}

/// Append an event where the primary mutation already succeeded; a failure is logged, not returned.
pub async fn record_best_effort(pool: &PgPool, event: NewTimelineEvent) {
    let claim_id = event.claim_id;
    let kind = event.kind.as_str();
    if let Err(e) = record(pool, event).await {
        warn!(%claim_id, kind, error = %e, "timeline event not recorded");
    }
}

/// Events for a claim in chronological order.
///
/// # Errors
///
/// Returns a backend error if the query fails.
pub async fn list(pool: &PgPool, claim_id: Uuid) -> Result<Vec<TimelineEvent>, BackendError> {
    let rows = sqlx::query(
        "SELECT t.id, t.kind, t.description, t.details, t.attachments, t.created_at, u.name AS user_name
         FROM claim_timeline t
         LEFT JOIN user_profiles u ON u.id = t.user_id
         WHERE t.claim_id = $1
         ORDER BY t.created_at ASC, t.id ASC",
    )
    .bind(claim_id)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .iter()
        .filter_map(|r| {
            let kind: String = r.get("kind");
            let Some(kind) = TimelineEventKind::parse(&kind) else {
                warn!(%claim_id, kind = %kind, "skipping timeline event with unknown kind");
                return None;
            };
            let details: serde_json::Value = r.get("details");
            let attachments: serde_json::Value = r.get("attachments");
            Some(TimelineEvent {
                id: r.get("id"),
                kind,
                timestamp: r.get("created_at"),
                description: r.get("description"),
                user: r.get("user_name"),
                details: serde_json::from_value(details).unwrap_or_default(),
                attachments: serde_json::from_value(attachments).unwrap_or_default(),
            })
        })
        .collect())
}

#[cfg(test)]
#[path = "timeline_test.rs"]
mod tests;
