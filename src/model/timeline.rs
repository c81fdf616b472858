//! Claim timeline events.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimelineEventKind {
    Created,
    Submitted,
    DocumentUploaded,
    DocumentDeleted,
    ValidationRequested,
    ValidationCompleted,
    CommentAdded,
    ReviewStarted,
    Approved,
    Rejected,
    InfoRequested,
    Reopened,
}

impl TimelineEventKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Submitted => "submitted",
            Self::DocumentUploaded => "document_uploaded",
            Self::DocumentDeleted => "document_deleted",
            Self::ValidationRequested => "validation_requested",
            Self::ValidationCompleted => "validation_completed",
            Self::CommentAdded => "comment_added",
            Self::ReviewStarted => "review_started",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::InfoRequested => "info_requested",
            Self::Reopened => "reopened",
        }
    }

    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        [
            Self::Created,
            Self::Submitted,
            Self::DocumentUploaded,
            Self::DocumentDeleted,
            Self::ValidationRequested,
            Self::ValidationCompleted,
            Self::CommentAdded,
            Self::ReviewStarted,
            Self::Approved,
            Self::Rejected,
            Self::InfoRequested,
            Self::Reopened,
        ]
        .into_iter()
        .find(|kind| kind.as_str() == raw)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineEvent {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub kind: TimelineEventKind,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    pub description: String,
    /// Display name of the acting user; `None` for system events.
    pub user: Option<String>,
    #[serde(default)]
    pub details: BTreeMap<String, String>,
    #[serde(default)]
    pub attachments: Vec<String>,
}
