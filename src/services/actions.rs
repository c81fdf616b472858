//! Role-based claim actions and the status transitions they drive.
//!
//! One table decides which action a role may take on a claim in a given
//! status. The claim detail response lists the allowed actions so clients
//! render exactly those buttons, and the action endpoint checks the same
//! table before mutating anything.

use serde::{Deserialize, Serialize};

use crate::model::{ClaimStatus, Role, TimelineEventKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClaimAction {
    Submit,
    UploadDocuments,
    AddComment,
    DownloadReport,
    StartReview,
    Approve,
    Reject,
    RequestInfo,
    RunValidation,
    Reopen,
}

impl ClaimAction {
    pub const ALL: [Self; 10] = [
        Self::Submit,
        Self::UploadDocuments,
        Self::AddComment,
        Self::DownloadReport,
        Self::StartReview,
        Self::Approve,
        Self::Reject,
        Self::RequestInfo,
        Self::RunValidation,
        Self::Reopen,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Submit => "submit",
            Self::UploadDocuments => "upload_documents",
            Self::AddComment => "add_comment",
            Self::DownloadReport => "download_report",
            Self::StartReview => "start_review",
            Self::Approve => "approve",
            Self::Reject => "reject",
            Self::RequestInfo => "request_info",
            Self::RunValidation => "run_validation",
            Self::Reopen => "reopen",
        }
    }

    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|a| a.as_str() == raw)
    }

    /// Status the claim moves to, for actions that change status.
    #[must_use]
    pub fn target_status(self) -> Option<ClaimStatus> {
        match self {
            Self::Submit | Self::RequestInfo => Some(ClaimStatus::Pending),
            Self::StartReview | Self::Reopen => Some(ClaimStatus::UnderReview),
            Self::Approve => Some(ClaimStatus::Approved),
            Self::Reject => Some(ClaimStatus::Rejected),
            Self::UploadDocuments | Self::AddComment | Self::DownloadReport | Self::RunValidation => None,
        }
    }

    /// Timeline event recorded when a status-changing action succeeds.
    #[must_use]
    pub fn timeline_kind(self) -> Option<TimelineEventKind> {
        match self {
            Self::Submit => Some(TimelineEventKind::Submitted),
            Self::StartReview => Some(TimelineEventKind::ReviewStarted),
            Self::Approve => Some(TimelineEventKind::Approved),
            Self::Reject => Some(TimelineEventKind::Rejected),
            Self::RequestInfo => Some(TimelineEventKind::InfoRequested),
            Self::Reopen => Some(TimelineEventKind::Reopened),
            Self::RunValidation => Some(TimelineEventKind::ValidationRequested),
            Self::UploadDocuments | Self::AddComment | Self::DownloadReport => None,
        }
    }
}

/// Whether `role` may take `action` on a claim currently in `status`.
#[must_use]
pub fn is_allowed(role: Role, action: ClaimAction, status: ClaimStatus) -> bool {
    use ClaimAction as A;
    use ClaimStatus as S;

    let staff = role.is_staff();
    match action {
        A::AddComment => true,
        A::DownloadReport => status == S::Approved,
        A::Submit => role == Role::Affiliate && status == S::Draft,
        A::UploadDocuments => match role {
            Role::Affiliate => matches!(status, S::Draft | S::Pending),
            Role::Admin => !status.is_closed(),
            Role::Analyst => false,
        },
        A::StartReview => staff && status == S::Pending,
        A::Approve | A::RequestInfo => staff && status == S::UnderReview,
        A::Reject | A::RunValidation => staff && matches!(status, S::Pending | S::UnderReview),
        A::Reopen => role == Role::Admin && status.is_closed(),
    }
}

/// Actions `role` may take on a claim in `status`, in display order.
#[must_use]
pub fn available_actions(role: Role, status: ClaimStatus) -> Vec<ClaimAction> {
    ClaimAction::ALL
        .into_iter()
        .filter(|a| is_allowed(role, *a, status))
        .collect()
}

#[cfg(test)]
#[path = "actions_test.rs"]
mod tests;
