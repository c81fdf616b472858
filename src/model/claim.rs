//! Claim aggregate.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};
use uuid::Uuid;

use super::comment::Comment;
use super::document::Document;
use super::iso_date;

/// Largest amount a `NUMERIC(12, 2)` money column holds: 9999999999.99.
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(3_567_587_327, 232, 0, false, 2);

/// Why `amount` cannot be stored in a money column, if it cannot.
///
/// Trailing zeros do not count as decimals, so `1.500` passes.
#[must_use]
pub fn money_problem(amount: Decimal) -> Option<String> {
    if amount.normalize().scale() > 2 {
        Some("must have at most two decimal places".into())
    } else if amount.abs() > MAX_AMOUNT {
        Some(format!("must be at most {MAX_AMOUNT}"))
    } else {
        None
    }
}

/// Lifecycle status of a claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClaimStatus {
    Draft,
    Pending,
    UnderReview,
    Approved,
    Rejected,
}

impl ClaimStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Pending => "pending",
            Self::UnderReview => "under_review",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }

    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "draft" => Some(Self::Draft),
            "pending" => Some(Self::Pending),
            "under_review" => Some(Self::UnderReview),
            "approved" => Some(Self::Approved),
            "rejected" => Some(Self::Rejected),
            _ => None,
        }
    }

    /// Approved and rejected claims only move again through an explicit reopen.
    #[must_use]
    pub fn is_closed(self) -> bool {
        matches!(self, Self::Approved | Self::Rejected)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Patient {
    pub name: String,
    pub dni: String,
    #[serde(with = "iso_date")]
    pub birth_date: Date,
    pub policy_number: String,
    pub plan: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Provider {
    pub name: String,
    pub cif: String,
    pub specialty: String,
}

/// A reimbursement request with its nested documents and comments.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Claim {
    pub id: Uuid,
    pub claim_number: String,
    pub affiliate_id: Uuid,
    pub status: ClaimStatus,
    pub requested_amount: Decimal,
    pub approved_amount: Option<Decimal>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub submission_date: Option<OffsetDateTime>,
    #[serde(with = "iso_date")]
    pub service_date: Date,
    pub description: String,
    pub icd10_code: String,
    pub patient: Patient,
    pub provider: Provider,
    #[serde(default)]
    pub documents: Vec<Document>,
    #[serde(default)]
    pub comments: Vec<Comment>,
    pub view_count: i32,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}
