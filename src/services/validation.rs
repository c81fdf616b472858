//! AI validation view — overall status derivation and storage.
//!
//! The scores themselves come from the external validator. This module only
//! summarizes what was stored for display.

use serde::Serialize;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::backend::BackendError;
use crate::format::format_percent;
use crate::model::{CheckStatus, ValidationCheck, ValidationData};

/// Overall status of a set of checks.
///
/// Precedence: any failed, then any warning, then any pending, else passed.
/// An empty set is passed.
#[must_use]
pub fn overall_status(checks: &[ValidationCheck]) -> CheckStatus {
    overall_status_of(checks.iter().map(|c| c.status))
}

/// [`overall_status`] over bare statuses.
#[must_use]
pub fn overall_status_of(statuses: impl IntoIterator<Item = CheckStatus>) -> CheckStatus {
    let mut seen_warning = false;
    let mut seen_pending = false;
    for status in statuses {
        match status {
            CheckStatus::Failed => return CheckStatus::Failed,
            CheckStatus::Warning => seen_warning = true,
            CheckStatus::Pending => seen_pending = true,
            CheckStatus::Passed => {}
        }
    }
    if seen_warning {
        CheckStatus::Warning
    } else if seen_pending {
        CheckStatus::Pending
    } else {
        CheckStatus::Passed
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceBand {
    High,
    Medium,
    Low,
}

/// 90 and above is high, 70 and above medium, anything else low.
#[must_use]
pub fn confidence_band(confidence: f64) -> ConfidenceBand {
    if confidence >= 90.0 {
        ConfidenceBand::High
    } else if confidence >= 70.0 {
        ConfidenceBand::Medium
    } else {
        ConfidenceBand::Low
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    pub passed: usize,
    pub warning: usize,
    pub failed: usize,
    pub pending: usize,
}

#[must_use]
pub fn status_counts(checks: &[ValidationCheck]) -> StatusCounts {
    let mut counts = StatusCounts::default();
    for check in checks {
        match check.status {
            CheckStatus::Passed => counts.passed += 1,
            CheckStatus::Warning => counts.warning += 1,
            CheckStatus::Failed => counts.failed += 1,
            CheckStatus::Pending => counts.pending += 1,
        }
    }
    counts
}

/// Validation data plus the derived display fields.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationView {
    #[serde(flatten)]
    pub data: ValidationData,
    pub overall_status: CheckStatus,
    pub confidence_band: ConfidenceBand,
    /// `overallConfidence` as shown on the dashboard, e.g. `87.5%`.
    pub confidence_label: String,
    pub counts: StatusCounts,
    pub total_processing_time: u64,
}

impl ValidationView {
    #[must_use]
    pub fn new(data: ValidationData) -> Self {
        Self {
            overall_status: overall_status(&data.checks),
            confidence_band: confidence_band(data.overall_confidence),
            confidence_label: format_percent(data.overall_confidence),
            counts: status_counts(&data.checks),
            total_processing_time: data.checks.iter().map(|c| c.processing_time).sum(),
            data,
        }
    }
}

// =============================================================================
// PERSISTENCE
// =============================================================================

/// Load the stored validation aggregate for a claim.
///
/// # Errors
///
/// Returns a backend error if the query fails or the stored JSON is malformed.
pub async fn load(pool: &PgPool, claim_id: Uuid) -> Result<Option<ValidationData>, BackendError> {
    let row = sqlx::query("SELECT data FROM claim_validations WHERE claim_id = $1")
        .bind(claim_id)
        .fetch_optional(pool)
        .await?;
    row.map(|r| {
        serde_json::from_value::<ValidationData>(r.get("data"))
            .map_err(|e| BackendError::Other(format!("stored validation data is malformed: {e}")))
    })
    .transpose()
}

/// Replace the validation aggregate for a claim.
///
/// # Errors
///
/// Returns a backend error if the upsert fails.
pub async fn store(pool: &PgPool, claim_id: Uuid, data: &ValidationData) -> Result<(), BackendError> {
    let json = serde_json::to_value(data).map_err(|e| BackendError::Other(e.to_string()))?;
    sqlx::query(
        "INSERT INTO claim_validations (claim_id, data, updated_at) VALUES ($1, $2, now())
         ON CONFLICT (claim_id) DO UPDATE SET data = EXCLUDED.data, updated_at = now()",
    )
    .bind(claim_id)
    .bind(json)
    .execute(pool)
    .await?;
    Ok(())
}

#[cfg(test)]
#[path = "validation_test.rs"]
mod tests;
