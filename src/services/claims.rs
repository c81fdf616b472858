//! Claim service — listing, creation, aggregate load, and status transitions.
//!
//! DESIGN
//! ======
//! A claim row carries its patient/provider blocks as JSON. The aggregate
//! returned to clients adds documents (through the `DocumentRepo` seam) and
//! threaded comments, plus the actions the caller's role may take.
//!
//! CONCURRENCY
//! ===========
//! Transitions update with `WHERE status = <expected>`. When another writer
//! moved the claim first the update touches no row and the caller gets a
//! conflict; otherwise the last write wins.

use rand::Rng;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use time::{Date, OffsetDateTime};
use tracing::info;
use uuid::Uuid;

use crate::backend::BackendError;
use crate::model::{Claim, ClaimStatus, Patient, Provider, Role, TimelineEventKind, money_problem};
use crate::services::actions::{self, ClaimAction};
use crate::services::comments::{self, CommentError};
use crate::services::documents::DocumentRepo;
use crate::services::timeline::{self, NewTimelineEvent};

const ALL_STATUSES: [ClaimStatus; 5] = [
    ClaimStatus::Draft,
    ClaimStatus::Pending,
    ClaimStatus::UnderReview,
    ClaimStatus::Approved,
    ClaimStatus::Rejected,
];

const CLAIM_NUMBER_ATTEMPTS: usize = 3;

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum ClaimError {
    #[error("claim not found: {0}")]
    NotFound(Uuid),
    #[error("not allowed to access claim {0}")]
    Forbidden(Uuid),
    #[error("{action} is not available to this role")]
    ActionForbidden { action: &'static str },
    #[error("{action} is not available while the claim is {status}")]
    InvalidTransition { action: &'static str, status: &'static str },
    #[error("claim was modified by someone else; expected status {expected}")]
    Conflict { expected: &'static str },
    #[error("{0}")]
    InvalidAmount(String),
    #[error("a reason is required to reject a claim")]
    MissingReason,
    #[error("{0}")]
    Invalid(String),
    #[error("{0}")]
    Backend(#[from] BackendError),
}

impl From<sqlx::Error> for ClaimError {
    fn from(err: sqlx::Error) -> Self {
        Self::Backend(err.into())
    }
}

impl From<CommentError> for ClaimError {
    fn from(err: CommentError) -> Self {
        match err {
            CommentError::Backend(e) => Self::Backend(e),
            other => Self::Invalid(other.to_string()),
        }
    }
}

/// Who is asking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewer {
    pub id: Uuid,
    pub role: Role,
}

/// Fields an affiliate fills in when opening a claim.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewClaim {
    pub requested_amount: Decimal,
    #[serde(with = "crate::model::iso_date")]
    pub service_date: Date,
    pub description: String,
    #[serde(default)]
    pub icd10_code: String,
    pub patient: Patient,
    pub provider: Provider,
}

/// Extra input some actions need.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionInput {
    pub approved_amount: Option<Decimal>,
    pub reason: Option<String>,
}

/// Aggregate returned by the detail endpoint.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimDetail {
    #[serde(flatten)]
    pub claim: Claim,
    pub available_actions: Vec<ClaimAction>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionOutcome {
    pub claim_id: Uuid,
    pub action: ClaimAction,
    pub status: ClaimStatus,
    pub available_actions: Vec<ClaimAction>,
}

// =============================================================================
// RULES
// =============================================================================

/// Staff see every claim; affiliates only their own.
#[must_use]
pub fn can_view(viewer: Viewer, affiliate_id: Uuid) -> bool {
    viewer.role.is_staff() || viewer.id == affiliate_id
}

/// Loads by anyone but the owner count as views.
#[must_use]
pub fn counts_as_view(viewer: Viewer, affiliate_id: Uuid) -> bool {
    viewer.id != affiliate_id
}

#[must_use]
pub fn format_claim_number(year: i32, sequence: u32) -> String {
    format!("CLM-{year}-{:06}", sequence % 1_000_000)
}

#[must_use]
pub fn generate_claim_number(year: i32) -> String {
    format_claim_number(year, rand::rng().random_range(0..1_000_000))
}

/// # Errors
///
/// `InvalidAmount` for a non-positive amount or one the money column cannot
/// hold, `Invalid` for a blank description.
pub fn validate_new_claim(claim: &NewClaim) -> Result<(), ClaimError> {
    if claim.requested_amount <= Decimal::ZERO {
        return Err(ClaimError::InvalidAmount("requested amount must be greater than zero".into()));
    }
    if let Some(problem) = money_problem(claim.requested_amount) {
        return Err(ClaimError::InvalidAmount(format!("requested amount {problem}")));
    }
    if claim.description.trim().is_empty() {
        return Err(ClaimError::Invalid("description is required".into()));
    }
    if claim.patient.name.trim().is_empty() {
        return Err(ClaimError::Invalid("patient name is required".into()));
    }
    Ok(())
}

/// Decide why an action is refused: the role never has it, or the status is wrong.
#[must_use]
pub fn denial(role: Role, action: ClaimAction, status: ClaimStatus) -> ClaimError {
    if ALL_STATUSES.iter().any(|s| actions::is_allowed(role, action, *s)) {
        ClaimError::InvalidTransition { action: action.as_str(), status: status.as_str() }
    } else {
        ClaimError::ActionForbidden { action: action.as_str() }
    }
}

/// Check the extra input an action carries.
///
/// # Errors
///
/// `InvalidAmount` unless an approval amount is within `(0, requested]` with
/// at most two decimals; `MissingReason` for a rejection without a reason.
pub fn check_action_input(action: ClaimAction, requested: Decimal, input: &ActionInput) -> Result<(), ClaimError> {
    match action {
        ClaimAction::Approve => {
            let Some(amount) = input.approved_amount else {
                return Err(ClaimError::InvalidAmount("an approved amount is required".into()));
            };
            if amount <= Decimal::ZERO {
                return Err(ClaimError::InvalidAmount("approved amount must be greater than zero".into()));
            }
            if let Some(problem) = money_problem(amount) {
                return Err(ClaimError::InvalidAmount(format!("approved amount {problem}")));
            }
            if amount > requested {
                return Err(ClaimError::InvalidAmount(format!(
                    "approved amount cannot exceed the requested amount ({requested})"
                )));
            }
            Ok(())
        }
        ClaimAction::Reject => match input.reason.as_deref().map(str::trim) {
            Some(reason) if !reason.is_empty() => Ok(()),
            _ => Err(ClaimError::MissingReason),
        },
        _ => Ok(()),
    }
}

// =============================================================================
// QUERIES
// =============================================================================

const CLAIM_COLUMNS: &str = "id, claim_number, affiliate_id, status, requested_amount, approved_amount, \
     submission_date, service_date, description, icd10_code, patient, provider, view_count, created_at, updated_at";

fn claim_from_row(row: &PgRow) -> Result<Claim, ClaimError> {
    let status: String = row.get("status");
    let status = ClaimStatus::parse(&status)
        .ok_or_else(|| BackendError::Other(format!("unknown claim status: {status}")))?;
    let patient: serde_json::Value = row.get("patient");
    let provider: serde_json::Value = row.get("provider");
    Ok(Claim {
        id: row.get("id"),
        claim_number: row.get("claim_number"),
        affiliate_id: row.get("affiliate_id"),
        status,
        requested_amount: row.get("requested_amount"),
        approved_amount: row.get("approved_amount"),
        submission_date: row.get("submission_date"),
        service_date: row.get("service_date"),
        description: row.get("description"),
        icd10_code: row.get("icd10_code"),
        patient: serde_json::from_value(patient).map_err(|e| BackendError::Other(format!("patient: {e}")))?,
        provider: serde_json::from_value(provider).map_err(|e| BackendError::Other(format!("provider: {e}")))?,
        documents: Vec::new(),
        comments: Vec::new(),
        view_count: row.get("view_count"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

async fn fetch(pool: &PgPool, claim_id: Uuid) -> Result<Claim, ClaimError> {
    let row = sqlx::query(&format!("SELECT {CLAIM_COLUMNS} FROM claims WHERE id = $1"))
        .bind(claim_id)
        .fetch_optional(pool)
        .await?
        .ok_or(ClaimError::NotFound(claim_id))?;
    claim_from_row(&row)
}

/// Claim row (without documents or comments) after an access check.
///
/// # Errors
///
/// `NotFound`, `Forbidden`, or a backend error.
pub async fn authorize(pool: &PgPool, viewer: Viewer, claim_id: Uuid) -> Result<Claim, ClaimError> {
    let claim = fetch(pool, claim_id).await?;
    if !can_view(viewer, claim.affiliate_id) {
        return Err(ClaimError::Forbidden(claim_id));
    }
    Ok(claim)
}

/// Claims visible to the viewer, newest first.
///
/// # Errors
///
/// Returns a backend error if the query fails.
pub async fn list(pool: &PgPool, viewer: Viewer, status: Option<ClaimStatus>) -> Result<Vec<Claim>, ClaimError> {
    let owner = (!viewer.role.is_staff()).then_some(viewer.id);
    let rows = sqlx::query(&format!(
        "SELECT {CLAIM_COLUMNS} FROM claims
         WHERE ($1::uuid IS NULL OR affiliate_id = $1)
           AND ($2::text IS NULL OR status = $2)
         ORDER BY created_at DESC"
    ))
    .bind(owner)
    .bind(status.map(ClaimStatus::as_str))
    .fetch_all(pool)
    .await?;

    rows.iter().map(claim_from_row).collect()
}

/// Open a draft claim for the viewer.
///
/// # Errors
///
/// Validation errors, `ActionForbidden` for staff, or a backend error.
pub async fn create(pool: &PgPool, viewer: Viewer, new: NewClaim) -> Result<Claim, ClaimError> {
    if viewer.role != Role::Affiliate {
        return Err(ClaimError::ActionForbidden { action: "create_claim" });
    }
    validate_new_claim(&new)?;

    let id = Uuid::new_v4();
    let patient = serde_json::to_value(&new.patient).map_err(|e| BackendError::Other(e.to_string()))?;
    let provider = serde_json::to_value(&new.provider).map_err(|e| BackendError::Other(e.to_string()))?;
    let year = OffsetDateTime::now_utc().year();

    let mut attempt = 0;
    let row = loop {
        attempt += 1;
        let claim_number = generate_claim_number(year);
        let result = sqlx::query(&format!(
            "INSERT INTO claims (id, claim_number, affiliate_id, status, requested_amount, service_date,
                                 description, icd10_code, patient, provider)
             VALUES ($1, $2, $3, 'draft', $4, $5, $6, $7, $8, $9)
             RETURNING {CLAIM_COLUMNS}"
        ))
        .bind(id)
        .bind(&claim_number)
        .bind(viewer.id)
        .bind(new.requested_amount)
        .bind(new.service_date)
        .bind(new.description.trim())
        .bind(new.icd10_code.trim())
        .bind(&patient)
        .bind(&provider)
        .fetch_one(pool)
        .await;

        match result {
            Ok(row) => break row,
            Err(e) if is_unique_violation(&e) && attempt < CLAIM_NUMBER_ATTEMPTS => {
                info!(%claim_number, attempt, "claim number taken; retrying");
            }
            Err(e) => return Err(e.into()),
        }
    };

    let claim = claim_from_row(&row)?;
    timeline::record_best_effort(
        pool,
        NewTimelineEvent::new(id, TimelineEventKind::Created)
            .by(viewer.id)
            .detail("claimNumber", &claim.claim_number),
    )
    .await;
    info!(claim_id = %id, claim_number = %claim.claim_number, "claim created");
    Ok(claim)
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error().is_some_and(|d| d.is_unique_violation())
}

/// Full aggregate for the detail view. Bumps the view counter for non-owners.
///
/// # Errors
///
/// `NotFound`, `Forbidden`, or a backend error from any of the three sources.
pub async fn load(
    pool: &PgPool,
    documents: &dyn DocumentRepo,
    viewer: Viewer,
    claim_id: Uuid,
) -> Result<ClaimDetail, ClaimError> {
    let mut claim = authorize(pool, viewer, claim_id).await?;

    if counts_as_view(viewer, claim.affiliate_id) {
        claim.view_count = sqlx::query_scalar(
            "UPDATE claims SET view_count = view_count + 1 WHERE id = $1 RETURNING view_count",
        )
        .bind(claim_id)
        .fetch_one(pool)
        .await?;
    }

    claim.documents = documents.list_for_claim(claim_id).await?;
    claim.comments = comments::list(pool, claim_id).await?;

    let available_actions = actions::available_actions(viewer.role, claim.status);
    Ok(ClaimDetail { claim, available_actions })
}

// =============================================================================
// ACTIONS
// =============================================================================

/// Run a role-based action against a claim.
///
/// Status-changing actions use a guarded update and append a timeline event.
/// `run_validation` marks the claim's pending or failed documents as
/// processing. Upload, comment, and report have their own endpoints.
///
/// # Errors
///
/// Access errors, `ActionForbidden`/`InvalidTransition` from the permission
/// table, input errors, `Conflict` when the status moved underneath us, or a
/// backend error.
pub async fn apply_action(
    pool: &PgPool,
    viewer: Viewer,
    claim_id: Uuid,
    action: ClaimAction,
    input: &ActionInput,
) -> Result<ActionOutcome, ClaimError> {
    let claim = authorize(pool, viewer, claim_id).await?;
    if !actions::is_allowed(viewer.role, action, claim.status) {
        return Err(denial(viewer.role, action, claim.status));
    }
    check_action_input(action, claim.requested_amount, input)?;

    let status = if let Some(target) = action.target_status() {
        transition(pool, claim_id, claim.status, target, input).await?;
        target
    } else if action == ClaimAction::RunValidation {
        let marked = sqlx::query(
            "UPDATE claim_documents SET status = 'processing'
             WHERE claim_id = $1 AND status IN ('pending', 'error')",
        )
        .bind(claim_id)
        .execute(pool)
        .await?
        .rows_affected();
        info!(%claim_id, documents = marked, "validation requested");
        claim.status
    } else {
        return Err(ClaimError::Invalid(format!("{} is handled by its own endpoint", action.as_str())));
    };

    if let Some(kind) = action.timeline_kind() {
        let mut event = NewTimelineEvent::new(claim_id, kind).by(viewer.id);
        if status != claim.status {
            event = event.detail("from", claim.status.as_str()).detail("to", status.as_str());
        }
        if let Some(amount) = input.approved_amount.filter(|_| action == ClaimAction::Approve) {
            event = event.detail("approvedAmount", amount);
        }
        if let Some(reason) = input.reason.as_deref().map(str::trim).filter(|r| !r.is_empty()) {
            if action == ClaimAction::RequestInfo {
                event = event.described(format!("Additional information requested: {reason}"));
            }
            event = event.detail("reason", reason);
        }
        timeline::record_best_effort(pool, event).await;
    }

    Ok(ActionOutcome {
        claim_id,
        action,
        status,
        available_actions: actions::available_actions(viewer.role, status),
    })
}

async fn transition(
    pool: &PgPool,
    claim_id: Uuid,
    from: ClaimStatus,
    to: ClaimStatus,
    input: &ActionInput,
) -> Result<(), ClaimError> {
    let approved_amount = if to == ClaimStatus::Approved { input.approved_amount } else { None };
    let reason = if to == ClaimStatus::Rejected {
        input.reason.as_deref().map(str::trim)
    } else {
        None
    };

    // Reopening a closed claim clears the previous decision.
    let result = sqlx::query(
        "UPDATE claims SET
             status = $1,
             approved_amount = CASE
                 WHEN $1 = 'approved' THEN $2
                 WHEN $4 IN ('approved', 'rejected') THEN NULL
                 ELSE approved_amount
             END,
             rejection_reason = CASE
                 WHEN $1 = 'rejected' THEN $3
                 WHEN $4 IN ('approved', 'rejected') THEN NULL
                 ELSE rejection_reason
             END,
             submission_date = CASE
                 WHEN $1 = 'pending' AND submission_date IS NULL THEN now()
                 ELSE submission_date
             END,
             updated_at = now()
         WHERE id = $5 AND status = $4",
    )
    .bind(to.as_str())
    .bind(approved_amount)
    .bind(reason)
    .bind(from.as_str())
    .bind(claim_id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(ClaimError::Conflict { expected: from.as_str() });
    }
    info!(%claim_id, from = from.as_str(), to = to.as_str(), "claim status changed");
    Ok(())
}

#[cfg(all(test, feature = "live-db-tests"))]
pub mod tests_support {
    use sqlx::PgPool;
    use sqlx::postgres::PgPoolOptions;
    use uuid::Uuid;

    use crate::model::Role;

    /// Connect to `TEST_DATABASE_URL` and apply migrations.
    pub async fn pool() -> PgPool {
        let database_url = std::env::var("TEST_DATABASE_URL").expect("TEST_DATABASE_URL required");
        let pool = PgPoolOptions::new().connect(&database_url).await.unwrap();
        sqlx::migrate!("src/db/migrations").run(&pool).await.unwrap();
        pool
    }

    pub async fn seed_user(pool: &PgPool, role: Role) -> Uuid {
        let id = Uuid::new_v4();
        sqlx::query("INSERT INTO user_profiles (id, email, name, role, password_hash) VALUES ($1, $2, $3, $4, $5)")
            .bind(id)
            .bind(format!("{id}@example.com"))
            .bind(format!("Seed {}", role.as_str()))
            .bind(role.as_str())
            .bind(crate::services::auth::hash_password("secret1"))
            .execute(pool)
            .await
            .unwrap();
        id
    }

    /// Insert a draft claim owned by `affiliate`.
    pub async fn seed_claim_for(pool: &PgPool, affiliate: Uuid) -> Uuid {
        let claim_id = Uuid::new_v4();
        sqlx::query(
            "INSERT INTO claims (id, claim_number, affiliate_id, status, requested_amount, service_date,
                                 description, icd10_code, patient, provider)
             VALUES ($1, $2, $3, 'draft', 120.50, '2024-03-01', 'Consulta', 'Z00.0', $4, $5)",
        )
        .bind(claim_id)
        .bind(format!("CLM-TEST-{}", &claim_id.simple().to_string()[..8]))
        .bind(affiliate)
        .bind(serde_json::json!({
            "name": "Lucía Pérez", "dni": "12345678Z", "birthDate": "1985-06-15",
            "policyNumber": "POL-1", "plan": "Premium"
        }))
        .bind(serde_json::json!({ "name": "Clínica Central", "cif": "B12345678", "specialty": "General" }))
        .execute(pool)
        .await
        .unwrap();
        claim_id
    }

    /// Insert an affiliate and a draft claim they own.
    pub async fn seed_claim(pool: &PgPool) -> Uuid {
        let affiliate = seed_user(pool, Role::Affiliate).await;
        seed_claim_for(pool, affiliate).await
    }
}

#[cfg(test)]
#[path = "claims_test.rs"]
mod tests;
