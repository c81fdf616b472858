//! Pre-liquidation view.
//!
//! The payout math is done by the external calculation service; this module
//! stores its output and derives display-only totals from it.

use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::backend::BackendError;
use crate::model::liquidation::LiquidationLine;
use crate::model::{LiquidationData, money_problem};

/// A liquidation field the money columns and the report cannot represent.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{field} {problem}")]
pub struct InvalidLiquidation {
    pub field: String,
    pub problem: String,
}

fn check_amount(field: &str, amount: Decimal, allow_negative: bool) -> Result<(), InvalidLiquidation> {
    let problem = if !allow_negative && amount < Decimal::ZERO {
        Some("must not be negative".to_string())
    } else {
        money_problem(amount)
    };
    match problem {
        Some(problem) => Err(InvalidLiquidation { field: field.to_string(), problem }),
        None => Ok(()),
    }
}

fn check_lines(field: &str, lines: &[LiquidationLine]) -> Result<(), InvalidLiquidation> {
    lines
        .iter()
        .enumerate()
        .try_for_each(|(i, line)| check_amount(&format!("{field}[{i}].amount"), line.amount, false))
}

/// Check a calculation service payload before it is stored.
///
/// Amounts follow the claim money rule (two decimals, `MAX_AMOUNT`) and,
/// except rule and history amounts, must not be negative. Coverage is a
/// percentage in `0..=100`.
///
/// # Errors
///
/// The first field that breaks a rule.
pub fn validate(data: &LiquidationData) -> Result<(), InvalidLiquidation> {
    check_amount("requestedAmount", data.requested_amount, false)?;
    check_amount("eligibleAmount", data.eligible_amount, false)?;
    check_amount("deductions", data.deductions, false)?;
    check_amount("finalAmount", data.final_amount, false)?;
    check_amount("plan.deductible", data.plan.deductible, false)?;
    check_amount("plan.annualLimit", data.plan.annual_limit, false)?;
    if !(Decimal::ZERO..=Decimal::ONE_HUNDRED).contains(&data.plan.coverage) {
        return Err(InvalidLiquidation { field: "plan.coverage".into(), problem: "must be between 0 and 100".into() });
    }
    for (i, rule) in data.coverage_rules.iter().enumerate() {
        if let Some(amount) = rule.amount {
            check_amount(&format!("coverageRules[{i}].amount"), amount, true)?;
        }
    }
    check_lines("deductionBreakdown", &data.deduction_breakdown)?;
    check_lines("exclusions", &data.exclusions)?;
    for (i, step) in data.calculation_history.iter().enumerate() {
        check_amount(&format!("calculationHistory[{i}].amount"), step.amount, true)?;
    }
    Ok(())
}

/// Display-only figures derived from a stored liquidation.
///
/// Totals are `None` when the lines overflow a `Decimal`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LiquidationSummary {
    pub breakdown_total: Option<Decimal>,
    pub exclusions_total: Option<Decimal>,
    /// Final amount as a percentage of the requested amount, two decimals.
    /// `None` when nothing was requested or the ratio overflows.
    pub approved_percentage: Option<Decimal>,
    /// Whether the itemized breakdown adds up to the reported deductions.
    pub breakdown_matches_deductions: bool,
    pub rules_applied: usize,
}

#[must_use]
pub fn summarize(data: &LiquidationData) -> LiquidationSummary {
    let breakdown_total = total(&data.deduction_breakdown);
    let approved_percentage = data
        .final_amount
        .checked_div(data.requested_amount)
        .and_then(|ratio| ratio.checked_mul(Decimal::ONE_HUNDRED))
        .map(|pct| pct.round_dp(2));
    LiquidationSummary {
        breakdown_total,
        exclusions_total: total(&data.exclusions),
        approved_percentage,
        breakdown_matches_deductions: data.deduction_breakdown.is_empty() || breakdown_total == Some(data.deductions),
        rules_applied: data.coverage_rules.iter().filter(|r| r.applied).count(),
    }
}

fn total(lines: &[LiquidationLine]) -> Option<Decimal> {
    lines.iter().try_fold(Decimal::ZERO, |acc, line| acc.checked_add(line.amount))
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LiquidationView {
    #[serde(flatten)]
    pub data: LiquidationData,
    pub summary: LiquidationSummary,
}

impl LiquidationView {
    #[must_use]
    pub fn new(data: LiquidationData) -> Self {
        Self { summary: summarize(&data), data }
    }
}

/// Load the stored liquidation for a claim.
///
/// # Errors
///
/// Returns a backend error if the query fails or the stored JSON is malformed.
pub async fn load(pool: &PgPool, claim_id: Uuid) -> Result<Option<LiquidationData>, BackendError> {
    let row = sqlx::query("SELECT data FROM claim_liquidations WHERE claim_id = $1")
        .bind(claim_id)
        .fetch_optional(pool)
        .await?;
    row.map(|r| {
        serde_json::from_value::<LiquidationData>(r.get("data"))
            .map_err(|e| BackendError::Other(format!("stored liquidation data is malformed: {e}")))
    })
    .transpose()
}

/// Replace the liquidation for a claim.
///
/// # Errors
///
/// Returns a backend error if the upsert fails.
pub async fn store(pool: &PgPool, claim_id: Uuid, data: &LiquidationData) -> Result<(), BackendError> {
    let json = serde_json::to_value(data).map_err(|e| BackendError::Other(e.to_string()))?;
    sqlx::query(
        "INSERT INTO claim_liquidations (claim_id, data, updated_at) VALUES ($1, $2, now())
         ON CONFLICT (claim_id) DO UPDATE SET data = EXCLUDED.data, updated_at = now()",
    )
    .bind(claim_id)
    .bind(json)
    .execute(pool)
    .await?;
    Ok(())
}

#[cfg(test)]
#[path = "liquidation_test.rs"]
mod tests;
