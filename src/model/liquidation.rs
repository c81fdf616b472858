//! Pre-liquidation aggregate produced by the external calculation service.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanCoverage {
    #[serde(default)]
    pub name: Option<String>,
    /// Coverage percentage, 0-100.
    pub coverage: Decimal,
    pub deductible: Decimal,
    pub annual_limit: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoverageRule {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub applied: bool,
    #[serde(default)]
    pub amount: Option<Decimal>,
}

/// One line of a deduction breakdown or exclusion list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiquidationLine {
    pub concept: String,
    pub amount: Decimal,
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalculationStep {
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    pub description: String,
    pub amount: Decimal,
    #[serde(default)]
    pub user: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiquidationData {
    pub requested_amount: Decimal,
    pub eligible_amount: Decimal,
    pub deductions: Decimal,
    pub final_amount: Decimal,
    pub plan: PlanCoverage,
    #[serde(default)]
    pub coverage_rules: Vec<CoverageRule>,
    #[serde(default)]
    pub deduction_breakdown: Vec<LiquidationLine>,
    #[serde(default)]
    pub exclusions: Vec<LiquidationLine>,
    #[serde(default)]
    pub calculation_history: Vec<CalculationStep>,
}
