//! AI validation aggregate produced by the external validator.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckStatus {
    Passed,
    Warning,
    Failed,
    Pending,
}

impl CheckStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Passed => "passed",
            Self::Warning => "warning",
            Self::Failed => "failed",
            Self::Pending => "pending",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationCheck {
    pub name: String,
    pub status: CheckStatus,
    /// 0-100.
    pub confidence: f64,
    /// Milliseconds spent by the validator on this check.
    #[serde(default)]
    pub processing_time: u64,
    #[serde(default)]
    pub extracted_data: BTreeMap<String, serde_json::Value>,
    #[serde(default)]
    pub issues: Vec<String>,
    #[serde(default)]
    pub rules_applied: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationData {
    #[serde(default)]
    pub checks: Vec<ValidationCheck>,
    pub overall_confidence: f64,
    pub ai_model: String,
    pub model_version: String,
}
