//! Claim documents and their AI validation payload.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentStatus {
    Validated,
    Processing,
    Error,
    Pending,
}

impl DocumentStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Validated => "validated",
            Self::Processing => "processing",
            Self::Error => "error",
            Self::Pending => "pending",
        }
    }

    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "validated" => Some(Self::Validated),
            "processing" => Some(Self::Processing),
            "error" => Some(Self::Error),
            "pending" => Some(Self::Pending),
            _ => None,
        }
    }
}

/// Document type chosen at upload. Also the middle segment of the storage path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentCategory {
    Invoice,
    MedicalReport,
    Prescription,
    Receipt,
    Identity,
    Other,
}

impl DocumentCategory {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Invoice => "invoice",
            Self::MedicalReport => "medical_report",
            Self::Prescription => "prescription",
            Self::Receipt => "receipt",
            Self::Identity => "identity",
            Self::Other => "other",
        }
    }

    /// Unknown categories fall back to `Other` instead of rejecting the upload.
    #[must_use]
    pub fn parse_or_other(raw: &str) -> Self {
        match raw.trim() {
            "invoice" => Self::Invoice,
            "medical_report" => Self::MedicalReport,
            "prescription" => Self::Prescription,
            "receipt" => Self::Receipt,
            "identity" => Self::Identity,
            _ => Self::Other,
        }
    }
}

/// Result attached to a document by the external validator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiValidation {
    #[serde(default)]
    pub extracted_data: BTreeMap<String, serde_json::Value>,
    pub confidence: f64,
    #[serde(default)]
    pub issues: Vec<String>,
}

/// Metadata row for an uploaded file. Mirrors the `claim_documents` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub id: Uuid,
    pub claim_id: Uuid,
    pub name: String,
    #[serde(rename = "type")]
    pub mime_type: String,
    pub size: i64,
    #[serde(with = "time::serde::rfc3339")]
    pub upload_date: OffsetDateTime,
    pub status: DocumentStatus,
    pub category: DocumentCategory,
    pub storage_path: String,
    pub uploaded_by: Option<Uuid>,
    /// Signed URL, filled in only when a caller asks for one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub ai_validation: Option<AiValidation>,
}
