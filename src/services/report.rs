//! Reimbursement report (`reembolso.pdf`).
//!
//! DESIGN
//! ======
//! The report is a fixed HTML layout filled from the claim and its stored
//! liquidation, then handed to an external HTML→PDF renderer behind the
//! `PdfRenderer` trait. Values are escaped as they are substituted and
//! substitution is a single pass, so placeholder-like text inside a value is
//! never expanded.

use std::time::Duration;

use rust_decimal::Decimal;
use time::OffsetDateTime;

use crate::backend::BackendError;
use crate::config::HttpTimeouts;
use crate::format::{format_currency, format_date, format_datetime};
use crate::model::{Claim, ClaimStatus, LiquidationData};

pub const REPORT_FILENAME: &str = "reembolso.pdf";
const REPORT_TEMPLATE: &str = include_str!("../../templates/reembolso.html");

#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("the reimbursement report is only available for approved claims (claim is {0})")]
    NotApproved(&'static str),
    #[error("report rendering is not configured")]
    RendererUnavailable,
    #[error("report rendering failed: {0}")]
    Render(#[from] BackendError),
}

// =============================================================================
// CONTENT
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportItem {
    pub concept: String,
    pub amount: Decimal,
}

/// Everything printed on the report, already decided.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportContent {
    pub claim_number: String,
    pub issue_date: String,
    /// `dd/mm/yyyy HH:MM` UTC, printed in the footer.
    pub generated_at: String,
    pub patient_name: String,
    pub patient_dni: String,
    pub policy_number: String,
    pub plan: String,
    pub provider: String,
    pub service_date: String,
    pub diagnosis: String,
    pub requested_amount: Decimal,
    pub approved_amount: Decimal,
    pub items: Vec<ReportItem>,
    pub justification: String,
}

/// Collect report content for an approved claim.
///
/// Approved items come from the applied coverage rules that carry an amount;
/// without any, the claim itself is the single item.
///
/// # Errors
///
/// `NotApproved` for any other status.
pub fn build_content(
    claim: &Claim,
    liquidation: Option<&LiquidationData>,
    issued_at: OffsetDateTime,
) -> Result<ReportContent, ReportError> {
    if claim.status != ClaimStatus::Approved {
        return Err(ReportError::NotApproved(claim.status.as_str()));
    }
    let approved_amount = claim
        .approved_amount
        .or(liquidation.map(|l| l.final_amount))
        .unwrap_or(Decimal::ZERO);

    let mut items: Vec<ReportItem> = liquidation
        .map(|l| {
            l.coverage_rules
                .iter()
                .filter(|r| r.applied)
                .filter_map(|r| r.amount.map(|amount| ReportItem { concept: r.name.clone(), amount }))
                .collect()
        })
        .unwrap_or_default();
    if items.is_empty() {
        items.push(ReportItem { concept: claim.description.clone(), amount: approved_amount });
    }

    let diagnosis = if claim.icd10_code.is_empty() {
        claim.description.clone()
    } else {
        format!("{} ({})", claim.description, claim.icd10_code)
    };

    Ok(ReportContent {
        claim_number: claim.claim_number.clone(),
        issue_date: format_date(issued_at.date()),
        generated_at: format_datetime(issued_at),
        patient_name: claim.patient.name.clone(),
        patient_dni: claim.patient.dni.clone(),
        policy_number: claim.patient.policy_number.clone(),
        plan: claim.patient.plan.clone(),
        provider: format!("{} · {}", claim.provider.name, claim.provider.specialty),
        service_date: format_date(claim.service_date),
        diagnosis,
        requested_amount: claim.requested_amount,
        approved_amount,
        items,
        justification: justification(liquidation),
    })
}

fn justification(liquidation: Option<&LiquidationData>) -> String {
    let Some(l) = liquidation else {
        return "Importe aprobado tras la revisión del expediente.".to_string();
    };
    let plan = l.plan.name.as_deref().unwrap_or("contratado");
    let mut text = format!(
        "Cobertura del {}% según el plan {plan}. Importe elegible {}, deducciones {}, deducible {}.",
        l.plan.coverage.normalize(),
        format_currency(l.eligible_amount),
        format_currency(l.deductions),
        format_currency(l.plan.deductible),
    );
    if !l.exclusions.is_empty() {
        let excluded: Vec<&str> = l.exclusions.iter().map(|e| e.concept.as_str()).collect();
        text.push_str(" Conceptos excluidos: ");
        text.push_str(&excluded.join(", "));
        text.push('.');
    }
    text
}

// =============================================================================
// HTML
// =============================================================================

#[must_use]
pub fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Replace `{{KEY}}` markers in one pass. Unknown markers are left as written.
#[must_use]
pub fn fill_template(template: &str, values: &[(&str, String)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find("}}") else {
            out.push_str(&rest[start..]);
            return out;
        };
        let key = &after[..end];
        match values.iter().find(|(k, _)| *k == key) {
            Some((_, value)) => out.push_str(value),
            None => out.push_str(&rest[start..start + 2 + end + 2]),
        }
        rest = &after[end + 2..];
    }
    out.push_str(rest);
    out
}

/// Render the report HTML. Every value is escaped.
#[must_use]
pub fn render_html(content: &ReportContent, logo_url: Option<&str>) -> String {
    let logo = logo_url
        .map(|url| format!(r#"<img src="{}" alt="logo">"#, escape_html(url)))
        .unwrap_or_default();
    let items = content
        .items
        .iter()
        .map(|item| {
            format!(
                r#"      <tr><td>{}</td><td class="amount">{}</td></tr>"#,
                escape_html(&item.concept),
                escape_html(&format_currency(item.amount))
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    let text = |s: &str| escape_html(s);
    fill_template(
        REPORT_TEMPLATE,
        &[
            ("LOGO", logo),
            ("CLAIM_NUMBER", text(&content.claim_number)),
            ("ISSUE_DATE", text(&content.issue_date)),
            ("GENERATED_AT", text(&content.generated_at)),
            ("PATIENT_NAME", text(&content.patient_name)),
            ("PATIENT_DNI", text(&content.patient_dni)),
            ("POLICY_NUMBER", text(&content.policy_number)),
            ("PLAN", text(&content.plan)),
            ("PROVIDER", text(&content.provider)),
            ("SERVICE_DATE", text(&content.service_date)),
            ("DIAGNOSIS", text(&content.diagnosis)),
            ("REQUESTED_AMOUNT", text(&format_currency(content.requested_amount))),
            ("APPROVED_AMOUNT", text(&format_currency(content.approved_amount))),
            ("ITEMS", items),
            ("JUSTIFICATION", text(&content.justification)),
        ],
    )
}

// =============================================================================
// RENDERER
// =============================================================================

#[async_trait::async_trait]
pub trait PdfRenderer: Send + Sync {
    async fn render(&self, html: String) -> Result<Vec<u8>, BackendError>;
}

/// Gotenberg-compatible Chromium HTML converter.
pub struct HttpPdfRenderer {
    http: reqwest::Client,
    base_url: String,
}

impl HttpPdfRenderer {
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(base_url: &str, timeouts: HttpTimeouts) -> Result<Self, BackendError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeouts.request_secs))
            .connect_timeout(Duration::from_secs(timeouts.connect_secs))
            .build()
            .map_err(|e| BackendError::Other(format!("renderer client build failed: {e}")))?;
        Ok(Self { http, base_url: base_url.trim_end_matches('/').to_string() })
    }

    fn convert_url(&self) -> String {
        format!("{}/forms/chromium/convert/html", self.base_url)
    }
}

#[async_trait::async_trait]
impl PdfRenderer for HttpPdfRenderer {
    async fn render(&self, html: String) -> Result<Vec<u8>, BackendError> {
        let part = reqwest::multipart::Part::text(html)
            .file_name("index.html")
            .mime_str("text/html")?;
        let form = reqwest::multipart::Form::new().part("files", part);

        let response = self.http.post(self.convert_url()).multipart(form).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BackendError::Other(format!("renderer returned {status}: {}", body.trim())));
        }
        Ok(response.bytes().await?.to_vec())
    }
}

/// Build and render the report for a claim.
///
/// # Errors
///
/// `RendererUnavailable` when no renderer is configured, `NotApproved`, or the
/// renderer's failure.
pub async fn generate(
    renderer: Option<&dyn PdfRenderer>,
    claim: &Claim,
    liquidation: Option<&LiquidationData>,
    logo_url: Option<&str>,
) -> Result<Vec<u8>, ReportError> {
    let content = build_content(claim, liquidation, OffsetDateTime::now_utc())?;
    let renderer = renderer.ok_or(ReportError::RendererUnavailable)?;
    let pdf = renderer.render(render_html(&content, logo_url)).await?;
    tracing::info!(claim_id = %claim.id, bytes = pdf.len(), "reimbursement report rendered");
    Ok(pdf)
}

#[cfg(test)]
#[path = "report_test.rs"]
mod tests;
