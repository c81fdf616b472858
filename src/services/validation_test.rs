use super::*;
use crate::model::CheckStatus::{Failed, Passed, Pending, Warning};

fn check(name: &str, status: CheckStatus, confidence: f64, ms: u64) -> ValidationCheck {
    ValidationCheck {
        name: name.into(),
        status,
        confidence,
        processing_time: ms,
        extracted_data: Default::default(),
        issues: vec![],
        rules_applied: vec![],
    }
}

#[test]
fn passed_and_warning_is_warning() {
    assert_eq!(overall_status_of([Passed, Warning]), Warning);
}

#[test]
fn any_failed_wins() {
    assert_eq!(overall_status_of([Passed, Failed, Warning]), Failed);
    assert_eq!(overall_status_of([Pending, Warning, Failed]), Failed);
}

#[test]
fn lone_pending_is_pending() {
    assert_eq!(overall_status_of([Pending]), Pending);
}

#[test]
fn warning_outranks_pending() {
    assert_eq!(overall_status_of([Pending, Warning]), Warning);
}

#[test]
fn empty_and_all_passed_are_passed() {
    assert_eq!(overall_status_of(Vec::<CheckStatus>::new()), Passed);
    assert_eq!(overall_status_of([Passed]), Passed);
    assert_eq!(overall_status_of([Passed, Passed]), Passed);
}

#[test]
fn derivation_is_order_independent() {
    let a = overall_status_of([Warning, Pending, Passed]);
    let b = overall_status_of([Passed, Pending, Warning]);
    assert_eq!(a, b);
}

#[test]
fn overall_status_reads_check_statuses() {
    let checks = vec![check("Identity", Passed, 98.0, 120), check("Invoice", Warning, 72.0, 340)];
    assert_eq!(overall_status(&checks), Warning);
}

#[test]
fn confidence_bands_have_inclusive_lower_bounds() {
    assert_eq!(confidence_band(90.0), ConfidenceBand::High);
    assert_eq!(confidence_band(89.99), ConfidenceBand::Medium);
    assert_eq!(confidence_band(70.0), ConfidenceBand::Medium);
    assert_eq!(confidence_band(69.9), ConfidenceBand::Low);
}

#[test]
fn view_summarizes_checks() {
    let data = ValidationData {
        checks: vec![
            check("Identity", Passed, 98.0, 120),
            check("Invoice", Failed, 40.0, 300),
            check("Prescription", Pending, 0.0, 0),
        ],
        overall_confidence: 79.5,
        ai_model: "doc-validator".into(),
        model_version: "2.1".into(),
    };

    let view = ValidationView::new(data);
    assert_eq!(view.overall_status, Failed);
    assert_eq!(view.confidence_band, ConfidenceBand::Medium);
    assert_eq!(view.counts, StatusCounts { passed: 1, warning: 0, failed: 1, pending: 1 });
    assert_eq!(view.total_processing_time, 420);

    let json = serde_json::to_value(&view).unwrap();
    assert_eq!(json["overallStatus"], "failed");
    assert_eq!(json["aiModel"], "doc-validator");
    assert_eq!(json["checks"].as_array().unwrap().len(), 3);
    assert_eq!(json["confidenceLabel"], "79.5%");
}
