use super::*;

#[test]
fn new_event_uses_default_description() {
    let event = NewTimelineEvent::new(Uuid::nil(), TimelineEventKind::Submitted);
    assert_eq!(event.description, "Claim submitted for review");
    assert!(event.user_id.is_none());
    assert!(event.details.is_empty());
}

#[test]
fn builder_collects_details_and_attachments() {
    let user = Uuid::new_v4();
    let event = NewTimelineEvent::new(Uuid::nil(), TimelineEventKind::DocumentUploaded)
        .by(user)
        .detail("category", "invoice")
        .detail("size", 2048)
        .attachment("factura.pdf");
    assert_eq!(event.user_id, Some(user));
    assert_eq!(event.details.get("category").map(String::as_str), Some("invoice"));
    assert_eq!(event.details.get("size").map(String::as_str), Some("2048"));
    assert_eq!(event.attachments, vec!["factura.pdf".to_string()]);
}

#[test]
fn described_overrides_default() {
    let event = NewTimelineEvent::new(Uuid::nil(), TimelineEventKind::Rejected).described("Missing invoice");
    assert_eq!(event.description, "Missing invoice");
}

#[test]
fn every_kind_has_a_description() {
    for raw in ["created", "submitted", "document_uploaded", "document_deleted", "validation_requested",
        "validation_completed", "comment_added", "review_started", "approved", "rejected", "info_requested", "reopened"]
    {
        let kind = TimelineEventKind::parse(raw).unwrap();
        assert!(!default_description(kind).is_empty());
    }
}

#[cfg(feature = "live-db-tests")]
#[tokio::test]
async fn record_then_list_round_trip() {
    let pool = crate::services::claims::tests_support::pool().await;
    let claim_id = crate::services::claims::tests_support::seed_claim(&pool).await;
    record(&pool, NewTimelineEvent::new(claim_id, TimelineEventKind::Created)).await.unwrap();
    record(&pool, NewTimelineEvent::new(claim_id, TimelineEventKind::Submitted).detail("from", "draft"))
        .await
        .unwrap();

    let events = list(&pool, claim_id).await.unwrap();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].kind, TimelineEventKind::Created);
    assert_eq!(events[1].details.get("from").map(String::as_str), Some("draft"));
}
