use super::*;

#[test]
fn missing_tab_is_overview() {
    assert_eq!(resolve_navigation(Role::Affiliate, None, None), Navigation { tab: Tab::Overview, action: None });
}

#[test]
fn unknown_tab_falls_back_to_overview() {
    let nav = resolve_navigation(Role::Analyst, Some("settings"), None);
    assert_eq!(nav.tab, Tab::Overview);
}

#[test]
fn every_tab_parses() {
    for (raw, tab) in [
        ("overview", Tab::Overview),
        ("claims", Tab::Claims),
        ("documents", Tab::Documents),
        ("timeline", Tab::Timeline),
        ("comments", Tab::Comments),
        ("liquidation", Tab::Liquidation),
        ("VALIDATION", Tab::Validation),
    ] {
        assert_eq!(Tab::parse(raw), Some(tab), "{raw}");
    }
}

#[test]
fn upload_action_opens_documents() {
    let nav = resolve_navigation(Role::Affiliate, None, Some("upload"));
    assert_eq!(nav, Navigation { tab: Tab::Documents, action: Some(NavAction::Upload) });
}

#[test]
fn explicit_tab_wins_over_action_tab() {
    let nav = resolve_navigation(Role::Affiliate, Some("claims"), Some("comment"));
    assert_eq!(nav.tab, Tab::Claims);
    assert_eq!(nav.action, Some(NavAction::Comment));
}

#[test]
fn unknown_action_is_ignored() {
    let nav = resolve_navigation(Role::Admin, Some("timeline"), Some("explode"));
    assert_eq!(nav, Navigation { tab: Tab::Timeline, action: None });
}

#[test]
fn role_limits_actions() {
    assert_eq!(resolve_navigation(Role::Analyst, None, Some("upload")).action, None);
    assert_eq!(resolve_navigation(Role::Analyst, None, Some("new_claim")).action, None);
    assert_eq!(resolve_navigation(Role::Admin, None, Some("upload")).action, Some(NavAction::Upload));
    assert_eq!(resolve_navigation(Role::Affiliate, None, Some("new_claim")).tab, Tab::Claims);
}

#[test]
fn navigation_serializes_snake_case() {
    let json = serde_json::to_value(resolve_navigation(Role::Affiliate, None, Some("new_claim"))).unwrap();
    assert_eq!(json, serde_json::json!({ "tab": "claims", "action": "new_claim" }));
}
