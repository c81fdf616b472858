//! Dashboard entry points — role redirect and query-driven navigation.

use axum::extract::Query;
use axum::response::{Json, Redirect};
use serde::{Deserialize, Serialize};

use crate::model::Role;
use crate::routes::auth::AuthUser;

/// Detail view tab selected by `?tab=`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Tab {
    #[default]
    Overview,
    Claims,
    Documents,
    Timeline,
    Comments,
    Liquidation,
    Validation,
}

impl Tab {
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "overview" => Some(Self::Overview),
            "claims" => Some(Self::Claims),
            "documents" => Some(Self::Documents),
            "timeline" => Some(Self::Timeline),
            "comments" => Some(Self::Comments),
            "liquidation" => Some(Self::Liquidation),
            "validation" => Some(Self::Validation),
            _ => None,
        }
    }
}

/// Shortcut opened by `?action=`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NavAction {
    Upload,
    NewClaim,
    Comment,
}

impl NavAction {
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "upload" => Some(Self::Upload),
            "new_claim" => Some(Self::NewClaim),
            "comment" => Some(Self::Comment),
            _ => None,
        }
    }

    /// Tab the shortcut lives on.
    #[must_use]
    pub fn tab(self) -> Tab {
        match self {
            Self::Upload => Tab::Documents,
            Self::NewClaim => Tab::Claims,
            Self::Comment => Tab::Comments,
        }
    }

    /// Analysts never upload; only affiliates open claims.
    #[must_use]
    pub fn available_to(self, role: Role) -> bool {
        match self {
            Self::Upload => role != Role::Analyst,
            Self::NewClaim => role == Role::Affiliate,
            Self::Comment => true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Navigation {
    pub tab: Tab,
    pub action: Option<NavAction>,
}

/// Resolve `tab`/`action` query values.
///
/// Unknown or missing tabs fall back to the action's tab, then to overview.
/// Unknown actions, and actions the role cannot take, are dropped.
#[must_use]
pub fn resolve_navigation(role: Role, tab: Option<&str>, action: Option<&str>) -> Navigation {
    let action = action
        .and_then(NavAction::parse)
        .filter(|a| a.available_to(role));
    let tab = tab
        .and_then(Tab::parse)
        .or_else(|| action.map(NavAction::tab))
        .unwrap_or_default();
    Navigation { tab, action }
}

#[derive(Debug, Deserialize)]
pub struct NavigationQuery {
    pub tab: Option<String>,
    pub action: Option<String>,
}

/// `GET /dashboard` — send the user to their role's landing route.
pub async fn dashboard_redirect(auth: AuthUser) -> Redirect {
    Redirect::temporary(auth.user.role.landing_route())
}

/// `GET /api/navigation?tab=&action=` — resolved navigation state.
pub async fn navigation(auth: AuthUser, Query(query): Query<NavigationQuery>) -> Json<Navigation> {
    Json(resolve_navigation(auth.user.role, query.tab.as_deref(), query.action.as_deref()))
}

#[cfg(test)]
#[path = "dashboard_test.rs"]
mod tests;
