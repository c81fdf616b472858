//! User roles.

use serde::{Deserialize, Serialize};

/// The three dashboard roles. Each has a fixed landing route after login.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Affiliate,
    Analyst,
    Admin,
}

impl Role {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Affiliate => "affiliate",
            Self::Analyst => "analyst",
            Self::Admin => "admin",
        }
    }

    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim() {
            "affiliate" => Some(Self::Affiliate),
            "analyst" => Some(Self::Analyst),
            "admin" => Some(Self::Admin),
            _ => None,
        }
    }

    /// Route a freshly logged-in user lands on.
    #[must_use]
    pub fn landing_route(self) -> &'static str {
        match self {
            Self::Affiliate => "/affiliate/dashboard",
            Self::Analyst => "/analyst/dashboard",
            Self::Admin => "/admin/analytics",
        }
    }

    /// Analysts and admins see every claim; affiliates only their own.
    #[must_use]
    pub fn is_staff(self) -> bool {
        matches!(self, Self::Analyst | Self::Admin)
    }
}
