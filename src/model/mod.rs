//! Domain types shared by services and routes.
//!
//! DESIGN
//! ======
//! Wire JSON is camelCase, matching what dashboard clients consume. Postgres
//! columns stay snake_case and are mapped by hand in the services. Nested
//! aggregates computed elsewhere (liquidation, validation, patient/provider
//! cards) are stored as `jsonb` and round-trip through these same types.

pub mod claim;
pub mod comment;
pub mod document;
pub mod liquidation;
pub mod timeline;
pub mod user;
pub mod validation;

pub use claim::{Claim, ClaimStatus, MAX_AMOUNT, Patient, Provider, money_problem};
pub use comment::{Comment, CommentAuthor};
pub use document::{AiValidation, Document, DocumentCategory, DocumentStatus};
pub use liquidation::LiquidationData;
pub use timeline::{TimelineEvent, TimelineEventKind};
pub use user::Role;
pub use validation::{CheckStatus, ValidationCheck, ValidationData};

/// `yyyy-mm-dd` serde helper for calendar dates.
pub mod iso_date {
    time::serde::format_description!(format, Date, "[year]-[month]-[day]");

    pub use format::{deserialize, serialize};
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
