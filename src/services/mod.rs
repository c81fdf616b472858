//! Domain services used by HTTP routes.
//!
//! ARCHITECTURE
//! ============
//! Service modules own business rules and persistence so route handlers stay
//! focused on request parsing, auth, and status-code mapping. Pure rules
//! (permission table, validation, threading, formatting) sit next to the
//! queries that use them and are tested without a database.

pub mod actions;
pub mod auth;
pub mod claims;
pub mod comments;
pub mod documents;
pub mod liquidation;
pub mod report;
pub mod session;
pub mod timeline;
pub mod validation;
