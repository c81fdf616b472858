//! Error categorization at the service-wrapper boundary.
//!
//! ERROR HANDLING
//! ==============
//! Every call into Postgres or the object-storage API funnels its failure
//! through `BackendError`. Network-unreachable failures collapse into one
//! user-facing message; everything else keeps the backend's own message so
//! callers can surface it verbatim. There is no retry at this layer.

/// Message shown to users when a backend cannot be reached at all.
pub const UNREACHABLE_MESSAGE: &str = "Cannot connect to the server. Check your connection and try again.";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BackendError {
    /// Connection refused, DNS failure, timeout, or closed pool.
    #[error("{}", UNREACHABLE_MESSAGE)]
    Unreachable { detail: String },
    #[error("not found: {0}")]
    NotFound(String),
    /// Any other backend failure, carrying the backend's message.
    #[error("{0}")]
    Other(String),
}

impl BackendError {
    #[must_use]
    pub fn is_unreachable(&self) -> bool {
        matches!(self, Self::Unreachable { .. })
    }
}

impl From<reqwest::Error> for BackendError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_connect() || err.is_timeout() {
            Self::Unreachable { detail: err.to_string() }
        } else {
            Self::Other(err.to_string())
        }
    }
}

impl From<sqlx::Error> for BackendError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Io(_) | sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => {
                Self::Unreachable { detail: err.to_string() }
            }
            sqlx::Error::RowNotFound => Self::NotFound("row".into()),
            other => Self::Other(other.to_string()),
        }
    }
}

#[cfg(test)]
#[path = "backend_test.rs"]
mod tests;
