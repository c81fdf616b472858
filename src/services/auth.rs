//! Email/password login for the three dashboard roles.
//!
//! The form is validated synchronously on every submit and reports each broken
//! rule with its own message. Credentials are then checked against
//! `user_profiles`; the account's role must match the role picked on the form.

use rand::Rng;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use sqlx::{PgPool, Row};
use tracing::info;
use uuid::Uuid;

use crate::backend::BackendError;
use crate::model::Role;
use crate::services::session::{SessionUser, bytes_to_hex};

pub const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, thiserror::Error)]
pub enum LoginError {
    #[error("Email is required")]
    EmailRequired,
    #[error("Enter a valid email address")]
    EmailInvalid,
    #[error("Password is required")]
    PasswordRequired,
    #[error("Password must be at least {min} characters")]
    PasswordTooShort { min: usize },
    #[error("Select a role to continue")]
    RoleRequired,
    #[error("Invalid email or password")]
    InvalidCredentials,
    #[error("This account is not registered as {0}")]
    RoleMismatch(&'static str),
    #[error("{0}")]
    Backend(#[from] BackendError),
}

impl LoginError {
    /// Form field the message belongs to.
    #[must_use]
    pub fn field(&self) -> &'static str {
        match self {
            Self::EmailRequired | Self::EmailInvalid => "email",
            Self::PasswordRequired | Self::PasswordTooShort { .. } => "password",
            Self::RoleRequired | Self::RoleMismatch(_) => "role",
            Self::InvalidCredentials | Self::Backend(_) => "form",
        }
    }
}

impl From<sqlx::Error> for LoginError {
    fn from(err: sqlx::Error) -> Self {
        Self::Backend(err.into())
    }
}

/// Raw login form; every field may be missing.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub role: Option<String>,
}

/// A form that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub email: String,
    pub password: String,
    pub role: Role,
}

#[must_use]
pub fn normalize_email(email: &str) -> Option<String> {
    let normalized = email.trim().to_ascii_lowercase();
    if normalized.chars().any(char::is_whitespace) {
        return None;
    }
    let (local, domain) = normalized.split_once('@')?;
    if local.is_empty() || domain.contains('@') {
        return None;
    }
    let (host, tld) = domain.rsplit_once('.')?;
    if host.is_empty() || tld.is_empty() {
        return None;
    }
    Some(normalized)
}

/// Check every field and collect one error per broken field.
///
/// # Errors
///
/// All field errors found, in form order (email, password, role).
pub fn validate_form(form: &LoginForm) -> Result<Credentials, Vec<LoginError>> {
    let mut errors = Vec::new();

    let email = if form.email.trim().is_empty() {
        errors.push(LoginError::EmailRequired);
        None
    } else {
        let normalized = normalize_email(&form.email);
        if normalized.is_none() {
            errors.push(LoginError::EmailInvalid);
        }
        normalized
    };

    if form.password.is_empty() {
        errors.push(LoginError::PasswordRequired);
    } else if form.password.chars().count() < MIN_PASSWORD_LEN {
        errors.push(LoginError::PasswordTooShort { min: MIN_PASSWORD_LEN });
    }

    let role = form.role.as_deref().map(str::trim).and_then(Role::parse);
    if role.is_none() {
        errors.push(LoginError::RoleRequired);
    }

    match (email, role) {
        (Some(email), Some(role)) if errors.is_empty() => Ok(Credentials { email, password: form.password.clone(), role }),
        _ => Err(errors),
    }
}

fn salted_digest(salt: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    bytes_to_hex(&hasher.finalize())
}

/// Hash a password under a fresh random salt, stored as `<salt>$<digest>`.
#[must_use]
pub fn hash_password(password: &str) -> String {
    let salt: [u8; 16] = rand::rng().random();
    let salt = bytes_to_hex(&salt);
    let digest = salted_digest(&salt, password);
    format!("{salt}${digest}")
}

/// Check a password against a stored `<salt>$<digest>` value.
#[must_use]
pub fn verify_password(stored: &str, password: &str) -> bool {
    stored
        .split_once('$')
        .is_some_and(|(salt, digest)| !salt.is_empty() && salted_digest(salt, password) == digest)
}

/// Stored account as read for login.
#[derive(Debug, Clone)]
pub struct Account {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub password_hash: String,
}

/// Decide a login against the account found for the email, if any.
///
/// # Errors
///
/// `InvalidCredentials` for an unknown email or wrong password, `RoleMismatch`
/// when the account has a different role than the one selected.
pub fn resolve_login(account: Option<&Account>, credentials: &Credentials) -> Result<SessionUser, LoginError> {
    let account = account.ok_or(LoginError::InvalidCredentials)?;
    if !verify_password(&account.password_hash, &credentials.password) {
        return Err(LoginError::InvalidCredentials);
    }
    if account.role != credentials.role {
        return Err(LoginError::RoleMismatch(credentials.role.as_str()));
    }
    Ok(SessionUser { id: account.id, name: account.name.clone(), email: account.email.clone(), role: account.role })
}

/// Look up the account and check the credentials.
///
/// # Errors
///
/// See [`resolve_login`]; also a backend error if the lookup fails.
pub async fn authenticate(pool: &PgPool, credentials: &Credentials) -> Result<SessionUser, LoginError> {
    let row = sqlx::query("SELECT id, name, email, role, password_hash FROM user_profiles WHERE email = $1")
        .bind(&credentials.email)
        .fetch_optional(pool)
        .await?;

    let account = row.and_then(|r| {
        let role: String = r.get("role");
        Some(Account {
            id: r.get("id"),
            name: r.get("name"),
            email: r.get("email"),
            role: Role::parse(&role)?,
            password_hash: r.get("password_hash"),
        })
    });

    let user = resolve_login(account.as_ref(), credentials)?;
    info!(user_id = %user.id, role = user.role.as_str(), "login succeeded");
    Ok(user)
}

#[cfg(test)]
#[path = "auth_test.rs"]
mod tests;
