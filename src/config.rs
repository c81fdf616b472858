//! Service configuration parsed from environment variables.
//!
//! `main` loads an optional `.env` first (via `dotenvy`), so every value
//! here may come from either the process environment or that file.

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_STORAGE_BUCKET: &str = "claim-documents";
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = crate::services::documents::MAX_FILE_BYTES;
pub const DEFAULT_SIGNED_URL_TTL_SECS: u64 = 3600;
pub const DEFAULT_HTTP_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_HTTP_CONNECT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required env var {var}")]
    Missing { var: String },
    #[error("invalid value for {var}: {value:?}")]
    Invalid { var: String, value: String },
}

/// Timeouts applied to every outbound HTTP client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HttpTimeouts {
    pub request_secs: u64,
    pub connect_secs: u64,
}

/// Object storage endpoint, e.g. `https://<project>.supabase.co/storage/v1`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageConfig {
    pub base_url: String,
    pub service_key: String,
    pub bucket: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub database_url: String,
    pub port: u16,
    pub storage: StorageConfig,
    pub max_upload_bytes: u64,
    pub signed_url_ttl_secs: u64,
    pub timeouts: HttpTimeouts,
    /// HTML→PDF renderer base URL. Report export is disabled when absent.
    pub pdf_renderer_url: Option<String>,
    pub report_logo_url: Option<String>,
    pub cookie_secure: bool,
}

impl AppConfig {
    /// Build typed config from environment variables.
    ///
    /// Required:
    /// - `DATABASE_URL`
    /// - `STORAGE_URL`
    /// - `STORAGE_SERVICE_KEY`
    ///
    /// Optional:
    /// - `PORT`: default 3000
    /// - `STORAGE_BUCKET`: default `claim-documents`
    /// - `MAX_UPLOAD_BYTES`: default 10 MiB
    /// - `SIGNED_URL_TTL_SECS`: default 3600
    /// - `HTTP_REQUEST_TIMEOUT_SECS` / `HTTP_CONNECT_TIMEOUT_SECS`: default 30 / 10
    /// - `PDF_RENDERER_URL`, `REPORT_LOGO_URL`
    /// - `COOKIE_SECURE`: defaults to true when `STORAGE_URL` is https
    ///
    /// # Errors
    ///
    /// Returns an error if a required variable is missing or `PORT` is not a port number.
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url = required("DATABASE_URL")?;
        let port = match non_empty("PORT") {
            Some(raw) => raw
                .parse::<u16>()
                .map_err(|_| ConfigError::Invalid { var: "PORT".into(), value: raw })?,
            None => DEFAULT_PORT,
        };

        let storage = StorageConfig {
            base_url: required("STORAGE_URL")?.trim_end_matches('/').to_string(),
            service_key: required("STORAGE_SERVICE_KEY")?,
            bucket: non_empty("STORAGE_BUCKET").unwrap_or_else(|| DEFAULT_STORAGE_BUCKET.to_string()),
        };

        let cookie_secure = env_bool("COOKIE_SECURE").unwrap_or_else(|| storage.base_url.starts_with("https://"));

        Ok(Self {
            database_url,
            port,
            max_upload_bytes: env_parse("MAX_UPLOAD_BYTES", DEFAULT_MAX_UPLOAD_BYTES),
            signed_url_ttl_secs: env_parse("SIGNED_URL_TTL_SECS", DEFAULT_SIGNED_URL_TTL_SECS),
            timeouts: HttpTimeouts {
                request_secs: env_parse("HTTP_REQUEST_TIMEOUT_SECS", DEFAULT_HTTP_REQUEST_TIMEOUT_SECS),
                connect_secs: env_parse("HTTP_CONNECT_TIMEOUT_SECS", DEFAULT_HTTP_CONNECT_TIMEOUT_SECS),
            },
            pdf_renderer_url: non_empty("PDF_RENDERER_URL").map(|url| url.trim_end_matches('/').to_string()),
            report_logo_url: non_empty("REPORT_LOGO_URL"),
            cookie_secure,
            storage,
        })
    }
}

fn required(key: &str) -> Result<String, ConfigError> {
    non_empty(key).ok_or_else(|| ConfigError::Missing { var: key.into() })
}

fn non_empty(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

pub(crate) fn env_parse<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr + Copy,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<T>().ok())
        .unwrap_or(default)
}

pub(crate) fn env_bool(key: &str) -> Option<bool> {
    std::env::var(key)
        .ok()
        .and_then(|raw| match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Some(true),
            "0" | "false" | "no" | "off" => Some(false),
            _ => None,
        })
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
