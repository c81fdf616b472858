//! Storage REST client (Supabase Storage compatible).
//!
//! Thin HTTP wrapper over `/object/...` endpoints. Response interpretation
//! lives in pure helpers (`error_message`, `parse_signed_url`) for testability.

use std::time::Duration;

use reqwest::StatusCode;
use serde::Deserialize;

use super::ObjectStore;
use crate::backend::BackendError;
use crate::config::{HttpTimeouts, StorageConfig};

// =============================================================================
// CLIENT
// =============================================================================

pub struct HttpObjectStore {
    http: reqwest::Client,
    base_url: String,
    service_key: String,
    bucket: String,
}

impl HttpObjectStore {
    /// Build a client for the configured bucket.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(config: &StorageConfig, timeouts: HttpTimeouts) -> Result<Self, BackendError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeouts.request_secs))
            .connect_timeout(Duration::from_secs(timeouts.connect_secs))
            .build()
            .map_err(|e| BackendError::Other(format!("storage client build failed: {e}")))?;
        Ok(Self {
            http,
            base_url: config.base_url.clone(),
            service_key: config.service_key.clone(),
            bucket: config.bucket.clone(),
        })
    }

    fn object_url(&self, path: &str) -> String {
        format!("{}/object/{}/{}", self.base_url, self.bucket, path.trim_start_matches('/'))
    }

    fn authorized(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        req.header("Authorization", format!("Bearer {}", self.service_key))
            .header("apikey", &self.service_key)
    }

    async fn check(response: reqwest::Response, path: &str) -> Result<reqwest::Response, BackendError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        if status == StatusCode::NOT_FOUND {
            return Err(BackendError::NotFound(path.to_string()));
        }
        Err(BackendError::Other(error_message(status, &body)))
    }
}

#[async_trait::async_trait]
impl ObjectStore for HttpObjectStore {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    async fn upload(&self, path: &str, bytes: Vec<u8>, content_type: &str) -> Result<(), BackendError> {
        let response = self
            .authorized(self.http.post(self.object_url(path)))
            .header("Content-Type", content_type)
            .header("x-upsert", "false")
            .header("cache-control", "max-age=3600")
            .body(bytes)
            .send()
            .await?;
        Self::check(response, path).await?;
        Ok(())
    }

    async fn download(&self, path: &str) -> Result<Vec<u8>, BackendError> {
        let response = self
            .authorized(self.http.get(self.object_url(path)))
            .send()
            .await?;
        let response = Self::check(response, path).await?;
        Ok(response.bytes().await?.to_vec())
    }

    async fn remove(&self, path: &str) -> Result<(), BackendError> {
        let response = self
            .authorized(self.http.delete(format!("{}/object/{}", self.base_url, self.bucket)))
            .json(&serde_json::json!({ "prefixes": [path] }))
            .send()
            .await?;
        let response = Self::check(response, path).await?;
        let removed: Vec<serde_json::Value> = response.json().await?;
        if removed.is_empty() {
            return Err(BackendError::NotFound(path.to_string()));
        }
        Ok(())
    }

    async fn signed_url(&self, path: &str, expires_in_secs: u64) -> Result<String, BackendError> {
        let response = self
            .authorized(self.http.post(format!(
                "{}/object/sign/{}/{}",
                self.base_url,
                self.bucket,
                path.trim_start_matches('/')
            )))
            .json(&serde_json::json!({ "expiresIn": expires_in_secs }))
            .send()
            .await?;
        let response = Self::check(response, path).await?;
        let body = response.text().await?;
        parse_signed_url(&self.base_url, &body)
    }
}

// =============================================================================
// PARSING
// =============================================================================

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Deserialize)]
struct SignedUrlBody {
    #[serde(rename = "signedURL", alias = "signedUrl")]
    signed_url: String,
}

/// Pull the most specific message out of a storage error body.
fn error_message(status: StatusCode, body: &str) -> String {
    let parsed = serde_json::from_str::<ErrorBody>(body).ok();
    parsed
        .and_then(|b| b.message.or(b.error))
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| {
            if body.trim().is_empty() {
                format!("storage request failed with status {status}")
            } else {
                body.trim().to_string()
            }
        })
}

/// The API answers with a path relative to the storage root; make it absolute.
fn parse_signed_url(base_url: &str, body: &str) -> Result<String, BackendError> {
    let parsed: SignedUrlBody = serde_json::from_str(body)
        .map_err(|e| BackendError::Other(format!("unexpected signed URL response: {e}")))?;
    if parsed.signed_url.starts_with("http://") || parsed.signed_url.starts_with("https://") {
        return Ok(parsed.signed_url);
    }
    Ok(format!("{}/{}", base_url.trim_end_matches('/'), parsed.signed_url.trim_start_matches('/')))
}

#[cfg(test)]
#[path = "http_test.rs"]
mod tests;
