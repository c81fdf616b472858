//! Object storage for uploaded claim documents.
//!
//! DESIGN
//! ======
//! `ObjectStore` is the seam between the document service and the hosted
//! storage API. Production uses [`http::HttpObjectStore`]; tests substitute
//! an in-memory store. Paths are bucket-relative
//! (`<claimId>/<category>/<file>`); the bucket is fixed per store.

pub mod http;

use crate::backend::BackendError;

#[async_trait::async_trait]
pub trait ObjectStore: Send + Sync {
    /// Bucket every path is resolved against.
    fn bucket(&self) -> &str;

    /// Store `bytes` at `path`. Fails if the path already exists.
    async fn upload(&self, path: &str, bytes: Vec<u8>, content_type: &str) -> Result<(), BackendError>;

    async fn download(&self, path: &str) -> Result<Vec<u8>, BackendError>;

    /// Remove the object at `path`. Returns `NotFound` if nothing was removed.
    async fn remove(&self, path: &str) -> Result<(), BackendError>;

    /// Time-limited URL a browser can fetch without credentials.
    async fn signed_url(&self, path: &str, expires_in_secs: u64) -> Result<String, BackendError>;
}

pub use http::HttpObjectStore;
