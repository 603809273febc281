//! Port for photo evidence storage.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::errors::DomainResult;

#[async_trait]
pub trait PhotoStorage: Send + Sync {
    /// Store an image for a record and return a stable URL for it.
    async fn upload(&self, record_id: Uuid, file_name: &str, bytes: &[u8]) -> DomainResult<String>;

    /// Delete a previously uploaded image by URL.
    async fn delete(&self, url: &str) -> DomainResult<()>;
}
