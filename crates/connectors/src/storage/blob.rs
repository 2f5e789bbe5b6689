use crate::storage::error::StorageError;
use async_trait::async_trait;
use tokio::io::AsyncWrite;

/// Remote store holding packaged migration data files.
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn exists(&self, name: &str) -> Result<bool, StorageError>;

    /// Streams the blob's bytes into `sink`, returning how many were written.
    async fn fetch(
        &self,
        name: &str,
        sink: &mut (dyn AsyncWrite + Unpin + Send),
    ) -> Result<u64, StorageError>;
}
