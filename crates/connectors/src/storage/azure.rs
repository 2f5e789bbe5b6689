use crate::storage::{blob::BlobStore, error::StorageError};
use async_trait::async_trait;
use reqwest::{Client, StatusCode, header::RANGE};
use std::fmt;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::{debug, info};

pub const DEFAULT_SHARE: &str = "knowledge-graph";
pub const DEFAULT_DIRECTORY: &str = "migration";

/// Size of each ranged download request.
const DOWNLOAD_CHUNK_BYTES: u64 = 100 * 1024 * 1024;

/// An Azure Files directory reached over HTTPS with a shared access signature.
pub struct AzureFileShare {
    client: Client,
    base_url: String,
    sas_token: Option<String>,
}

impl AzureFileShare {
    pub fn new(base_url: &str, sas_token: Option<String>) -> Result<Self, StorageError> {
        let base_url = base_url.trim().trim_end_matches('/');
        if !(base_url.starts_with("https://") || base_url.starts_with("http://")) {
            return Err(StorageError::InvalidUrl(base_url.to_string()));
        }

        Ok(AzureFileShare {
            client: Client::builder().build()?,
            base_url: base_url.to_string(),
            sas_token: sas_token
                .map(|token| token.trim_start_matches('?').to_string())
                .filter(|token| !token.is_empty()),
        })
    }

    /// `directory` of the file `share` in storage account `account`.
    pub fn for_account(
        account: &str,
        share: &str,
        directory: &str,
        sas_token: Option<String>,
    ) -> Result<Self, StorageError> {
        let directory = directory.trim_matches('/');
        let url = format!("https://{account}.file.core.windows.net/{share}/{directory}");
        Self::new(&url, sas_token)
    }

    fn file_url(&self, name: &str) -> String {
        match &self.sas_token {
            Some(token) => format!("{}/{}?{}", self.base_url, name, token),
            None => format!("{}/{}", self.base_url, name),
        }
    }

    async fn content_length(&self, name: &str) -> Result<u64, StorageError> {
        let response = self.client.head(self.file_url(name)).send().await?;
        match response.status() {
            StatusCode::NOT_FOUND => Err(StorageError::NotFound(name.to_string())),
            status if status.is_success() => Ok(response.content_length().unwrap_or(0)),
            status => Err(StorageError::Status {
                status: status.as_u16(),
                name: name.to_string(),
            }),
        }
    }
}

impl fmt::Debug for AzureFileShare {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AzureFileShare")
            .field("base_url", &self.base_url)
            .field("sas_token", &self.sas_token.as_ref().map(|_| "***"))
            .finish()
    }
}

#[async_trait]
impl BlobStore for AzureFileShare {
    async fn exists(&self, name: &str) -> Result<bool, StorageError> {
        match self.content_length(name).await {
            Ok(_) => Ok(true),
            Err(StorageError::NotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn fetch(
        &self,
        name: &str,
        sink: &mut (dyn AsyncWrite + Unpin + Send),
    ) -> Result<u64, StorageError> {
        let total = self.content_length(name).await?;
        let mut written = 0u64;

        for (start, end) in byte_ranges(total, DOWNLOAD_CHUNK_BYTES) {
            let mut response = self
                .client
                .get(self.file_url(name))
                .header(RANGE, format!("bytes={start}-{end}"))
                .send()
                .await?;

            let status = response.status();
            if !status.is_success() {
                return Err(StorageError::Status {
                    status: status.as_u16(),
                    name: name.to_string(),
                });
            }

            while let Some(bytes) = response.chunk().await? {
                sink.write_all(&bytes).await?;
                written += bytes.len() as u64;
            }
            info!(file = name, downloaded = written, total, "Downloaded range");
        }

        sink.flush().await?;
        debug!(file = name, bytes = written, "Finished download");
        Ok(written)
    }
}

/// Inclusive byte ranges covering `total` bytes in `chunk`-sized pieces.
fn byte_ranges(total: u64, chunk: u64) -> Vec<(u64, u64)> {
    let mut ranges = Vec::new();
    let mut start = 0;
    while start < total {
        let end = (start + chunk).min(total) - 1;
        ranges.push((start, end));
        start = end + 1;
    }
    ranges
}
