use crate::storage::{blob::BlobStore, error::StorageError};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::{
    fs,
    io::{self, AsyncWrite},
};

/// A local directory standing in for the remote share.
#[derive(Debug, Clone)]
pub struct LocalDirStore {
    root: PathBuf,
}

impl LocalDirStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        LocalDirStore { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[async_trait]
impl BlobStore for LocalDirStore {
    async fn exists(&self, name: &str) -> Result<bool, StorageError> {
        Ok(fs::try_exists(self.root.join(name)).await?)
    }

    async fn fetch(
        &self,
        name: &str,
        sink: &mut (dyn AsyncWrite + Unpin + Send),
    ) -> Result<u64, StorageError> {
        let path = self.root.join(name);
        let mut file = match fs::File::open(&path).await {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StorageError::NotFound(name.to_string()));
            }
            Err(e) => return Err(e.into()),
        };
        Ok(io::copy(&mut file, sink).await?)
    }
}
