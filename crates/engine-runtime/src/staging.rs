use crate::error::TaskError;
use connectors::{
    file::delimited::format::FileFormat,
    storage::{archive, blob::BlobStore, error::StorageError},
};
use std::{
    path::{Path, PathBuf},
    sync::Arc,
};
use tokio::{fs, io::AsyncWriteExt};
use tracing::{info, warn};

const ARCHIVE_EXTENSIONS: [&str; 2] = [".zip", ".gz"];

/// Resolves a packaged data file to an extracted file in a local directory,
/// downloading and unpacking it when it is not already there.
#[derive(Clone)]
pub struct DataFileStager {
    store: Option<Arc<dyn BlobStore>>,
    local_dir: PathBuf,
    prefix: Option<String>,
}

impl DataFileStager {
    pub fn new(local_dir: impl Into<PathBuf>) -> Self {
        Self {
            store: None,
            local_dir: local_dir.into(),
            prefix: None,
        }
    }

    pub fn with_store(mut self, store: Arc<dyn BlobStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Environment prefix tried first, as `<prefix>-<file_name>`.
    pub fn with_prefix(mut self, prefix: Option<String>) -> Self {
        self.prefix = prefix.filter(|p| !p.is_empty());
        self
    }

    pub fn local_dir(&self) -> &Path {
        &self.local_dir
    }

    /// Path of the data file extracted from `file_name`: the name without its
    /// archive extension, ending in the format's extension.
    pub fn local_path(&self, file_name: &str, format: FileFormat) -> PathBuf {
        let lower = file_name.to_ascii_lowercase();
        let base = ARCHIVE_EXTENSIONS
            .iter()
            .find(|ext| lower.ends_with(*ext))
            .map_or(file_name, |ext| &file_name[..file_name.len() - ext.len()]);

        let extension = format.extension();
        if base.to_ascii_lowercase().ends_with(extension) {
            self.local_dir.join(base)
        } else {
            self.local_dir.join(format!("{base}{extension}"))
        }
    }

    pub async fn stage(&self, file_name: &str, format: FileFormat) -> Result<PathBuf, TaskError> {
        let mut target = self.local_path(file_name, format);
        if fs::try_exists(&target).await? {
            info!(path = %target.display(), "Using existing data file");
            return Ok(target);
        }

        let store = self
            .store
            .as_ref()
            .ok_or_else(|| TaskError::MissingDataFile(target.clone()))?;

        let mut blob = file_name.to_string();
        if let Some(prefix) = &self.prefix {
            let prefixed = format!("{prefix}-{file_name}");
            if store.exists(&prefixed).await? {
                info!(blob = %prefixed, "Using environment-specific data file");
                target = self.local_path(&prefixed, format);
                blob = prefixed;
            }
        }

        fs::create_dir_all(&self.local_dir).await?;
        let download = self.local_dir.join(&blob);
        info!(blob = %blob, dest = %download.display(), "Downloading data file");
        let mut file = fs::File::create(&download).await?;
        let bytes = store.fetch(&blob, &mut file).await?;
        file.flush().await?;
        drop(file);
        info!(blob = %blob, bytes, "Finished downloading data file");

        let dir = self.local_dir.clone();
        let gz_name = target
            .file_name()
            .and_then(|name| name.to_str())
            .map(String::from);
        let extracted = tokio::task::spawn_blocking(move || {
            archive::extract(&download, &dir, gz_name.as_deref())
        })
        .await
        .map_err(StorageError::from)??;

        if !extracted.contains(&target) && !fs::try_exists(&target).await? {
            return Err(TaskError::MissingEntry {
                archive: blob,
                expected: target,
            });
        }
        Ok(target)
    }

    /// Deletes a data file after a successful load.
    pub async fn cleanup(&self, path: &Path) {
        match fs::remove_file(path).await {
            Ok(()) => info!(path = %path.display(), "Deleted data file"),
            Err(e) => warn!(path = %path.display(), error = %e, "Failed to delete data file"),
        }
    }
}
