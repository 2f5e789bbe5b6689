use connectors::{
    file::delimited::error::FileError, graph::error::GraphError, storage::error::StorageError,
};
use engine_core::{
    error::{LoadError, LoopError},
    settings::SettingsError,
};
use std::path::PathBuf;
use thiserror::Error;

/// Problems reading or resolving a changelog.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid changelog: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid env file {path} at line {line}: {reason}")]
    EnvFile {
        path: PathBuf,
        line: usize,
        reason: String,
    },

    #[error("Unresolved variable ${{{0}}}")]
    UnresolvedVariable(String),

    #[error("Unterminated placeholder in \"{0}\"")]
    UnterminatedPlaceholder(String),
}

/// Failure of a single change set.
#[derive(Debug, Error)]
pub enum TaskError {
    #[error("Invalid file type: {0}")]
    Format(#[from] FileError),

    #[error("Invalid settings: {0}")]
    Settings(#[from] SettingsError),

    #[error("Data file {0} is not present locally and no blob store is configured")]
    MissingDataFile(PathBuf),

    #[error("Archive {archive} did not contain {expected}")]
    MissingEntry { archive: String, expected: PathBuf },

    #[error("Staging failed: {0}")]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Loop(#[from] LoopError),

    #[error("Task used before setup")]
    NotSetUp,
}

impl From<std::io::Error> for TaskError {
    fn from(e: std::io::Error) -> Self {
        TaskError::Storage(StorageError::Io(e))
    }
}

/// Errors ending a changelog run.
#[derive(Debug, Error)]
pub enum ChangelogError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Changelog validation failed:\n  - {}", .0.join("\n  - "))]
    Validation(Vec<String>),

    #[error("Unknown change set: {0}")]
    UnknownChange(String),

    #[error("Graph connection failed: {0}")]
    Graph(#[from] GraphError),

    #[error("Blob store setup failed: {0}")]
    Storage(#[from] StorageError),

    #[error("Change set {id} failed: {source}")]
    Task {
        id: String,
        #[source]
        source: TaskError,
    },
}
