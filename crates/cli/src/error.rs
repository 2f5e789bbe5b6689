use connectors::{file::delimited::error::FileError, graph::error::GraphError};
use engine_core::{
    error::{LoadError, LoopError},
    settings::SettingsError,
};
use engine_runtime::error::{ChangelogError, ConfigError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("Failed to load configuration: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Changelog(#[from] ChangelogError),

    #[error("Invalid file type: {0}")]
    FileType(#[from] FileError),

    #[error("Invalid settings: {0}")]
    Settings(#[from] SettingsError),

    #[error("Bulk load failed: {0}")]
    Load(#[from] LoadError),

    #[error("Convergence loop failed: {0}")]
    Loop(#[from] LoopError),

    #[error("Graph error: {0}")]
    Graph(#[from] GraphError),

    #[error("Failed to write output: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to serialize data to JSON: {0}")]
    JsonSerialize(#[from] serde_json::Error),
}
