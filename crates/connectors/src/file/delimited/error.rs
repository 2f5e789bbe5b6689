use model::records::row::HeaderError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FileError {
    #[error("Source unavailable: {path}: {source}")]
    SourceUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Source has no header line")]
    MissingHeader,

    #[error("Invalid header: {0}")]
    InvalidHeader(#[from] HeaderError),

    #[error("Error reading line {line}: {source}")]
    Read {
        line: u64,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed record at line {line}: {source}")]
    Parse {
        line: u64,
        #[source]
        source: csv::Error,
    },

    #[error("Unknown file type: {0}")]
    UnknownFormat(String),
}
