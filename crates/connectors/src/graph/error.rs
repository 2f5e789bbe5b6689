use std::time::Duration;
use thiserror::Error;

/// Errors raised by a remote graph store.
#[derive(Debug, Error)]
pub enum GraphError {
    #[error("Invalid credentials: expected \"user,password\"")]
    InvalidCredentials,

    #[error("Invalid graph host: {0}")]
    InvalidHost(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Unexpected HTTP status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Query failed [{code}]: {message}")]
    Query { code: String, message: String },

    #[error("Transaction exceeded timeout of {0:?}")]
    Timeout(Duration),

    /// The commit was sent but no answer arrived before the deadline, so the
    /// transaction may or may not have been applied.
    #[error("Commit not confirmed within {0:?}; the transaction may have been applied")]
    CommitOutcomeUnknown(Duration),

    #[error("Store did not open a transaction: {0}")]
    MissingTransaction(String),

    #[error("Unexpected result: {0}")]
    UnexpectedResult(String),

    #[error("Graph session already closed")]
    Closed,
}
