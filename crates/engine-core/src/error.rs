use crate::resume::ResumePoint;
use connectors::{file::delimited::error::FileError, graph::error::GraphError};
use model::{pagination::offset::Offset, records::row::ParameterRow};
use thiserror::Error;

/// A record could not be bound to the header.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BindError {
    #[error(
        "Field count mismatch at offset {offset}: header has {expected} fields, record has {found}: {record}"
    )]
    FieldCountMismatch {
        offset: Offset,
        expected: usize,
        found: usize,
        record: String,
    },
}

/// A chunk's write transaction failed or timed out.
#[derive(Debug, Error)]
pub enum WriteError {
    #[error("Transaction failed for chunk {chunk} ({rows} rows, last row {last_row}): {source}")]
    TransactionFailure {
        chunk: usize,
        rows: usize,
        last_row: ParameterRow,
        #[source]
        source: GraphError,
    },

    #[error("Failed to encode chunk {chunk} parameters: {source}")]
    Encode {
        chunk: usize,
        #[source]
        source: serde_json::Error,
    },
}

impl WriteError {
    /// Whether the chunk may have committed even though the write failed.
    pub fn outcome_unknown(&self) -> bool {
        matches!(
            self,
            WriteError::TransactionFailure {
                source: GraphError::CommitOutcomeUnknown(_),
                ..
            }
        )
    }
}

/// Errors ending a bulk load. Each carries the point to resume from.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Failed to read source: {source}. {resume}")]
    Source {
        #[source]
        source: FileError,
        resume: ResumePoint,
    },

    #[error("{source}. {resume}")]
    FieldCountMismatch {
        #[source]
        source: BindError,
        resume: ResumePoint,
    },

    #[error("{source}. {resume}")]
    TransactionFailure {
        #[source]
        source: WriteError,
        resume: ResumePoint,
    },
}

impl LoadError {
    pub fn resume(&self) -> &ResumePoint {
        match self {
            LoadError::Source { resume, .. }
            | LoadError::FieldCountMismatch { resume, .. }
            | LoadError::TransactionFailure { resume, .. } => resume,
        }
    }
}

/// Errors ending a convergence loop.
#[derive(Debug, Error)]
pub enum LoopError {
    #[error("Condition query failed: {0}")]
    Condition(#[source] GraphError),

    #[error("Mutation query failed after {iterations} iterations: {source}")]
    Mutation {
        iterations: u64,
        #[source]
        source: GraphError,
    },

    #[error("Condition query must return one integer, got {0}")]
    InvalidCount(String),

    #[error("Condition count did not decrease ({previous} -> {current}); the mutation makes no progress")]
    Stalled { previous: u64, current: u64 },

    #[error("Condition still {remaining} after the limit of {limit} iterations")]
    IterationLimit { limit: u64, remaining: u64 },
}
