use model::pagination::offset::Offset;
use std::{num::NonZeroUsize, time::Duration};
use thiserror::Error;

pub const DEFAULT_CHUNK_SIZE: NonZeroUsize = match NonZeroUsize::new(5000) {
    Some(size) => size,
    None => unreachable!(),
};

/// Ceiling on a single write transaction.
pub const DEFAULT_TX_TIMEOUT: Duration = Duration::from_secs(15 * 60);

/// Name of the list parameter carrying a chunk's rows.
pub const DEFAULT_ROWS_PARAM: &str = "rows";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SettingsError {
    #[error("Chunk size must be greater than zero")]
    ZeroChunkSize,

    #[error("Transaction timeout must be greater than zero")]
    ZeroTimeout,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoaderSettings {
    pub chunk_size: NonZeroUsize,
    /// Data records to skip before the first chunk.
    pub start_offset: Offset,
    pub tx_timeout: Duration,
    pub rows_param: String,
}

impl Default for LoaderSettings {
    fn default() -> Self {
        LoaderSettings {
            chunk_size: DEFAULT_CHUNK_SIZE,
            start_offset: Offset::ZERO,
            tx_timeout: DEFAULT_TX_TIMEOUT,
            rows_param: DEFAULT_ROWS_PARAM.to_string(),
        }
    }
}

impl LoaderSettings {
    pub fn with_chunk_size(mut self, size: usize) -> Result<Self, SettingsError> {
        self.chunk_size = NonZeroUsize::new(size).ok_or(SettingsError::ZeroChunkSize)?;
        Ok(self)
    }

    pub fn with_start_offset(mut self, offset: Offset) -> Self {
        self.start_offset = offset;
        self
    }

    pub fn with_tx_timeout(mut self, timeout: Duration) -> Result<Self, SettingsError> {
        if timeout.is_zero() {
            return Err(SettingsError::ZeroTimeout);
        }
        self.tx_timeout = timeout;
        Ok(self)
    }

    pub fn with_rows_param(mut self, name: impl Into<String>) -> Self {
        self.rows_param = name.into();
        self
    }
}

/// Guard rails for the convergence loop.
///
/// The loop has no iteration cap unless one is configured; stall detection
/// stops a mutation that fails to lower the condition count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoopPolicy {
    pub max_iterations: Option<u64>,
    pub fail_on_stall: bool,
    pub tx_timeout: Duration,
}

impl Default for LoopPolicy {
    fn default() -> Self {
        LoopPolicy {
            max_iterations: None,
            fail_on_stall: true,
            tx_timeout: DEFAULT_TX_TIMEOUT,
        }
    }
}

impl LoopPolicy {
    pub fn with_max_iterations(mut self, limit: Option<u64>) -> Self {
        self.max_iterations = limit;
        self
    }

    pub fn with_stall_detection(mut self, enabled: bool) -> Self {
        self.fail_on_stall = enabled;
        self
    }

    pub fn with_tx_timeout(mut self, timeout: Duration) -> Result<Self, SettingsError> {
        if timeout.is_zero() {
            return Err(SettingsError::ZeroTimeout);
        }
        self.tx_timeout = timeout;
        Ok(self)
    }
}
