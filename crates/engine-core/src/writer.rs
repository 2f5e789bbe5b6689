use crate::error::WriteError;
use connectors::graph::store::GraphStore;
use model::{
    query::statement::{AccessMode, QueryStats, Statement},
    records::batch::WriteBatch,
};
use std::{
    sync::Arc,
    time::{Duration, Instant},
};
use tracing::{error, info};

#[derive(Debug, Clone)]
pub struct WriteResult {
    pub rows_written: usize,
    pub duration: Duration,
    pub stats: QueryStats,
}

/// Submits each batch as one write transaction, passing every row in a single
/// list parameter. Failures are reported, never retried.
pub struct GraphWriteExecutor {
    store: Arc<dyn GraphStore>,
    query: String,
    rows_param: String,
    timeout: Duration,
}

impl GraphWriteExecutor {
    pub fn new(
        store: Arc<dyn GraphStore>,
        query: impl Into<String>,
        rows_param: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            store,
            query: query.into(),
            rows_param: rows_param.into(),
            timeout,
        }
    }

    pub async fn write(&self, batch: &WriteBatch) -> Result<WriteResult, WriteError> {
        let start = Instant::now();
        let Some(last_row) = batch.last_row() else {
            return Ok(WriteResult {
                rows_written: 0,
                duration: start.elapsed(),
                stats: QueryStats::default(),
            });
        };

        info!(
            chunk = batch.seq,
            row_count = batch.len(),
            "Writing chunk to graph store"
        );

        let rows = serde_json::to_value(&batch.rows).map_err(|source| WriteError::Encode {
            chunk: batch.seq,
            source,
        })?;
        let statement = Statement::new(self.query.as_str()).with_param(self.rows_param.as_str(), rows);

        let result = self
            .store
            .run(statement, AccessMode::Write, self.timeout)
            .await
            .map_err(|source| {
                error!(chunk = batch.seq, error = %source, "Chunk transaction failed");
                WriteError::TransactionFailure {
                    chunk: batch.seq,
                    rows: batch.len(),
                    last_row: last_row.clone(),
                    source,
                }
            })?;

        let duration = start.elapsed();
        let rows_written = batch.len();
        let rows_per_sec = rows_written as f64 / duration.as_secs_f64().max(f64::EPSILON);

        info!(
            chunk = batch.seq,
            rows = rows_written,
            nodes_created = result.stats.nodes_created,
            relationships_created = result.stats.relationships_created,
            duration_ms = duration.as_millis(),
            rows_per_sec = %format!("{:.2}", rows_per_sec),
            "Chunk committed"
        );

        Ok(WriteResult {
            rows_written,
            duration,
            stats: result.stats,
        })
    }
}
