use crate::{
    binder::ParameterBinder,
    error::{BindError, LoadError, WriteError},
    metrics::Metrics,
    partition::ChunkPartitioner,
    resume::ResumeReporter,
    settings::LoaderSettings,
    writer::GraphWriteExecutor,
};
use connectors::{
    file::delimited::{format::FileFormat, source::RecordSource},
    graph::store::GraphStore,
};
use model::pagination::offset::Offset;
use serde::Serialize;
use std::{
    io::Read,
    path::Path,
    sync::Arc,
    time::Instant,
};
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoadSummary {
    pub start_offset: Offset,
    pub skipped: u64,
    pub chunks: usize,
    pub rows_committed: u64,
    /// Offset a later run would start from to continue after this one.
    pub end_offset: Offset,
    pub duration_ms: u128,
}

/// Streams a delimited file into the graph, one committed chunk at a time.
///
/// Chunks are read, bound and written strictly in order, each write awaited
/// before the next chunk is read. The first failure ends the load with the
/// offset to resume from.
pub struct BulkLoader {
    store: Arc<dyn GraphStore>,
    query: String,
    settings: LoaderSettings,
    metrics: Metrics,
}

impl BulkLoader {
    pub fn new(store: Arc<dyn GraphStore>, query: impl Into<String>, settings: LoaderSettings) -> Self {
        Self {
            store,
            query: query.into(),
            settings,
            metrics: Metrics::new(),
        }
    }

    pub fn with_metrics(mut self, metrics: Metrics) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn settings(&self) -> &LoaderSettings {
        &self.settings
    }

    /// Opens `path` at the configured start offset and loads it.
    pub async fn load_file(&self, path: &Path, format: FileFormat) -> Result<LoadSummary, LoadError> {
        let source = match RecordSource::open(path, format, self.settings.start_offset) {
            Ok(source) => source,
            Err(source) => {
                self.metrics.increment_failures();
                let resume = ResumeReporter::new(self.settings.start_offset).report(None, None);
                return Err(LoadError::Source { source, resume });
            }
        };
        self.run(source).await
    }

    pub async fn run<R: Read>(&self, source: RecordSource<R>) -> Result<LoadSummary, LoadError> {
        let started = Instant::now();
        let start_offset = source.start();
        let binder = ParameterBinder::new(source.header().clone());
        let writer = GraphWriteExecutor::new(
            self.store.clone(),
            self.query.as_str(),
            self.settings.rows_param.as_str(),
            self.settings.tx_timeout,
        );
        let mut reporter = ResumeReporter::new(start_offset);
        let mut chunks = ChunkPartitioner::new(source, self.settings.chunk_size);
        let mut written = 0;

        info!(
            start_offset = %start_offset,
            chunk_size = self.settings.chunk_size.get(),
            fields = ?binder.header().fields(),
            "Starting bulk load"
        );

        let mut failure = None;
        for next in chunks.by_ref() {
            let chunk = match next {
                Ok(chunk) => chunk,
                Err(source) => {
                    self.metrics.increment_failures();
                    let resume = reporter.report(None, None);
                    failure = Some(LoadError::Source { source, resume });
                    break;
                }
            };
            let seq = chunk.seq;

            let batch = match binder.bind_chunk(chunk) {
                Ok(batch) => batch,
                Err(source) => {
                    self.metrics.increment_failures();
                    let BindError::FieldCountMismatch { record, .. } = &source;
                    let resume = reporter.report(Some(seq), Some(record.clone()));
                    failure = Some(LoadError::FieldCountMismatch { source, resume });
                    break;
                }
            };

            match writer.write(&batch).await {
                Ok(result) => {
                    reporter.record_commit(result.rows_written, batch.last_row());
                    self.metrics.record_chunk(result.rows_written as u64);
                    written += 1;
                }
                Err(source) => {
                    self.metrics.increment_failures();
                    let last_attempted = match &source {
                        WriteError::TransactionFailure { last_row, .. } => Some(last_row.to_string()),
                        WriteError::Encode { .. } => None,
                    };
                    let resume = if source.outcome_unknown() {
                        reporter.report_unconfirmed(Some(seq), last_attempted)
                    } else {
                        reporter.report(Some(seq), last_attempted)
                    };
                    failure = Some(LoadError::TransactionFailure { source, resume });
                    break;
                }
            }
        }

        let skipped = chunks.source().skipped();
        self.metrics.increment_skipped(skipped);
        if let Some(err) = failure {
            return Err(err);
        }

        let summary = LoadSummary {
            start_offset,
            skipped,
            chunks: written,
            rows_committed: reporter.committed_rows(),
            end_offset: reporter.committed_offset(),
            duration_ms: started.elapsed().as_millis(),
        };
        info!(
            chunks = summary.chunks,
            rows = summary.rows_committed,
            skipped = summary.skipped,
            end_offset = %summary.end_offset,
            duration_ms = summary.duration_ms,
            "Bulk load complete"
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::MockGraph;
    use connectors::graph::error::GraphError;
    use std::{io::Cursor, time::Duration};

    fn source(data: &str, start: u64) -> RecordSource<Cursor<Vec<u8>>> {
        RecordSource::from_reader(
            Cursor::new(data.as_bytes().to_vec()),
            FileFormat::Tsv,
            Offset::new(start),
        )
        .unwrap()
    }

    fn settings(chunk_size: usize) -> LoaderSettings {
        LoaderSettings::default().with_chunk_size(chunk_size).unwrap()
    }

    #[tokio::test]
    async fn loads_all_rows_in_chunks() {
        let graph = MockGraph::new();
        let loader = BulkLoader::new(graph.clone(), "UNWIND $rows AS row CREATE (:N)", settings(2));

        let summary = loader
            .run(source("id\tname\n1\ta\n2\tb\n3\tc\n", 0))
            .await
            .unwrap();

        assert_eq!(summary.chunks, 2);
        assert_eq!(summary.rows_committed, 3);
        assert_eq!(summary.end_offset, Offset::new(3));
        assert_eq!(graph.calls().len(), 2);
    }

    #[tokio::test]
    async fn field_count_mismatch_reports_chunk_start() {
        let graph = MockGraph::new();
        let metrics = Metrics::new();
        let loader = BulkLoader::new(graph.clone(), "q", settings(2)).with_metrics(metrics.clone());

        let err = loader
            .run(source("id\tname\n1\ta\n2\tb\n3\n4\td\n", 0))
            .await
            .unwrap_err();

        match err {
            LoadError::FieldCountMismatch { source, resume } => {
                let BindError::FieldCountMismatch { offset, .. } = source;
                assert_eq!(offset, Offset::new(2));
                assert_eq!(resume.offset, Offset::new(2));
                assert_eq!(resume.failed_chunk, Some(2));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(graph.calls().len(), 1);
        assert_eq!(metrics.snapshot().failure_count, 1);
    }

    #[tokio::test]
    async fn transaction_failure_resumes_after_last_commit() {
        let graph = MockGraph::new();
        graph.fail_call(2, GraphError::Timeout(Duration::from_secs(1)));
        let loader = BulkLoader::new(graph.clone(), "q", settings(2));

        let err = loader
            .run(source("id\n1\n2\n3\n4\n5\n", 1))
            .await
            .unwrap_err();

        let resume = err.resume();
        assert_eq!(resume.offset, Offset::new(3));
        assert_eq!(resume.line_index, 4);
        assert_eq!(resume.last_attempted.as_deref(), Some("{id=5}"));
        assert_eq!(resume.last_committed.as_deref(), Some("{id=3}"));
        assert!(err.to_string().contains("Set start offset to 3"));
    }

    #[tokio::test]
    async fn unconfirmed_commit_is_flagged_in_resume_guidance() {
        let graph = MockGraph::new();
        graph.fail_call(2, GraphError::CommitOutcomeUnknown(Duration::from_secs(1)));
        let loader = BulkLoader::new(graph.clone(), "q", settings(2));

        let err = loader
            .run(source("id\n1\n2\n3\n4\n", 0))
            .await
            .unwrap_err();

        let resume = err.resume();
        assert_eq!(resume.offset, Offset::new(2));
        assert!(resume.commit_unconfirmed);
        assert!(err.to_string().contains("commit of chunk 2 was not confirmed"));
    }

    #[tokio::test]
    async fn skipped_records_are_counted_when_the_load_fails() {
        let graph = MockGraph::new();
        graph.fail_call(1, GraphError::Timeout(Duration::from_secs(1)));
        let metrics = Metrics::new();
        let loader = BulkLoader::new(graph, "q", settings(2)).with_metrics(metrics.clone());

        let err = loader
            .run(source("id\n1\n2\n3\n4\n5\n", 3))
            .await
            .unwrap_err();

        assert!(!err.resume().commit_unconfirmed);
        assert_eq!(metrics.snapshot().records_skipped, 3);
        assert_eq!(metrics.snapshot().failure_count, 1);
    }

    #[tokio::test]
    async fn missing_file_is_a_source_error() {
        let graph = MockGraph::new();
        let loader = BulkLoader::new(graph, "q", settings(2));
        let dir = tempfile::tempdir().unwrap();

        let err = loader
            .load_file(&dir.path().join("absent.tsv"), FileFormat::Tsv)
            .await
            .unwrap_err();

        assert!(matches!(err, LoadError::Source { .. }));
        assert_eq!(err.resume().offset, Offset::ZERO);
    }
}
