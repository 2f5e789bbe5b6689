use super::{MigrationTask, TaskOutcome, timeout_from_secs};
use crate::{changelog::FileQueryChange, error::TaskError, staging::DataFileStager};
use async_trait::async_trait;
use connectors::{file::delimited::format::FileFormat, graph::store::GraphStore};
use engine_core::{
    loader::BulkLoader,
    metrics::Metrics,
    settings::{DEFAULT_ROWS_PARAM, LoaderSettings},
};
use model::{pagination::offset::Offset, query::statement::Statement};
use std::sync::Arc;
use tracing::info;

/// Stages a data file and streams it through the bulk loader.
pub struct FileQueryTask {
    id: String,
    change: FileQueryChange,
    stager: DataFileStager,
    metrics: Metrics,
    format: Option<FileFormat>,
}

impl FileQueryTask {
    pub fn new(id: impl Into<String>, change: FileQueryChange, stager: DataFileStager) -> Self {
        Self {
            id: id.into(),
            change,
            stager,
            metrics: Metrics::new(),
            format: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Metrics) -> Self {
        self.metrics = metrics;
        self
    }

    /// Start offset of the first data record, from the line-based `start_at`.
    pub fn start_offset(&self) -> Offset {
        Offset::from_line_index(self.change.start_at)
    }

    fn settings(&self) -> Result<LoaderSettings, TaskError> {
        let mut settings = LoaderSettings::default().with_start_offset(self.start_offset());
        if let Some(size) = self.change.chunk_size {
            settings = settings.with_chunk_size(size)?;
        }
        if let Some(timeout) = timeout_from_secs(self.change.tx_timeout_secs) {
            settings = settings.with_tx_timeout(timeout)?;
        }
        Ok(settings)
    }
}

#[async_trait]
impl MigrationTask for FileQueryTask {
    fn id(&self) -> &str {
        &self.id
    }

    fn setup(&mut self) -> Result<(), TaskError> {
        self.format = Some(self.change.file_type.parse()?);
        Ok(())
    }

    fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if self.change.query.trim().is_empty() {
            errors.push("query is empty".to_string());
        } else if !Statement::references_param(&self.change.query, DEFAULT_ROWS_PARAM) {
            errors.push(format!(
                "query does not reference ${DEFAULT_ROWS_PARAM}; every chunk is passed as that list"
            ));
        }
        if self.change.file_name.trim().is_empty() {
            errors.push("file_name is empty".to_string());
        }
        if self.change.file_type.parse::<FileFormat>().is_err() {
            errors.push(format!(
                "file_type \"{}\" is not one of CSV, TSV, PSV",
                self.change.file_type
            ));
        }
        if self.change.chunk_size == Some(0) {
            errors.push("chunk_size must be greater than zero".to_string());
        }
        if self.change.tx_timeout_secs == Some(0) {
            errors.push("tx_timeout_secs must be greater than zero".to_string());
        }
        errors
    }

    async fn execute(&self, store: Arc<dyn GraphStore>) -> Result<TaskOutcome, TaskError> {
        let format = self.format.ok_or(TaskError::NotSetUp)?;
        let settings = self.settings()?;
        let path = self.stager.stage(&self.change.file_name, format).await?;

        info!(
            id = %self.id,
            file = %path.display(),
            start_at = self.change.start_at,
            "Loading data file"
        );
        let summary = BulkLoader::new(store, self.change.query.as_str(), settings)
            .with_metrics(self.metrics.clone())
            .load_file(&path, format)
            .await?;

        if !self.change.keep_files {
            self.stager.cleanup(&path).await;
        }
        Ok(TaskOutcome::Loaded(summary))
    }

    fn confirmation_message(&self) -> String {
        format!("Loaded {} into the graph", self.change.file_name)
    }
}
