use crate::{
    changelog::{Change, Changelog, StorageSection},
    env::EnvVars,
    error::ChangelogError,
    staging::DataFileStager,
    tasks::{
        MigrationTask, TaskOutcome, condition_query::ConditionQueryTask, file_query::FileQueryTask,
    },
};
use chrono::{DateTime, Utc};
use connectors::{
    graph::{
        neo4j::{adapter::Neo4jGraph, config::Neo4jConfig},
        store::GraphStore,
    },
    storage::{azure::AzureFileShare, blob::BlobStore, local::LocalDirStore},
};
use engine_core::metrics::{Metrics, MetricsSnapshot};
use serde::Serialize;
use std::{
    collections::HashSet,
    path::{Path, PathBuf},
    sync::Arc,
};
use tracing::{error, info, warn};

#[derive(Debug, Clone, Serialize)]
pub struct CompletedChange {
    pub id: String,
    pub message: String,
    pub outcome: TaskOutcome,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub completed: Vec<CompletedChange>,
    pub metrics: MetricsSnapshot,
}

/// Runs the change sets of a changelog in order over one graph session.
pub struct ChangelogExecutor {
    changelog: Changelog,
    env: EnvVars,
    local_dir: PathBuf,
    metrics: Metrics,
}

impl ChangelogExecutor {
    /// `default_local_dir` is used when the changelog names no staging directory.
    pub fn new(changelog: Changelog, env: EnvVars, default_local_dir: impl Into<PathBuf>) -> Self {
        let local_dir = changelog
            .staging
            .local_dir
            .clone()
            .unwrap_or_else(|| default_local_dir.into());
        Self {
            changelog,
            env,
            local_dir,
            metrics: Metrics::new(),
        }
    }

    pub fn changelog(&self) -> &Changelog {
        &self.changelog
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    pub fn graph_config(&self) -> Result<Neo4jConfig, ChangelogError> {
        let graph = &self.changelog.graph;
        Ok(Neo4jConfig::from_credentials(
            &graph.host,
            &graph.credentials,
            graph.database.as_deref(),
        )?)
    }

    fn blob_store(&self) -> Result<Option<Arc<dyn BlobStore>>, ChangelogError> {
        let store: Arc<dyn BlobStore> = match &self.changelog.storage {
            None => return Ok(None),
            Some(StorageSection::AzureFileShare {
                account,
                sas_token,
                share,
                directory,
            }) => Arc::new(AzureFileShare::for_account(
                account,
                share,
                directory,
                sas_token.clone(),
            )?),
            Some(StorageSection::LocalDir { path }) => Arc::new(LocalDirStore::new(path.clone())),
        };
        Ok(Some(store))
    }

    fn stager(&self, local_dir: Option<&Path>, store: Option<Arc<dyn BlobStore>>) -> DataFileStager {
        let stager = DataFileStager::new(local_dir.unwrap_or(&self.local_dir))
            .with_prefix(self.env.datafiles_prefix().map(str::to_string));
        match store {
            Some(store) => stager.with_store(store),
            None => stager,
        }
    }

    /// Builds and sets up the tasks to run, in changelog order. An empty
    /// `only` selects every change set.
    pub fn tasks(&self, only: &[String]) -> Result<Vec<Box<dyn MigrationTask>>, ChangelogError> {
        for id in only {
            if self.changelog.change(id).is_none() {
                return Err(ChangelogError::UnknownChange(id.clone()));
            }
        }

        let store = self.blob_store()?;
        let mut tasks: Vec<Box<dyn MigrationTask>> = Vec::new();
        for change in &self.changelog.changes {
            if !only.is_empty() && !only.contains(&change.id) {
                continue;
            }
            let mut task: Box<dyn MigrationTask> = match &change.change {
                Change::FileQuery(file) => Box::new(
                    FileQueryTask::new(
                        change.id.as_str(),
                        file.clone(),
                        self.stager(file.local_dir.as_deref(), store.clone()),
                    )
                    .with_metrics(self.metrics.clone()),
                ),
                Change::ConditionQuery(cond) => Box::new(
                    ConditionQueryTask::new(change.id.as_str(), cond.clone())
                        .with_metrics(self.metrics.clone()),
                ),
            };
            // Setup failures surface through validation.
            if let Err(e) = task.setup() {
                warn!(id = %change.id, error = %e, "Task setup failed");
            }
            tasks.push(task);
        }
        Ok(tasks)
    }

    /// Every problem in the changelog, each prefixed with its change set id.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        let mut seen = HashSet::new();
        for change in &self.changelog.changes {
            if change.id.trim().is_empty() {
                errors.push("change set with an empty id".to_string());
            } else if !seen.insert(change.id.as_str()) {
                errors.push(format!("{}: duplicate change set id", change.id));
            }
        }
        if let Err(e) = self.graph_config() {
            errors.push(format!("graph: {e}"));
        }

        match self.tasks(&[]) {
            Ok(tasks) => {
                for task in &tasks {
                    errors.extend(task.validate().into_iter().map(|e| format!("{}: {e}", task.id())));
                }
            }
            Err(e) => errors.push(e.to_string()),
        }
        errors
    }

    /// Connects to the configured graph, runs, and closes the session on
    /// every exit path.
    pub async fn run_connected(&self, only: &[String]) -> Result<RunReport, ChangelogError> {
        let graph: Arc<dyn GraphStore> = Arc::new(Neo4jGraph::connect(self.graph_config()?)?);
        let result = self.run(graph.clone(), only).await;
        if let Err(e) = graph.close().await {
            warn!(error = %e, "Failed to close graph session");
        }
        result
    }

    /// Validates, then runs the selected change sets in order on `store`,
    /// stopping at the first failure.
    pub async fn run(
        &self,
        store: Arc<dyn GraphStore>,
        only: &[String],
    ) -> Result<RunReport, ChangelogError> {
        let errors = self.validate();
        if !errors.is_empty() {
            return Err(ChangelogError::Validation(errors));
        }

        let started_at = Utc::now();
        let tasks = self.tasks(only)?;
        let mut completed = Vec::with_capacity(tasks.len());
        info!(changes = tasks.len(), "Running changelog");

        for task in tasks {
            info!(id = %task.id(), "Running change set");
            match task.execute(store.clone()).await {
                Ok(outcome) => {
                    let message = task.confirmation_message();
                    info!(id = %task.id(), %message, "Change set complete");
                    completed.push(CompletedChange {
                        id: task.id().to_string(),
                        message,
                        outcome,
                    });
                }
                Err(source) => {
                    error!(id = %task.id(), error = %source, "Change set failed");
                    return Err(ChangelogError::Task {
                        id: task.id().to_string(),
                        source,
                    });
                }
            }
        }

        let report = RunReport {
            started_at,
            finished_at: Utc::now(),
            completed,
            metrics: self.metrics.snapshot(),
        };
        info!(
            changes = report.completed.len(),
            rows = report.metrics.records_committed,
            iterations = report.metrics.loop_iterations,
            "Changelog complete"
        );
        Ok(report)
    }
}
