use crate::error::TaskError;
use async_trait::async_trait;
use connectors::graph::store::GraphStore;
use engine_core::{condition::LoopSummary, loader::LoadSummary};
use serde::Serialize;
use std::{sync::Arc, time::Duration};

pub mod condition_query;
pub mod file_query;

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum TaskOutcome {
    Loaded(LoadSummary),
    Drained(LoopSummary),
}

/// One change set's lifecycle: `setup`, then `validate`, then `execute`.
#[async_trait]
pub trait MigrationTask: Send + Sync {
    fn id(&self) -> &str;

    /// Resolves anything needed before validation. No remote calls.
    fn setup(&mut self) -> Result<(), TaskError> {
        Ok(())
    }

    /// Problems that would make `execute` fail; empty when the task is runnable.
    fn validate(&self) -> Vec<String>;

    async fn execute(&self, store: Arc<dyn GraphStore>) -> Result<TaskOutcome, TaskError>;

    fn confirmation_message(&self) -> String;
}

pub(crate) fn timeout_from_secs(secs: Option<u64>) -> Option<Duration> {
    secs.map(Duration::from_secs)
}
