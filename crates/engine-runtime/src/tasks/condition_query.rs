use super::{MigrationTask, TaskOutcome, timeout_from_secs};
use crate::{changelog::ConditionQueryChange, error::TaskError};
use async_trait::async_trait;
use connectors::graph::store::GraphStore;
use engine_core::{condition::ConditionLoopExecutor, metrics::Metrics, settings::LoopPolicy};
use std::sync::Arc;
use tracing::info;

/// Runs a mutation repeatedly until its condition query reports zero.
pub struct ConditionQueryTask {
    id: String,
    change: ConditionQueryChange,
    metrics: Metrics,
}

impl ConditionQueryTask {
    pub fn new(id: impl Into<String>, change: ConditionQueryChange) -> Self {
        Self {
            id: id.into(),
            change,
            metrics: Metrics::new(),
        }
    }

    pub fn with_metrics(mut self, metrics: Metrics) -> Self {
        self.metrics = metrics;
        self
    }

    fn policy(&self) -> Result<LoopPolicy, TaskError> {
        let mut policy = LoopPolicy::default()
            .with_max_iterations(self.change.max_iterations)
            .with_stall_detection(self.change.fail_on_stall);
        if let Some(timeout) = timeout_from_secs(self.change.tx_timeout_secs) {
            policy = policy.with_tx_timeout(timeout)?;
        }
        Ok(policy)
    }
}

#[async_trait]
impl MigrationTask for ConditionQueryTask {
    fn id(&self) -> &str {
        &self.id
    }

    fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if self.change.query.trim().is_empty() {
            errors.push("query is empty".to_string());
        }
        if self.change.condition_query.trim().is_empty() {
            errors.push("condition_query is empty".to_string());
        }
        if self.change.max_iterations == Some(0) {
            errors.push("max_iterations must be greater than zero".to_string());
        }
        if self.change.tx_timeout_secs == Some(0) {
            errors.push("tx_timeout_secs must be greater than zero".to_string());
        }
        errors
    }

    async fn execute(&self, store: Arc<dyn GraphStore>) -> Result<TaskOutcome, TaskError> {
        info!(id = %self.id, query = %self.change.query, "Draining condition");
        let summary = ConditionLoopExecutor::new(
            store,
            self.change.condition_query.as_str(),
            self.change.query.as_str(),
            self.policy()?,
        )
        .with_metrics(self.metrics.clone())
        .run()
        .await?;
        Ok(TaskOutcome::Drained(summary))
    }

    fn confirmation_message(&self) -> String {
        format!("Condition of {} drained", self.id)
    }
}
