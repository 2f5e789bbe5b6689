use crate::{error::LoopError, metrics::Metrics, settings::LoopPolicy};
use connectors::graph::store::GraphStore;
use model::query::statement::{AccessMode, QueryResult, Statement};
use serde::Serialize;
use serde_json::Value;
use std::{
    sync::Arc,
    time::{Duration, Instant},
};
use tracing::{debug, error, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Checking,
    Mutating { count: u64 },
    Done,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoopSummary {
    pub initial_count: u64,
    pub iterations: u64,
    /// Every count observed, initial check first and the final zero last.
    pub counts: Vec<u64>,
    #[serde(with = "duration_ms")]
    pub duration: Duration,
}

/// Drains a condition by repeating a bounded mutation until the condition
/// query reports zero.
///
/// Each query runs in its own transaction. The loop starts in
/// [`LoopState::Checking`] and alternates with [`LoopState::Mutating`] until
/// it reaches `Done`, or `Failed` on the first error. A mutation that does not
/// lower the count fails the loop when stall detection is on.
pub struct ConditionLoopExecutor {
    store: Arc<dyn GraphStore>,
    condition: String,
    mutation: String,
    policy: LoopPolicy,
    metrics: Metrics,
    state: LoopState,
    iterations: u64,
    counts: Vec<u64>,
}

impl ConditionLoopExecutor {
    pub fn new(
        store: Arc<dyn GraphStore>,
        condition: impl Into<String>,
        mutation: impl Into<String>,
        policy: LoopPolicy,
    ) -> Self {
        Self {
            store,
            condition: condition.into(),
            mutation: mutation.into(),
            policy,
            metrics: Metrics::new(),
            state: LoopState::Checking,
            iterations: 0,
            counts: Vec::new(),
        }
    }

    pub fn with_metrics(mut self, metrics: Metrics) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn iterations(&self) -> u64 {
        self.iterations
    }

    /// Advances the loop by one query and returns the new state.
    pub async fn step(&mut self) -> Result<LoopState, LoopError> {
        let next = match self.state {
            LoopState::Checking => self.check().await,
            LoopState::Mutating { count } => self.mutate(count).await,
            terminal => return Ok(terminal),
        };

        match next {
            Ok(state) => {
                self.state = state;
                Ok(state)
            }
            Err(e) => {
                self.state = LoopState::Failed;
                self.metrics.increment_failures();
                error!(error = %e, iterations = self.iterations, "Convergence loop failed");
                Err(e)
            }
        }
    }

    pub async fn run(mut self) -> Result<LoopSummary, LoopError> {
        let start = Instant::now();
        info!(condition = %self.condition, "Starting convergence loop");

        while self.step().await? != LoopState::Done {}

        let summary = LoopSummary {
            initial_count: self.counts.first().copied().unwrap_or(0),
            iterations: self.iterations,
            counts: self.counts,
            duration: start.elapsed(),
        };
        info!(
            initial_count = summary.initial_count,
            iterations = summary.iterations,
            duration_ms = summary.duration.as_millis(),
            "Convergence loop done"
        );
        Ok(summary)
    }

    async fn check(&mut self) -> Result<LoopState, LoopError> {
        let result = self
            .store
            .run(
                Statement::new(self.condition.as_str()),
                AccessMode::Read,
                self.policy.tx_timeout,
            )
            .await
            .map_err(LoopError::Condition)?;
        let count = parse_count(&result)?;
        let previous = self.counts.last().copied();
        self.counts.push(count);
        debug!(count, ?previous, "Condition checked");

        if count == 0 {
            return Ok(LoopState::Done);
        }
        if let Some(previous) = previous
            && self.policy.fail_on_stall
            && count >= previous
        {
            return Err(LoopError::Stalled {
                previous,
                current: count,
            });
        }
        if let Some(limit) = self.policy.max_iterations
            && self.iterations >= limit
        {
            return Err(LoopError::IterationLimit {
                limit,
                remaining: count,
            });
        }
        Ok(LoopState::Mutating { count })
    }

    async fn mutate(&mut self, count: u64) -> Result<LoopState, LoopError> {
        let result = self
            .store
            .run(
                Statement::new(self.mutation.as_str()),
                AccessMode::Write,
                self.policy.tx_timeout,
            )
            .await
            .map_err(|source| LoopError::Mutation {
                iterations: self.iterations,
                source,
            })?;

        self.iterations += 1;
        self.metrics.increment_iterations();
        info!(
            iteration = self.iterations,
            remaining_before = count,
            nodes_deleted = result.stats.nodes_deleted,
            relationships_deleted = result.stats.relationships_deleted,
            properties_set = result.stats.properties_set,
            "Mutation applied"
        );
        Ok(LoopState::Checking)
    }
}

/// Reads the count from the first column of the first row.
///
/// Accepts a JSON integer or a numeric string; a negative count reads as zero.
pub fn parse_count(result: &QueryResult) -> Result<u64, LoopError> {
    let value = result
        .first_value()
        .ok_or_else(|| LoopError::InvalidCount("no rows".to_string()))?;

    let count = match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    };

    match (count, value) {
        (Some(n), _) => Ok(n.max(0) as u64),
        (None, Value::Number(n)) if n.is_u64() => Ok(n.as_u64().unwrap_or(u64::MAX)),
        (None, other) => Err(LoopError::InvalidCount(other.to_string())),
    }
}

mod duration_ms {
    use serde::Serializer;
    use std::time::Duration;

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u128(duration.as_millis())
    }
}
