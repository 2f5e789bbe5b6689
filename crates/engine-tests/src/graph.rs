use async_trait::async_trait;
use connectors::graph::{error::GraphError, store::GraphStore};
use model::query::statement::{AccessMode, QueryResult, QueryStats, Statement};
use serde_json::Value;
use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
    time::Duration,
};

/// How the scripted store answers a failing call.
#[derive(Debug, Clone, Copy)]
pub enum Failure {
    Timeout,
    Query,
}

impl Failure {
    fn into_error(self, timeout: Duration) -> GraphError {
        match self {
            Failure::Timeout => GraphError::Timeout(timeout),
            Failure::Query => GraphError::Query {
                code: "Neo.TransientError.Transaction.DeadlockDetected".to_string(),
                message: "scripted failure".to_string(),
            },
        }
    }
}

#[derive(Debug, Default)]
struct State {
    /// Rows of every committed chunk write, in commit order.
    committed: Vec<Vec<Value>>,
    write_attempts: usize,
    read_calls: usize,
    mutations: usize,
    write_failures: HashMap<usize, Failure>,
    read_failures: HashMap<usize, Failure>,
    remaining: u64,
    per_mutation: u64,
    closed: bool,
}

/// In-memory graph store driven by a script.
///
/// Writes carrying a `rows` list are recorded as chunk commits. Writes
/// without parameters are condition mutations and lower the scripted count
/// by `per_mutation`; reads return that count. Failing calls commit nothing.
#[derive(Debug, Default)]
pub struct ScriptedGraph {
    state: Mutex<State>,
}

impl ScriptedGraph {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_condition(initial: u64, per_mutation: u64) -> Arc<Self> {
        let graph = Self::default();
        {
            let mut state = graph.state.lock().unwrap();
            state.remaining = initial;
            state.per_mutation = per_mutation;
        }
        Arc::new(graph)
    }

    /// Fails the `n`th write attempt (1-based).
    pub fn fail_write(&self, n: usize, failure: Failure) {
        self.state.lock().unwrap().write_failures.insert(n, failure);
    }

    /// Fails the `n`th read (1-based).
    pub fn fail_read(&self, n: usize, failure: Failure) {
        self.state.lock().unwrap().read_failures.insert(n, failure);
    }

    pub fn committed(&self) -> Vec<Vec<Value>> {
        self.state.lock().unwrap().committed.clone()
    }

    /// The `id` field of every committed row, in commit order.
    pub fn committed_ids(&self) -> Vec<String> {
        self.committed()
            .iter()
            .flatten()
            .filter_map(|row| row.get("id").and_then(Value::as_str).map(str::to_string))
            .collect()
    }

    pub fn write_attempts(&self) -> usize {
        self.state.lock().unwrap().write_attempts
    }

    pub fn mutations(&self) -> usize {
        self.state.lock().unwrap().mutations
    }

    pub fn remaining(&self) -> u64 {
        self.state.lock().unwrap().remaining
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().unwrap().closed
    }
}

#[async_trait]
impl GraphStore for ScriptedGraph {
    async fn run(
        &self,
        statement: Statement,
        mode: AccessMode,
        timeout: Duration,
    ) -> Result<QueryResult, GraphError> {
        let mut state = self.state.lock().unwrap();
        if state.closed {
            return Err(GraphError::Closed);
        }

        match mode {
            AccessMode::Read => {
                state.read_calls += 1;
                let call = state.read_calls;
                if let Some(failure) = state.read_failures.remove(&call) {
                    return Err(failure.into_error(timeout));
                }
                if statement.text == "RETURN 1" {
                    return Ok(single(Value::from(1)));
                }
                Ok(single(Value::from(state.remaining)))
            }
            AccessMode::Write => {
                state.write_attempts += 1;
                let call = state.write_attempts;
                if let Some(failure) = state.write_failures.remove(&call) {
                    return Err(failure.into_error(timeout));
                }

                let mut stats = QueryStats::default();
                match statement.parameters.get("rows") {
                    Some(Value::Array(rows)) => {
                        stats.contains_updates = true;
                        stats.nodes_created = rows.len() as u64;
                        state.committed.push(rows.clone());
                    }
                    _ => {
                        let removed = state.per_mutation.min(state.remaining);
                        state.remaining -= removed;
                        state.mutations += 1;
                        stats.contains_updates = removed > 0;
                        stats.nodes_deleted = removed;
                    }
                }
                Ok(QueryResult {
                    stats,
                    ..Default::default()
                })
            }
        }
    }

    async fn close(&self) -> Result<(), GraphError> {
        self.state.lock().unwrap().closed = true;
        Ok(())
    }
}

fn single(value: Value) -> QueryResult {
    QueryResult {
        columns: vec!["count".to_string()],
        rows: vec![vec![value]],
        ..Default::default()
    }
}
