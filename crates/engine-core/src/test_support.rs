use async_trait::async_trait;
use connectors::graph::{error::GraphError, store::GraphStore};
use model::{
    pagination::offset::Offset,
    query::statement::{AccessMode, QueryResult, Statement},
    records::{
        batch::WriteBatch,
        row::{Header, ParameterRow},
    },
};
use serde_json::Value;
use std::{
    collections::{HashMap, VecDeque},
    sync::{Arc, Mutex},
    time::Duration,
};

#[derive(Debug, Clone)]
pub struct Call {
    pub statement: Statement,
    pub mode: AccessMode,
}

#[derive(Default)]
struct State {
    calls: Vec<Call>,
    failures: HashMap<usize, GraphError>,
    counts: VecDeque<Value>,
}

/// In-memory store recording every statement. Calls are numbered from 1.
#[derive(Default)]
pub struct MockGraph {
    state: Mutex<State>,
}

impl MockGraph {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn fail_call(&self, call: usize, error: GraphError) {
        self.state.lock().unwrap().failures.insert(call, error);
    }

    /// Values returned, in order, by statements run in read mode.
    pub fn with_counts(self: Arc<Self>, counts: impl IntoIterator<Item = Value>) -> Arc<Self> {
        self.state.lock().unwrap().counts.extend(counts);
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }
}

#[async_trait]
impl GraphStore for MockGraph {
    async fn run(
        &self,
        statement: Statement,
        mode: AccessMode,
        _timeout: Duration,
    ) -> Result<QueryResult, GraphError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call { statement, mode });
        let call = state.calls.len();
        if let Some(error) = state.failures.remove(&call) {
            return Err(error);
        }

        let mut result = QueryResult::default();
        if mode == AccessMode::Read {
            let count = state.counts.pop_front().unwrap_or(Value::from(0));
            result.columns = vec!["count".to_string()];
            result.rows = vec![vec![count]];
        }
        Ok(result)
    }

    async fn close(&self) -> Result<(), GraphError> {
        Ok(())
    }
}

/// A batch of `len` single-column rows with ids `first..first + len`.
pub fn batch(seq: usize, first: u64, len: u64) -> WriteBatch {
    let header = Header::new(vec!["id".to_string()]).unwrap();
    let rows = (first..first + len)
        .map(|i| ParameterRow::new(Offset::new(i), header.clone(), vec![i.to_string()]))
        .collect();
    WriteBatch::new(seq, rows)
}
