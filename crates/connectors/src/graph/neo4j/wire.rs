//! JSON bodies of the Neo4j HTTP transaction API.

use crate::graph::error::GraphError;
use model::query::statement::{QueryResult, QueryStats, Statement};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Serialize)]
pub(super) struct TxRequest<'a> {
    pub statements: Vec<WireStatement<'a>>,
}

impl<'a> TxRequest<'a> {
    pub fn single(statement: &'a Statement) -> Self {
        TxRequest {
            statements: vec![WireStatement {
                statement: &statement.text,
                parameters: &statement.parameters,
                include_stats: true,
            }],
        }
    }

    pub fn empty() -> Self {
        TxRequest {
            statements: Vec::new(),
        }
    }
}

#[derive(Debug, Serialize)]
pub(super) struct WireStatement<'a> {
    pub statement: &'a str,
    pub parameters: &'a Map<String, Value>,
    #[serde(rename = "includeStats")]
    pub include_stats: bool,
}

#[derive(Debug, Deserialize)]
pub(super) struct TxResponse {
    #[serde(default)]
    pub results: Vec<WireResult>,
    #[serde(default)]
    pub errors: Vec<WireError>,
    pub commit: Option<String>,
}

impl TxResponse {
    /// First reported error, if any.
    pub fn error(&self) -> Option<GraphError> {
        self.errors.first().map(|e| GraphError::Query {
            code: e.code.clone(),
            message: e.message.clone(),
        })
    }

    pub fn into_result(self) -> QueryResult {
        match self.results.into_iter().next() {
            Some(result) => QueryResult {
                columns: result.columns,
                rows: result.data.into_iter().map(|d| d.row).collect(),
                stats: result.stats.unwrap_or_default(),
            },
            None => QueryResult::default(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct WireResult {
    #[serde(default)]
    pub columns: Vec<String>,
    #[serde(default)]
    pub data: Vec<WireRow>,
    pub stats: Option<QueryStats>,
}

#[derive(Debug, Deserialize)]
pub(super) struct WireRow {
    #[serde(default)]
    pub row: Vec<Value>,
}

#[derive(Debug, Deserialize)]
pub(super) struct WireError {
    pub code: String,
    pub message: String,
}
