use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Whether a transaction may mutate the graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessMode {
    Read,
    Write,
}

impl AccessMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccessMode::Read => "READ",
            AccessMode::Write => "WRITE",
        }
    }
}

impl fmt::Display for AccessMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A query text plus its named parameters.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Statement {
    #[serde(rename = "statement")]
    pub text: String,
    pub parameters: Map<String, Value>,
}

impl Statement {
    pub fn new(text: impl Into<String>) -> Self {
        Statement {
            text: text.into(),
            parameters: Map::new(),
        }
    }

    pub fn with_param(mut self, name: impl Into<String>, value: Value) -> Self {
        self.parameters.insert(name.into(), value);
        self
    }

    /// True when the query text references `$name` as a whole parameter.
    pub fn references_param(text: &str, name: &str) -> bool {
        let needle = format!("${name}");
        text.match_indices(&needle).any(|(idx, _)| {
            text[idx + needle.len()..]
                .chars()
                .next()
                .is_none_or(|c| !(c.is_alphanumeric() || c == '_'))
        })
    }
}

/// Update counters reported by the store for one statement.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct QueryStats {
    #[serde(default)]
    pub contains_updates: bool,
    #[serde(default)]
    pub nodes_created: u64,
    #[serde(default)]
    pub nodes_deleted: u64,
    #[serde(default)]
    pub relationships_created: u64,
    #[serde(default, alias = "relationship_deleted")]
    pub relationships_deleted: u64,
    #[serde(default)]
    pub properties_set: u64,
}

/// Tabular result of one statement.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryResult {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
    pub stats: QueryStats,
}

impl QueryResult {
    pub fn first_value(&self) -> Option<&Value> {
        self.rows.first().and_then(|row| row.first())
    }
}
