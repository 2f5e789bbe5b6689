use crate::graph::error::GraphError;
use std::fmt;

pub const DEFAULT_DATABASE: &str = "neo4j";

/// Connection settings for a Neo4j server's HTTP endpoint.
#[derive(Clone, PartialEq, Eq)]
pub struct Neo4jConfig {
    pub host: String,
    pub username: String,
    pub password: String,
    pub database: String,
}

impl Neo4jConfig {
    /// Builds a config from the `user,password` credential pair used by
    /// migration changelogs.
    pub fn from_credentials(
        host: &str,
        credentials: &str,
        database: Option<&str>,
    ) -> Result<Self, GraphError> {
        let (username, password) = credentials
            .split_once(',')
            .ok_or(GraphError::InvalidCredentials)?;
        if username.trim().is_empty() {
            return Err(GraphError::InvalidCredentials);
        }

        let host = host.trim().trim_end_matches('/');
        if !(host.starts_with("http://") || host.starts_with("https://")) {
            return Err(GraphError::InvalidHost(format!(
                "{host} (the HTTP API endpoint is required, e.g. http://localhost:7474)"
            )));
        }

        Ok(Neo4jConfig {
            host: host.to_string(),
            username: username.trim().to_string(),
            password: password.to_string(),
            database: database
                .filter(|db| !db.trim().is_empty())
                .unwrap_or(DEFAULT_DATABASE)
                .to_string(),
        })
    }

    pub(crate) fn begin_url(&self) -> String {
        format!("{}/db/{}/tx", self.host, self.database)
    }
}

impl fmt::Debug for Neo4jConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Neo4jConfig")
            .field("host", &self.host)
            .field("username", &self.username)
            .field("password", &"***")
            .field("database", &self.database)
            .finish()
    }
}
