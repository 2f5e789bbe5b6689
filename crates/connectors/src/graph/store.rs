use crate::graph::error::GraphError;
use async_trait::async_trait;
use model::query::statement::{AccessMode, QueryResult, Statement};
use std::time::Duration;

const VERIFY_TIMEOUT: Duration = Duration::from_secs(30);

/// Connection to a remote graph store.
///
/// One handle is acquired per run and shared by every chunk write and loop
/// iteration; the owner must call [`GraphStore::close`] on every exit path.
#[async_trait]
pub trait GraphStore: Send + Sync {
    /// Runs `statement` in its own transaction and commits it.
    ///
    /// A transaction that times out before its commit is sent is rolled back
    /// and reported as [`GraphError::Timeout`]; nothing it wrote stays
    /// visible. Expiry while the commit is unanswered is reported as
    /// [`GraphError::CommitOutcomeUnknown`].
    async fn run(
        &self,
        statement: Statement,
        mode: AccessMode,
        timeout: Duration,
    ) -> Result<QueryResult, GraphError>;

    /// Releases the connection. Further calls to `run` fail with
    /// [`GraphError::Closed`].
    async fn close(&self) -> Result<(), GraphError>;

    /// Round-trips a trivial read query.
    async fn verify(&self) -> Result<(), GraphError> {
        let result = self
            .run(Statement::new("RETURN 1"), AccessMode::Read, VERIFY_TIMEOUT)
            .await?;

        match result.first_value().and_then(|v| v.as_i64()) {
            Some(1) => Ok(()),
            other => Err(GraphError::UnexpectedResult(format!(
                "RETURN 1 produced {other:?}"
            ))),
        }
    }
}
