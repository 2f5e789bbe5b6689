use crate::graph::{
    error::GraphError,
    neo4j::{
        config::Neo4jConfig,
        wire::{TxRequest, TxResponse},
    },
    store::GraphStore,
};
use async_trait::async_trait;
use model::query::statement::{AccessMode, QueryResult, Statement};
use reqwest::{Client, header::LOCATION};
use std::{
    sync::atomic::{AtomicBool, Ordering},
    time::{Duration, Instant},
};
use tokio::time;
use tracing::{debug, info, warn};

const ACCESS_MODE_HEADER: &str = "access-mode";
const ROLLBACK_TIMEOUT: Duration = Duration::from_secs(10);

/// [`GraphStore`] backed by the Neo4j HTTP transaction API.
///
/// Each [`GraphStore::run`] opens an explicit transaction, runs the statement
/// inside it and commits. Both steps share one deadline. A transaction that
/// times out before the commit is sent is deleted and fails with
/// [`GraphError::Timeout`]; once the commit is in flight the server may
/// already have applied it, so expiry then fails with
/// [`GraphError::CommitOutcomeUnknown`].
pub struct Neo4jGraph {
    client: Client,
    config: Neo4jConfig,
    closed: AtomicBool,
}

impl Neo4jGraph {
    pub fn connect(config: Neo4jConfig) -> Result<Self, GraphError> {
        let client = Client::builder().build()?;
        info!(host = %config.host, database = %config.database, "Opened graph session");
        Ok(Neo4jGraph {
            client,
            config,
            closed: AtomicBool::new(false),
        })
    }

    pub fn config(&self) -> &Neo4jConfig {
        &self.config
    }

    async fn post(
        &self,
        url: &str,
        body: &TxRequest<'_>,
        mode: AccessMode,
    ) -> Result<(Option<String>, TxResponse), GraphError> {
        let response = self
            .client
            .post(url)
            .basic_auth(&self.config.username, Some(&self.config.password))
            .header(ACCESS_MODE_HEADER, mode.as_str())
            .json(body)
            .send()
            .await?;

        let status = response.status();
        let location = response
            .headers()
            .get(LOCATION)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GraphError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed = response.json::<TxResponse>().await?;
        Ok((location, parsed))
    }

    async fn rollback(&self, tx_url: &str) {
        let request = self
            .client
            .delete(tx_url)
            .basic_auth(&self.config.username, Some(&self.config.password))
            .send();

        match time::timeout(ROLLBACK_TIMEOUT, request).await {
            Ok(Ok(resp)) if resp.status().is_success() => {
                debug!(tx = tx_url, "Rolled back transaction");
            }
            // The server already discards a transaction whose statement failed.
            Ok(Ok(resp)) => {
                debug!(tx = tx_url, status = %resp.status(), "Rollback not applied");
            }
            Ok(Err(error)) => {
                warn!(tx = tx_url, %error, "Failed to roll back transaction");
            }
            Err(_) => {
                warn!(tx = tx_url, "Rollback timed out");
            }
        }
    }
}

#[async_trait]
impl GraphStore for Neo4jGraph {
    async fn run(
        &self,
        statement: Statement,
        mode: AccessMode,
        timeout: Duration,
    ) -> Result<QueryResult, GraphError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(GraphError::Closed);
        }

        let started = Instant::now();
        let deadline = time::Instant::now() + timeout;
        let request = TxRequest::single(&statement);

        let (location, opened) = time::timeout_at(
            deadline,
            self.post(&self.config.begin_url(), &request, mode),
        )
        .await
        .map_err(|_| GraphError::Timeout(timeout))??;

        let tx_url = location.or_else(|| {
            opened
                .commit
                .as_deref()
                .map(|commit| commit.trim_end_matches("/commit").to_string())
        });

        if let Some(error) = opened.error() {
            if let Some(url) = &tx_url {
                self.rollback(url).await;
            }
            return Err(error);
        }

        let Some(commit_url) = opened.commit.clone() else {
            if let Some(url) = &tx_url {
                self.rollback(url).await;
            }
            return Err(GraphError::MissingTransaction(
                "response carried no commit URL".into(),
            ));
        };
        let tx_url = tx_url.unwrap_or_else(|| commit_url.clone());
        let result = opened.into_result();

        match time::timeout_at(deadline, self.post(&commit_url, &TxRequest::empty(), mode)).await
        {
            Ok(Ok((_, committed))) => {
                if let Some(error) = committed.error() {
                    return Err(error);
                }
                debug!(
                    %mode,
                    rows = result.rows.len(),
                    elapsed_ms = started.elapsed().as_millis(),
                    "Committed transaction"
                );
                Ok(result)
            }
            Ok(Err(error)) => {
                self.rollback(&tx_url).await;
                Err(error)
            }
            Err(_) => {
                warn!(tx = %tx_url, ?timeout, "Commit not confirmed before the deadline");
                self.rollback(&tx_url).await;
                Err(GraphError::CommitOutcomeUnknown(timeout))
            }
        }
    }

    async fn close(&self) -> Result<(), GraphError> {
        if !self.closed.swap(true, Ordering::SeqCst) {
            info!(host = %self.config.host, "Closed graph session");
        }
        Ok(())
    }
}
