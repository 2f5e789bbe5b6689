use crate::error::CliError;
use async_trait::async_trait;
use connectors::graph::{
    neo4j::{adapter::Neo4jGraph, config::Neo4jConfig},
    store::GraphStore,
};
use tracing::{error, info};

/// Trait for "pinging" a data store
#[async_trait]
pub trait ConnectionPinger {
    /// Attempts to ping; returns Err if unreachable
    async fn ping(&self) -> Result<(), CliError>;
}

pub struct Neo4jPinger {
    pub config: Neo4jConfig,
}

#[async_trait]
impl ConnectionPinger for Neo4jPinger {
    async fn ping(&self) -> Result<(), CliError> {
        info!(host = %self.config.host, database = %self.config.database, "Pinging graph");
        let graph = Neo4jGraph::connect(self.config.clone())?;
        let result = graph.verify().await;
        graph.close().await?;

        match result {
            Ok(()) => {
                info!("Graph connection OK");
                Ok(())
            }
            Err(e) => {
                error!(error = %e, "Graph connection failed");
                Err(e.into())
            }
        }
    }
}
