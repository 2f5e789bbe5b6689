pub mod error;
pub mod neo4j;
pub mod store;
