pub mod changelog;
pub mod env;
pub mod error;
pub mod executor;
pub mod staging;
pub mod tasks;
