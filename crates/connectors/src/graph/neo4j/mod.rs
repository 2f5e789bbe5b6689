pub mod adapter;
pub mod config;
mod wire;
