pub mod file;
pub mod graph;
pub mod storage;
