#![allow(dead_code)]

pub mod graph;
pub mod utils;

mod loader;
