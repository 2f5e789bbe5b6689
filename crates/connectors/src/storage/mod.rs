pub mod archive;
pub mod azure;
pub mod blob;
pub mod error;
pub mod local;
