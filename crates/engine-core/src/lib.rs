pub mod binder;
pub mod condition;
pub mod error;
pub mod loader;
pub mod metrics;
pub mod partition;
pub mod resume;
pub mod settings;
pub mod writer;

#[cfg(test)]
mod test_support;
