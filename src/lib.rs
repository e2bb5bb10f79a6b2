// Library exports for the token harness
pub mod core;
pub mod contracts;
pub mod runtime;
pub mod storage;
pub mod api;
pub mod config;
pub mod metrics;

#[cfg(test)]
mod tests;
