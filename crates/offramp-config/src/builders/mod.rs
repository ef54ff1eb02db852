//! Builders for assembling configurations in code.

mod config;

pub use config::ConfigBuilder;
