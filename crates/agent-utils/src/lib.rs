//! Shared utilities for the agent-query workspace
//!
//! Logging setup and application-level configuration used by the binaries.

pub mod config;
pub mod logging;

pub use config::AppConfig;
pub use logging::{LogFormat, init_tracing, init_tracing_with};
