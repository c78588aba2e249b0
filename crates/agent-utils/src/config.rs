//! Configuration management utilities

use std::env;

use serde::{Deserialize, Serialize};

use crate::logging::LogFormat;

/// Application-level configuration shared by the binaries
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Application name
    pub app_name: String,
    /// Environment (development, production, etc.)
    pub environment: String,
    /// Log output format
    pub log_format: LogFormat,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            app_name: "agent-query".to_string(),
            environment: "development".to_string(),
            log_format: LogFormat::Plain,
        }
    }
}

impl AppConfig {
    /// Defaults for the named environment
    ///
    /// Production logs JSON, everything else plain text.
    pub fn for_environment(environment: impl Into<String>) -> Self {
        let mut config = Self {
            environment: environment.into(),
            ..Self::default()
        };
        if config.is_production() {
            config.log_format = LogFormat::Json;
        }
        config
    }

    /// Defaults overridden by `APP_ENV` and `LOG_FORMAT`
    ///
    /// An unrecognized `LOG_FORMAT` is rejected rather than silently ignored.
    pub fn from_env() -> anyhow::Result<Self> {
        let mut config = match env::var("APP_ENV") {
            Ok(environment) => Self::for_environment(environment),
            Err(_) => Self::default(),
        };

        if let Ok(format) = env::var("LOG_FORMAT") {
            config.log_format = format.parse().map_err(anyhow::Error::msg)?;
        }

        Ok(config)
    }

    pub fn with_app_name(mut self, app_name: impl Into<String>) -> Self {
        self.app_name = app_name.into();
        self
    }

    /// Whether this is a production deployment
    pub fn is_production(&self) -> bool {
        matches!(self.environment.as_str(), "prod" | "production")
    }
}
