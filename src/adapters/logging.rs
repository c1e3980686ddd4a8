//! Tracing subscriber setup from the `[logging]` section.

use crate::ports::config_port::ConfigPort;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Debug, Clone, PartialEq)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
    pub ansi: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: "pretty".into(),
            ansi: true,
        }
    }
}

impl LoggingConfig {
    pub fn from_config(config: &dyn ConfigPort) -> Self {
        let defaults = Self::default();
        Self {
            level: config
                .get_string("logging", "level")
                .unwrap_or(defaults.level),
            format: config
                .get_string("logging", "format")
                .unwrap_or(defaults.format),
            ansi: config.get_bool("logging", "ansi", defaults.ansi),
        }
    }

    /// Install the global subscriber. `RUST_LOG` overrides the configured level.
    /// A second call is a no-op.
    pub fn init(&self) {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&self.level));

        let result = match self.format.as_str() {
            "json" => fmt()
                .json()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .try_init(),
            _ => fmt()
                .with_env_filter(filter)
                .with_ansi(self.ansi)
                .with_writer(std::io::stderr)
                .try_init(),
        };
        if result.is_err() {
            tracing::debug!("tracing subscriber already installed");
        }
    }
}
