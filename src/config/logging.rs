//! Logging configuration.

use serde::Deserialize;
use tracing_subscriber::EnvFilter;

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Tracing filter directive (e.g. "info", "guest_concierge=debug").
    #[serde(default = "default_filter")]
    pub filter: String,

    /// Emit JSON-formatted log lines.
    #[serde(default)]
    pub json: bool,
}

impl LoggingConfig {
    /// Initializes the global tracing subscriber.
    ///
    /// Safe to call more than once; subsequent calls are no-ops. The host
    /// binary calls this once at startup.
    pub fn init_tracing(&self) {
        let filter = EnvFilter::try_new(&self.filter)
            .unwrap_or_else(|_| EnvFilter::new(default_filter()));

        let builder = tracing_subscriber::fmt().with_env_filter(filter);

        let result = if self.json {
            builder.json().try_init()
        } else {
            builder.try_init()
        };

        // Already-initialized is fine (tests, embedded use).
        let _ = result;
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_filter(),
            json: false,
        }
    }
}

fn default_filter() -> String {
    "info".to_string()
}
