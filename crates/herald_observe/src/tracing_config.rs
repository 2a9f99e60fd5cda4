//! Subscriber setup for processes embedding Herald.
//!
//! [`TracingConfig`] installs a global `tracing` subscriber with one of the
//! [`TracingFormat`] layouts. Herald itself only emits events; nothing is
//! printed until a subscriber is installed.
//!
//! # Example
//!
//! ```
//! use herald_observe::{TracingConfig, TracingFormat};
//! use tracing::Level;
//!
//! // Development: pretty output with debug level
//! let dev = TracingConfig::new()
//!     .with_level(Level::DEBUG)
//!     .with_format(TracingFormat::Pretty);
//!
//! // Production: JSON for log aggregation
//! let prod = TracingConfig::new()
//!     .with_format(TracingFormat::Json)
//!     .with_env_filter("herald_hooks=info,herald_observe=warn");
//!
//! dev.init();
//! # let _ = prod;
//! ```

use tracing::Level;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};

// ─────────────────────────────────────────────────────────────────────────────
// TracingFormat
// ─────────────────────────────────────────────────────────────────────────────

/// Tracing output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TracingFormat {
    /// Human-readable colored output (default).
    #[default]
    Pretty,
    /// Compact single-line output.
    Compact,
    /// JSON structured output for log aggregation.
    Json,
}

// ─────────────────────────────────────────────────────────────────────────────
// TracingConfig
// ─────────────────────────────────────────────────────────────────────────────

/// Global subscriber configuration.
///
/// Without an explicit filter, `RUST_LOG` is honoured and `level` is the
/// fallback when it is unset or invalid.
#[derive(Debug, Clone)]
pub struct TracingConfig {
    /// Maximum log level.
    pub level: Level,
    /// Output format.
    pub format: TracingFormat,
    env_filter: Option<String>,
    span_events: bool,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            format: TracingFormat::Pretty,
            env_filter: None,
            span_events: false,
        }
    }
}

impl TracingConfig {
    /// Creates a configuration with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the maximum log level.
    #[must_use]
    pub fn with_level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    /// Sets the output format.
    #[must_use]
    pub fn with_format(mut self, format: TracingFormat) -> Self {
        self.format = format;
        self
    }

    /// Sets a filter directive string, e.g. `herald_hooks=trace,warn`.
    ///
    /// Takes precedence over `RUST_LOG`.
    #[must_use]
    pub fn with_env_filter(mut self, filter: impl Into<String>) -> Self {
        self.env_filter = Some(filter.into());
        self
    }

    /// Enables span enter/exit events in output.
    #[must_use]
    pub fn with_span_events(mut self, enabled: bool) -> Self {
        self.span_events = enabled;
        self
    }

    /// Returns the filter directive string, if one was set.
    #[must_use]
    pub fn env_filter(&self) -> Option<&str> {
        self.env_filter.as_deref()
    }

    /// Returns `true` if span enter/exit events are enabled.
    #[must_use]
    pub fn span_events(&self) -> bool {
        self.span_events
    }

    fn build_filter(&self) -> EnvFilter {
        match &self.env_filter {
            Some(filter) => {
                EnvFilter::try_new(filter).unwrap_or_else(|_| EnvFilter::new(self.level.as_str()))
            }
            None => EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(self.level.as_str())),
        }
    }

    /// Installs the global subscriber.
    ///
    /// # Errors
    ///
    /// Returns [`TryInitError`] if a global subscriber is already set.
    pub fn try_init(&self) -> Result<(), TryInitError> {
        let env_filter = self.build_filter();
        let span_events = if self.span_events {
            FmtSpan::ENTER | FmtSpan::EXIT
        } else {
            FmtSpan::NONE
        };

        match self.format {
            TracingFormat::Pretty => tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .pretty()
                        .with_span_events(span_events),
                )
                .try_init()?,
            TracingFormat::Compact => tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .compact()
                        .with_span_events(span_events),
                )
                .try_init()?,
            TracingFormat::Json => tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_span_events(span_events),
                )
                .try_init()?,
        }

        tracing::info!(level = %self.level, format = ?self.format, "tracing initialized");
        Ok(())
    }

    /// Installs the global subscriber, keeping any subscriber already set.
    pub fn init(&self) {
        if let Err(err) = self.try_init() {
            tracing::debug!(error = %err, "tracing subscriber already installed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_default_is_pretty() {
        assert_eq!(TracingFormat::default(), TracingFormat::Pretty);
    }

    #[test]
    fn default_level_is_info() {
        let config = TracingConfig::default();
        assert_eq!(config.level, Level::INFO);
        assert_eq!(config.env_filter(), None);
        assert!(!config.span_events());
    }

    #[test]
    fn builders_set_fields() {
        let config = TracingConfig::new()
            .with_level(Level::DEBUG)
            .with_format(TracingFormat::Json)
            .with_env_filter("herald_hooks=trace")
            .with_span_events(true);
        assert_eq!(config.level, Level::DEBUG);
        assert_eq!(config.format, TracingFormat::Json);
        assert_eq!(config.env_filter(), Some("herald_hooks=trace"));
        assert!(config.span_events());
    }

    #[test]
    fn second_install_is_rejected_by_try_init() {
        let config = TracingConfig::new().with_format(TracingFormat::Compact);
        config.init();
        assert!(config.try_init().is_err());
        config.init();
    }
}
