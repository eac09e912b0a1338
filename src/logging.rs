//! Logging setup for component-factory
//!
//! The factory emits `tracing` events under the `component_factory` target:
//! registrations and constructions at `debug`, cache hits and partial
//! instances at `trace`, unresolved placeholders at `warn`. This module wires
//! those events to a `tracing-subscriber` formatter.
//!
//! # Features
//!
//! - `logging` - Emit factory events (default)
//! - `logging-json` - JSON structured output
//! - `logging-pretty` - Multi-line human readable output
//!
//! # Example
//!
//! ```rust,ignore
//! use component_factory::logging;
//!
//! // JSON if logging-json is enabled, pretty otherwise
//! logging::init();
//!
//! // Only factory events, including per-lookup traces
//! logging::builder()
//!     .trace()
//!     .factory_only()
//!     .compact()
//!     .init();
//! ```

use tracing::Level;

/// Tracing target used by every factory event
pub const TARGET: &str = "component_factory";

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// JSON structured logging
    #[default]
    Json,
    /// Multi-line colored output
    Pretty,
    /// Single-line output
    Compact,
}

/// Builder for the global subscriber
#[derive(Debug, Clone)]
pub struct LoggingBuilder {
    level: Level,
    format: LogFormat,
    target: Option<&'static str>,
    with_file: bool,
    with_line_number: bool,
    with_thread_ids: bool,
    with_thread_names: bool,
    respect_env: bool,
}

impl Default for LoggingBuilder {
    fn default() -> Self {
        Self {
            level: Level::DEBUG,
            format: if cfg!(feature = "logging-json") {
                LogFormat::Json
            } else {
                LogFormat::Pretty
            },
            target: None,
            with_file: false,
            with_line_number: false,
            with_thread_ids: false,
            with_thread_names: false,
            respect_env: true,
        }
    }
}

impl LoggingBuilder {
    /// Create a builder at `DEBUG`
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the minimum level
    pub fn with_level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    /// Show per-lookup events such as cache hits
    pub fn trace(self) -> Self {
        self.with_level(Level::TRACE)
    }

    /// Show registrations and constructions
    pub fn debug(self) -> Self {
        self.with_level(Level::DEBUG)
    }

    /// Only unresolved placeholders and worse
    pub fn warn(self) -> Self {
        self.with_level(Level::WARN)
    }

    /// Only show events from `target`
    pub fn with_target_filter(mut self, target: &'static str) -> Self {
        self.target = Some(target);
        self
    }

    /// Only show factory events
    pub fn factory_only(self) -> Self {
        self.with_target_filter(TARGET)
    }

    /// Ignore `RUST_LOG` and use the configured level and target only
    pub fn ignore_env(mut self) -> Self {
        self.respect_env = false;
        self
    }

    /// Include file names
    pub fn with_file(mut self) -> Self {
        self.with_file = true;
        self
    }

    /// Include line numbers
    pub fn with_line_number(mut self) -> Self {
        self.with_line_number = true;
        self
    }

    /// Include thread IDs, useful when watching concurrent singleton creation
    pub fn with_thread_ids(mut self) -> Self {
        self.with_thread_ids = true;
        self
    }

    /// Include thread names
    pub fn with_thread_names(mut self) -> Self {
        self.with_thread_names = true;
        self
    }

    /// JSON output
    pub fn json(mut self) -> Self {
        self.format = LogFormat::Json;
        self
    }

    /// Pretty output
    pub fn pretty(mut self) -> Self {
        self.format = LogFormat::Pretty;
        self
    }

    /// Compact output
    pub fn compact(mut self) -> Self {
        self.format = LogFormat::Compact;
        self
    }

    /// Filter directive built from the level and target
    pub fn directive(&self) -> String {
        match self.target {
            Some(target) => format!("{}={}", target, self.level),
            None => self.level.to_string(),
        }
    }

    /// Install the global subscriber.
    ///
    /// Returns `false` if a global subscriber was already installed.
    #[cfg(any(feature = "logging-json", feature = "logging-pretty"))]
    pub fn try_init(self) -> bool {
        use tracing_subscriber::{EnvFilter, fmt, prelude::*};

        let filter = match EnvFilter::try_from_default_env() {
            Ok(env) if self.respect_env => env,
            _ => EnvFilter::new(self.directive()),
        };

        let base = fmt::layer()
            .with_file(self.with_file)
            .with_line_number(self.with_line_number)
            .with_thread_ids(self.with_thread_ids)
            .with_thread_names(self.with_thread_names)
            .with_target(true);

        let registry = tracing_subscriber::registry().with(filter);
        let installed = match self.format {
            #[cfg(feature = "logging-json")]
            LogFormat::Json => registry.with(base.json()).try_init(),
            #[cfg(not(feature = "logging-json"))]
            LogFormat::Json => registry.with(base).try_init(),
            LogFormat::Pretty => registry.with(base.pretty()).try_init(),
            LogFormat::Compact => registry.with(base.compact()).try_init(),
        };
        installed.is_ok()
    }

    /// Install the global subscriber (no-op without a subscriber feature)
    #[cfg(not(any(feature = "logging-json", feature = "logging-pretty")))]
    pub fn try_init(self) -> bool {
        false
    }

    /// Install the global subscriber, ignoring an existing one
    pub fn init(self) {
        let _ = self.try_init();
    }
}

/// Create a new builder
pub fn builder() -> LoggingBuilder {
    LoggingBuilder::new()
}

/// Install the default subscriber: JSON with `logging-json`, pretty otherwise
pub fn init() {
    builder().init();
}

/// Install JSON logging at `DEBUG`
pub fn init_json() {
    builder().json().init();
}

/// Install pretty logging at `DEBUG`
pub fn init_pretty() {
    builder().pretty().init();
}

/// Install logging for factory events only
pub fn init_factory_only() {
    builder().factory_only().init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults() {
        let builder = LoggingBuilder::default();
        assert_eq!(builder.level, Level::DEBUG);
        assert!(builder.target.is_none());
        assert!(builder.respect_env);
        assert_eq!(builder.directive(), "DEBUG");
    }

    #[test]
    fn test_builder_chain() {
        let builder = LoggingBuilder::new()
            .trace()
            .compact()
            .with_file()
            .with_line_number()
            .ignore_env()
            .factory_only();

        assert_eq!(builder.level, Level::TRACE);
        assert_eq!(builder.format, LogFormat::Compact);
        assert!(builder.with_file);
        assert!(builder.with_line_number);
        assert!(!builder.respect_env);
        assert_eq!(builder.directive(), "component_factory=TRACE");
    }
}
