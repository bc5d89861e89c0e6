//! `tracing` subscriber set-up for the binary.
//!
//! Events go to stderr so that reports on stdout stay clean. `RUST_LOG`
//! overrides the configured default level when it is set.

use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    /// Filter used when `RUST_LOG` is unset or invalid.
    pub default_level: String,
    /// Include the module path of each event.
    pub include_target: bool,
    /// Include source file and line.
    pub include_location: bool,
    pub timestamps: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            default_level: "tickdesk=warn".to_string(),
            include_target: false,
            include_location: false,
            timestamps: false,
        }
    }
}

impl LogConfig {
    /// `--verbose` raises the crate to debug and adds timestamps and targets.
    pub fn for_verbosity(verbose: bool) -> Self {
        if verbose {
            Self {
                default_level: "tickdesk=debug".to_string(),
                include_target: true,
                timestamps: true,
                ..Self::default()
            }
        } else {
            Self::default()
        }
    }

    fn filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&self.default_level))
    }
}

/// Installs the global subscriber.
///
/// # Errors
///
/// Fails when a global subscriber is already set.
pub fn init_logging(config: &LogConfig) -> Result<(), TryInitError> {
    let layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(config.include_target)
        .with_file(config.include_location)
        .with_line_number(config.include_location);
    let registry = tracing_subscriber::registry().with(config.filter());

    if config.timestamps {
        registry.with(layer).try_init()
    } else {
        registry.with(layer.without_time()).try_init()
    }
}
