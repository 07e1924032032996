//! Logging infrastructure for the editor core
//!
//! Structured logging uses the `tracing` crate. Native builds install a
//! `tracing-subscriber` registry writing to stderr; browser builds route
//! events to the console through `tracing-wasm`.
//!
//! # Usage
//!
//! ```rust
//! use pipewright::core::logging::init_logging;
//!
//! // Defaults, or whatever the environment asks for
//! let _ = init_logging(None, None);
//!
//! // Explicit level and format
//! let _ = init_logging(Some("debug"), Some("pretty"));
//! ```
//!
//! # Log Levels
//!
//! - `trace`: per-element detail (every stage, forward and patch)
//! - `debug`: counts, selections and surgeries that turned out to be no-ops
//! - `info`: pipeline boundaries (rebuild started, rebuild finished)
//! - `warn`: recoverable oddities (dangling edges, unknown stage kinds)
//! - `error`: rebuild failures
//!
//! # Environment Variables
//!
//! - `PIPEWRIGHT_LOG_LEVEL`: level or filter directives, used when no level is passed
//! - `PIPEWRIGHT_LOG_FORMAT`: compact|pretty|json, used when no format is passed
//! - `RUST_LOG`: standard `EnvFilter` directives, the last resort, e.g.
//!   `RUST_LOG="info,pipewright::plugins::adapter::surgeon=trace"`

use std::fmt as std_fmt;
use std::str::FromStr;

#[cfg(not(target_arch = "wasm32"))]
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Layer, Registry,
};

#[cfg(target_arch = "wasm32")]
use tracing_wasm::WASMLayerConfig;

pub const LEVEL_ENV: &str = "PIPEWRIGHT_LOG_LEVEL";
pub const FORMAT_ENV: &str = "PIPEWRIGHT_LOG_FORMAT";

#[cfg(not(target_arch = "wasm32"))]
const DEFAULT_LEVEL: &str = "info";

/// Log format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Single line per event, no targets
    #[default]
    Compact,
    /// Multi-line with source locations and span activity
    Pretty,
    /// One JSON object per event
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "compact" => Ok(LogFormat::Compact),
            "pretty" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            _ => Err(format!("Unknown log format: {}", s)),
        }
    }
}

impl std_fmt::Display for LogFormat {
    fn fmt(&self, f: &mut std_fmt::Formatter<'_>) -> std_fmt::Result {
        f.write_str(match self {
            LogFormat::Compact => "compact",
            LogFormat::Pretty => "pretty",
            LogFormat::Json => "json",
        })
    }
}

impl LogFormat {
    /// Get all valid format names
    pub fn variants() -> &'static [&'static str] {
        &["compact", "pretty", "json"]
    }
}

/// Filter directives to use: the argument, then `PIPEWRIGHT_LOG_LEVEL`.
/// `None` leaves the choice to `RUST_LOG`.
#[cfg(not(target_arch = "wasm32"))]
fn requested_level(level: Option<&str>) -> Option<String> {
    level
        .map(str::to_string)
        .or_else(|| std::env::var(LEVEL_ENV).ok())
        .filter(|l| !l.trim().is_empty())
}

fn requested_format(format: Option<&str>) -> Result<LogFormat, String> {
    match format
        .map(str::to_string)
        .or_else(|| std::env::var(FORMAT_ENV).ok())
    {
        Some(name) => LogFormat::from_str(&name).map_err(|e| format!("Invalid log format: {}", e)),
        None => Ok(LogFormat::default()),
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn env_filter(level: Option<String>) -> EnvFilter {
    match level {
        Some(directives) => {
            EnvFilter::try_new(&directives).unwrap_or_else(|_| EnvFilter::new(DEFAULT_LEVEL))
        }
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LEVEL)),
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn fmt_layer(format: LogFormat) -> Box<dyn Layer<Registry> + Send + Sync> {
    let layer = fmt::layer().with_writer(std::io::stderr).with_level(true);
    match format {
        LogFormat::Compact => layer
            .with_target(false)
            .with_span_events(FmtSpan::NONE)
            .compact()
            .boxed(),
        LogFormat::Pretty => layer
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .with_span_events(FmtSpan::ACTIVE)
            .pretty()
            .boxed(),
        LogFormat::Json => layer
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .with_span_events(FmtSpan::ACTIVE)
            .json()
            .boxed(),
    }
}

/// Initialize the global tracing subscriber
///
/// * `level` - `EnvFilter` directives (trace|debug|info|warn|error|off, or
///   per-target rules). Falls back to `PIPEWRIGHT_LOG_LEVEL`, then `RUST_LOG`,
///   then `info`. Invalid directives fall back to `info`.
/// * `format` - compact|pretty|json. Falls back to `PIPEWRIGHT_LOG_FORMAT`,
///   then compact.
///
/// Returns an error for an unknown format or when a global subscriber is
/// already installed.
pub fn init_logging(
    level: Option<&str>,
    format: Option<&str>,
) -> Result<(), Box<dyn std::error::Error>> {
    let format = requested_format(format)?;

    #[cfg(target_arch = "wasm32")]
    {
        // The browser console filters on its own.
        let _ = (level, format);
        tracing_wasm::set_as_global_default_with_config(WASMLayerConfig::default());
        Ok(())
    }

    #[cfg(not(target_arch = "wasm32"))]
    {
        Registry::default()
            .with(fmt_layer(format))
            .with(env_filter(requested_level(level)))
            .try_init()?;
        Ok(())
    }
}

/// Initialize logging from the environment alone
pub fn init_default_logging() -> Result<(), Box<dyn std::error::Error>> {
    init_logging(None, None)
}
