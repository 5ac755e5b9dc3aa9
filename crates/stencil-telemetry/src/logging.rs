//! Structured logging with JSON or pretty output.
//!
//! Logs go to stderr so that command output (artifacts, documents) can be
//! piped from stdout.

use crate::{LogFormat, TelemetryConfig, TelemetryError};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Initialize the logging subsystem.
///
/// Sets up tracing-subscriber with either JSON or pretty format,
/// respecting the configured log level unless `RUST_LOG` is set.
pub fn init_logging(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    match config.log_format {
        LogFormat::Json => init_json_logging(filter),
        LogFormat::Pretty => init_pretty_logging(filter),
    }
}

fn init_json_logging(filter: EnvFilter) -> Result<(), TelemetryError> {
    let json_layer = fmt::layer()
        .json()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_current_span(true)
        .with_span_list(false)
        .with_file(false)
        .with_line_number(false)
        .flatten_event(true)
        .with_filter(filter);

    tracing_subscriber::registry()
        .with(json_layer)
        .try_init()
        .map_err(|e: tracing_subscriber::util::TryInitError| {
            TelemetryError::LoggingInit(e.to_string())
        })
}

fn init_pretty_logging(filter: EnvFilter) -> Result<(), TelemetryError> {
    let pretty_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .with_filter(filter);

    tracing_subscriber::registry()
        .with(pretty_layer)
        .try_init()
        .map_err(|e: tracing_subscriber::util::TryInitError| {
            TelemetryError::LoggingInit(e.to_string())
        })
}

/// Standard log event names.
pub mod events {
    /// A route table was compiled.
    pub const ROUTES_COMPILED: &str = "routes_compiled";

    /// A route was shipped to the engine.
    pub const ROUTE_REGISTERED: &str = "route_registered";

    /// A dependency was shipped to the engine.
    pub const DEPENDENCY_REGISTERED: &str = "dependency_registered";

    /// The native engine library was loaded.
    pub const ENGINE_LOADED: &str = "engine_loaded";

    /// Control is being handed to the engine's serving loop.
    pub const ENGINE_STARTING: &str = "engine_starting";
}

/// Helper macros for structured logging with standard fields.
///
/// These wrap the tracing macros to ensure consistent field naming.
#[macro_export]
macro_rules! log_routes_compiled {
    ($($field:tt)*) => {
        tracing::info!(
            event = $crate::logging::events::ROUTES_COMPILED,
            $($field)*
        )
    };
}

#[macro_export]
macro_rules! log_route_registered {
    ($($field:tt)*) => {
        tracing::debug!(
            event = $crate::logging::events::ROUTE_REGISTERED,
            $($field)*
        )
    };
}

#[macro_export]
macro_rules! log_dependency_registered {
    ($($field:tt)*) => {
        tracing::debug!(
            event = $crate::logging::events::DEPENDENCY_REGISTERED,
            $($field)*
        )
    };
}

#[macro_export]
macro_rules! log_engine_loaded {
    ($($field:tt)*) => {
        tracing::info!(
            event = $crate::logging::events::ENGINE_LOADED,
            $($field)*
        )
    };
}

#[macro_export]
macro_rules! log_engine_starting {
    ($($field:tt)*) => {
        tracing::info!(
            event = $crate::logging::events::ENGINE_STARTING,
            $($field)*
        )
    };
}
