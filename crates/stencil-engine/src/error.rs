use std::ffi::NulError;

use thiserror::Error;

/// Errors raised at the engine boundary.
#[derive(Debug, Error)]
pub enum EngineError {
    /// E2001: The engine library could not be loaded.
    #[error("E2001: failed to load engine library {path}")]
    Load {
        path: String,
        source: libloading::Error,
    },

    /// E2002: The library does not export a required entry point.
    #[error("E2002: engine library does not export '{symbol}'")]
    MissingSymbol {
        symbol: &'static str,
        source: libloading::Error,
    },

    /// E2003: Text cannot cross the boundary as a NUL-terminated string.
    #[error("E2003: {field} contains an interior NUL byte")]
    InvalidText {
        field: &'static str,
        source: NulError,
    },

    /// E2004: The engine has already been handed control.
    #[error("E2004: cannot call {0} after the engine has started")]
    AlreadyStarted(&'static str),

    /// E2005: Server configuration is write-once and must precede routes.
    #[error("E2005: server configuration is locked: {0}")]
    ConfigLocked(&'static str),

    /// E2006: Route parameters could not be encoded.
    #[error("E2006: failed to encode parameters: {0}")]
    Encode(#[from] serde_json::Error),

    /// E2007: A numeric value does not fit the native integer width.
    #[error("E2007: {field} value {value} exceeds the native integer range")]
    OutOfRange { field: &'static str, value: u64 },

    /// E2008: The boundary call itself reported a fault.
    #[error("E2008: engine call {operation} failed: {message}")]
    Boundary {
        operation: &'static str,
        message: String,
    },
}
