use thiserror::Error;

/// Structural errors in declared routes and configuration (E1001–E1006).
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ModelError {
    /// E1001: Unknown HTTP method.
    #[error("E1001: unsupported HTTP method: {0}")]
    InvalidMethod(String),

    /// E1002: Unknown log level.
    #[error("E1002: invalid log level: {0} (expected debug, info, warn or error)")]
    InvalidLogLevel(String),

    /// E1003: Unknown parameter location.
    #[error("E1003: invalid parameter location: {0} (expected path, query, header or cookie)")]
    InvalidLocation(String),

    /// E1004: Parameter declared without a name.
    #[error("E1004: parameter #{index} of {route} has an empty name")]
    EmptyParameterName { route: String, index: usize },

    /// E1005: Two parameters of one route share a name.
    #[error("E1005: duplicate parameter '{name}' in {route}")]
    DuplicateParameter { route: String, name: String },

    /// E1006: Response key outside the HTTP status range.
    #[error("E1006: invalid response status {status} in {route}")]
    InvalidStatus { route: String, status: u16 },
}
