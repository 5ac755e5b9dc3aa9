use thiserror::Error;

pub use stencil_model::CompileWarning;

/// Declaration-time errors. Each one aborts compilation before anything is
/// shipped to the engine.
#[derive(Debug, Error)]
pub enum CompileError {
    /// Structurally invalid route or configuration value.
    #[error(transparent)]
    Model(#[from] stencil_model::ModelError),

    /// E1010: Two routes share a path and method.
    #[error("E1010: routing conflict: {0}")]
    RoutingConflict(String),

    /// E1050: Two routes differ only in placeholder names.
    #[error("E1050: ambiguous route: {0}")]
    AmbiguousRoute(String),

    /// E1054: Malformed placeholder syntax.
    #[error("E1054: invalid path template: {0}")]
    InvalidPathTemplate(String),

    /// E1060: A path placeholder is missing from the handler's parameters.
    #[error("E1060: path parameter '{param}' is not defined in the parameters of handler '{handler}' ({route})")]
    UndeclaredPathParam {
        route: String,
        handler: String,
        param: String,
    },

    /// E1061: The handler failed while being rendered with placeholders.
    #[error("E1061: handler '{handler}' failed while compiling {route}: {source}")]
    HandlerFailed {
        route: String,
        handler: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// E1062: The handler output depends on parameter values, so no single
    /// template can represent it.
    #[error("E1062: handler '{handler}' output for {route} depends on path parameter values; it cannot be compiled to a static template")]
    ValueDependentTemplate { route: String, handler: String },

    /// E1070: A dependency lookup failed.
    #[error("E1070: dependency '{0}' not found")]
    DependencyNotFound(String),

    /// E1071: A route references a dependency that has not been registered.
    #[error("E1071: dependency '{name}' required by {route} is not registered")]
    UnresolvedDependency { route: String, name: String },

    /// E1072: A dependency provider failed.
    #[error("E1072: dependency provider '{name}' failed for {route}: {source}")]
    DependencyFailed {
        route: String,
        name: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// E1080: Server configuration declared more than once.
    #[error("E1080: server configuration declared more than once")]
    ConfigRedeclared,

    /// Manifest parsing or loading error.
    #[error("manifest error: {0}")]
    ManifestError(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
