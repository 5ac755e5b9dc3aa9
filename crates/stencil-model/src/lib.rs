//! Value types shared by the stencil compiler and the engine bridge.
//!
//! Describes what an application declares (routes, parameters, request
//! bodies, server tuning) and the compiled artifact that crosses the boundary
//! into the native serving engine. Nothing here performs I/O.

pub mod artifact;
pub mod error;
pub mod model;

pub use artifact::{CompileWarning, CompiledApp, DependencyEntry, ARTIFACT_VERSION};
pub use error::ModelError;
pub use model::{
    CompiledRoute, HttpMethod, LogLevel, MiddlewareToggle, ParamLocation, Parameter, RequestBody,
    RouteOptions, ServerConfig, DEFAULT_RESPONSE_DESCRIPTION, KNOWN_MIDDLEWARES,
};
