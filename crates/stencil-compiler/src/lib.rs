//! Compiles route declarations into engine-ready templates.
//!
//! Extracts path placeholders, checks them against each handler's declared
//! parameters, renders every handler once with `{name}` tokens in place of
//! live values, and resolves route dependencies. The result is a
//! [`CompiledApp`] that the engine bridge can ship without running
//! application code at request time.

pub mod dependency;
pub mod error;
pub mod manifest;
pub mod openapi;
pub mod path;
pub mod route_table;
pub mod template;

pub use dependency::{Dependency, DependencyRegistry, DependencyValue, Provider};
pub use error::{CompileError, CompileWarning};
pub use manifest::{ManifestRoute, RouteManifest};
pub use openapi::{openapi_document, ApiInfo};
pub use path::{extract_path_params, normalize_path_template};
pub use route_table::{referenced_dependencies, CompileOptions, RouteTable, COMPILER_VERSION};
pub use template::{
    compile_template, substitute, to_template_json, CompiledTemplate, Handler, Placeholders,
    StaticTemplate, TemplateSource,
};

// Re-export the model so callers need a single import.
pub use stencil_model::{
    CompiledApp, CompiledRoute, DependencyEntry, HttpMethod, LogLevel, MiddlewareToggle,
    ParamLocation, Parameter, RequestBody, RouteOptions, ServerConfig,
};
