//! Declarative routes served by a native engine.
//!
//! An [`App`] owns the dependency registry and the connection to a serving
//! engine. Route tables are compiled and validated in full before anything
//! crosses the engine boundary:
//!
//! ```no_run
//! use serde_json::json;
//! use stencil::{App, Handler, RouteTable};
//!
//! # fn main() -> Result<(), stencil::AppError> {
//! let mut app = App::load("./libstencil_engine.so")?;
//! app.install(RouteTable::new().get(
//!     "/users/{user_id}",
//!     Handler::new("get_user", &["user_id"], |p| {
//!         Ok(json!({ "message": "Hello", "user_id": p.require("user_id")? }))
//!     }),
//! ))?;
//! app.start()?;
//! # Ok(())
//! # }
//! ```

use std::path::{Path, PathBuf};

use thiserror::Error;

pub use stencil_compiler::{
    openapi_document, substitute, ApiInfo, CompileError, CompileOptions, CompiledApp,
    CompiledRoute, Dependency, DependencyRegistry, DependencyValue, Handler, HttpMethod, LogLevel,
    ParamLocation, Parameter, Placeholders, RequestBody, RouteManifest, RouteOptions, RouteTable,
    ServerConfig, StaticTemplate, TemplateSource,
};
pub use stencil_engine::{
    library_filename, EngineCall, EngineError, NativeEngine, RecordingEngine,
    RegistrationBridge, ServingEngine, ShipSummary,
};

/// Engine library looked up when none is configured: the platform file name
/// of `stencil_engine` in the working directory.
///
/// The `./` prefix keeps the loader from searching its system paths.
pub fn default_engine_path() -> PathBuf {
    Path::new(".").join(library_filename("stencil_engine"))
}

/// Errors surfaced to application code.
#[derive(Debug, Error)]
pub enum AppError {
    /// A declaration is invalid; nothing from it was shipped.
    #[error(transparent)]
    Compile(#[from] CompileError),

    /// The engine could not be loaded or rejected a call.
    #[error(transparent)]
    Engine(#[from] EngineError),
}

/// Application assembly: registry, compile options and engine connection.
pub struct App<E: ServingEngine> {
    bridge: RegistrationBridge<E>,
    registry: DependencyRegistry,
    options: CompileOptions,
}

impl App<NativeEngine> {
    /// Load the native engine library. Fails before any declaration runs
    /// when the library or one of its entry points is missing.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, AppError> {
        let engine = NativeEngine::load(path)?;
        Self::with_engine(engine)
    }
}

impl<E: ServingEngine> App<E> {
    /// Connect to an already constructed engine.
    pub fn with_engine(engine: E) -> Result<Self, AppError> {
        Ok(Self {
            bridge: RegistrationBridge::connect(engine)?,
            registry: DependencyRegistry::new(),
            options: CompileOptions::default(),
        })
    }

    pub fn with_options(mut self, options: CompileOptions) -> Self {
        self.options = options;
        self
    }

    pub fn registry(&self) -> &DependencyRegistry {
        &self.registry
    }

    /// Registry entries added here are shipped by the next
    /// [`install`](Self::install).
    pub fn registry_mut(&mut self) -> &mut DependencyRegistry {
        &mut self.registry
    }

    /// Compile a route table and ship it to the engine.
    ///
    /// Compilation errors abort before any engine call.
    pub fn install(&mut self, table: RouteTable) -> Result<CompiledApp, AppError> {
        let compiled = table.build(&mut self.registry, &self.options)?;
        for warning in &compiled.warnings {
            tracing::warn!(
                code = %warning.code,
                location = warning.location.as_deref().unwrap_or(""),
                "{}",
                warning.message
            );
        }
        self.bridge.ship(&compiled)?;
        Ok(compiled)
    }

    /// Hand control to the engine.
    pub fn start(&mut self) -> Result<(), AppError> {
        self.bridge.start()?;
        Ok(())
    }

    pub fn bridge(&self) -> &RegistrationBridge<E> {
        &self.bridge
    }

    pub fn into_engine(self) -> E {
        self.bridge.into_engine()
    }
}
