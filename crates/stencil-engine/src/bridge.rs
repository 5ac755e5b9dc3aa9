//! Registration bridge: the only path from compiled routes to the engine.

use std::collections::BTreeMap;

use stencil_model::{CompiledApp, CompiledRoute, LogLevel, ServerConfig};

use crate::engine::ServingEngine;
use crate::error::EngineError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    /// Nothing but configuration has been sent.
    Configuring,
    /// At least one route has been sent; server config is locked.
    Registering,
    /// `StartServer` has been called.
    Started,
}

/// Counts of what [`RegistrationBridge::ship`] sent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ShipSummary {
    pub routes: usize,
    pub routes_with_params: usize,
    pub dependencies: usize,
    pub middlewares: usize,
}

/// Marshals declarations into engine calls and enforces call ordering.
///
/// - Every call after [`start`](Self::start) fails with
///   [`EngineError::AlreadyStarted`].
/// - Server configuration may be sent once, before the first route.
#[derive(Debug)]
pub struct RegistrationBridge<E: ServingEngine> {
    engine: E,
    phase: Phase,
    server_configured: bool,
    // Dependency values the engine already holds.
    dependencies: BTreeMap<String, String>,
}

impl<E: ServingEngine> RegistrationBridge<E> {
    /// Wrap an engine and apply its load-time defaults (log level `info`,
    /// debug data off).
    pub fn connect(mut engine: E) -> Result<Self, EngineError> {
        engine.set_log_level(LogLevel::default().as_str())?;
        engine.set_include_debug_data(false)?;
        Ok(Self {
            engine,
            phase: Phase::Configuring,
            server_configured: false,
            dependencies: BTreeMap::new(),
        })
    }

    fn ensure_not_started(&self, operation: &'static str) -> Result<(), EngineError> {
        if self.phase == Phase::Started {
            return Err(EngineError::AlreadyStarted(operation));
        }
        Ok(())
    }

    fn ensure_config_open(&self) -> Result<(), EngineError> {
        if self.server_configured {
            return Err(EngineError::ConfigLocked("already configured"));
        }
        if self.phase == Phase::Registering {
            return Err(EngineError::ConfigLocked("routes already registered"));
        }
        Ok(())
    }

    /// Send one compiled route, choosing the wire shape by whether it
    /// documents parameters.
    pub fn register_route(&mut self, route: &CompiledRoute) -> Result<(), EngineError> {
        self.ensure_not_started("RegisterRoute")?;

        let method = route.method.as_str();
        if route.has_parameters() {
            let params_json = route.parameters_json()?;
            self.engine.register_route_with_params(
                &route.path,
                method,
                &route.template,
                &route.description,
                &params_json,
            )?;
        } else {
            self.engine.register_route(
                &route.path,
                method,
                &route.template,
                &route.description,
            )?;
        }

        self.phase = Phase::Registering;
        stencil_telemetry::log_route_registered!(
            method = method,
            path = %route.path,
            parameters = route.parameters.len()
        );
        Ok(())
    }

    pub fn register_middleware(&mut self, name: &str, enabled: bool) -> Result<(), EngineError> {
        self.ensure_not_started("RegisterMiddleware")?;
        self.engine.register_middleware(name, enabled)
    }

    pub fn register_dependency(&mut self, name: &str, value: &str) -> Result<(), EngineError> {
        self.ensure_not_started("RegisterDependency")?;
        self.engine.register_dependency(name, value)?;
        self.dependencies.insert(name.to_string(), value.to_string());
        stencil_telemetry::log_dependency_registered!(name = name);
        Ok(())
    }

    /// Send server configuration. Write-once, and only before routes.
    pub fn set_server_config(&mut self, config: &ServerConfig) -> Result<(), EngineError> {
        self.ensure_not_started("SetServerConfig")?;
        self.ensure_config_open()?;
        self.engine.set_server_config(config)?;
        self.server_configured = true;
        Ok(())
    }

    pub fn set_log_level(&mut self, level: LogLevel) -> Result<(), EngineError> {
        self.ensure_not_started("SetLogLevel")?;
        self.engine.set_log_level(level.as_str())
    }

    pub fn set_include_debug_data(&mut self, enabled: bool) -> Result<(), EngineError> {
        self.ensure_not_started("SetIncludeDebugData")?;
        self.engine.set_include_debug_data(enabled)
    }

    /// Send a compiled application: log level, debug flag, server config,
    /// middlewares, dependencies, then routes in declaration order.
    /// Dependencies the engine already holds with the same value are skipped.
    ///
    /// Lifecycle violations are reported before the first engine call.
    pub fn ship(&mut self, app: &CompiledApp) -> Result<ShipSummary, EngineError> {
        self.ensure_not_started("ship")?;
        if app.server.is_some() {
            self.ensure_config_open()?;
        }

        let mut summary = ShipSummary::default();

        if let Some(level) = app.log_level {
            self.set_log_level(level)?;
        }
        if let Some(enabled) = app.include_debug_data {
            self.set_include_debug_data(enabled)?;
        }
        if let Some(server) = &app.server {
            self.set_server_config(server)?;
        }
        for toggle in &app.middlewares {
            self.register_middleware(&toggle.name, toggle.enabled)?;
            summary.middlewares += 1;
        }
        for entry in &app.dependencies {
            if self.dependencies.get(&entry.name) == Some(&entry.value) {
                continue;
            }
            self.register_dependency(&entry.name, &entry.value)?;
            summary.dependencies += 1;
        }
        for route in &app.routes {
            self.register_route(route)?;
            summary.routes += 1;
            if route.has_parameters() {
                summary.routes_with_params += 1;
            }
        }

        tracing::info!(
            routes = summary.routes,
            dependencies = summary.dependencies,
            middlewares = summary.middlewares,
            "application shipped to engine"
        );
        Ok(summary)
    }

    /// Hand control to the engine. With a native engine this blocks for the
    /// life of the server.
    pub fn start(&mut self) -> Result<(), EngineError> {
        self.ensure_not_started("StartServer")?;
        self.phase = Phase::Started;
        stencil_telemetry::log_engine_starting!("handing control to engine");
        self.engine.start()
    }

    pub fn is_started(&self) -> bool {
        self.phase == Phase::Started
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn into_engine(self) -> E {
        self.engine
    }
}
