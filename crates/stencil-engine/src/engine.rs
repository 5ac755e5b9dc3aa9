use stencil_model::ServerConfig;

use crate::error::EngineError;

/// The serving engine's registration surface.
///
/// Each method corresponds to one exported entry point. Calls are
/// fire-and-forget: an `Ok` only means the call was made.
pub trait ServingEngine {
    /// `RegisterRoute(path, method, template, description)`
    fn register_route(
        &mut self,
        path: &str,
        method: &str,
        template: &str,
        description: &str,
    ) -> Result<(), EngineError>;

    /// `RegisterRouteWithParams(path, method, template, description, params_json)`
    fn register_route_with_params(
        &mut self,
        path: &str,
        method: &str,
        template: &str,
        description: &str,
        params_json: &str,
    ) -> Result<(), EngineError>;

    /// `RegisterMiddleware(name, enabled)`
    fn register_middleware(&mut self, name: &str, enabled: bool) -> Result<(), EngineError>;

    /// `RegisterDependency(name, value)`
    fn register_dependency(&mut self, name: &str, value: &str) -> Result<(), EngineError>;

    /// `SetServerConfig(read, write, idle, max_body, concurrency, bind_address)`
    fn set_server_config(&mut self, config: &ServerConfig) -> Result<(), EngineError>;

    /// `SetLogLevel(level)`
    fn set_log_level(&mut self, level: &str) -> Result<(), EngineError>;

    /// `SetIncludeDebugData(enabled)`
    fn set_include_debug_data(&mut self, enabled: bool) -> Result<(), EngineError>;

    /// `StartServer()`. A native engine does not return from this call
    /// while it is serving.
    fn start(&mut self) -> Result<(), EngineError>;
}

impl<E: ServingEngine + ?Sized> ServingEngine for Box<E> {
    fn register_route(
        &mut self,
        path: &str,
        method: &str,
        template: &str,
        description: &str,
    ) -> Result<(), EngineError> {
        (**self).register_route(path, method, template, description)
    }

    fn register_route_with_params(
        &mut self,
        path: &str,
        method: &str,
        template: &str,
        description: &str,
        params_json: &str,
    ) -> Result<(), EngineError> {
        (**self).register_route_with_params(path, method, template, description, params_json)
    }

    fn register_middleware(&mut self, name: &str, enabled: bool) -> Result<(), EngineError> {
        (**self).register_middleware(name, enabled)
    }

    fn register_dependency(&mut self, name: &str, value: &str) -> Result<(), EngineError> {
        (**self).register_dependency(name, value)
    }

    fn set_server_config(&mut self, config: &ServerConfig) -> Result<(), EngineError> {
        (**self).set_server_config(config)
    }

    fn set_log_level(&mut self, level: &str) -> Result<(), EngineError> {
        (**self).set_log_level(level)
    }

    fn set_include_debug_data(&mut self, enabled: bool) -> Result<(), EngineError> {
        (**self).set_include_debug_data(enabled)
    }

    fn start(&mut self) -> Result<(), EngineError> {
        (**self).start()
    }
}
