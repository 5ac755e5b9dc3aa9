//! In-process engine that records every boundary call.

use serde::Serialize;

use stencil_model::ServerConfig;

use crate::engine::ServingEngine;
use crate::error::EngineError;

/// One boundary call, as the native engine would receive it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "call")]
pub enum EngineCall {
    RegisterRoute {
        path: String,
        method: String,
        template: String,
        description: String,
    },
    RegisterRouteWithParams {
        path: String,
        method: String,
        template: String,
        description: String,
        params_json: String,
    },
    RegisterMiddleware {
        name: String,
        enabled: bool,
    },
    RegisterDependency {
        name: String,
        value: String,
    },
    SetServerConfig {
        read_timeout: u64,
        write_timeout: u64,
        idle_timeout: u64,
        max_body_size: u64,
        concurrency: u64,
        bind_address: Option<String>,
    },
    SetLogLevel {
        level: String,
    },
    SetIncludeDebugData {
        enabled: bool,
    },
    StartServer,
}

impl EngineCall {
    /// Exported entry point name.
    pub fn name(&self) -> &'static str {
        match self {
            EngineCall::RegisterRoute { .. } => "RegisterRoute",
            EngineCall::RegisterRouteWithParams { .. } => "RegisterRouteWithParams",
            EngineCall::RegisterMiddleware { .. } => "RegisterMiddleware",
            EngineCall::RegisterDependency { .. } => "RegisterDependency",
            EngineCall::SetServerConfig { .. } => "SetServerConfig",
            EngineCall::SetLogLevel { .. } => "SetLogLevel",
            EngineCall::SetIncludeDebugData { .. } => "SetIncludeDebugData",
            EngineCall::StartServer => "StartServer",
        }
    }
}

/// A [`ServingEngine`] that stores calls instead of serving.
///
/// `start` returns immediately.
#[derive(Debug, Default)]
pub struct RecordingEngine {
    calls: Vec<EngineCall>,
    fail_on: Option<&'static str>,
}

impl RecordingEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every call to the named entry point fail.
    pub fn failing_on(mut self, entry_point: &'static str) -> Self {
        self.fail_on = Some(entry_point);
        self
    }

    pub fn calls(&self) -> &[EngineCall] {
        &self.calls
    }

    pub fn into_calls(self) -> Vec<EngineCall> {
        self.calls
    }

    pub fn started(&self) -> bool {
        self.calls.iter().any(|c| *c == EngineCall::StartServer)
    }

    fn record(&mut self, call: EngineCall) -> Result<(), EngineError> {
        let name = call.name();
        if self.fail_on == Some(name) {
            return Err(EngineError::Boundary {
                operation: name,
                message: "rejected by recording engine".to_string(),
            });
        }
        self.calls.push(call);
        Ok(())
    }
}

impl ServingEngine for RecordingEngine {
    fn register_route(
        &mut self,
        path: &str,
        method: &str,
        template: &str,
        description: &str,
    ) -> Result<(), EngineError> {
        self.record(EngineCall::RegisterRoute {
            path: path.to_string(),
            method: method.to_string(),
            template: template.to_string(),
            description: description.to_string(),
        })
    }

    fn register_route_with_params(
        &mut self,
        path: &str,
        method: &str,
        template: &str,
        description: &str,
        params_json: &str,
    ) -> Result<(), EngineError> {
        self.record(EngineCall::RegisterRouteWithParams {
            path: path.to_string(),
            method: method.to_string(),
            template: template.to_string(),
            description: description.to_string(),
            params_json: params_json.to_string(),
        })
    }

    fn register_middleware(&mut self, name: &str, enabled: bool) -> Result<(), EngineError> {
        self.record(EngineCall::RegisterMiddleware {
            name: name.to_string(),
            enabled,
        })
    }

    fn register_dependency(&mut self, name: &str, value: &str) -> Result<(), EngineError> {
        self.record(EngineCall::RegisterDependency {
            name: name.to_string(),
            value: value.to_string(),
        })
    }

    fn set_server_config(&mut self, config: &ServerConfig) -> Result<(), EngineError> {
        self.record(EngineCall::SetServerConfig {
            read_timeout: config.read_timeout_ms,
            write_timeout: config.write_timeout_ms,
            idle_timeout: config.idle_timeout_ms,
            max_body_size: config.max_body_size,
            concurrency: config.concurrency,
            bind_address: config.bind_address.clone(),
        })
    }

    fn set_log_level(&mut self, level: &str) -> Result<(), EngineError> {
        self.record(EngineCall::SetLogLevel {
            level: level.to_string(),
        })
    }

    fn set_include_debug_data(&mut self, enabled: bool) -> Result<(), EngineError> {
        self.record(EngineCall::SetIncludeDebugData { enabled })
    }

    fn start(&mut self) -> Result<(), EngineError> {
        self.record(EngineCall::StartServer)
    }
}
