use serde::{Deserialize, Serialize};

use crate::model::{CompiledRoute, HttpMethod, LogLevel, MiddlewareToggle, ServerConfig};

/// Artifact format version written into serialized artifacts.
pub const ARTIFACT_VERSION: u32 = 1;

/// A non-fatal finding produced while compiling declarations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompileWarning {
    /// Warning code (e.g. "E1101").
    pub code: String,
    pub message: String,
    /// Route or declaration the warning refers to.
    pub location: Option<String>,
}

/// A named dependency value as shipped to the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyEntry {
    pub name: String,
    pub value: String,
}

/// Everything the engine needs, validated and in shipping order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompiledApp {
    pub artifact_version: u32,
    pub compiler_version: String,
    pub log_level: Option<LogLevel>,
    pub include_debug_data: Option<bool>,
    pub server: Option<ServerConfig>,
    pub middlewares: Vec<MiddlewareToggle>,
    pub dependencies: Vec<DependencyEntry>,
    pub routes: Vec<CompiledRoute>,
    /// SHA-256 of the serialized routes, hex encoded.
    pub routes_sha256: String,
    #[serde(default)]
    pub warnings: Vec<CompileWarning>,
}

impl CompiledApp {
    /// Find a compiled route by method and exact path template.
    pub fn route(&self, method: HttpMethod, path: &str) -> Option<&CompiledRoute> {
        self.routes
            .iter()
            .find(|r| r.method == method && r.path == path)
    }

    /// Look up a shipped dependency value.
    pub fn dependency(&self, name: &str) -> Option<&str> {
        self.dependencies
            .iter()
            .find(|d| d.name == name)
            .map(|d| d.value.as_str())
    }
}
