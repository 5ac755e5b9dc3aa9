use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ModelError;

/// Description attached to the default `200` response.
pub const DEFAULT_RESPONSE_DESCRIPTION: &str = "Successful response";

/// Middleware names the native engine knows how to install.
pub const KNOWN_MIDDLEWARES: &[&str] = &["logging", "cors", "rate_limiter"];

/// HTTP methods a route can be declared for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
    Patch,
    Options,
    Head,
}

impl HttpMethod {
    /// Every supported method, in declaration order.
    pub const ALL: [HttpMethod; 7] = [
        HttpMethod::Get,
        HttpMethod::Post,
        HttpMethod::Put,
        HttpMethod::Delete,
        HttpMethod::Patch,
        HttpMethod::Options,
        HttpMethod::Head,
    ];

    /// Upper-case wire name (e.g. "GET").
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Options => "OPTIONS",
            HttpMethod::Head => "HEAD",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HttpMethod {
    type Err = ModelError;

    /// Parse a method name, case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.to_ascii_uppercase();
        HttpMethod::ALL
            .into_iter()
            .find(|m| m.as_str() == upper)
            .ok_or_else(|| ModelError::InvalidMethod(s.to_string()))
    }
}

/// Where a parameter is read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamLocation {
    Path,
    Query,
    Header,
    Cookie,
}

impl ParamLocation {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParamLocation::Path => "path",
            ParamLocation::Query => "query",
            ParamLocation::Header => "header",
            ParamLocation::Cookie => "cookie",
        }
    }
}

impl fmt::Display for ParamLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ParamLocation {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "path" => Ok(ParamLocation::Path),
            "query" => Ok(ParamLocation::Query),
            "header" => Ok(ParamLocation::Header),
            "cookie" => Ok(ParamLocation::Cookie),
            _ => Err(ModelError::InvalidLocation(s.to_string())),
        }
    }
}

/// Engine log verbosity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogLevel {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            _ => Err(ModelError::InvalidLogLevel(s.to_string())),
        }
    }
}

fn default_param_type() -> String {
    "string".to_string()
}

/// A documented request parameter.
///
/// Serializes to the wire object `{name, in, description, required, type, schema}`
/// with every field present, `schema` as `null` when unset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    #[serde(rename = "in")]
    pub location: ParamLocation,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub required: bool,
    #[serde(rename = "type", default = "default_param_type")]
    pub param_type: String,
    #[serde(default)]
    pub schema: Option<String>,
}

impl Parameter {
    /// Create an optional string parameter.
    pub fn new(name: impl Into<String>, location: ParamLocation) -> Self {
        Self {
            name: name.into(),
            location,
            description: String::new(),
            required: false,
            param_type: default_param_type(),
            schema: None,
        }
    }

    /// A path parameter. Path parameters are always required.
    pub fn path(name: impl Into<String>) -> Self {
        Self::new(name, ParamLocation::Path).with_required(true)
    }

    pub fn query(name: impl Into<String>) -> Self {
        Self::new(name, ParamLocation::Query)
    }

    pub fn header(name: impl Into<String>) -> Self {
        Self::new(name, ParamLocation::Header)
    }

    pub fn cookie(name: impl Into<String>) -> Self {
        Self::new(name, ParamLocation::Cookie)
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    /// Set the type tag ("string", "integer", ...).
    pub fn with_type(mut self, param_type: impl Into<String>) -> Self {
        self.param_type = param_type.into();
        self
    }

    /// Attach a free-form schema (usually JSON Schema text).
    pub fn with_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }
}

fn default_content_type() -> String {
    "application/json".to_string()
}

/// Request body documentation. At most one per route.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestBody {
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub required: bool,
    #[serde(default = "default_content_type")]
    pub content_type: String,
    #[serde(default)]
    pub schema: String,
}

impl Default for RequestBody {
    fn default() -> Self {
        Self {
            description: String::new(),
            required: false,
            content_type: default_content_type(),
            schema: String::new(),
        }
    }
}

impl RequestBody {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = content_type.into();
        self
    }

    pub fn with_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = schema.into();
        self
    }
}

fn default_responses() -> BTreeMap<u16, String> {
    BTreeMap::from([(200, DEFAULT_RESPONSE_DESCRIPTION.to_string())])
}

/// Everything declared about one endpoint except its handler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteOptions {
    /// Path template (e.g. "/users/{user_id}").
    pub path: String,
    pub method: HttpMethod,
    #[serde(default)]
    pub description: String,
    /// Parameters in declaration order.
    #[serde(default)]
    pub parameters: Vec<Parameter>,
    #[serde(default)]
    pub request_body: Option<RequestBody>,
    /// Status code -> description.
    #[serde(default = "default_responses")]
    pub responses: BTreeMap<u16, String>,
    /// Names of dependencies this route requires.
    #[serde(default)]
    pub dependencies: Vec<String>,
}

impl RouteOptions {
    pub fn new(method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            method,
            description: String::new(),
            parameters: Vec::new(),
            request_body: None,
            responses: default_responses(),
            dependencies: Vec::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_parameter(mut self, parameter: Parameter) -> Self {
        self.parameters.push(parameter);
        self
    }

    pub fn with_parameters(mut self, parameters: impl IntoIterator<Item = Parameter>) -> Self {
        self.parameters.extend(parameters);
        self
    }

    pub fn with_request_body(mut self, body: RequestBody) -> Self {
        self.request_body = Some(body);
        self
    }

    /// Add or replace the description of a response status.
    pub fn with_response(mut self, status: u16, description: impl Into<String>) -> Self {
        self.responses.insert(status, description.into());
        self
    }

    pub fn with_dependency(mut self, name: impl Into<String>) -> Self {
        self.dependencies.push(name.into());
        self
    }

    /// Human-readable route identity used in error locations ("GET /users/{id}").
    pub fn label(&self) -> String {
        format!("{} {}", self.method, self.path)
    }

    /// Check structural validity: non-empty, unique parameter names and
    /// response keys inside the HTTP status range.
    pub fn validate(&self) -> Result<(), ModelError> {
        let mut seen = std::collections::HashSet::new();
        for (index, param) in self.parameters.iter().enumerate() {
            if param.name.is_empty() {
                return Err(ModelError::EmptyParameterName {
                    route: self.label(),
                    index: index + 1,
                });
            }
            if !seen.insert(param.name.as_str()) {
                return Err(ModelError::DuplicateParameter {
                    route: self.label(),
                    name: param.name.clone(),
                });
            }
        }

        if let Some(&status) = self.responses.keys().find(|s| !(100..=599).contains(*s)) {
            return Err(ModelError::InvalidStatus {
                route: self.label(),
                status,
            });
        }

        Ok(())
    }
}

/// Server tuning forwarded to the native engine.
///
/// Timeouts are in milliseconds. A zero value leaves the engine's own
/// default in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub read_timeout_ms: u64,
    pub write_timeout_ms: u64,
    pub idle_timeout_ms: u64,
    pub max_body_size: u64,
    pub concurrency: u64,
    /// Listen address such as ":8000" or "127.0.0.1:8000".
    pub bind_address: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            read_timeout_ms: 5_000,
            write_timeout_ms: 10_000,
            idle_timeout_ms: 30_000,
            max_body_size: 4 * 1024 * 1024,
            concurrency: 256 * 1024,
            bind_address: None,
        }
    }
}

impl ServerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_read_timeout_ms(mut self, ms: u64) -> Self {
        self.read_timeout_ms = ms;
        self
    }

    pub fn with_write_timeout_ms(mut self, ms: u64) -> Self {
        self.write_timeout_ms = ms;
        self
    }

    pub fn with_idle_timeout_ms(mut self, ms: u64) -> Self {
        self.idle_timeout_ms = ms;
        self
    }

    pub fn with_max_body_size(mut self, bytes: u64) -> Self {
        self.max_body_size = bytes;
        self
    }

    pub fn with_concurrency(mut self, limit: u64) -> Self {
        self.concurrency = limit;
        self
    }

    pub fn with_bind_address(mut self, address: impl Into<String>) -> Self {
        self.bind_address = Some(address.into());
        self
    }
}

/// Enable or disable one of the engine's built-in middlewares.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MiddlewareToggle {
    pub name: String,
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
}

fn enabled_by_default() -> bool {
    true
}

impl MiddlewareToggle {
    pub fn new(name: impl Into<String>, enabled: bool) -> Self {
        Self {
            name: name.into(),
            enabled,
        }
    }

    /// Whether the native engine recognises this middleware name.
    pub fn is_known(&self) -> bool {
        KNOWN_MIDDLEWARES.contains(&self.name.as_str())
    }
}

/// A route after template synthesis, ready to cross the engine boundary.
///
/// The boundary only carries `(path, method, template, description)` and,
/// when parameters exist, their JSON; the remaining fields feed local
/// tooling such as OpenAPI generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompiledRoute {
    pub path: String,
    pub method: HttpMethod,
    /// Response body with literal `{name}` tokens for every path parameter.
    pub template: String,
    pub description: String,
    /// Placeholder names in the path, in order of first appearance.
    pub path_params: Vec<String>,
    pub parameters: Vec<Parameter>,
    #[serde(default)]
    pub request_body: Option<RequestBody>,
    pub responses: BTreeMap<u16, String>,
    #[serde(default)]
    pub dependencies: Vec<String>,
}

impl CompiledRoute {
    /// Whether the route ships through the with-parameters wire shape.
    pub fn has_parameters(&self) -> bool {
        !self.parameters.is_empty()
    }

    /// JSON array of the parameters, in declaration order.
    pub fn parameters_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self.parameters)
    }

    pub fn label(&self) -> String {
        format!("{} {}", self.method, self.path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn method_parses_case_insensitively() {
        assert_eq!("get".parse::<HttpMethod>().unwrap(), HttpMethod::Get);
        assert_eq!("PATCH".parse::<HttpMethod>().unwrap(), HttpMethod::Patch);
        assert_eq!(
            "TRACE".parse::<HttpMethod>(),
            Err(ModelError::InvalidMethod("TRACE".into()))
        );
    }

    #[test]
    fn log_level_round_trips_names() {
        for level in [LogLevel::Debug, LogLevel::Info, LogLevel::Warn, LogLevel::Error] {
            assert_eq!(level.as_str().parse::<LogLevel>().unwrap(), level);
        }
        assert!("verbose".parse::<LogLevel>().is_err());
        assert_eq!(LogLevel::default(), LogLevel::Info);
    }

    #[test]
    fn parameter_serializes_every_wire_field() {
        let param = Parameter::path("user_id")
            .with_description("The user ID")
            .with_type("integer");
        let json = serde_json::to_value(&param).unwrap();

        assert_eq!(
            json,
            serde_json::json!({
                "name": "user_id",
                "in": "path",
                "description": "The user ID",
                "required": true,
                "type": "integer",
                "schema": null
            })
        );
    }

    #[test]
    fn parameter_defaults_match_declaration_defaults() {
        let param: Parameter = serde_json::from_str(r#"{"name": "q", "in": "query"}"#).unwrap();
        assert!(!param.required);
        assert_eq!(param.param_type, "string");
        assert!(param.schema.is_none());
        assert!(param.description.is_empty());
    }

    #[test]
    fn route_options_default_response() {
        let route = RouteOptions::new(HttpMethod::Get, "/hello");
        assert_eq!(route.responses.len(), 1);
        assert_eq!(route.responses[&200], DEFAULT_RESPONSE_DESCRIPTION);
        assert!(route.request_body.is_none());
    }

    #[test]
    fn validate_rejects_duplicate_parameter_names() {
        let route = RouteOptions::new(HttpMethod::Get, "/users/{id}")
            .with_parameter(Parameter::path("id"))
            .with_parameter(Parameter::query("id"));

        assert_eq!(
            route.validate(),
            Err(ModelError::DuplicateParameter {
                route: "GET /users/{id}".into(),
                name: "id".into()
            })
        );
    }

    #[test]
    fn validate_rejects_empty_parameter_name() {
        let route =
            RouteOptions::new(HttpMethod::Post, "/items").with_parameter(Parameter::query(""));
        assert!(matches!(
            route.validate(),
            Err(ModelError::EmptyParameterName { index: 1, .. })
        ));
    }

    #[test]
    fn validate_rejects_out_of_range_status() {
        let route = RouteOptions::new(HttpMethod::Get, "/").with_response(42, "nope");
        assert!(matches!(
            route.validate(),
            Err(ModelError::InvalidStatus { status: 42, .. })
        ));
    }

    #[test]
    fn server_config_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.read_timeout_ms, 5_000);
        assert_eq!(config.write_timeout_ms, 10_000);
        assert_eq!(config.idle_timeout_ms, 30_000);
        assert_eq!(config.max_body_size, 4 * 1024 * 1024);
        assert_eq!(config.concurrency, 256 * 1024);
        assert!(config.bind_address.is_none());
    }

    #[test]
    fn server_config_partial_deserialize_keeps_defaults() {
        let config: ServerConfig =
            serde_json::from_str(r#"{"concurrency": 1000, "bind_address": ":9000"}"#).unwrap();
        assert_eq!(config.concurrency, 1000);
        assert_eq!(config.read_timeout_ms, 5_000);
        assert_eq!(config.bind_address.as_deref(), Some(":9000"));
    }

    #[test]
    fn middleware_known_names() {
        assert!(MiddlewareToggle::new("cors", true).is_known());
        assert!(!MiddlewareToggle::new("gzip", true).is_known());
    }

    #[test]
    fn request_body_defaults_to_json() {
        let body = RequestBody::new();
        assert_eq!(body.content_type, "application/json");
        assert!(!body.required);
    }
}
