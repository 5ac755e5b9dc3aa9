//! Route manifest (`stencil.yaml`) parser.
//!
//! The manifest is the declarative counterpart of building a [`RouteTable`]
//! in code: every route carries a static response whose strings may contain
//! `{name}` tokens.

use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use stencil_model::{DependencyEntry, LogLevel, MiddlewareToggle, RouteOptions, ServerConfig};

use crate::error::CompileError;
use crate::path::extract_path_params;
use crate::route_table::RouteTable;
use crate::template::StaticTemplate;

/// A route manifest.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RouteManifest {
    #[serde(default)]
    pub log_level: Option<LogLevel>,
    #[serde(default)]
    pub include_debug_data: Option<bool>,
    #[serde(default)]
    pub server: Option<ServerConfig>,
    #[serde(default)]
    pub middlewares: Vec<MiddlewareToggle>,
    /// Registered before any route, in listed order.
    #[serde(default)]
    pub dependencies: Vec<DependencyEntry>,
    #[serde(default)]
    pub routes: Vec<ManifestRoute>,
}

/// One route entry in the manifest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestRoute {
    #[serde(flatten)]
    pub options: RouteOptions,
    /// Name reported in errors. Defaults to the route label.
    #[serde(default)]
    pub handler: Option<String>,
    /// Parameters the response accepts. Defaults to the path placeholders.
    #[serde(default)]
    pub arguments: Option<Vec<String>>,
    /// Response body; strings may contain `{name}` tokens.
    pub response: Value,
}

impl ManifestRoute {
    fn into_source(self) -> (RouteOptions, StaticTemplate) {
        let name = self.handler.unwrap_or_else(|| self.options.label());
        // A malformed path is reported by the build step.
        let arguments = self
            .arguments
            .unwrap_or_else(|| extract_path_params(&self.options.path).unwrap_or_default());
        (
            self.options,
            StaticTemplate::new(name, arguments, self.response),
        )
    }
}

impl RouteManifest {
    /// Load a manifest from a file path.
    pub fn load(path: &Path) -> Result<Self, CompileError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            CompileError::ManifestError(format!("failed to read {}: {}", path.display(), e))
        })?;

        Self::parse(&content, path)
    }

    /// Parse a manifest from YAML content.
    pub fn parse(content: &str, path: &Path) -> Result<Self, CompileError> {
        serde_yaml::from_str(content).map_err(|e| {
            CompileError::ManifestError(format!("failed to parse {}: {}", path.display(), e))
        })
    }

    /// Turn the manifest into a route table ready to build.
    pub fn into_route_table(self) -> RouteTable {
        let mut table = RouteTable::new();

        if let Some(level) = self.log_level {
            table = table.log_level(level);
        }
        if let Some(enabled) = self.include_debug_data {
            table = table.include_debug_data(enabled);
        }
        if let Some(server) = self.server {
            table = table.configure_server(server);
        }
        for toggle in self.middlewares {
            table = table.middleware(toggle.name, toggle.enabled);
        }
        for entry in self.dependencies {
            table = table.dependency(entry.name, entry.value);
        }
        for route in self.routes {
            let (options, source) = route.into_source();
            table = table.route(options, source);
        }

        table
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dependency::DependencyRegistry;
    use crate::route_table::CompileOptions;
    use serde_json::json;
    use std::io::Write;
    use stencil_model::{HttpMethod, ParamLocation};
    use tempfile::NamedTempFile;

    const SAMPLE: &str = r#"
log_level: debug
include_debug_data: true
server:
  concurrency: 1000
  bind_address: ":8000"
middlewares:
  - name: cors
  - name: logging
    enabled: false
dependencies:
  - name: db
    value: postgres://localhost/app
routes:
  - path: /users/{user_id}
    method: GET
    description: Get a user
    handler: get_user
    dependencies: [db]
    parameters:
      - name: user_id
        in: path
        required: true
        type: integer
    responses:
      200: OK
      404: Not found
    response:
      message: Hello
      user_id: "{user_id}"
  - path: /health
    method: GET
    response: ok
"#;

    #[test]
    fn parse_full_manifest() {
        let manifest = RouteManifest::parse(SAMPLE, Path::new("stencil.yaml")).unwrap();

        assert_eq!(manifest.log_level, Some(LogLevel::Debug));
        assert_eq!(manifest.include_debug_data, Some(true));
        let server = manifest.server.as_ref().unwrap();
        assert_eq!(server.concurrency, 1000);
        assert_eq!(server.read_timeout_ms, 5_000);
        assert!(manifest.middlewares[0].enabled);
        assert!(!manifest.middlewares[1].enabled);

        let route = &manifest.routes[0];
        assert_eq!(route.options.method, HttpMethod::Get);
        assert_eq!(route.options.parameters[0].location, ParamLocation::Path);
        assert_eq!(route.options.parameters[0].param_type, "integer");
        assert_eq!(route.options.responses[&404], "Not found");
        assert_eq!(route.handler.as_deref(), Some("get_user"));
    }

    #[test]
    fn route_defaults_apply() {
        let manifest = RouteManifest::parse(SAMPLE, Path::new("stencil.yaml")).unwrap();
        let health = &manifest.routes[1];
        assert_eq!(health.options.responses[&200], "Successful response");
        assert!(health.options.parameters.is_empty());
        assert!(health.handler.is_none());
    }

    #[test]
    fn manifest_compiles_to_app() {
        let manifest = RouteManifest::parse(SAMPLE, Path::new("stencil.yaml")).unwrap();
        let mut registry = DependencyRegistry::new();
        let app = manifest
            .into_route_table()
            .build(&mut registry, &CompileOptions::default())
            .unwrap();

        assert_eq!(app.routes.len(), 2);
        assert_eq!(
            app.routes[0].template,
            r#"{"message": "Hello", "user_id": "{user_id}"}"#
        );
        assert_eq!(app.routes[0].dependencies, vec!["db"]);
        assert_eq!(app.routes[1].template, "ok");
        assert_eq!(registry.resolve("db").unwrap(), "postgres://localhost/app");
        assert_eq!(app.log_level, Some(LogLevel::Debug));
    }

    #[test]
    fn explicit_arguments_are_checked_against_the_path() {
        let yaml = r#"
routes:
  - path: /users/{user_id}
    method: GET
    handler: get_user
    arguments: [id]
    response: {}
"#;
        let manifest = RouteManifest::parse(yaml, Path::new("stencil.yaml")).unwrap();
        let err = manifest
            .into_route_table()
            .build(&mut DependencyRegistry::new(), &CompileOptions::default())
            .unwrap_err();
        assert!(matches!(err, CompileError::UndeclaredPathParam { .. }));
        assert!(err.to_string().contains("get_user"));
    }

    #[test]
    fn malformed_path_reported_at_build() {
        let yaml = r#"
routes:
  - path: /users/{user_id
    method: GET
    response: {}
"#;
        let manifest = RouteManifest::parse(yaml, Path::new("stencil.yaml")).unwrap();
        let err = manifest
            .into_route_table()
            .build(&mut DependencyRegistry::new(), &CompileOptions::default())
            .unwrap_err();
        assert!(matches!(err, CompileError::InvalidPathTemplate(_)));
    }

    #[test]
    fn load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{}", SAMPLE).unwrap();

        let manifest = RouteManifest::load(file.path()).unwrap();
        assert_eq!(manifest.routes.len(), 2);
        assert_eq!(manifest.routes[0].response, json!({ "message": "Hello", "user_id": "{user_id}" }));
    }

    #[test]
    fn load_missing_file() {
        let err = RouteManifest::load(Path::new("/nonexistent/stencil.yaml")).unwrap_err();
        assert!(err.to_string().contains("failed to read"));
    }

    #[test]
    fn parse_rejects_unknown_method() {
        let yaml = r#"
routes:
  - path: /x
    method: TRACE
    response: {}
"#;
        let err = RouteManifest::parse(yaml, Path::new("bad.yaml")).unwrap_err();
        assert!(err.to_string().contains("bad.yaml"));
    }

    #[test]
    fn empty_manifest_is_valid() {
        let manifest = RouteManifest::parse("{}", Path::new("stencil.yaml")).unwrap();
        assert!(manifest.routes.is_empty());
        assert!(manifest.server.is_none());
    }
}
