//! Declaration-time route table.
//!
//! Routes, dependencies, middleware toggles and configuration are collected in
//! declaration order. [`RouteTable::build`] validates all of them and produces
//! a [`CompiledApp`]; nothing reaches the engine until the whole table is
//! known to be valid.

use std::collections::{BTreeSet, HashMap};

use sha2::{Digest, Sha256};

use stencil_model::{
    CompiledApp, CompiledRoute, HttpMethod, LogLevel, MiddlewareToggle, ParamLocation,
    RouteOptions, ServerConfig, ARTIFACT_VERSION,
};

use crate::dependency::{Dependency, DependencyRegistry};
use crate::error::{CompileError, CompileWarning};
use crate::path::{extract_path_params, normalize_path_template};
use crate::template::{compile_template, TemplateSource};

/// Compiler version embedded in artifacts.
pub const COMPILER_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Options for [`RouteTable::build`].
#[derive(Debug, Clone)]
pub struct CompileOptions {
    /// Render each handler a second time with probe values and reject
    /// handlers whose output changes shape.
    pub detect_value_dependence: bool,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            detect_value_dependence: true,
        }
    }
}

struct RouteDeclaration {
    options: RouteOptions,
    source: Box<dyn TemplateSource>,
    dependencies: Vec<Dependency>,
}

enum Declaration {
    Route(RouteDeclaration),
    Dependency { name: String, value: String },
    Middleware(MiddlewareToggle),
}

/// Builder accumulating declarations for one application.
///
/// ```
/// use serde_json::json;
/// use stencil_compiler::{CompileOptions, DependencyRegistry, Handler, RouteTable};
///
/// let table = RouteTable::new().get(
///     "/users/{user_id}",
///     Handler::new("get_user", &["user_id"], |p| {
///         Ok(json!({ "message": "Hello", "user_id": p.require("user_id")? }))
///     }),
/// );
///
/// let mut registry = DependencyRegistry::new();
/// let app = table.build(&mut registry, &CompileOptions::default()).unwrap();
/// assert_eq!(app.routes[0].template, r#"{"message": "Hello", "user_id": "{user_id}"}"#);
/// ```
#[derive(Default)]
pub struct RouteTable {
    declarations: Vec<Declaration>,
    server: Option<ServerConfig>,
    server_redeclared: bool,
    log_level: Option<LogLevel>,
    include_debug_data: Option<bool>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a route.
    pub fn route(self, options: RouteOptions, source: impl TemplateSource + 'static) -> Self {
        self.route_with_dependencies(options, source, Vec::new())
    }

    /// Declare a route that requires dependencies.
    ///
    /// Names listed in `options.dependencies` are treated as
    /// [`Dependency::Named`] and checked before the ones given here.
    pub fn route_with_dependencies(
        mut self,
        options: RouteOptions,
        source: impl TemplateSource + 'static,
        dependencies: Vec<Dependency>,
    ) -> Self {
        self.declarations.push(Declaration::Route(RouteDeclaration {
            options,
            source: Box::new(source),
            dependencies,
        }));
        self
    }

    pub fn get(self, path: impl Into<String>, source: impl TemplateSource + 'static) -> Self {
        self.route(RouteOptions::new(HttpMethod::Get, path), source)
    }

    pub fn post(self, path: impl Into<String>, source: impl TemplateSource + 'static) -> Self {
        self.route(RouteOptions::new(HttpMethod::Post, path), source)
    }

    pub fn put(self, path: impl Into<String>, source: impl TemplateSource + 'static) -> Self {
        self.route(RouteOptions::new(HttpMethod::Put, path), source)
    }

    pub fn delete(self, path: impl Into<String>, source: impl TemplateSource + 'static) -> Self {
        self.route(RouteOptions::new(HttpMethod::Delete, path), source)
    }

    pub fn patch(self, path: impl Into<String>, source: impl TemplateSource + 'static) -> Self {
        self.route(RouteOptions::new(HttpMethod::Patch, path), source)
    }

    /// Register a dependency value. Visible to routes declared after it.
    pub fn dependency(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.declarations.push(Declaration::Dependency {
            name: name.into(),
            value: value.into(),
        });
        self
    }

    /// Toggle one of the engine's built-in middlewares.
    pub fn middleware(mut self, name: impl Into<String>, enabled: bool) -> Self {
        self.declarations
            .push(Declaration::Middleware(MiddlewareToggle::new(name, enabled)));
        self
    }

    /// Set the server configuration. May be called once per table.
    pub fn configure_server(mut self, config: ServerConfig) -> Self {
        if self.server.is_some() {
            self.server_redeclared = true;
        }
        self.server = Some(config);
        self
    }

    pub fn log_level(mut self, level: LogLevel) -> Self {
        self.log_level = Some(level);
        self
    }

    pub fn include_debug_data(mut self, enabled: bool) -> Self {
        self.include_debug_data = Some(enabled);
        self
    }

    /// Number of declared routes.
    pub fn route_count(&self) -> usize {
        self.declarations
            .iter()
            .filter(|d| matches!(d, Declaration::Route(_)))
            .count()
    }

    /// Validate and compile every declaration.
    ///
    /// Declarations are processed in order, so a named dependency must be
    /// declared (or already present in `registry`) before the first route that
    /// uses it. On error `registry` is left untouched; on success it holds
    /// every dependency the table registered.
    pub fn build(
        self,
        registry: &mut DependencyRegistry,
        options: &CompileOptions,
    ) -> Result<CompiledApp, CompileError> {
        if self.server_redeclared {
            return Err(CompileError::ConfigRedeclared);
        }

        let mut staged = registry.clone();
        let mut routes: Vec<CompiledRoute> = Vec::new();
        let mut middlewares: Vec<MiddlewareToggle> = Vec::new();
        let mut warnings: Vec<CompileWarning> = Vec::new();
        let mut seen_routes: HashMap<(String, HttpMethod), usize> = HashMap::new();
        let mut seen_structural: HashMap<(String, HttpMethod), String> = HashMap::new();

        for declaration in self.declarations {
            match declaration {
                Declaration::Dependency { name, value } => {
                    staged.register(name, value);
                }
                Declaration::Middleware(toggle) => {
                    if !toggle.is_known() {
                        tracing::warn!(middleware = %toggle.name, "unknown middleware name");
                        warnings.push(CompileWarning {
                            code: "E1201".to_string(),
                            message: format!(
                                "unknown middleware '{}' will be ignored by the engine",
                                toggle.name
                            ),
                            location: Some(format!("middleware '{}'", toggle.name)),
                        });
                    }
                    middlewares.push(toggle);
                }
                Declaration::Route(route) => {
                    let label = route.options.label();

                    // Routing conflicts (E1010)
                    let key = (route.options.path.clone(), route.options.method);
                    if let Some(first) = seen_routes.get(&key) {
                        return Err(CompileError::RoutingConflict(format!(
                            "{} declared twice (first as route #{})",
                            label,
                            first + 1
                        )));
                    }
                    seen_routes.insert(key, routes.len());

                    // Same structure, different placeholder names (E1050)
                    let structural_key = (
                        normalize_path_template(&route.options.path),
                        route.options.method,
                    );
                    if let Some(other_path) = seen_structural.get(&structural_key) {
                        return Err(CompileError::AmbiguousRoute(format!(
                            "'{}' and '{}' have same structure but different param names ({})",
                            route.options.path, other_path, route.options.method
                        )));
                    }
                    seen_structural.insert(structural_key, route.options.path.clone());

                    let compiled = compile_route(route, &mut staged, options, &mut warnings)?;
                    tracing::debug!(
                        route = %label,
                        template_len = compiled.template.len(),
                        "route compiled"
                    );
                    routes.push(compiled);
                }
            }
        }

        let routes_json = serde_json::to_string(&routes)?;
        let routes_sha256 = compute_sha256(&routes_json);

        warnings.sort_by(|a, b| {
            (&a.location, &a.code, &a.message).cmp(&(&b.location, &b.code, &b.message))
        });

        let dependencies = staged.entries();
        *registry = staged;

        stencil_telemetry::log_routes_compiled!(
            routes = routes.len(),
            dependencies = dependencies.len(),
            warnings = warnings.len(),
            routes_sha256 = %routes_sha256
        );

        Ok(CompiledApp {
            artifact_version: ARTIFACT_VERSION,
            compiler_version: COMPILER_VERSION.to_string(),
            log_level: self.log_level,
            include_debug_data: self.include_debug_data,
            server: self.server,
            middlewares,
            dependencies,
            routes,
            routes_sha256,
            warnings,
        })
    }
}

fn compile_route(
    route: RouteDeclaration,
    registry: &mut DependencyRegistry,
    options: &CompileOptions,
    warnings: &mut Vec<CompileWarning>,
) -> Result<CompiledRoute, CompileError> {
    let RouteDeclaration {
        options: route_options,
        source,
        dependencies,
    } = route;
    let label = route_options.label();

    route_options.validate()?;
    let path_params = extract_path_params(&route_options.path)?;

    // Documented path parameters that the path never mentions (E1103)
    for param in &route_options.parameters {
        if param.location == ParamLocation::Path && !path_params.contains(&param.name) {
            warnings.push(CompileWarning {
                code: "E1103".to_string(),
                message: format!(
                    "path parameter '{}' is documented but not present in the path",
                    param.name
                ),
                location: Some(label.clone()),
            });
        }
    }

    let mut resolved: Vec<String> = Vec::new();
    let named = route_options
        .dependencies
        .iter()
        .map(|name| Dependency::named(name.as_str()));
    for dependency in named.chain(dependencies) {
        match registry.attach(&dependency, &label)? {
            Some(name) => {
                if !resolved.contains(&name) {
                    resolved.push(name);
                }
            }
            None => {
                let name = match &dependency {
                    Dependency::Named(name) => name.as_str(),
                    Dependency::Provided(provider) => provider.name(),
                };
                warnings.push(CompileWarning {
                    code: "E1104".to_string(),
                    message: format!(
                        "dependency '{}' produced a non-text value and was not registered",
                        name
                    ),
                    location: Some(label.clone()),
                });
            }
        }
    }

    let compiled = compile_template(
        &label,
        source.as_ref(),
        &path_params,
        options.detect_value_dependence,
    )?;
    warnings.extend(compiled.warnings);

    Ok(CompiledRoute {
        path: route_options.path,
        method: route_options.method,
        template: compiled.template,
        description: route_options.description,
        path_params,
        parameters: route_options.parameters,
        request_body: route_options.request_body,
        responses: route_options.responses,
        dependencies: resolved,
    })
}

/// Compute SHA-256 hash of a string.
fn compute_sha256(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    hex::encode(hasher.finalize())
}

/// Names of every dependency the compiled routes reference.
pub fn referenced_dependencies(app: &CompiledApp) -> BTreeSet<&str> {
    app.routes
        .iter()
        .flat_map(|r| r.dependencies.iter().map(String::as_str))
        .collect()
}
