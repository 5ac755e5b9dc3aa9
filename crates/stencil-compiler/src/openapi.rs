//! OpenAPI 3.0 document generation from compiled routes.

use serde_json::{json, Map, Value};

use stencil_model::{CompiledApp, CompiledRoute, Parameter};

/// The `info` block of a generated document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiInfo {
    pub title: String,
    pub version: String,
    pub description: String,
}

impl Default for ApiInfo {
    fn default() -> Self {
        Self {
            title: "Stencil API".to_string(),
            version: "1.0.0".to_string(),
            description: String::new(),
        }
    }
}

impl ApiInfo {
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

/// Build an OpenAPI 3.0 document describing every route in `app`.
///
/// Paths appear in route declaration order. When a route's template is
/// valid JSON it is attached as the example body of its `200` response.
pub fn openapi_document(app: &CompiledApp, info: &ApiInfo) -> Value {
    let mut paths = Map::new();

    for route in &app.routes {
        let entry = paths
            .entry(route.path.clone())
            .or_insert_with(|| Value::Object(Map::new()));
        if let Value::Object(methods) = entry {
            methods.insert(route.method.as_str().to_ascii_lowercase(), operation(route));
        }
    }

    let mut info_block = json!({
        "title": info.title,
        "version": info.version,
    });
    if !info.description.is_empty() {
        info_block["description"] = Value::String(info.description.clone());
    }

    json!({
        "openapi": "3.0.0",
        "info": info_block,
        "paths": paths,
        "components": {},
    })
}

fn operation(route: &CompiledRoute) -> Value {
    let mut op = Map::new();
    op.insert("summary".into(), Value::String(route.description.clone()));
    op.insert(
        "parameters".into(),
        Value::Array(route.parameters.iter().map(parameter).collect()),
    );

    if let Some(body) = &route.request_body {
        op.insert(
            "requestBody".into(),
            json!({
                "description": body.description,
                "required": body.required,
                "content": {
                    body.content_type.clone(): { "schema": schema_value(&body.schema, "object") }
                },
            }),
        );
    }

    let example = serde_json::from_str::<Value>(&route.template).ok();
    let mut responses = Map::new();
    for (status, description) in &route.responses {
        let mut response = json!({ "description": description });
        if *status == 200 {
            if let Some(example) = &example {
                response["content"] = json!({
                    "application/json": { "example": example }
                });
            }
        }
        responses.insert(status.to_string(), response);
    }
    op.insert("responses".into(), Value::Object(responses));

    Value::Object(op)
}

fn parameter(param: &Parameter) -> Value {
    let schema = match &param.schema {
        Some(schema) => schema_value(schema, &param.param_type),
        None => json!({ "type": param.param_type }),
    };
    json!({
        "name": param.name,
        "in": param.location.as_str(),
        "description": param.description,
        "required": param.required,
        "schema": schema,
    })
}

// Free-form schemas are usually JSON Schema text; anything else falls back
// to a bare type.
fn schema_value(schema: &str, fallback_type: &str) -> Value {
    match serde_json::from_str::<Value>(schema) {
        Ok(value @ Value::Object(_)) => value,
        _ => json!({ "type": fallback_type }),
    }
}
