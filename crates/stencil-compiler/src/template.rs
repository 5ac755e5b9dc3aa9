//! Response template synthesis.
//!
//! A handler is rendered once with the literal token `{name}` bound to every
//! path parameter. The serialized output is the template the engine serves,
//! replacing each token with the live request value. Handlers whose output
//! depends on parameter *values* (branching, length, case changes) cannot be
//! represented this way; the compiler detects the common cases with a second
//! probe render and rejects them.

use std::collections::BTreeMap;
use std::fmt;
use std::io;

use serde::Serialize;
use serde_json::ser::Formatter;
use serde_json::Value;

use crate::error::{CompileError, CompileWarning};

/// Values bound to a handler's path parameters during a render.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Placeholders {
    values: BTreeMap<String, String>,
}

impl Placeholders {
    /// Bind each name to its own `{name}` token.
    pub fn tokens(names: &[String]) -> Self {
        names
            .iter()
            .map(|name| (name.clone(), token(name)))
            .collect()
    }

    /// Bind names to arbitrary values.
    pub fn from_values<K, V>(values: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        values
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect()
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    /// Like [`get`](Self::get), but an unbound name is an error the handler can
    /// propagate with `?`.
    pub fn require(&self, name: &str) -> anyhow::Result<&str> {
        self.get(name)
            .ok_or_else(|| anyhow::anyhow!("no value bound for parameter '{}'", name))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl FromIterator<(String, String)> for Placeholders {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

/// Something that can produce a route's response shape from its parameters.
///
/// Implementations must be pure: the same placeholders always produce the
/// same value, and rendering has no side effects.
pub trait TemplateSource {
    /// Identifier used in error messages.
    fn name(&self) -> &str;

    /// The parameter names the source accepts (its "signature").
    fn parameters(&self) -> &[String];

    /// Produce the response value for the given parameter bindings.
    fn render(&self, params: &Placeholders) -> anyhow::Result<Value>;
}

type RenderFn = dyn Fn(&Placeholders) -> anyhow::Result<Value>;

/// A closure-backed [`TemplateSource`].
///
/// ```
/// use serde_json::json;
/// use stencil_compiler::Handler;
///
/// let get_user = Handler::new("get_user", &["user_id"], |p| {
///     Ok(json!({ "message": "Hello", "user_id": p.require("user_id")? }))
/// });
/// ```
pub struct Handler {
    name: String,
    parameters: Vec<String>,
    render: Box<RenderFn>,
}

impl Handler {
    pub fn new<F>(name: impl Into<String>, parameters: &[&str], render: F) -> Self
    where
        F: Fn(&Placeholders) -> anyhow::Result<Value> + 'static,
    {
        Self {
            name: name.into(),
            parameters: parameters.iter().map(|p| p.to_string()).collect(),
            render: Box::new(render),
        }
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handler")
            .field("name", &self.name)
            .field("parameters", &self.parameters)
            .finish_non_exhaustive()
    }
}

impl TemplateSource for Handler {
    fn name(&self) -> &str {
        &self.name
    }

    fn parameters(&self) -> &[String] {
        &self.parameters
    }

    fn render(&self, params: &Placeholders) -> anyhow::Result<Value> {
        (self.render)(params)
    }
}

/// A fixed response value whose strings may contain `{name}` tokens.
///
/// Rendering substitutes the bound values into those tokens, so a static
/// template behaves exactly like a handler that interpolates its arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct StaticTemplate {
    name: String,
    parameters: Vec<String>,
    value: Value,
}

impl StaticTemplate {
    pub fn new(name: impl Into<String>, parameters: Vec<String>, value: Value) -> Self {
        Self {
            name: name.into(),
            parameters,
            value,
        }
    }
}

impl TemplateSource for StaticTemplate {
    fn name(&self) -> &str {
        &self.name
    }

    fn parameters(&self) -> &[String] {
        &self.parameters
    }

    fn render(&self, params: &Placeholders) -> anyhow::Result<Value> {
        let values: BTreeMap<String, String> = params
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let mut value = self.value.clone();
        substitute_value(&mut value, &values);
        Ok(value)
    }
}

/// Output of [`compile_template`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledTemplate {
    pub template: String,
    pub warnings: Vec<CompileWarning>,
}

/// Derive the response template for one route.
///
/// `route` labels errors ("GET /users/{user_id}"). `path_params` must come
/// from [`extract_path_params`](crate::path::extract_path_params).
pub fn compile_template(
    route: &str,
    source: &dyn TemplateSource,
    path_params: &[String],
    detect_value_dependence: bool,
) -> Result<CompiledTemplate, CompileError> {
    let declared = source.parameters();
    if let Some(missing) = path_params.iter().find(|p| !declared.contains(*p)) {
        return Err(CompileError::UndeclaredPathParam {
            route: route.to_string(),
            handler: source.name().to_string(),
            param: missing.clone(),
        });
    }

    let template = render_text(route, source, &Placeholders::tokens(path_params))?;

    if detect_value_dependence && !path_params.is_empty() {
        let probes: Placeholders = path_params
            .iter()
            .enumerate()
            .map(|(i, name)| (name.clone(), probe(i)))
            .collect();
        let mut probed = render_text(route, source, &probes)?;
        for (i, name) in path_params.iter().enumerate() {
            probed = probed.replace(&probe(i), &token(name));
        }
        if probed != template {
            return Err(CompileError::ValueDependentTemplate {
                route: route.to_string(),
                handler: source.name().to_string(),
            });
        }
    }

    let warnings = path_params
        .iter()
        .filter(|name| !template.contains(&token(name)))
        .map(|name| CompileWarning {
            code: "E1101".to_string(),
            message: format!(
                "path parameter '{}' does not appear in the response template",
                name
            ),
            location: Some(route.to_string()),
        })
        .collect();

    Ok(CompiledTemplate { template, warnings })
}

fn render_text(
    route: &str,
    source: &dyn TemplateSource,
    params: &Placeholders,
) -> Result<String, CompileError> {
    let value = source
        .render(params)
        .map_err(|e| CompileError::HandlerFailed {
            route: route.to_string(),
            handler: source.name().to_string(),
            source: e.into(),
        })?;

    match value {
        Value::String(text) => Ok(text),
        other => Ok(to_template_json(&other)?),
    }
}

/// Writes `", "` between items and `": "` after keys, the layout the engine's
/// clients already expect from served bodies.
struct SpacedFormatter;

impl Formatter for SpacedFormatter {
    fn begin_array_value<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_key<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_value<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        writer.write_all(b": ")
    }
}

/// Serialize a value as template text: single line, spaced separators, keys
/// in insertion order.
pub fn to_template_json(value: &Value) -> Result<String, serde_json::Error> {
    let mut buf = Vec::new();
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, SpacedFormatter);
    value.serialize(&mut serializer)?;
    String::from_utf8(buf).map_err(serde::ser::Error::custom)
}

fn token(name: &str) -> String {
    format!("{{{}}}", name)
}

// Must survive JSON escaping unchanged and never occur in real output.
fn probe(index: usize) -> String {
    format!("__stencil_probe_{}__", index)
}

/// Fill a compiled template with live values, the way the serving engine does.
///
/// When the template is a JSON object, tokens are replaced inside string
/// values only (keys are left alone), recursing through nested objects and
/// arrays, and the object is re-serialized. Any other template gets a plain
/// textual replacement. Tokens without a bound value are kept verbatim, and
/// substituted values are never re-scanned for tokens.
pub fn substitute(template: &str, values: &BTreeMap<String, String>) -> String {
    if let Ok(mut value @ Value::Object(_)) = serde_json::from_str::<Value>(template) {
        substitute_value(&mut value, values);
        if let Ok(text) = to_template_json(&value) {
            return text;
        }
    }
    replace_tokens(template, values)
}

fn substitute_value(value: &mut Value, values: &BTreeMap<String, String>) {
    match value {
        Value::String(s) => {
            if s.contains('{') {
                *s = replace_tokens(s, values);
            }
        }
        Value::Array(items) => {
            for item in items {
                substitute_value(item, values);
            }
        }
        Value::Object(map) => {
            for (_, item) in map.iter_mut() {
                substitute_value(item, values);
            }
        }
        _ => {}
    }
}

fn replace_tokens(text: &str, values: &BTreeMap<String, String>) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        match after.find(|c: char| c == '{' || c == '}') {
            Some(end) if after.as_bytes()[end] == b'}' => {
                let name = &after[..end];
                match values.get(name) {
                    Some(value) => out.push_str(value),
                    None => {
                        out.push('{');
                        out.push_str(name);
                        out.push('}');
                    }
                }
                rest = &after[end + 1..];
            }
            _ => {
                out.push('{');
                rest = after;
            }
        }
    }

    out.push_str(rest);
    out
}
