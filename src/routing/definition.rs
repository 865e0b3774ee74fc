//! Route definitions and match results.

use std::fmt;
use std::sync::Arc;

use http::Method;
use serde_json::{Map, Value};

use crate::routing::group::MiddlewareRef;
use crate::routing::handler::HandlerRef;

/// An immutable registered route.
pub struct RouteDefinition {
    pub(crate) methods: Vec<Method>,
    pub(crate) path: String,
    pub(crate) handler: HandlerRef,
    pub(crate) middleware: Vec<MiddlewareRef>,
    pub(crate) name: Option<String>,
}

impl RouteDefinition {
    /// Uppercase methods the route answers, never empty.
    pub fn methods(&self) -> &[Method] {
        &self.methods
    }

    /// Full path pattern, including group prefixes.
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn handler(&self) -> &HandlerRef {
        &self.handler
    }

    /// Group middleware (outer to inner) followed by the route's own.
    pub fn middleware(&self) -> &[MiddlewareRef] {
        &self.middleware
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn allows(&self, method: &Method) -> bool {
        self.methods.contains(method)
    }

    /// Whether the pattern contains a `{placeholder}`.
    pub fn is_dynamic(&self) -> bool {
        self.path.contains('{') && self.path.contains('}')
    }
}

impl fmt::Debug for RouteDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteDefinition")
            .field("methods", &self.methods)
            .field("path", &self.path)
            .field("handler", &self.handler)
            .field("middleware", &self.middleware)
            .field("name", &self.name)
            .finish()
    }
}

/// Per-route options.
///
/// ```rust
/// use ferrous_kernel::RouteOptions;
///
/// let options = RouteOptions::named("users.show").middleware(["auth", "audit"]);
/// assert_eq!(options.name.as_deref(), Some("users.show"));
/// assert_eq!(options.middleware.len(), 2);
/// ```
#[derive(Debug, Default, Clone)]
pub struct RouteOptions {
    pub name: Option<String>,
    pub middleware: Vec<MiddlewareRef>,
}

impl RouteOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn named(name: impl Into<String>) -> Self {
        Self::new().name(name)
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn middleware<I, M>(mut self, middleware: I) -> Self
    where
        I: IntoIterator<Item = M>,
        M: Into<MiddlewareRef>,
    {
        self.middleware.extend(middleware.into_iter().map(Into::into));
        self
    }
}

/// Parameters captured from a matched path, in pattern order.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RouteParams(Vec<(String, String)>);

impl RouteParams {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.iter().find(|(k, _)| k == name).map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The parameters as a JSON object of strings.
    pub fn to_json(&self) -> Value {
        let map: Map<String, Value> = self
            .0
            .iter()
            .map(|(k, v)| (k.clone(), Value::String(v.clone())))
            .collect();
        Value::Object(map)
    }
}

impl From<matchit::Params<'_, '_>> for RouteParams {
    fn from(params: matchit::Params<'_, '_>) -> Self {
        RouteParams(params.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect())
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for RouteParams {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        RouteParams(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// Outcome of matching a method and path against the route table.
#[derive(Debug, Clone)]
pub enum RouteMatch {
    Found {
        route: Arc<RouteDefinition>,
        params: RouteParams,
    },
    NotFound,
    MethodNotAllowed {
        allowed: Vec<Method>,
    },
}

impl RouteMatch {
    pub fn is_found(&self) -> bool {
        matches!(self, RouteMatch::Found { .. })
    }
}
