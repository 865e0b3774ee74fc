//! Route groups, middleware references and path normalization.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::pipeline::Middleware;

/// A middleware attached to a route: a container id or a ready instance.
#[derive(Clone)]
pub enum MiddlewareRef {
    Named(String),
    Instance(Arc<dyn Middleware>),
}

impl MiddlewareRef {
    /// The container id, for named references.
    pub fn name(&self) -> Option<&str> {
        match self {
            MiddlewareRef::Named(name) => Some(name),
            MiddlewareRef::Instance(_) => None,
        }
    }
}

impl fmt::Debug for MiddlewareRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MiddlewareRef::Named(name) => f.debug_tuple("Named").field(name).finish(),
            MiddlewareRef::Instance(_) => f.write_str("Instance(..)"),
        }
    }
}

impl From<&str> for MiddlewareRef {
    fn from(name: &str) -> Self {
        MiddlewareRef::Named(name.to_string())
    }
}

impl From<String> for MiddlewareRef {
    fn from(name: String) -> Self {
        MiddlewareRef::Named(name)
    }
}

impl From<Arc<dyn Middleware>> for MiddlewareRef {
    fn from(middleware: Arc<dyn Middleware>) -> Self {
        MiddlewareRef::Instance(middleware)
    }
}

/// Options for [`Router::group_with`](crate::Router::group_with).
#[derive(Debug, Default, Clone)]
pub struct GroupOptions {
    pub middleware: Vec<MiddlewareRef>,
}

impl GroupOptions {
    pub fn new() -> Self {
        Self::default()
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

/// One active group: normalized prefix and expanded middleware.
#[derive(Debug, Clone)]
pub(crate) struct GroupFrame {
    pub(crate) prefix: String,
    pub(crate) middleware: Vec<MiddlewareRef>,
}

/// Replaces references to named groups by the group's members.
///
/// Expansion is a single level: a group listing another group's name keeps
/// that name as a plain middleware id.
pub(crate) fn expand(middleware: Vec<MiddlewareRef>, groups: &HashMap<String, Vec<MiddlewareRef>>) -> Vec<MiddlewareRef> {
    let mut expanded = Vec::with_capacity(middleware.len());
    for item in middleware {
        match item.name().and_then(|name| groups.get(name)) {
            Some(members) => expanded.extend(members.iter().cloned()),
            None => expanded.push(item),
        }
    }
    expanded
}

/// `""` or `"/"` become `""`, anything else `"/segment..."` without a
/// trailing slash.
pub(crate) fn normalize_prefix(prefix: &str) -> String {
    let trimmed = prefix.trim().trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{trimmed}")
    }
}

/// Ensures a single leading slash; the empty path is `/`.
pub(crate) fn normalize_path(path: &str) -> String {
    format!("/{}", path.trim_start_matches('/'))
}

/// Joins the active prefixes and a route path.
pub(crate) fn join(frames: &[GroupFrame], path: &str) -> String {
    let prefix: String = frames.iter().map(|f| f.prefix.as_str()).collect();
    let path = normalize_path(path);
    if prefix.is_empty() {
        path
    } else {
        format!("{}{}", prefix.trim_end_matches('/'), path)
    }
}
