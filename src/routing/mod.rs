//! Route table with named routes, groups and reverse generation.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use http::Method;
use parking_lot::{Mutex, RwLock};
use tracing::{debug, trace};

mod definition;
mod generator;
mod group;
mod handler;
mod matcher;

pub use definition::{RouteDefinition, RouteMatch, RouteOptions, RouteParams};
pub use generator::RouteGenerator;
pub use group::{GroupOptions, MiddlewareRef};
pub use handler::{handler, Controller, HandlerRef};

use crate::autowire::{Arguments, Injectable};
use crate::error::{DiResult, RouteError};
use crate::http::Request;
use group::GroupFrame;
use matcher::Matcher;

/// Methods registered by [`Router::any`].
pub const ANY_METHODS: [Method; 7] = [
    Method::GET,
    Method::HEAD,
    Method::POST,
    Method::PUT,
    Method::PATCH,
    Method::DELETE,
    Method::OPTIONS,
];

#[derive(Default)]
struct Table {
    routes: Vec<Arc<RouteDefinition>>,
    named: HashMap<String, Arc<RouteDefinition>>,
    groups: HashMap<String, Vec<MiddlewareRef>>,
    generation: u64,
}

struct Compiled {
    generation: u64,
    matcher: Arc<Matcher>,
}

/// The route table.
///
/// Registration takes `&self` so the router can live in the container as a
/// shared singleton. Matching compiles the table on first use; registering
/// another route afterwards makes the next dispatch recompile.
///
/// # Examples
///
/// ```rust
/// use ferrous_kernel::{GroupOptions, RouteMatch, RouteOptions, Router};
/// use http::Method;
///
/// let router = Router::new();
/// router.middleware_group("web", ["session", "csrf"]);
///
/// router
///     .group_with("/admin", GroupOptions::new().middleware(["web"]), |r| {
///         r.get("/users/{id}", "UserController@show", RouteOptions::named("admin.users.show"))?;
///         Ok(())
///     })
///     .unwrap();
///
/// match router.dispatch(&Method::GET, "/admin/users/42").unwrap() {
///     RouteMatch::Found { route, params } => {
///         assert_eq!(params.get("id"), Some("42"));
///         assert_eq!(route.middleware().len(), 2);
///     }
///     _ => unreachable!(),
/// }
///
/// assert_eq!(router.route_path("admin.users.show", &[("id", "7")]).unwrap(), "/admin/users/7");
/// ```
#[derive(Default)]
pub struct Router {
    table: RwLock<Table>,
    frames: Mutex<Vec<GroupFrame>>,
    compiled: RwLock<Option<Compiled>>,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    // ----- Registration -----

    /// `GET` and `HEAD`.
    pub fn get(&self, path: &str, handler: impl Into<HandlerRef>, options: RouteOptions) -> Result<Arc<RouteDefinition>, RouteError> {
        self.add_route([Method::GET, Method::HEAD], path, handler, options)
    }

    pub fn post(&self, path: &str, handler: impl Into<HandlerRef>, options: RouteOptions) -> Result<Arc<RouteDefinition>, RouteError> {
        self.add_route([Method::POST], path, handler, options)
    }

    pub fn put(&self, path: &str, handler: impl Into<HandlerRef>, options: RouteOptions) -> Result<Arc<RouteDefinition>, RouteError> {
        self.add_route([Method::PUT], path, handler, options)
    }

    pub fn patch(&self, path: &str, handler: impl Into<HandlerRef>, options: RouteOptions) -> Result<Arc<RouteDefinition>, RouteError> {
        self.add_route([Method::PATCH], path, handler, options)
    }

    pub fn delete(&self, path: &str, handler: impl Into<HandlerRef>, options: RouteOptions) -> Result<Arc<RouteDefinition>, RouteError> {
        self.add_route([Method::DELETE], path, handler, options)
    }

    pub fn options(&self, path: &str, handler: impl Into<HandlerRef>, options: RouteOptions) -> Result<Arc<RouteDefinition>, RouteError> {
        self.add_route([Method::OPTIONS], path, handler, options)
    }

    /// Every common method, see [`ANY_METHODS`].
    pub fn any(&self, path: &str, handler: impl Into<HandlerRef>, options: RouteOptions) -> Result<Arc<RouteDefinition>, RouteError> {
        self.add_route(ANY_METHODS, path, handler, options)
    }

    /// Registers a route for an explicit method set.
    ///
    /// The path is prefixed by the active groups, and the middleware list is
    /// the groups' middleware followed by the route's own, with named
    /// middleware groups expanded.
    pub fn add_route<I>(
        &self,
        methods: I,
        path: &str,
        handler: impl Into<HandlerRef>,
        options: RouteOptions,
    ) -> Result<Arc<RouteDefinition>, RouteError>
    where
        I: IntoIterator<Item = Method>,
    {
        let mut method_set: Vec<Method> = Vec::new();
        for method in methods.into_iter().map(uppercase) {
            if !method_set.contains(&method) {
                method_set.push(method);
            }
        }

        let frames = self.frames.lock().clone();
        let full_path = group::join(&frames, path);
        if method_set.is_empty() {
            return Err(RouteError::InvalidRoute {
                path: full_path,
                reason: "no HTTP methods given".to_string(),
            });
        }

        let mut table = self.table.write();
        if let Some(name) = &options.name {
            if table.named.contains_key(name) {
                return Err(RouteError::DuplicateName(name.clone()));
            }
        }

        let mut middleware: Vec<MiddlewareRef> = frames.iter().flat_map(|f| f.middleware.iter().cloned()).collect();
        middleware.extend(group::expand(options.middleware, &table.groups));

        let route = Arc::new(RouteDefinition {
            methods: method_set,
            path: full_path,
            handler: handler.into(),
            middleware,
            name: options.name,
        });

        debug!(
            methods = ?route.methods(),
            path = route.path(),
            name = ?route.name(),
            "Registered route"
        );

        if let Some(name) = &route.name {
            table.named.insert(name.clone(), Arc::clone(&route));
        }
        table.routes.push(Arc::clone(&route));
        table.generation += 1;

        Ok(route)
    }

    /// Runs `routes` with `prefix` applied to every route it registers.
    pub fn group<F>(&self, prefix: &str, routes: F) -> Result<(), RouteError>
    where
        F: FnOnce(&Router) -> Result<(), RouteError>,
    {
        self.group_with(prefix, GroupOptions::default(), routes)
    }

    /// Like [`group`](Self::group), also applying the group's middleware.
    ///
    /// The frame is popped however `routes` exits.
    pub fn group_with<F>(&self, prefix: &str, options: GroupOptions, routes: F) -> Result<(), RouteError>
    where
        F: FnOnce(&Router) -> Result<(), RouteError>,
    {
        let frame = GroupFrame {
            prefix: group::normalize_prefix(prefix),
            middleware: group::expand(options.middleware, &self.table.read().groups),
        };
        trace!(prefix = %frame.prefix, "Entering route group");
        self.frames.lock().push(frame);

        let _pop = FrameGuard { router: self };
        routes(self)
    }

    /// Defines a named middleware list usable wherever middleware is
    /// listed. Names of groups already defined are expanded now.
    pub fn middleware_group<I, M>(&self, name: impl Into<String>, middleware: I)
    where
        I: IntoIterator<Item = M>,
        M: Into<MiddlewareRef>,
    {
        let mut table = self.table.write();
        let list = group::expand(middleware.into_iter().map(Into::into).collect(), &table.groups);
        table.groups.insert(name.into(), list);
    }

    // ----- Matching -----

    /// Matches a method and path.
    pub fn dispatch(&self, method: &Method, path: &str) -> Result<RouteMatch, RouteError> {
        let matcher = self.matcher()?;
        let result = matcher.lookup(method, path);
        trace!(method = %method, path, found = result.is_found(), "Dispatched");
        Ok(result)
    }

    pub fn dispatch_request(&self, request: &Request) -> Result<RouteMatch, RouteError> {
        self.dispatch(request.method(), request.path())
    }

    fn matcher(&self) -> Result<Arc<Matcher>, RouteError> {
        let generation = self.table.read().generation;
        if let Some(compiled) = self.compiled.read().as_ref() {
            if compiled.generation == generation {
                return Ok(Arc::clone(&compiled.matcher));
            }
        }

        let (generation, routes) = {
            let table = self.table.read();
            (table.generation, table.routes.clone())
        };
        let matcher = Arc::new(Matcher::compile(&routes)?);
        *self.compiled.write() = Some(Compiled {
            generation,
            matcher: Arc::clone(&matcher),
        });
        Ok(matcher)
    }

    // ----- Lookup -----

    /// Path of a named route with `params` substituted.
    ///
    /// Placeholders without a value are dropped: `/users/{id}` with no
    /// parameters yields `/users`.
    pub fn route_path(&self, name: &str, params: &[(&str, &str)]) -> Result<String, RouteError> {
        let route = self.route(name).ok_or_else(|| RouteError::UnknownName(name.to_string()))?;
        Ok(generator::fill(route.path(), params))
    }

    pub fn route(&self, name: &str) -> Option<Arc<RouteDefinition>> {
        self.table.read().named.get(name).cloned()
    }

    /// Whether any route has exactly this (normalized) path pattern.
    pub fn has_path(&self, path: &str) -> bool {
        let path = group::normalize_path(path);
        self.table.read().routes.iter().any(|r| r.path() == path)
    }

    /// All routes in registration order.
    pub fn definitions(&self) -> Vec<Arc<RouteDefinition>> {
        self.table.read().routes.clone()
    }

    /// The route rendering an error page for `status`.
    ///
    /// In order: a route for exactly `/error/<status>`; the first
    /// `/error/{...}` route not named `error.default`; the first such route
    /// named `error.default`; any route named `error.default`.
    pub fn find_error_route(&self, status: u16) -> Option<Arc<RouteDefinition>> {
        let table = self.table.read();
        let exact = format!("/error/{status}");
        if let Some(route) = table.routes.iter().find(|r| r.path() == exact) {
            return Some(Arc::clone(route));
        }

        let mut first_default = None;
        for route in table.routes.iter().filter(|r| r.path().starts_with("/error/") && r.is_dynamic()) {
            if route.name() != Some("error.default") {
                return Some(Arc::clone(route));
            }
            first_default.get_or_insert_with(|| Arc::clone(route));
        }

        first_default.or_else(|| table.named.get("error.default").cloned())
    }
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let table = self.table.read();
        f.debug_struct("Router")
            .field("routes", &table.routes.len())
            .field("named", &table.named.len())
            .field("groups", &table.groups.len())
            .finish()
    }
}

impl Injectable for Router {
    fn construct(_: &Arguments) -> DiResult<Self> {
        Ok(Router::new())
    }
}

struct FrameGuard<'a> {
    router: &'a Router,
}

impl Drop for FrameGuard<'_> {
    fn drop(&mut self) {
        self.router.frames.lock().pop();
    }
}

fn uppercase(method: Method) -> Method {
    let upper = method.as_str().to_ascii_uppercase();
    if upper == method.as_str() {
        return method;
    }
    Method::from_bytes(upper.as_bytes()).unwrap_or(method)
}
