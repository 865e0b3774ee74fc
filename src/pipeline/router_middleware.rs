//! Bridge from the pipeline to route handlers.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, warn};

use crate::autowire::{Argument, Callable, Overrides};
use crate::container::Container;
use crate::error::{DiError, Error, HttpError, Result};
use crate::http::{Request, Response, ROUTE_PARAMS};
use crate::key::Key;
use crate::pipeline::{Dispatcher, Middleware, RequestHandler};
use crate::routing::{Controller, HandlerRef, RouteMatch, RouteParams, Router};
use crate::traits::Resolver;

/// Matches the request against the [`Router`] and runs the route.
///
/// Route parameters become request attributes (and the `route_params`
/// bundle). The route's own middleware run in a fresh inner [`Dispatcher`]
/// that ends in the handler. The handler is called through
/// [`Container::call`] with the request and the route parameters as
/// overrides.
///
/// This middleware never calls `next`: it is the end of the global chain.
pub struct RouterMiddleware {
    router: Arc<Router>,
    container: Container,
}

impl RouterMiddleware {
    pub fn new(router: Arc<Router>, container: Container) -> Self {
        Self { router, container }
    }

    /// Resolves a handler reference to a callable.
    pub fn resolve_handler(&self, handler: &HandlerRef) -> Result<Callable<Response>> {
        resolve_handler(&self.container, handler)
    }
}

impl Middleware for RouterMiddleware {
    fn process(&self, request: Request, _next: &dyn RequestHandler) -> Result<Response> {
        let (route, params) = match self.router.dispatch_request(&request)? {
            RouteMatch::Found { route, params } => (route, params),
            RouteMatch::NotFound => {
                debug!(method = %request.method(), path = request.path(), "No route matched");
                return Err(HttpError::not_found().into());
            }
            RouteMatch::MethodNotAllowed { allowed } => {
                let allowed: Vec<&str> = allowed.iter().map(|m| m.as_str()).collect();
                debug!(method = %request.method(), path = request.path(), ?allowed, "Method not allowed");
                return Err(HttpError::new(
                    http::StatusCode::METHOD_NOT_ALLOWED,
                    format!("Method Not Allowed (allow: {})", allowed.join(", ")),
                )
                .into());
            }
        };

        let mut request = request;
        request.set_attribute(ROUTE_PARAMS, params.to_json());
        for (name, value) in params.iter() {
            request.set_attribute(name, value);
        }

        let callable = self.resolve_handler(route.handler())?;

        if route.middleware().is_empty() {
            return invoke(&self.container, &callable, &params, request);
        }

        let middleware = route
            .middleware()
            .iter()
            .map(|reference| self.container.middleware(reference))
            .collect::<Result<Vec<_>>>()?;

        let container = self.container.clone();
        let fallback: Arc<dyn RequestHandler> =
            Arc::new(move |request: Request| invoke(&container, &callable, &params, request));

        Dispatcher::new(middleware, fallback).handle(request)
    }
}

/// Resolves a handler reference through the container.
pub(crate) fn resolve_handler(container: &Container, handler: &HandlerRef) -> Result<Callable<Response>> {
    match handler {
        HandlerRef::Callable(callable) => Ok(callable.clone()),
        HandlerRef::Method { service, method } => controller(container, service)?
            .action(method)
            .ok_or_else(|| Error::InvalidHandler(format!("{service}@{method}: no such action"))),
        HandlerRef::Service(service) => controller(container, service)?
            .invoke()
            .ok_or_else(|| Error::InvalidHandler(format!("{service}: not invocable"))),
    }
}

fn controller(container: &Container, service: &Key) -> Result<Arc<dyn Controller>> {
    container.get_as::<dyn Controller>(service).map_err(|e| match e {
        e @ DiError::TypeMismatch(_) => {
            warn!(service = %service, error = %e, "Route handler is not a controller");
            Error::InvalidHandler(format!("{service}: {e}"))
        }
        other => Error::Di(other),
    })
}

/// Overrides carrying the request, by name and by type.
pub(crate) fn request_overrides(request: Request) -> Overrides {
    let request = Arc::new(request);
    let mut overrides = Overrides::new();
    overrides.insert("request", Argument::Object(request.clone()));
    overrides.insert(Key::of::<Request>().as_str(), Argument::Object(request));
    overrides
}

/// Calls a route handler with the request and route parameters as
/// overrides.
pub(crate) fn invoke(
    container: &Container,
    callable: &Callable<Response>,
    params: &RouteParams,
    request: Request,
) -> Result<Response> {
    let mut overrides = request_overrides(request);
    for (name, value) in params.iter() {
        overrides.insert(name, Argument::Value(Value::String(value.to_string())));
    }
    container.call(callable, &overrides)
}
