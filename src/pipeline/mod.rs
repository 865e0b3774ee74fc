//! Middleware pipeline.
//!
//! A [`Dispatcher`] runs an ordered list of [`Middleware`] and ends in a
//! fallback [`RequestHandler`]. Each middleware receives the dispatcher
//! itself as `next`, so calling `next.handle(request)` advances the chain and
//! returning without calling it short-circuits.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::trace;

pub(crate) mod router_middleware;

pub use router_middleware::RouterMiddleware;

use crate::container::Container;
use crate::error::{DiError, Error, Result};
use crate::http::{Request, Response};
use crate::key::Key;
use crate::routing::MiddlewareRef;
use crate::traits::Resolver;

/// Terminal or intermediate request handler.
pub trait RequestHandler: Send + Sync {
    fn handle(&self, request: Request) -> Result<Response>;
}

impl<F> RequestHandler for F
where
    F: Fn(Request) -> Result<Response> + Send + Sync,
{
    fn handle(&self, request: Request) -> Result<Response> {
        self(request)
    }
}

/// A pipeline stage.
pub trait Middleware: Send + Sync {
    fn process(&self, request: Request, next: &dyn RequestHandler) -> Result<Response>;
}

impl<F> Middleware for F
where
    F: Fn(Request, &dyn RequestHandler) -> Result<Response> + Send + Sync,
{
    fn process(&self, request: Request, next: &dyn RequestHandler) -> Result<Response> {
        self(request, next)
    }
}

/// Boxes a closure as a [`Middleware`].
///
/// ```rust
/// use ferrous_kernel::{middleware_fn, RequestHandler};
/// use http::header::{HeaderValue, X_FRAME_OPTIONS};
///
/// let frame_guard = middleware_fn(|request, next| {
///     let mut response = next.handle(request)?;
///     response.headers_mut().insert(X_FRAME_OPTIONS, HeaderValue::from_static("DENY"));
///     Ok(response)
/// });
/// # let _ = frame_guard;
/// ```
pub fn middleware_fn<F>(f: F) -> Arc<dyn Middleware>
where
    F: Fn(Request, &dyn RequestHandler) -> Result<Response> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Boxes a closure as a [`RequestHandler`].
pub fn handler_fn<F>(f: F) -> Arc<dyn RequestHandler>
where
    F: Fn(Request) -> Result<Response> + Send + Sync + 'static,
{
    Arc::new(f)
}

#[derive(Debug, Default)]
struct Cursor {
    index: usize,
    depth: usize,
}

/// Re-entrant middleware dispatcher.
///
/// The position in the chain is reset whenever a fresh, outermost
/// `handle` starts and again when it finishes, whether it returns, fails
/// or unwinds, so a dispatcher can be reused for consecutive requests. It is
/// not meant to run two requests at the same time; build one per request.
///
/// # Examples
///
/// ```rust
/// use ferrous_kernel::{handler_fn, middleware_fn, Dispatcher, Request, RequestHandler, Response};
/// use http::StatusCode;
///
/// let tag = middleware_fn(|mut request, next| {
///     request.set_attribute("seen", true);
///     next.handle(request)
/// });
/// let end = handler_fn(|request| {
///     let seen = request.attribute("seen").is_some();
///     Ok(Response::text(seen.to_string(), StatusCode::OK))
/// });
///
/// let dispatcher = Dispatcher::new(vec![tag], end);
/// let response = dispatcher.handle(Request::get("/")).unwrap();
/// assert_eq!(response.body_str(), Some("true"));
/// ```
pub struct Dispatcher {
    middleware: Vec<Arc<dyn Middleware>>,
    fallback: Arc<dyn RequestHandler>,
    cursor: Mutex<Cursor>,
}

impl Dispatcher {
    pub fn new(middleware: Vec<Arc<dyn Middleware>>, fallback: Arc<dyn RequestHandler>) -> Self {
        Self {
            middleware,
            fallback,
            cursor: Mutex::new(Cursor::default()),
        }
    }

    pub fn len(&self) -> usize {
        self.middleware.len()
    }

    pub fn is_empty(&self) -> bool {
        self.middleware.is_empty()
    }
}

impl RequestHandler for Dispatcher {
    fn handle(&self, request: Request) -> Result<Response> {
        let (next, position) = {
            let mut cursor = self.cursor.lock();
            if cursor.depth == 0 {
                cursor.index = 0;
            }
            cursor.depth += 1;
            let position = cursor.index;
            let next = self.middleware.get(position).cloned();
            if next.is_some() {
                cursor.index += 1;
            }
            (next, position)
        };
        let _exit = CursorGuard { cursor: &self.cursor };

        match next {
            Some(middleware) => {
                trace!(position, "Running middleware");
                middleware.process(request, self)
            }
            None => {
                trace!("Running fallback handler");
                self.fallback.handle(request)
            }
        }
    }
}

struct CursorGuard<'a> {
    cursor: &'a Mutex<Cursor>,
}

impl Drop for CursorGuard<'_> {
    fn drop(&mut self) {
        let mut cursor = self.cursor.lock();
        cursor.depth = cursor.depth.saturating_sub(1);
        if cursor.depth == 0 {
            cursor.index = 0;
        }
    }
}

impl Container {
    /// Exposes the service under `id`, of concrete type `M`, as a
    /// [`Middleware`].
    pub fn as_middleware<M: Middleware + 'static>(&self, id: impl Into<Key>) -> &Self {
        self.expose::<dyn Middleware>(id, |any| any.downcast::<M>().ok().map(|m| m as Arc<dyn Middleware>))
    }

    /// Resolves a middleware reference.
    ///
    /// A service that is not a middleware gives [`Error::InvalidMiddleware`];
    /// resolution failures are returned as [`Error::Di`].
    pub fn middleware(&self, reference: &MiddlewareRef) -> Result<Arc<dyn Middleware>> {
        match reference {
            MiddlewareRef::Instance(middleware) => Ok(Arc::clone(middleware)),
            MiddlewareRef::Named(id) => self
                .get_as::<dyn Middleware>(id.as_str())
                .map_err(|e| match e {
                    e @ DiError::TypeMismatch(_) => Error::InvalidMiddleware(format!("{id}: {e}")),
                    other => Error::Di(other),
                }),
        }
    }
}
