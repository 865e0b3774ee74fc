//! Error types for the container, the router and the dispatch pipeline.

use http::StatusCode;
use thiserror::Error;

/// Dependency injection errors
///
/// Represents the failures that can occur while resolving services or
/// autowiring constructor and callable parameters.
///
/// # Examples
///
/// ```rust
/// use ferrous_kernel::{Container, DiError};
///
/// let container = Container::new();
/// match container.get_any("mailer") {
///     Err(DiError::NotFound(key)) => assert_eq!(key, "mailer"),
///     _ => unreachable!(),
/// }
///
/// let circular = DiError::Circular(vec!["A".into(), "B".into(), "A".into()]);
/// assert_eq!(circular.to_string(), "Circular dependency: A -> B -> A");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DiError {
    /// Service not registered, not declared and not cached
    #[error("Service not found: {0}")]
    NotFound(String),
    /// Type downcast or trait upcast failed
    #[error("Type mismatch for: {0}")]
    TypeMismatch(String),
    /// Circular dependency detected (includes the full chain)
    #[error("Circular dependency: {}", .0.join(" -> "))]
    Circular(Vec<String>),
    /// A constructor or callable parameter could not be satisfied
    #[error("Cannot autowire {target}::{parameter}: {reason}")]
    Autowire {
        target: String,
        parameter: String,
        reason: String,
    },
    /// Maximum recursion depth exceeded
    #[error("Max depth {0} exceeded")]
    DepthExceeded(usize),
}

impl DiError {
    pub(crate) fn autowire(
        target: impl Into<String>,
        parameter: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        DiError::Autowire {
            target: target.into(),
            parameter: parameter.into(),
            reason: reason.into(),
        }
    }
}

/// Result type for container operations
pub type DiResult<T> = std::result::Result<T, DiError>;

/// Route registration and generation errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteError {
    /// A route with this name is already registered
    #[error("Route name '{0}' is already registered")]
    DuplicateName(String),
    /// No route with this name is registered
    #[error("No route named '{0}' is registered")]
    UnknownName(String),
    /// A route definition that cannot be registered
    #[error("Invalid route '{path}': {reason}")]
    InvalidRoute { path: String, reason: String },
    /// The matcher rejected a path pattern
    #[error("Route '{path}' cannot be compiled: {reason}")]
    Conflict { path: String, reason: String },
}

/// A typed HTTP failure raised inside the pipeline.
///
/// The kernel turns these into responses; nothing in the pipeline renders
/// bodies for them.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{status}: {message}")]
pub struct HttpError {
    pub status: StatusCode,
    pub message: String,
}

impl HttpError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn not_found() -> Self {
        Self::new(StatusCode::NOT_FOUND, "Not Found")
    }

    pub fn method_not_allowed() -> Self {
        Self::new(StatusCode::METHOD_NOT_ALLOWED, "Method Not Allowed")
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }
}

/// Crate-wide error type.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Di(#[from] DiError),

    #[error(transparent)]
    Route(#[from] RouteError),

    #[error(transparent)]
    Http(#[from] HttpError),

    /// A middleware reference that does not resolve to a [`Middleware`](crate::Middleware)
    #[error("Invalid middleware: {0}")]
    InvalidMiddleware(String),

    /// A handler reference that does not resolve to something invocable
    #[error("Invalid route handler: {0}")]
    InvalidHandler(String),

    /// Failure raised by application code (handlers, middleware, modules)
    #[error("Handler error: {0}")]
    Handler(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
    /// Wraps an application error.
    pub fn handler<E>(error: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Error::Handler(error.into())
    }

    /// HTTP status this error maps to.
    ///
    /// HTTP failures keep their status when it is a 4xx/5xx code; everything
    /// else is a server error.
    pub fn status(&self) -> StatusCode {
        match self {
            Error::Http(e) if e.status.is_client_error() || e.status.is_server_error() => e.status,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// The HTTP failure, if this is one.
    pub fn as_http(&self) -> Option<&HttpError> {
        match self {
            Error::Http(e) => Some(e),
            _ => None,
        }
    }
}

/// Result type for pipeline operations
pub type Result<T> = std::result::Result<T, Error>;
