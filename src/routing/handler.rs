//! Route handler references and controllers.

use std::fmt;
use std::sync::Arc;

use crate::autowire::{Callable, Parameter};
use crate::container::Container;
use crate::http::{Request, Response};
use crate::key::Key;

/// What a route calls.
///
/// Strings convert by shape: `"Type@method"` names a controller action,
/// anything else a controller invoked as a whole.
///
/// ```rust
/// use ferrous_kernel::HandlerRef;
///
/// match HandlerRef::from("UserController@show") {
///     HandlerRef::Method { service, method } => {
///         assert_eq!(service.as_str(), "UserController");
///         assert_eq!(method, "show");
///     }
///     _ => unreachable!(),
/// }
/// assert!(matches!(HandlerRef::from("HealthCheck"), HandlerRef::Service(_)));
/// ```
#[derive(Clone)]
pub enum HandlerRef {
    /// A callable with declared parameters
    Callable(Callable<Response>),
    /// An action of a controller resolved from the container
    Method { service: Key, method: String },
    /// A controller resolved from the container and invoked as a whole
    Service(Key),
}

impl fmt::Debug for HandlerRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HandlerRef::Callable(callable) => f.debug_tuple("Callable").field(&callable.name()).finish(),
            HandlerRef::Method { service, method } => write!(f, "Method({service}@{method})"),
            HandlerRef::Service(key) => f.debug_tuple("Service").field(&key.as_str()).finish(),
        }
    }
}

impl From<&str> for HandlerRef {
    fn from(target: &str) -> Self {
        match target.split_once('@') {
            Some((service, method)) => HandlerRef::Method {
                service: Key::from(service),
                method: method.to_string(),
            },
            None => HandlerRef::Service(Key::from(target)),
        }
    }
}

impl From<String> for HandlerRef {
    fn from(target: String) -> Self {
        HandlerRef::from(target.as_str())
    }
}

impl From<Callable<Response>> for HandlerRef {
    fn from(callable: Callable<Response>) -> Self {
        HandlerRef::Callable(callable)
    }
}

/// Wraps a closure taking the current request as a route handler.
///
/// ```rust
/// use ferrous_kernel::{handler, Response};
/// use http::StatusCode;
///
/// let hello = handler(|request| Ok(Response::text(format!("hi {}", request.path()), StatusCode::OK)));
/// # let _ = hello;
/// ```
pub fn handler<F>(f: F) -> Callable<Response>
where
    F: Fn(&Request) -> crate::Result<Response> + Send + Sync + 'static,
{
    Callable::new("closure", move |args| {
        let request = args.object::<Request>("request")?;
        f(&request)
    })
    .param(Parameter::object::<Request>("request"))
}

/// A service exposing route actions.
///
/// Actions are callables, so their parameters (route values, the request,
/// other services) are injected by the container when the route runs.
///
/// ```rust
/// use ferrous_kernel::{Callable, Container, Controller, Parameter, Response};
/// use http::StatusCode;
/// use std::sync::Arc;
///
/// struct UserController;
///
/// impl Controller for UserController {
///     fn action(self: Arc<Self>, method: &str) -> Option<Callable<Response>> {
///         match method {
///             "show" => Some(
///                 Callable::new("UserController@show", |args| {
///                     let id: u64 = args.value("id")?;
///                     Ok(Response::text(format!("user {id}"), StatusCode::OK))
///                 })
///                 .param(Parameter::scalar("id")),
///             ),
///             _ => None,
///         }
///     }
/// }
///
/// let container = Container::new();
/// container.singleton("UserController", |_| Ok(UserController));
/// container.as_controller::<UserController>("UserController");
/// ```
pub trait Controller: Send + Sync {
    /// The callable for a named action, if the controller has it.
    fn action(self: Arc<Self>, method: &str) -> Option<Callable<Response>>;

    /// The callable used when the controller itself is the handler.
    fn invoke(self: Arc<Self>) -> Option<Callable<Response>> {
        None
    }
}

impl Container {
    /// Exposes the service under `id`, of concrete type `C`, as a
    /// [`Controller`].
    pub fn as_controller<C: Controller + 'static>(&self, id: impl Into<Key>) -> &Self {
        self.expose::<dyn Controller>(id, |any| any.downcast::<C>().ok().map(|c| c as Arc<dyn Controller>))
    }
}
