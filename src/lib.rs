//! # ferrous-kernel
//!
//! The core of a small synchronous web framework: a service container with
//! autowiring, a router with named routes and groups, and a re-entrant
//! middleware pipeline tied together by an HTTP kernel.
//!
//! ## Features
//!
//! - **Autowiring**: types describe their constructor parameters once and the
//!   container builds them, reading scalars from a parameter store
//! - **Circular dependency detection**: resolution cycles fail with the full chain
//! - **Named routes and groups**: prefixes, middleware groups and URL generation
//! - **Re-entrant dispatcher**: middleware call `next` or short-circuit
//! - **Error pages**: JSON for API clients, an error route for everyone else
//!
//! ## Quick Start
//!
//! ```rust
//! use ferrous_kernel::{
//!     handler, Container, HttpKernel, HttpModule, Request, Resolver, Response, RouteOptions, Router,
//! };
//! use http::StatusCode;
//!
//! # fn main() -> ferrous_kernel::Result<()> {
//! let container = Container::new();
//! container.add_module(HttpModule::default())?;
//!
//! let router = container.resolve::<Router>()?;
//! router.get(
//!     "/hello/{name}",
//!     handler(|request| {
//!         let name = request.attribute_str("name").unwrap_or("stranger");
//!         Ok(Response::text(format!("Hello, {name}!"), StatusCode::OK))
//!     }),
//!     RouteOptions::named("hello"),
//! )?;
//!
//! let kernel = HttpKernel::new(container);
//! let response = kernel.handle(Request::get("/hello/ferris"));
//! assert_eq!(response.body_str(), Some("Hello, ferris!"));
//! assert_eq!(router.route_path("hello", &[("name", "crab")])?, "/hello/crab");
//! # Ok(())
//! # }
//! ```
//!
//! ## Autowiring
//!
//! ```rust
//! use ferrous_kernel::{Arguments, Container, DiResult, Injectable, Parameter, Resolver};
//! use std::sync::Arc;
//!
//! struct Mailer {
//!     host: String,
//! }
//!
//! impl Injectable for Mailer {
//!     fn parameters() -> Vec<Parameter> {
//!         vec![Parameter::scalar("host")]
//!     }
//!
//!     fn construct(args: &Arguments) -> DiResult<Self> {
//!         Ok(Mailer { host: args.value("host")? })
//!     }
//! }
//!
//! struct Signup {
//!     mailer: Arc<Mailer>,
//! }
//!
//! impl Injectable for Signup {
//!     fn parameters() -> Vec<Parameter> {
//!         vec![Parameter::of::<Mailer>("mailer")]
//!     }
//!
//!     fn construct(args: &Arguments) -> DiResult<Self> {
//!         Ok(Signup { mailer: args.object("mailer")? })
//!     }
//! }
//!
//! let container = Container::new();
//! container.set_param("host", "smtp.local");
//!
//! let signup = container.resolve::<Signup>().unwrap();
//! assert_eq!(signup.mailer.host, "smtp.local");
//! ```

// Module declarations
pub mod autowire;
pub mod config;
pub mod container;
pub mod descriptors;
pub mod error;
pub mod http;
pub mod kernel;
pub mod key;
pub mod lifetime;
pub mod module;
pub mod pipeline;
pub mod routing;
pub mod traits;

// Internal modules
mod internal;
mod registration;

// Re-export core types
pub use autowire::{Argument, Arguments, Callable, Injectable, Overrides, Parameter, ParameterKind, Recipe};
pub use config::{ConfigProvider, ConfigSource, EnvironmentConfigSource, JsonConfigSource};
pub use container::{Container, ResolverContext};
pub use descriptors::ServiceDescriptor;
pub use error::{DiError, DiResult, Error, HttpError, Result, RouteError};
pub use self::http::{Request, Response, ROUTE_PARAMS};
pub use kernel::{HttpKernel, HttpModule, KernelConfig};
pub use key::{key_of_type, Key};
pub use lifetime::Lifetime;
pub use module::ServiceModule;
pub use pipeline::{handler_fn, middleware_fn, Dispatcher, Middleware, RequestHandler, RouterMiddleware};
pub use registration::{AnyArc, BindingKind};
pub use routing::{
    handler, Controller, GroupOptions, HandlerRef, MiddlewareRef, RouteDefinition, RouteGenerator, RouteMatch,
    RouteOptions, RouteParams, Router,
};
pub use traits::{Resolver, ResolverCore};

#[cfg(feature = "tower-integration")]
pub use kernel::KernelService;
