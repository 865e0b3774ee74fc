//! HTTP kernel: container wiring for the pipeline and error rendering.

use http::{Method, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::autowire::Argument;
use crate::config::ConfigProvider;
use crate::container::Container;
use crate::error::{Error, HttpError, Result, RouteError};
use crate::http::{Request, Response};
use crate::key::Key;
use crate::module::ServiceModule;
use crate::pipeline::router_middleware::{request_overrides, resolve_handler};
use crate::pipeline::{handler_fn, Dispatcher, Middleware, RequestHandler, RouterMiddleware};
use crate::routing::{RouteGenerator, Router};
use crate::traits::Resolver;

/// Kernel settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KernelConfig {
    /// Expose error details in responses (`app.env == "local"`)
    pub debug: bool,
    /// Container ids of the middleware run before routing, in order
    pub global_middleware: Vec<String>,
}

impl KernelConfig {
    /// Reads `app.env` and `http.middleware`.
    pub fn from_config(config: &ConfigProvider) -> Self {
        Self {
            debug: config.get_string_or("app.env", "production") == "local",
            global_middleware: config.get_as("http.middleware").unwrap_or_default(),
        }
    }
}

/// Registers the HTTP services.
///
/// * `Router` and `RouteGenerator` as autowired singletons,
/// * `RouterMiddleware` as a singleton exposed as middleware,
/// * `Dispatcher` as a transient: a fresh pipeline of the configured global
///   middleware followed by `RouterMiddleware`, falling back to 404,
/// * the `KernelConfig` itself.
#[derive(Debug, Default, Clone)]
pub struct HttpModule {
    config: KernelConfig,
}

impl HttpModule {
    pub fn new(config: KernelConfig) -> Self {
        Self { config }
    }

    pub fn from_config(config: &ConfigProvider) -> Self {
        Self::new(KernelConfig::from_config(config))
    }
}

impl ServiceModule for HttpModule {
    fn register(self, container: &Container) -> Result<()> {
        debug!(global_middleware = ?self.config.global_middleware, "Registering HTTP services");
        let global = self.config.global_middleware.clone();
        container.instance(Key::of::<KernelConfig>(), self.config);

        container.singleton_type::<Router>();
        container.singleton_type::<RouteGenerator>();

        container.singleton(Key::of::<RouterMiddleware>(), |ctx| {
            let router = ctx.resolve::<Router>()?;
            Ok(RouterMiddleware::new(router, ctx.container().clone()))
        });
        container.as_middleware::<RouterMiddleware>(Key::of::<RouterMiddleware>());

        container.bind(Key::of::<Dispatcher>(), move |ctx| {
            let mut middleware = Vec::with_capacity(global.len() + 1);
            for id in &global {
                middleware.push(ctx.get_as::<dyn Middleware>(id.as_str())?);
            }
            middleware.push(ctx.get_as::<dyn Middleware>(Key::of::<RouterMiddleware>())?);
            let fallback = handler_fn(|_| Err(HttpError::not_found().into()));
            Ok(Dispatcher::new(middleware, fallback))
        });

        Ok(())
    }
}

/// Turns requests into responses, never failing.
///
/// Failures are logged with a short error code and rendered:
/// * JSON `{"code", "error_code"}` for API requests (plus `"message"` in
///   debug mode),
/// * a plain HTML page with the error details in debug mode,
/// * otherwise the application's error route, dispatched as
///   `GET /error/<status>` with `code` and `error_code` available to the
///   handler,
/// * and as a last resort `Something went wrong (<code>).`
///
/// # Examples
///
/// ```rust
/// use ferrous_kernel::{handler, Container, HttpKernel, HttpModule, Request, Resolver, Response, RouteOptions, Router};
/// use http::StatusCode;
///
/// let container = Container::new();
/// container.add_module(HttpModule::default()).unwrap();
///
/// let router = container.resolve::<Router>().unwrap();
/// router
///     .get("/ping", handler(|_| Ok(Response::text("pong", StatusCode::OK))), RouteOptions::new())
///     .unwrap();
///
/// let kernel = HttpKernel::new(container);
/// assert_eq!(kernel.handle(Request::get("/ping")).body_str(), Some("pong"));
///
/// let missing = kernel.handle(Request::get("/nope"));
/// assert_eq!(missing.status(), StatusCode::NOT_FOUND);
/// ```
#[derive(Debug, Clone)]
pub struct HttpKernel {
    container: Container,
    config: KernelConfig,
}

impl HttpKernel {
    /// Uses the `KernelConfig` registered by [`HttpModule`], or defaults.
    pub fn new(container: Container) -> Self {
        let config = container
            .get::<KernelConfig>(Key::of::<KernelConfig>())
            .map(|c| KernelConfig::clone(&c))
            .unwrap_or_default();
        Self::with_config(container, config)
    }

    pub fn with_config(container: Container, config: KernelConfig) -> Self {
        Self { container, config }
    }

    pub fn container(&self) -> &Container {
        &self.container
    }

    pub fn config(&self) -> &KernelConfig {
        &self.config
    }

    /// Runs the request through a fresh dispatcher.
    pub fn handle(&self, request: Request) -> Response {
        let original = request.clone();
        match self.dispatch(request) {
            Ok(response) => response,
            Err(e) => self.render_error(&e, &original),
        }
    }

    /// [`handle`](Self::handle) for `http` crate types.
    pub fn handle_http(&self, request: http::Request<Vec<u8>>) -> http::Response<Vec<u8>> {
        self.handle(Request::from(request)).into_http()
    }

    fn dispatch(&self, request: Request) -> Result<Response> {
        let dispatcher = self.container.get::<Dispatcher>(Key::of::<Dispatcher>())?;
        dispatcher.handle(request)
    }

    /// Renders a failure of `request` as a response.
    pub fn render_error(&self, failure: &Error, request: &Request) -> Response {
        let status = failure.status();
        let code = error_code();
        let api = request.expects_json();

        error!(
            error_code = %code,
            status = status.as_u16(),
            api,
            method = %request.method(),
            path = request.path(),
            error = %failure,
            "Request failed"
        );

        if api {
            let mut body = json!({ "code": status.as_u16(), "error_code": code });
            if self.config.debug {
                body["message"] = Value::String(failure.to_string());
            }
            return Response::json(&body, status);
        }

        if self.config.debug {
            return Response::html(debug_page(status, &code, failure, request), status);
        }

        match self.error_page(status, &code, request) {
            Ok(response) => response,
            Err(e) => {
                warn!(error_code = %code, error = %e, "Error route unavailable");
                Response::text(format!("Something went wrong ({code}).\n"), status)
            }
        }
    }

    fn error_page(&self, status: StatusCode, code: &str, request: &Request) -> Result<Response> {
        let router = self.container.resolve::<Router>()?;
        let route = router
            .find_error_route(status.as_u16())
            .ok_or_else(|| Error::from(RouteError::UnknownName("error.default".to_string())))?;
        let callable = resolve_handler(&self.container, route.handler())?;

        let mut error_request = request.clone();
        error_request.retarget(Method::GET, &format!("/error/{}", status.as_u16()));
        error_request.set_attribute("code", status.as_u16());
        error_request.set_attribute("error_code", code);

        let mut overrides = request_overrides(error_request);
        overrides.insert("code", Argument::Value(json!(status.as_u16())));
        overrides.insert("error_code", Argument::Value(Value::String(code.to_string())));
        self.container.call(&callable, &overrides)
    }
}

/// 16 lowercase hex characters.
fn error_code() -> String {
    format!("{:016x}", Uuid::new_v4().as_u128() as u64)
}

fn debug_page(status: StatusCode, code: &str, failure: &Error, request: &Request) -> String {
    format!(
        "<!doctype html>\n<html><head><title>{status}</title></head><body>\n\
         <h1>{status}</h1>\n<p>Error code: <code>{code}</code></p>\n\
         <p>{method} {path}</p>\n<pre>{message}</pre>\n</body></html>\n",
        status = escape_html(&status.to_string()),
        code = escape_html(code),
        method = escape_html(request.method().as_str()),
        path = escape_html(request.path()),
        message = escape_html(&format!("{failure:#?}")),
    )
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(feature = "tower-integration")]
pub use service::KernelService;

#[cfg(feature = "tower-integration")]
mod service {
    use std::convert::Infallible;
    use std::future::{ready, Ready};
    use std::sync::Arc;
    use std::task::{Context, Poll};

    use super::HttpKernel;

    /// [`tower::Service`] running requests through an [`HttpKernel`].
    #[derive(Debug, Clone)]
    pub struct KernelService {
        kernel: Arc<HttpKernel>,
    }

    impl KernelService {
        pub fn new(kernel: HttpKernel) -> Self {
            Self { kernel: Arc::new(kernel) }
        }
    }

    impl tower::Service<http::Request<Vec<u8>>> for KernelService {
        type Response = http::Response<Vec<u8>>;
        type Error = Infallible;
        type Future = Ready<Result<Self::Response, Self::Error>>;

        fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
            Poll::Ready(Ok(()))
        }

        fn call(&mut self, request: http::Request<Vec<u8>>) -> Self::Future {
            ready(Ok(self.kernel.handle_http(request)))
        }
    }
}
