/// HTTP kernel integration tests
///
/// Full request flow through the container-built dispatcher: routing, global
/// middleware from configuration, and error rendering for API clients, debug
/// mode, error routes and the plain-text fallback.

use ferrous_kernel::{
    handler, middleware_fn, Callable, ConfigProvider, Container, Dispatcher, Error, HttpError, HttpKernel, HttpModule,
    JsonConfigSource, KernelConfig, Key, Parameter, Request, Resolver, Response, RouteGenerator, RouteOptions, Router,
};
use http::header::{HeaderValue, ACCEPT};
use http::StatusCode;
use serde_json::{json, Value};
use std::sync::Arc;

fn kernel_with(config: KernelConfig) -> (HttpKernel, Arc<Router>) {
    let container = Container::new();
    container.add_module(HttpModule::new(config)).unwrap();
    let router = container.resolve::<Router>().unwrap();
    (HttpKernel::new(container), router)
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new("ferrous_kernel=debug"))
        .with_test_writer()
        .try_init();
}

fn kernel() -> (HttpKernel, Arc<Router>) {
    kernel_with(KernelConfig::default())
}

fn error_page() -> Callable<Response> {
    Callable::new("ErrorController@show", |args| {
        let code: u16 = args.value("code")?;
        let error_code: String = args.value("error_code")?;
        let request = args.object::<Request>("request")?;
        let status = StatusCode::from_u16(code).map_err(Error::handler)?;
        let body = format!(
            "error page {code} [{error_code}] at {} (attribute {})",
            request.path(),
            request.attribute("code").cloned().unwrap_or(Value::Null)
        );
        Ok(Response::html(body, status))
    })
    .param(Parameter::scalar("code"))
    .param(Parameter::scalar("error_code"))
    .param(Parameter::object::<Request>("request"))
}

fn fallback_code(response: &Response) -> String {
    let body = response.body_str().unwrap();
    let code = body
        .strip_prefix("Something went wrong (")
        .and_then(|rest| rest.strip_suffix(").\n"))
        .unwrap_or_else(|| panic!("unexpected fallback body {body:?}"));
    assert_eq!(code.len(), 16);
    assert!(code.chars().all(|c| c.is_ascii_hexdigit()));
    code.to_string()
}

#[test]
fn test_routes_are_served() {
    let (kernel, router) = kernel();
    router
        .get(
            "/hello/{name}",
            handler(|request| {
                let name = request.attribute_str("name").unwrap_or("?");
                Ok(Response::text(format!("hello {name}"), StatusCode::OK))
            }),
            RouteOptions::named("hello"),
        )
        .unwrap();

    let response = kernel.handle(Request::get("/hello/ada"));
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.body_str(), Some("hello ada"));
}

#[test]
fn test_missing_route_without_error_route_falls_back_to_text() {
    init_tracing();
    let (kernel, _router) = kernel();

    let response = kernel.handle(Request::get("/missing"));
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(response.content_type(), Some("text/plain; charset=utf-8"));
    fallback_code(&response);
}

#[test]
fn test_error_route_renders_with_code_and_error_code() {
    let (kernel, router) = kernel();
    router
        .get("/error/{code}", error_page(), RouteOptions::named("error.default"))
        .unwrap();

    let response = kernel.handle(Request::get("/missing?x=1"));
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let body = response.body_str().unwrap();
    assert!(body.starts_with("error page 404 ["), "{body}");
    assert!(body.contains("at /error/404"), "{body}");
    assert!(body.contains("(attribute 404)"), "{body}");

    let error_code = &body["error page 404 [".len().."error page 404 [".len() + 16];
    assert!(error_code.chars().all(|c| c.is_ascii_hexdigit()));
}

#[test]
fn test_exact_error_route_wins() {
    let (kernel, router) = kernel();
    router
        .get("/error/{code}", error_page(), RouteOptions::named("error.default"))
        .unwrap();
    router
        .get(
            "/error/500",
            handler(|_| Ok(Response::text("server trouble", StatusCode::INTERNAL_SERVER_ERROR))),
            RouteOptions::named("error.500"),
        )
        .unwrap();
    router
        .get("/fail", handler(|_| Err(Error::handler("boom"))), RouteOptions::new())
        .unwrap();

    let response = kernel.handle(Request::get("/fail"));
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response.body_str(), Some("server trouble"));
}

#[test]
fn test_http_errors_keep_their_status() {
    let (kernel, router) = kernel();
    router
        .get(
            "/teapot",
            handler(|_| Err(HttpError::new(StatusCode::IM_A_TEAPOT, "short and stout").into())),
            RouteOptions::new(),
        )
        .unwrap();
    router
        .get(
            "/weird",
            handler(|_| Err(HttpError::new(StatusCode::MOVED_PERMANENTLY, "not an error status").into())),
            RouteOptions::new(),
        )
        .unwrap();

    assert_eq!(kernel.handle(Request::get("/teapot")).status(), StatusCode::IM_A_TEAPOT);
    assert_eq!(kernel.handle(Request::get("/weird")).status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[test]
fn test_wrong_method_renders_405() {
    let (kernel, router) = kernel();
    router
        .post("/submit", handler(|_| Ok(Response::ok())), RouteOptions::new())
        .unwrap();

    assert_eq!(kernel.handle(Request::get("/submit")).status(), StatusCode::METHOD_NOT_ALLOWED);
}

#[test]
fn test_failing_error_route_falls_back_to_text() {
    let (kernel, router) = kernel();
    router
        .get(
            "/error/{code}",
            handler(|_| Err(Error::handler("error page broke"))),
            RouteOptions::named("error.default"),
        )
        .unwrap();

    let response = kernel.handle(Request::get("/missing"));
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    fallback_code(&response);
}

#[test]
fn test_api_requests_get_json_errors() {
    let (kernel, router) = kernel();
    router
        .get("/error/{code}", error_page(), RouteOptions::named("error.default"))
        .unwrap();

    for request in [
        Request::get("/api/users/9"),
        Request::get("/users/9").with_header(ACCEPT, HeaderValue::from_static("application/json")),
    ] {
        let response = kernel.handle(request);
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(response.content_type(), Some("application/json; charset=utf-8"));

        let body: Value = serde_json::from_slice(response.body()).unwrap();
        assert_eq!(body["code"], json!(404));
        assert_eq!(body["error_code"].as_str().map(str::len), Some(16));
        assert!(body.get("message").is_none());
    }
}

#[test]
fn test_debug_mode_adds_message_to_json() {
    let (kernel, _router) = kernel_with(KernelConfig {
        debug: true,
        global_middleware: Vec::new(),
    });

    let response = kernel.handle(Request::get("/api/nothing"));
    let body: Value = serde_json::from_slice(response.body()).unwrap();
    assert_eq!(body["code"], json!(404));
    assert!(body["message"].as_str().unwrap().contains("Not Found"));
}

#[test]
fn test_debug_mode_renders_html_details() {
    let (kernel, router) = kernel_with(KernelConfig {
        debug: true,
        global_middleware: Vec::new(),
    });
    router
        .get("/error/{code}", error_page(), RouteOptions::named("error.default"))
        .unwrap();
    router
        .get("/fail", handler(|_| Err(Error::handler("<script>"))), RouteOptions::new())
        .unwrap();

    let response = kernel.handle(Request::get("/fail"));
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response.content_type(), Some("text/html; charset=utf-8"));

    let body = response.body_str().unwrap();
    assert!(body.contains("GET /fail"));
    assert!(body.contains("&lt;script&gt;"));
    assert!(!body.contains("error page"));
}

#[test]
fn test_global_middleware_run_before_routing() {
    let (kernel, router) = kernel_with(KernelConfig {
        debug: false,
        global_middleware: vec!["powered_by".to_string(), "maintenance".to_string()],
    });
    let container = kernel.container();
    container.singleton("powered_by", |_| {
        Ok(middleware_fn(|request, next| {
            let mut response = next.handle(request)?;
            response
                .headers_mut()
                .insert("x-powered-by", HeaderValue::from_static("ferrous-kernel"));
            Ok(response)
        }))
    });
    container.singleton("maintenance", |_| {
        Ok(middleware_fn(|request, next| {
            if request.path().starts_with("/admin") {
                return Ok(Response::text("maintenance", StatusCode::SERVICE_UNAVAILABLE));
            }
            next.handle(request)
        }))
    });
    router
        .get("/", handler(|_| Ok(Response::text("home", StatusCode::OK))), RouteOptions::new())
        .unwrap();
    router
        .get("/admin", handler(|_| Ok(Response::text("admin", StatusCode::OK))), RouteOptions::new())
        .unwrap();

    let home = kernel.handle(Request::get("/"));
    assert_eq!(home.body_str(), Some("home"));
    assert_eq!(home.headers()["x-powered-by"], "ferrous-kernel");

    let admin = kernel.handle(Request::get("/admin"));
    assert_eq!(admin.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(admin.headers()["x-powered-by"], "ferrous-kernel");
}

#[test]
fn test_unregistered_global_middleware_is_a_server_error() {
    let (kernel, router) = kernel_with(KernelConfig {
        debug: false,
        global_middleware: vec!["nope".to_string()],
    });
    router
        .get("/", handler(|_| Ok(Response::ok())), RouteOptions::new())
        .unwrap();

    let response = kernel.handle(Request::get("/"));
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    fallback_code(&response);
}

#[test]
fn test_dispatcher_is_transient() {
    let (kernel, _router) = kernel();
    let container = kernel.container();

    let a = container.get::<Dispatcher>(Key::of::<Dispatcher>()).unwrap();
    let b = container.get::<Dispatcher>(Key::of::<Dispatcher>()).unwrap();
    assert!(!Arc::ptr_eq(&a, &b));
    assert_eq!(a.len(), 1);
}

#[test]
fn test_services_are_registered() {
    let (kernel, router) = kernel();
    let container = kernel.container();
    router
        .get("/docs/{page}", handler(|_| Ok(Response::ok())), RouteOptions::named("docs"))
        .unwrap();

    let urls = container.resolve::<RouteGenerator>().unwrap();
    assert_eq!(urls.path("docs", &[("page", "intro")]).unwrap(), "/docs/intro");
    assert!(Arc::ptr_eq(&router, &container.resolve::<Router>().unwrap()));
    assert!(container.has(Key::of::<KernelConfig>()));
}

#[test]
fn test_config_drives_the_kernel() {
    let provider = ConfigProvider::new().with_source(JsonConfigSource::new(json!({
        "app": { "env": "local" },
        "http": { "middleware": [] }
    })));

    let container = Container::new();
    container.add_module(HttpModule::from_config(&provider)).unwrap();
    let kernel = HttpKernel::new(container);

    assert!(kernel.config().debug);
    let response = kernel.handle(Request::get("/missing"));
    assert_eq!(response.content_type(), Some("text/html; charset=utf-8"));
}

#[test]
fn test_http_crate_round_trip() {
    let (kernel, router) = kernel();
    router
        .post(
            "/echo",
            handler(|request| {
                let payload: Value = request.json().map_err(Error::handler)?;
                Ok(Response::json(&payload, StatusCode::CREATED))
            }),
            RouteOptions::new(),
        )
        .unwrap();

    let request = http::Request::builder()
        .method("POST")
        .uri("/echo")
        .body(br#"{"ok":true}"#.to_vec())
        .unwrap();
    let response = kernel.handle_http(request);

    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(response.body(), br#"{"ok":true}"#);
}

#[cfg(feature = "tower-integration")]
#[test]
fn test_tower_service() {
    use ferrous_kernel::KernelService;
    use tower::Service;

    let (kernel, router) = kernel();
    router
        .get("/ping", handler(|_| Ok(Response::text("pong", StatusCode::OK))), RouteOptions::new())
        .unwrap();

    let mut service = KernelService::new(kernel);
    let request = http::Request::builder().uri("/ping").body(Vec::new()).unwrap();
    let response = service.call(request).into_inner().unwrap();
    assert_eq!(response.body(), b"pong");
}
