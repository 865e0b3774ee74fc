//! Web application demo
//!
//! Wires a small application end to end:
//! - configuration from a JSON document plus `DEMO_*` environment variables
//! - an autowired service with a scalar parameter from the container
//! - a controller with named routes, a route group and middleware groups
//! - an error route receiving the status and a reference code
//!
//! Run with `cargo run --example web_app`, or `DEMO_APP_ENV=local` for debug
//! error pages.

use ferrous_kernel::{
    handler, middleware_fn, Arguments, Callable, ConfigProvider, Container, Controller, DiResult,
    EnvironmentConfigSource, Error, GroupOptions, HttpError, HttpKernel, HttpModule, Injectable, JsonConfigSource,
    Parameter, Request, RequestHandler, Resolver, Response, RouteGenerator, RouteOptions, Router,
};
use http::header::{HeaderValue, ACCEPT};
use http::StatusCode;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;

/// In-memory article storage, autowired with its page size.
struct ArticleStore {
    articles: HashMap<u64, String>,
    page_size: usize,
}

impl Injectable for ArticleStore {
    fn parameters() -> Vec<Parameter> {
        vec![Parameter::scalar("page_size").default(10)]
    }

    fn construct(args: &Arguments) -> DiResult<Self> {
        let articles = [(1, "Hello, kernel"), (2, "Routing in depth"), (3, "Autowiring")]
            .into_iter()
            .map(|(id, title)| (id, title.to_string()))
            .collect();
        Ok(ArticleStore {
            articles,
            page_size: args.value("page_size")?,
        })
    }
}

struct ArticleController {
    store: Arc<ArticleStore>,
    urls: Arc<RouteGenerator>,
}

impl Injectable for ArticleController {
    fn parameters() -> Vec<Parameter> {
        vec![
            Parameter::of::<ArticleStore>("store"),
            Parameter::of::<RouteGenerator>("urls"),
        ]
    }

    fn construct(args: &Arguments) -> DiResult<Self> {
        Ok(ArticleController {
            store: args.object("store")?,
            urls: args.object("urls")?,
        })
    }
}

impl Controller for ArticleController {
    fn action(self: Arc<Self>, method: &str) -> Option<Callable<Response>> {
        match method {
            "index" => Some(Callable::new("ArticleController@index", move |_| {
                let mut ids: Vec<_> = self.store.articles.keys().copied().collect();
                ids.sort_unstable();
                let links: Vec<String> = ids
                    .into_iter()
                    .take(self.store.page_size)
                    .map(|id| self.urls.path("articles.show", &[("id", &id.to_string())]))
                    .collect::<Result<_, _>>()?;
                Ok(Response::json(&json!({ "articles": links }), StatusCode::OK))
            })),
            "show" => Some(
                Callable::new("ArticleController@show", move |args| {
                    let id: u64 = args.value("id")?;
                    match self.store.articles.get(&id) {
                        Some(title) => Ok(Response::html(format!("<h1>{title}</h1>"), StatusCode::OK)),
                        None => Err(HttpError::not_found().into()),
                    }
                })
                .param(Parameter::scalar("id")),
            ),
            _ => None,
        }
    }
}

fn error_page() -> Callable<Response> {
    Callable::new("ErrorController@show", |args| {
        let code: u16 = args.value("code")?;
        let error_code: String = args.value("error_code")?;
        let status = StatusCode::from_u16(code).map_err(Error::handler)?;
        Ok(Response::html(
            format!("<p>{} (reference {error_code})</p>", status.canonical_reason().unwrap_or("Error")),
            status,
        ))
    })
    .param(Parameter::scalar("code"))
    .param(Parameter::scalar("error_code"))
}

fn build() -> ferrous_kernel::Result<HttpKernel> {
    let config = ConfigProvider::new()
        .with_source(EnvironmentConfigSource::with_prefix("demo"))
        .with_source(JsonConfigSource::new(json!({
            "app": { "env": "production" },
            "http": { "middleware": ["request-log"] }
        })));

    let container = Container::new();
    container.set_param("page_size", 2);
    container.singleton("request-log", |_| {
        Ok(middleware_fn(|request, next| {
            let method = request.method().clone();
            let path = request.path().to_string();
            let response = next.handle(request)?;
            tracing::info!(%method, %path, status = response.status().as_u16(), "request served");
            Ok(response)
        }))
    });
    container.singleton("powered-by", |_| {
        Ok(middleware_fn(|request, next| {
            let mut response = next.handle(request)?;
            response
                .headers_mut()
                .insert("x-powered-by", HeaderValue::from_static("ferrous-kernel"));
            Ok(response)
        }))
    });
    container.singleton_type::<ArticleController>();
    container.as_controller::<ArticleController>("ArticleController");
    container.add_module(HttpModule::from_config(&config))?;

    let router = container.resolve::<Router>()?;
    router.middleware_group("web", ["powered-by"]);
    router.get("/", handler(|_| Ok(Response::text("home", StatusCode::OK))), RouteOptions::named("home"))?;
    router.get(
        "/articles",
        "ArticleController@index",
        RouteOptions::named("articles.index").middleware(["web"]),
    )?;
    router.group_with("/articles", GroupOptions::new().middleware(["web"]), |r| {
        r.get("/{id}", "ArticleController@show", RouteOptions::named("articles.show"))?;
        Ok(())
    })?;
    router.get("/error/{code}", error_page(), RouteOptions::named("error.default"))?;

    Ok(HttpKernel::new(container))
}

fn main() {
    tracing_subscriber::fmt().with_target(false).init();

    let kernel = match build() {
        Ok(kernel) => kernel,
        Err(error) => {
            eprintln!("failed to start: {error}");
            std::process::exit(1);
        }
    };
    println!("debug mode: {}", kernel.config().debug);

    let requests = [
        Request::get("/"),
        Request::get("/articles"),
        Request::get("/articles/2"),
        Request::get("/articles/9"),
        Request::post("/articles/2"),
        Request::get("/missing").with_header(ACCEPT, HeaderValue::from_static("application/json")),
    ];

    for request in requests {
        let line = format!("{} {}", request.method(), request.path());
        let response = kernel.handle(request);
        println!("{line} -> {}", response.status());
        println!("    {}", response.body_str().unwrap_or("<binary>"));
    }
}
