//! Reverse routing: named route to concrete path.

use std::sync::{Arc, OnceLock};

use regex::{Captures, Regex};

use crate::autowire::{Arguments, Injectable, Parameter};
use crate::error::{DiResult, RouteError};
use crate::routing::Router;

fn placeholder() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\{([^{}/]+)\}").expect("placeholder pattern"))
}

/// Substitutes `{name}` placeholders and drops the ones left unfilled.
///
/// Substitution is a single pass, so values are inserted verbatim. An
/// unfilled placeholder that is a whole segment is removed together with
/// its slash (`/users/{id}` becomes `/users`); inside a larger segment only
/// the placeholder itself goes.
pub(crate) fn fill(pattern: &str, params: &[(&str, &str)]) -> String {
    let lookup = |name: &str| {
        let name = name.trim_start_matches('*');
        params.iter().find(|(key, _)| *key == name).map(|(_, value)| *value)
    };

    let segments: Vec<String> = pattern
        .split('/')
        .filter_map(|segment| match placeholder().captures(segment) {
            Some(caps) if caps[0].len() == segment.len() && lookup(&caps[1]).is_none() => None,
            _ => Some(
                placeholder()
                    .replace_all(segment, |caps: &Captures<'_>| lookup(&caps[1]).unwrap_or_default().to_string())
                    .into_owned(),
            ),
        })
        .collect();

    let path = segments.join("/");
    if path.is_empty() {
        "/".to_string()
    } else {
        path
    }
}

/// Builds paths for named routes.
///
/// ```rust
/// use ferrous_kernel::{handler, Response, RouteGenerator, RouteOptions, Router};
/// use std::sync::Arc;
///
/// let router = Arc::new(Router::new());
/// router
///     .get("/posts/{slug}", handler(|_| Ok(Response::ok())), RouteOptions::named("posts.show"))
///     .unwrap();
///
/// let urls = RouteGenerator::new(router);
/// assert_eq!(urls.path("posts.show", &[("slug", "hello")]).unwrap(), "/posts/hello");
/// ```
#[derive(Debug, Clone)]
pub struct RouteGenerator {
    router: Arc<Router>,
}

impl RouteGenerator {
    pub fn new(router: Arc<Router>) -> Self {
        Self { router }
    }

    pub fn path(&self, name: &str, params: &[(&str, &str)]) -> Result<String, RouteError> {
        self.router.route_path(name, params)
    }
}

impl Injectable for RouteGenerator {
    fn parameters() -> Vec<Parameter> {
        vec![Parameter::object::<Router>("router")]
    }

    fn construct(args: &Arguments) -> DiResult<Self> {
        Ok(Self::new(args.object::<Router>("router")?))
    }
}
