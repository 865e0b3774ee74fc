//! Compiled route matcher.
//!
//! One radix tree per HTTP method. A miss for the request method that hits
//! another method's tree is reported as `MethodNotAllowed`.

use std::sync::Arc;

use http::Method;
use matchit::Router as MatchitRouter;
use tracing::debug;

use crate::error::RouteError;
use crate::routing::definition::{RouteDefinition, RouteMatch, RouteParams};

pub(crate) struct Matcher {
    trees: Vec<(Method, MatchitRouter<Arc<RouteDefinition>>)>,
}

impl Matcher {
    pub(crate) fn compile(routes: &[Arc<RouteDefinition>]) -> Result<Self, RouteError> {
        let mut trees: Vec<(Method, MatchitRouter<Arc<RouteDefinition>>)> = Vec::new();

        for route in routes {
            for method in route.methods() {
                let position = match trees.iter().position(|(m, _)| m == method) {
                    Some(position) => position,
                    None => {
                        trees.push((method.clone(), MatchitRouter::new()));
                        trees.len() - 1
                    }
                };
                trees[position]
                    .1
                    .insert(route.path(), Arc::clone(route))
                    .map_err(|e| RouteError::Conflict {
                        path: format!("{} {}", method, route.path()),
                        reason: e.to_string(),
                    })?;
            }
        }

        debug!(routes = routes.len(), methods = trees.len(), "Compiled route matcher");
        Ok(Matcher { trees })
    }

    pub(crate) fn lookup(&self, method: &Method, path: &str) -> RouteMatch {
        if let Some((_, tree)) = self.trees.iter().find(|(m, _)| m == method) {
            if let Ok(matched) = tree.at(path) {
                return RouteMatch::Found {
                    route: Arc::clone(matched.value),
                    params: RouteParams::from(matched.params),
                };
            }
        }

        let allowed: Vec<Method> = self
            .trees
            .iter()
            .filter(|(m, tree)| m != method && tree.at(path).is_ok())
            .map(|(m, _)| m.clone())
            .collect();

        if allowed.is_empty() {
            RouteMatch::NotFound
        } else {
            RouteMatch::MethodNotAllowed { allowed }
        }
    }
}
