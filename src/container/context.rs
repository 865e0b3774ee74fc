//! Resolver context handed to factory functions.

use std::any::TypeId;

use serde_json::Value;

use crate::autowire::Recipe;
use crate::container::Container;
use crate::error::DiResult;
use crate::key::Key;
use crate::registration::AnyArc;
use crate::traits::ResolverCore;

/// Context passed to factory functions for resolving dependencies.
///
/// Resolutions made through the context share the resolving stack of the
/// resolution that invoked the factory, so cycles through factories are
/// detected like any other.
///
/// # Examples
///
/// ```
/// use ferrous_kernel::{Container, Resolver};
/// use std::sync::Arc;
///
/// struct Database { url: String }
/// struct UserService { db: Arc<Database> }
///
/// let container = Container::new();
/// container.singleton("db", |_| Ok(Database { url: "postgres://localhost".to_string() }));
/// container.bind("users", |ctx| {
///     Ok(UserService { db: ctx.get::<Database>("db")? })
/// });
///
/// let users = container.get::<UserService>("users").unwrap();
/// assert_eq!(users.db.url, "postgres://localhost");
/// ```
pub struct ResolverContext<'a> {
    container: &'a Container,
}

impl<'a> ResolverContext<'a> {
    pub(crate) fn new(container: &'a Container) -> Self {
        Self { container }
    }

    /// The container performing the resolution.
    pub fn container(&self) -> &'a Container {
        self.container
    }
}

impl<'a> ResolverCore for ResolverContext<'a> {
    fn resolve_with(&self, key: &Key, fallback: Option<&Recipe>) -> DiResult<AnyArc> {
        self.container.resolve_with(key, fallback)
    }

    fn exposure(&self, key: &Key, view: TypeId) -> Option<AnyArc> {
        self.container.exposure(key, view)
    }

    fn param_value(&self, key: &str) -> Option<Value> {
        self.container.param_value(key)
    }
}
