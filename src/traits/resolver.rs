//! Resolver traits for service resolution.

use std::any::TypeId;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::autowire::{Injectable, Recipe};
use crate::error::{DiError, DiResult};
use crate::key::Key;
use crate::registration::AnyArc;

/// Core resolver trait for object-safe service resolution.
///
/// Implemented by [`Container`](crate::Container) and by the
/// [`ResolverContext`](crate::ResolverContext) handed to factories. Most code
/// uses the generic methods of [`Resolver`] instead.
pub trait ResolverCore: Send + Sync {
    /// Resolves a service by key.
    ///
    /// When nothing is registered or declared under the key and `fallback`
    /// is given, the fallback recipe is autowired.
    fn resolve_with(&self, key: &Key, fallback: Option<&Recipe>) -> DiResult<AnyArc>;

    /// Resolves a service by key.
    fn resolve_any(&self, key: &Key) -> DiResult<AnyArc> {
        self.resolve_with(key, None)
    }

    /// The registered upcast of the service under `key` to the view `view`.
    fn exposure(&self, key: &Key, view: TypeId) -> Option<AnyArc>;

    /// A raw value from the parameter store.
    fn param_value(&self, key: &str) -> Option<Value>;
}

/// High-level resolver interface with generic methods for type-safe service resolution.
///
/// # Examples
///
/// ```
/// use ferrous_kernel::{Container, Resolver};
/// use std::sync::Arc;
///
/// trait Greeter: Send + Sync {
///     fn greet(&self) -> String;
/// }
///
/// struct English;
/// impl Greeter for English {
///     fn greet(&self) -> String { "hello".into() }
/// }
///
/// let container = Container::new();
/// container.instance("port", 8080u16);
/// container.instance("greeter", Arc::new(English) as Arc<dyn Greeter>);
///
/// let port = container.get::<u16>("port").unwrap();
/// assert_eq!(*port, 8080);
///
/// let greeter = container.get_as::<dyn Greeter>("greeter").unwrap();
/// assert_eq!(greeter.greet(), "hello");
/// ```
pub trait Resolver: ResolverCore {
    /// Resolves the service under `id` as a concrete type.
    fn get<T: Send + Sync + 'static>(&self, id: impl Into<Key>) -> DiResult<Arc<T>> {
        let key = id.into();
        self.resolve_any(&key)?
            .downcast::<T>()
            .map_err(|_| DiError::TypeMismatch(format!("{} as {}", key, std::any::type_name::<T>())))
    }

    /// Resolves an [`Injectable`] by its own key, autowiring it when nothing
    /// is registered.
    fn resolve<T: Injectable>(&self) -> DiResult<Arc<T>> {
        let recipe = Recipe::of::<T>();
        let key = recipe.key();
        self.resolve_with(&key, Some(&recipe))?
            .downcast::<T>()
            .map_err(|_| DiError::TypeMismatch(format!("{} as {}", key, std::any::type_name::<T>())))
    }

    /// Resolves the service under `id` as the trait object view `T`.
    ///
    /// Accepts services stored as `Arc<T>` (registered through
    /// `instance(id, Arc::new(service) as Arc<dyn Trait>)` or a factory
    /// returning `Arc<dyn Trait>`) and services with a registered exposure.
    fn get_as<T: ?Sized + Send + Sync + 'static>(&self, id: impl Into<Key>) -> DiResult<Arc<T>> {
        let key = id.into();
        let any = self.resolve_any(&key)?;
        let any = match any.downcast::<Arc<T>>() {
            Ok(stored) => return Ok(Arc::clone(&*stored)),
            Err(any) => any,
        };

        let mismatch = || DiError::TypeMismatch(format!("{} as {}", key, std::any::type_name::<T>()));
        let exposure = self.exposure(&key, TypeId::of::<T>()).ok_or_else(mismatch)?;
        let upcast = exposure
            .downcast_ref::<fn(AnyArc) -> Option<Arc<T>>>()
            .ok_or_else(mismatch)?;
        upcast(any).ok_or_else(mismatch)
    }

    /// A parameter-store value deserialized into `T`.
    fn param_as<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.param_value(key).and_then(|v| serde_json::from_value(v).ok())
    }
}

impl<R: ResolverCore + ?Sized> Resolver for R {}
