//! The service container.
//!
//! [`Container`] holds bindings, cached singletons, aliases, the catalog of
//! autowirable types and a scalar parameter store. It is a cheap-to-clone
//! handle; clones share all state.

use std::any::TypeId;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use serde_json::Value;
use tracing::{debug, trace};

mod context;

pub use context::ResolverContext;

use crate::autowire::{Argument, Arguments, Callable, Injectable, Overrides, Parameter, ParameterKind, Recipe};
use crate::descriptors::ServiceDescriptor;
use crate::error::{DiError, DiResult};
use crate::internal::{resolving_keys, StackGuard};
use crate::key::Key;
use crate::lifetime::Lifetime;
use crate::module::ServiceModule;
use crate::registration::{AnyArc, Binding, BindingKind, Concrete, Factory, Params, Registry};
use crate::traits::ResolverCore;

static NEXT_CONTAINER_ID: AtomicUsize = AtomicUsize::new(1);

/// Service container with declared-dependency autowiring.
///
/// Registration and resolution take `&self`; no lock is held while a factory
/// or constructor runs, so factories may resolve other services or register
/// new ones.
///
/// # Examples
///
/// ```rust
/// use ferrous_kernel::{Arguments, Container, DiResult, Injectable, Parameter, Resolver};
/// use std::sync::Arc;
///
/// struct Clock;
/// impl Injectable for Clock {
///     fn construct(_: &Arguments) -> DiResult<Self> { Ok(Clock) }
/// }
///
/// struct Mailer { clock: Arc<Clock>, host: String }
/// impl Injectable for Mailer {
///     fn parameters() -> Vec<Parameter> {
///         vec![Parameter::of::<Clock>("clock"), Parameter::scalar("host")]
///     }
///     fn construct(args: &Arguments) -> DiResult<Self> {
///         Ok(Mailer { clock: args.object("clock")?, host: args.value("host")? })
///     }
/// }
///
/// let container = Container::new();
/// container.singleton_type::<Mailer>();
/// container.alias("mailer", ferrous_kernel::Key::of::<Mailer>());
/// container.set_param(format!("{}:host", std::any::type_name::<Mailer>()), "smtp.local");
///
/// let a = container.get::<Mailer>("mailer").unwrap();
/// let b = container.resolve::<Mailer>().unwrap();
/// assert!(Arc::ptr_eq(&a, &b));
/// assert_eq!(a.host, "smtp.local");
/// ```
#[derive(Clone)]
pub struct Container {
    inner: Arc<Inner>,
}

struct Inner {
    id: usize,
    registry: RwLock<Registry>,
    params: RwLock<Params>,
}

impl Container {
    pub fn new() -> Self {
        Container {
            inner: Arc::new(Inner {
                id: NEXT_CONTAINER_ID.fetch_add(1, Ordering::Relaxed),
                registry: RwLock::new(Registry::default()),
                params: RwLock::new(Params::default()),
            }),
        }
    }

    // ----- Registration -----

    /// Registers a transient factory; every resolution calls it again.
    pub fn bind<T, F>(&self, id: impl Into<Key>, factory: F) -> &Self
    where
        T: Send + Sync + 'static,
        F: Fn(&ResolverContext) -> DiResult<T> + Send + Sync + 'static,
    {
        self.register(id.into(), Lifetime::Transient, Concrete::Factory(erase(factory)))
    }

    /// Registers a shared factory; the first result is cached.
    pub fn singleton<T, F>(&self, id: impl Into<Key>, factory: F) -> &Self
    where
        T: Send + Sync + 'static,
        F: Fn(&ResolverContext) -> DiResult<T> + Send + Sync + 'static,
    {
        self.register(id.into(), Lifetime::Singleton, Concrete::Factory(erase(factory)))
    }

    /// Registers `T` as a shared, autowired service under its own key.
    pub fn singleton_type<T: Injectable>(&self) -> &Self {
        self.declare::<T>();
        self.register(T::key(), Lifetime::Singleton, Concrete::Type(Recipe::of::<T>()))
    }

    /// Registers `id` as a shared service autowired from `T`.
    pub fn singleton_as<T: Injectable>(&self, id: impl Into<Key>) -> &Self {
        self.register(id.into(), Lifetime::Singleton, Concrete::Type(Recipe::of::<T>()))
    }

    /// Registers `id` as a shared service built from the type declared under
    /// the same key. The catalog is consulted lazily, at first resolution.
    pub fn singleton_declared(&self, id: impl Into<Key>) -> &Self {
        let key = id.into();
        self.register(key.clone(), Lifetime::Singleton, Concrete::Declared(key))
    }

    /// Caches a ready instance, replacing any binding for the key.
    pub fn instance<T: Send + Sync + 'static>(&self, id: impl Into<Key>, value: T) -> &Self {
        self.instance_arc(id, Arc::new(value))
    }

    /// Caches a ready shared instance, replacing any binding for the key.
    pub fn instance_arc<T: Send + Sync + 'static>(&self, id: impl Into<Key>, value: Arc<T>) -> &Self {
        let key = self.canonical(id.into());
        debug!(key = %key, "Registering instance");
        self.inner.registry.write().instance(key, value);
        self
    }

    /// Makes `from` resolve as `to`. Aliases are followed one level.
    pub fn alias(&self, from: impl Into<Key>, to: impl Into<Key>) -> &Self {
        let (from, to) = (from.into(), to.into());
        trace!(from = %from, to = %to, "Registering alias");
        self.inner.registry.write().aliases.insert(from, to);
        self
    }

    /// Adds `T` to the catalog of autowirable types.
    pub fn declare<T: Injectable>(&self) -> &Self {
        let recipe = Recipe::of::<T>();
        self.inner.registry.write().catalog.insert(recipe.key(), recipe);
        self
    }

    /// Registers how the service under `id` is viewed as `T`, typically a
    /// trait object.
    ///
    /// ```rust
    /// use ferrous_kernel::{Container, Resolver};
    /// use std::sync::Arc;
    ///
    /// trait Named: Send + Sync { fn name(&self) -> &str; }
    /// struct Service;
    /// impl Named for Service { fn name(&self) -> &str { "service" } }
    ///
    /// let container = Container::new();
    /// container.singleton("service", |_| Ok(Service));
    /// container.expose::<dyn Named>("service", |any| {
    ///     any.downcast::<Service>().ok().map(|s| s as Arc<dyn Named>)
    /// });
    ///
    /// let named = container.get_as::<dyn Named>("service").unwrap();
    /// assert_eq!(named.name(), "service");
    /// ```
    pub fn expose<T: ?Sized + 'static>(&self, id: impl Into<Key>, upcast: fn(AnyArc) -> Option<Arc<T>>) -> &Self {
        let key = self.canonical(id.into());
        let upcast: AnyArc = Arc::new(upcast);
        self.inner
            .registry
            .write()
            .exposures
            .insert((key, TypeId::of::<T>()), upcast);
        self
    }

    /// Registers the services of a module.
    pub fn add_module<M: ServiceModule>(&self, module: M) -> crate::Result<&Self> {
        module.register(self)?;
        Ok(self)
    }

    fn register(&self, key: Key, lifetime: Lifetime, concrete: Concrete) -> &Self {
        let key = self.canonical(key);
        let binding = Binding::new(lifetime, concrete);
        debug!(key = %key, lifetime = ?lifetime, kind = ?binding.kind(), "Registering binding");
        self.inner.registry.write().bind(key, binding);
        self
    }

    // ----- Queries -----

    /// Whether `id` is cached, bound or declared.
    pub fn has(&self, id: impl Into<Key>) -> bool {
        let registry = self.inner.registry.read();
        let key = registry.canonical(&id.into());
        registry.contains(&key)
    }

    /// Resolves the service under `id` without downcasting.
    pub fn get_any(&self, id: impl Into<Key>) -> DiResult<AnyArc> {
        self.resolve_with(&id.into(), None)
    }

    /// Keys this thread is currently resolving in this container, outermost
    /// first. Empty outside of a resolution.
    pub fn resolving(&self) -> Vec<Key> {
        resolving_keys(self.inner.id)
    }

    /// Lists every binding and cached instance.
    pub fn descriptors(&self) -> Vec<ServiceDescriptor> {
        let registry = self.inner.registry.read();
        let mut out: Vec<ServiceDescriptor> = registry
            .bindings
            .iter()
            .map(|(key, binding)| ServiceDescriptor {
                key: key.clone(),
                lifetime: binding.lifetime,
                kind: binding.kind(),
                cached: registry.instances.contains_key(key),
            })
            .collect();
        out.extend(
            registry
                .instances
                .keys()
                .filter(|key| !registry.bindings.contains_key(*key))
                .map(|key| ServiceDescriptor {
                    key: key.clone(),
                    lifetime: Lifetime::Singleton,
                    kind: BindingKind::Instance,
                    cached: true,
                }),
        );
        out.sort_by(|a, b| a.key.cmp(&b.key));
        out
    }

    // ----- Parameter store -----

    pub fn set_param(&self, key: impl Into<String>, value: impl Into<Value>) -> &Self {
        self.inner.params.write().set(key.into(), value.into());
        self
    }

    pub fn param(&self, key: &str) -> Option<Value> {
        self.inner.params.read().get(key).cloned()
    }

    pub fn param_or(&self, key: &str, default: impl Into<Value>) -> Value {
        self.param(key).unwrap_or_else(|| default.into())
    }

    pub fn has_param(&self, key: &str) -> bool {
        self.inner.params.read().contains(key)
    }

    // ----- Invocation -----

    /// Invokes a callable, resolving each declared parameter.
    ///
    /// Overrides win, matched by parameter name and then by the parameter's
    /// type key. Remaining object parameters are resolved from the
    /// container; scalars come from the parameter store (`"<callable
    /// name>:<param>"`, then the bare name), their default, or null when
    /// nullable.
    pub fn call<R>(&self, callable: &Callable<R>, overrides: &Overrides) -> crate::Result<R> {
        let target = Key::from(callable.name());
        let mut args = Arguments::new(callable.name());
        for parameter in callable.parameters() {
            let argument = self.argument(&target, parameter, Some(overrides))?;
            args.insert(parameter.name, argument);
        }
        trace!(callable = callable.name(), "Invoking callable");
        callable.invoke(&args)
    }

    // ----- Resolution -----

    fn canonical(&self, key: Key) -> Key {
        let registry = self.inner.registry.read();
        match registry.aliases.get(&key) {
            Some(target) => target.clone(),
            None => key,
        }
    }

    pub(crate) fn resolve_with(&self, id: &Key, fallback: Option<&Recipe>) -> DiResult<AnyArc> {
        let (key, cached, binding, declared) = {
            let registry = self.inner.registry.read();
            let key = registry.canonical(id);
            let cached = registry.instances.get(&key).cloned();
            let binding = registry.bindings.get(&key).cloned();
            let declared = registry.catalog.get(&key).copied();
            (key, cached, binding, declared)
        };

        if let Some(hit) = cached {
            trace!(key = %key, "Resolved from cache");
            return Ok(hit);
        }

        let _guard = StackGuard::enter(self.inner.id, &key)?;

        let value = match &binding {
            Some(binding) => match &binding.concrete {
                Concrete::Factory(factory) => factory(&ResolverContext::new(self))?,
                Concrete::Type(recipe) => self.build(recipe)?,
                Concrete::Declared(declared_key) => {
                    let recipe = self
                        .inner
                        .registry
                        .read()
                        .catalog
                        .get(declared_key)
                        .copied()
                        .ok_or_else(|| DiError::NotFound(declared_key.to_string()))?;
                    self.build(&recipe)?
                }
            },
            None => match declared.or_else(|| fallback.copied()) {
                Some(recipe) => self.build(&recipe)?,
                None => return Err(DiError::NotFound(key.to_string())),
            },
        };

        match binding {
            Some(binding) if binding.lifetime.is_shared() => Ok(self.store(key, &binding, value)),
            _ => Ok(value),
        }
    }

    // Caches a singleton unless its binding was replaced while building.
    // A concurrent build that finished first wins.
    fn store(&self, key: Key, binding: &Arc<Binding>, value: AnyArc) -> AnyArc {
        let mut registry = self.inner.registry.write();
        let current = registry
            .bindings
            .get(&key)
            .map_or(false, |b| Arc::ptr_eq(b, binding));
        if !current {
            debug!(key = %key, "Binding replaced during resolution, not caching");
            return value;
        }
        registry.instances.entry(key).or_insert(value).clone()
    }

    fn build(&self, recipe: &Recipe) -> DiResult<AnyArc> {
        let target = recipe.key();
        debug!(target = %target, "Autowiring");
        let mut args = Arguments::new(target.as_str());
        for parameter in recipe.parameters() {
            let argument = self.argument(&target, &parameter, None)?;
            args.insert(parameter.name, argument);
        }
        recipe.construct(&args)
    }

    fn argument(&self, target: &Key, parameter: &Parameter, overrides: Option<&Overrides>) -> DiResult<Argument> {
        if let Some(found) = overrides.and_then(|o| o.get(parameter.name)) {
            return Ok(found.clone());
        }

        match &parameter.kind {
            ParameterKind::Union(_) => Err(DiError::autowire(
                target.as_str(),
                parameter.name,
                "union parameters are not supported",
            )),
            ParameterKind::Object { key, recipe } => {
                if let Some(found) = overrides.and_then(|o| o.get(key.as_str())) {
                    return Ok(found.clone());
                }
                self.resolve_with(key, recipe.as_ref()).map(Argument::Object)
            }
            ParameterKind::Scalar { default, nullable } => {
                let scoped = target.scoped(parameter.name);
                {
                    let params = self.inner.params.read();
                    if let Some(value) = params.get(&scoped).or_else(|| params.get(parameter.name)) {
                        return Ok(Argument::Value(value.clone()));
                    }
                }
                if let Some(value) = default {
                    return Ok(Argument::Value(value.clone()));
                }
                if *nullable {
                    return Ok(Argument::Null);
                }
                Err(DiError::autowire(
                    target.as_str(),
                    parameter.name,
                    format!("no value for scalar parameter, provide param '{}' or '{}'", parameter.name, scoped),
                ))
            }
        }
    }
}

impl ResolverCore for Container {
    fn resolve_with(&self, key: &Key, fallback: Option<&Recipe>) -> DiResult<AnyArc> {
        Container::resolve_with(self, key, fallback)
    }

    fn exposure(&self, key: &Key, view: TypeId) -> Option<AnyArc> {
        let registry = self.inner.registry.read();
        let key = registry.canonical(key);
        registry.exposures.get(&(key, view)).cloned()
    }

    fn param_value(&self, key: &str) -> Option<Value> {
        self.param(key)
    }
}

impl Default for Container {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let registry = self.inner.registry.read();
        f.debug_struct("Container")
            .field("id", &self.inner.id)
            .field("bindings", &registry.bindings.len())
            .field("instances", &registry.instances.len())
            .field("aliases", &registry.aliases.len())
            .finish()
    }
}

fn erase<T, F>(factory: F) -> Factory
where
    T: Send + Sync + 'static,
    F: Fn(&ResolverContext) -> DiResult<T> + Send + Sync + 'static,
{
    Arc::new(move |ctx: &ResolverContext| -> DiResult<AnyArc> { Ok(Arc::new(factory(ctx)?)) })
}
