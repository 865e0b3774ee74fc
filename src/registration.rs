//! Service registration types.

use std::any::{Any, TypeId};
use std::sync::Arc;

use serde_json::Value;

use crate::autowire::Recipe;
use crate::container::ResolverContext;
use crate::error::DiResult;
use crate::key::Key;
use crate::lifetime::Lifetime;

// Type-erased Arc for storage
pub type AnyArc = Arc<dyn Any + Send + Sync>;

pub(crate) type Factory = Arc<dyn for<'a> Fn(&ResolverContext<'a>) -> DiResult<AnyArc> + Send + Sync>;

#[cfg(feature = "performance")]
pub(crate) type Map<K, V> = ahash::AHashMap<K, V>;
#[cfg(not(feature = "performance"))]
pub(crate) type Map<K, V> = std::collections::HashMap<K, V>;

/// What a binding builds.
#[derive(Clone)]
pub(crate) enum Concrete {
    /// User factory closure
    Factory(Factory),
    /// Autowiring recipe for a known type
    Type(Recipe),
    /// Type looked up in the catalog at resolution time
    Declared(Key),
}

/// Service binding with lifetime and constructor.
///
/// Bindings are shared as `Arc` so a resolution in flight can tell whether
/// the key was re-registered while it ran.
pub(crate) struct Binding {
    pub(crate) lifetime: Lifetime,
    pub(crate) concrete: Concrete,
}

impl Binding {
    pub(crate) fn new(lifetime: Lifetime, concrete: Concrete) -> Arc<Self> {
        Arc::new(Binding { lifetime, concrete })
    }

    pub(crate) fn kind(&self) -> BindingKind {
        match self.concrete {
            Concrete::Factory(_) => BindingKind::Factory,
            Concrete::Type(_) => BindingKind::Type,
            Concrete::Declared(_) => BindingKind::Declared,
        }
    }
}

/// How a service is produced, for introspection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingKind {
    Factory,
    Type,
    Declared,
    Instance,
}

/// All registration tables of a container.
#[derive(Default)]
pub(crate) struct Registry {
    pub(crate) bindings: Map<Key, Arc<Binding>>,
    pub(crate) instances: Map<Key, AnyArc>,
    pub(crate) aliases: Map<Key, Key>,
    pub(crate) catalog: Map<Key, Recipe>,
    /// Upcasts to trait object views: `(service, view type) -> fn(AnyArc) -> Option<Arc<View>>`
    pub(crate) exposures: Map<(Key, TypeId), AnyArc>,
}

impl Registry {
    /// Replaces the binding for `key` and evicts any cached instance.
    pub(crate) fn bind(&mut self, key: Key, binding: Arc<Binding>) {
        self.instances.remove(&key);
        self.bindings.insert(key, binding);
    }

    /// Caches a ready instance and drops any competing binding.
    pub(crate) fn instance(&mut self, key: Key, value: AnyArc) {
        self.bindings.remove(&key);
        self.instances.insert(key, value);
    }

    /// Follows one alias level.
    pub(crate) fn canonical(&self, key: &Key) -> Key {
        self.aliases.get(key).cloned().unwrap_or_else(|| key.clone())
    }

    pub(crate) fn contains(&self, key: &Key) -> bool {
        self.instances.contains_key(key) || self.bindings.contains_key(key) || self.catalog.contains_key(key)
    }
}

/// Scalar parameter store.
#[derive(Default)]
pub(crate) struct Params {
    values: Map<String, Value>,
}

impl Params {
    pub(crate) fn set(&mut self, key: String, value: Value) {
        self.values.insert(key, value);
    }

    pub(crate) fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub(crate) fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }
}
