//! Service descriptors for introspection and diagnostics.

use crate::key::Key;
use crate::lifetime::Lifetime;
use crate::registration::BindingKind;

/// Service descriptor for introspection and diagnostics
///
/// Describes one entry of a container: its key, lifetime, how it is
/// produced and whether an instance is currently cached. Useful for startup
/// health checks and for listing what a module registered.
///
/// # Examples
///
/// ```rust
/// use ferrous_kernel::{BindingKind, Container, Lifetime};
///
/// struct Mailer;
///
/// let container = Container::new();
/// container.singleton("mailer", |_| Ok(Mailer));
/// container.instance("app.name", String::from("demo"));
///
/// let descriptors = container.descriptors();
///
/// let mailer = descriptors.iter().find(|d| d.key.as_str() == "mailer").unwrap();
/// assert_eq!(mailer.lifetime, Lifetime::Singleton);
/// assert_eq!(mailer.kind, BindingKind::Factory);
/// assert!(!mailer.cached);
///
/// let name = descriptors.iter().find(|d| d.key.as_str() == "app.name").unwrap();
/// assert_eq!(name.kind, BindingKind::Instance);
/// assert!(name.cached);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceDescriptor {
    /// The service key
    pub key: Key,
    /// Service lifetime (instances count as singletons)
    pub lifetime: Lifetime,
    /// How the service is produced
    pub kind: BindingKind,
    /// Whether an instance is cached right now
    pub cached: bool,
}

impl ServiceDescriptor {
    /// The key as a string.
    pub fn type_name(&self) -> &str {
        self.key.as_str()
    }

    /// Whether resolving this entry hits the cache.
    pub fn is_resolved(&self) -> bool {
        self.cached
    }
}
