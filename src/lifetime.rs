//! Service lifetime definitions.

/// Service lifetimes controlling instance caching behavior.
///
/// # Examples
///
/// ```rust
/// use ferrous_kernel::{Container, Lifetime, Resolver};
/// use std::sync::Arc;
///
/// struct Database { url: String }
/// struct RequestModel { id: u32 }
///
/// let container = Container::new();
///
/// // Singleton: one instance for the container
/// container.singleton("db", |_| Ok(Database { url: "postgres://localhost".to_string() }));
///
/// // Transient: new instance every time
/// container.bind("model", |_| Ok(RequestModel { id: 12345 }));
///
/// let db1 = container.get::<Database>("db").unwrap();
/// let db2 = container.get::<Database>("db").unwrap();
/// assert!(Arc::ptr_eq(&db1, &db2));
///
/// let m1 = container.get::<RequestModel>("model").unwrap();
/// let m2 = container.get::<RequestModel>("model").unwrap();
/// assert!(!Arc::ptr_eq(&m1, &m2));
///
/// let descriptors = container.descriptors();
/// assert!(descriptors.iter().any(|d| d.lifetime == Lifetime::Singleton));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifetime {
    /// Single instance per container, cached after first resolution
    ///
    /// The cached instance is dropped only when the key is registered
    /// again.
    Singleton,
    /// New instance per resolution, never cached
    Transient,
}

impl Lifetime {
    /// Whether resolved instances are cached.
    #[inline]
    pub fn is_shared(self) -> bool {
        matches!(self, Lifetime::Singleton)
    }
}
