//! Service key types for the container.

use std::borrow::Cow;
use std::fmt;

/// Key for service storage and lookup.
///
/// A key is a plain string identifier. Keys for Rust types are derived from
/// [`std::any::type_name`] so that typed registrations and string lookups
/// (aliases, `"Type@method"` handler references, configuration-driven
/// middleware lists) share one namespace.
///
/// # Examples
///
/// ```rust
/// use ferrous_kernel::Key;
///
/// struct Database;
///
/// let typed = Key::of::<Database>();
/// assert!(typed.as_str().ends_with("Database"));
///
/// let named = Key::from("router");
/// assert_eq!(named.as_str(), "router");
/// assert_eq!(named, Key::from(String::from("router")));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Key(Cow<'static, str>);

impl Key {
    /// Key for the concrete type `T`.
    #[inline(always)]
    pub fn of<T: ?Sized + 'static>() -> Self {
        Key(Cow::Borrowed(std::any::type_name::<T>()))
    }

    /// Key from a static string without allocating.
    pub const fn from_static(name: &'static str) -> Self {
        Key(Cow::Borrowed(name))
    }

    /// The identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Scoped parameter-store key, `"<key>:<param>"`.
    pub(crate) fn scoped(&self, param: &str) -> String {
        format!("{}:{}", self.0, param)
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Key {
    fn from(value: &str) -> Self {
        Key(Cow::Owned(value.to_owned()))
    }
}

impl From<String> for Key {
    fn from(value: String) -> Self {
        Key(Cow::Owned(value))
    }
}

impl From<&String> for Key {
    fn from(value: &String) -> Self {
        Key(Cow::Owned(value.clone()))
    }
}

impl From<&Key> for Key {
    fn from(value: &Key) -> Self {
        value.clone()
    }
}

impl AsRef<str> for Key {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// Helper function for creating type keys
#[inline(always)]
pub fn key_of_type<T: ?Sized + 'static>() -> Key {
    Key::of::<T>()
}
