//! Declared-dependency autowiring.
//!
//! Types describe their constructor parameters as data ([`Injectable`]) and
//! callables carry the same description ([`Callable`]). The container walks
//! these lists to produce [`Arguments`], so no runtime reflection is needed.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{DiError, DiResult};
use crate::key::Key;
use crate::registration::AnyArc;

/// A type the container can construct from declared dependencies.
///
/// # Examples
///
/// ```rust
/// use ferrous_kernel::{Arguments, Container, DiResult, Injectable, Parameter, Resolver};
/// use std::sync::Arc;
///
/// struct Database { url: String }
///
/// impl Injectable for Database {
///     fn parameters() -> Vec<Parameter> {
///         vec![Parameter::scalar("url")]
///     }
///
///     fn construct(args: &Arguments) -> DiResult<Self> {
///         Ok(Database { url: args.value("url")? })
///     }
/// }
///
/// struct UserRepository { db: Arc<Database> }
///
/// impl Injectable for UserRepository {
///     fn parameters() -> Vec<Parameter> {
///         vec![Parameter::of::<Database>("db")]
///     }
///
///     fn construct(args: &Arguments) -> DiResult<Self> {
///         Ok(UserRepository { db: args.object("db")? })
///     }
/// }
///
/// let container = Container::new();
/// container.set_param("url", "postgres://localhost");
///
/// let repo = container.resolve::<UserRepository>().unwrap();
/// assert_eq!(repo.db.url, "postgres://localhost");
/// ```
pub trait Injectable: Send + Sync + Sized + 'static {
    /// Key the type is registered and looked up under.
    fn key() -> Key {
        Key::of::<Self>()
    }

    /// Declared constructor parameters, in order.
    ///
    /// An empty list means the type has no dependencies.
    fn parameters() -> Vec<Parameter> {
        Vec::new()
    }

    /// Builds the value from resolved arguments.
    fn construct(args: &Arguments) -> DiResult<Self>;
}

/// Type-erased constructor description of an [`Injectable`].
#[derive(Clone, Copy)]
pub struct Recipe {
    key: fn() -> Key,
    parameters: fn() -> Vec<Parameter>,
    construct: fn(&Arguments) -> DiResult<AnyArc>,
    type_name: &'static str,
}

impl Recipe {
    pub fn of<T: Injectable>() -> Self {
        Recipe {
            key: T::key,
            parameters: T::parameters,
            construct: construct_erased::<T>,
            type_name: std::any::type_name::<T>(),
        }
    }

    pub fn key(&self) -> Key {
        (self.key)()
    }

    pub fn parameters(&self) -> Vec<Parameter> {
        (self.parameters)()
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub(crate) fn construct(&self, args: &Arguments) -> DiResult<AnyArc> {
        (self.construct)(args)
    }
}

fn construct_erased<T: Injectable>(args: &Arguments) -> DiResult<AnyArc> {
    Ok(Arc::new(T::construct(args)?))
}

impl fmt::Debug for Recipe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Recipe").field("type", &self.type_name).finish()
    }
}

/// One declared parameter of a constructor or callable.
#[derive(Debug, Clone)]
pub struct Parameter {
    pub name: &'static str,
    pub kind: ParameterKind,
}

/// How a parameter is satisfied.
#[derive(Debug, Clone)]
pub enum ParameterKind {
    /// A service, resolved from the container by key.
    ///
    /// When a recipe is attached the type is autowired even if nothing is
    /// registered under the key.
    Object { key: Key, recipe: Option<Recipe> },
    /// A plain value taken from the parameter store.
    Scalar { default: Option<Value>, nullable: bool },
    /// Several possible types. Never autowirable.
    Union(Vec<Key>),
}

impl Parameter {
    /// Object parameter for an autowirable type.
    pub fn of<T: Injectable>(name: &'static str) -> Self {
        Parameter {
            name,
            kind: ParameterKind::Object {
                key: T::key(),
                recipe: Some(Recipe::of::<T>()),
            },
        }
    }

    /// Object parameter for any type registered under its type key.
    pub fn object<T: ?Sized + 'static>(name: &'static str) -> Self {
        Self::service(name, Key::of::<T>())
    }

    /// Object parameter resolved by an explicit service id.
    pub fn service(name: &'static str, id: impl Into<Key>) -> Self {
        Parameter {
            name,
            kind: ParameterKind::Object {
                key: id.into(),
                recipe: None,
            },
        }
    }

    /// Scalar parameter without a default.
    pub fn scalar(name: &'static str) -> Self {
        Parameter {
            name,
            kind: ParameterKind::Scalar {
                default: None,
                nullable: false,
            },
        }
    }

    /// Parameter accepting any of several types.
    pub fn union(name: &'static str, keys: Vec<Key>) -> Self {
        Parameter {
            name,
            kind: ParameterKind::Union(keys),
        }
    }

    /// Sets the default of a scalar parameter. No effect on other kinds.
    pub fn default(mut self, value: impl Into<Value>) -> Self {
        if let ParameterKind::Scalar { default, .. } = &mut self.kind {
            *default = Some(value.into());
        }
        self
    }

    /// Lets a scalar parameter resolve to null. No effect on other kinds.
    pub fn nullable(mut self) -> Self {
        if let ParameterKind::Scalar { nullable, .. } = &mut self.kind {
            *nullable = true;
        }
        self
    }

    /// Type key of an object parameter.
    pub fn type_key(&self) -> Option<&Key> {
        match &self.kind {
            ParameterKind::Object { key, .. } => Some(key),
            _ => None,
        }
    }
}

/// A resolved argument.
#[derive(Clone)]
pub enum Argument {
    Object(AnyArc),
    Value(Value),
    Null,
}

impl fmt::Debug for Argument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Argument::Object(_) => f.write_str("Object(..)"),
            Argument::Value(v) => f.debug_tuple("Value").field(v).finish(),
            Argument::Null => f.write_str("Null"),
        }
    }
}

impl From<Value> for Argument {
    fn from(value: Value) -> Self {
        Argument::Value(value)
    }
}

/// Named arguments handed to a constructor or callable.
#[derive(Debug, Default, Clone)]
pub struct Arguments {
    target: String,
    values: HashMap<&'static str, Argument>,
}

impl Arguments {
    pub(crate) fn new(target: impl Into<String>) -> Self {
        Arguments {
            target: target.into(),
            values: HashMap::new(),
        }
    }

    pub(crate) fn insert(&mut self, name: &'static str, argument: Argument) {
        self.values.insert(name, argument);
    }

    /// The raw argument.
    pub fn raw(&self, name: &str) -> Option<&Argument> {
        self.values.get(name)
    }

    /// An object argument downcast to `T`.
    pub fn object<T: Send + Sync + 'static>(&self, name: &str) -> DiResult<Arc<T>> {
        match self.values.get(name) {
            Some(Argument::Object(any)) => any
                .clone()
                .downcast::<T>()
                .map_err(|_| DiError::TypeMismatch(std::any::type_name::<T>().to_string())),
            Some(_) => Err(DiError::TypeMismatch(std::any::type_name::<T>().to_string())),
            None => Err(self.missing(name)),
        }
    }

    /// A value argument deserialized into `T`.
    ///
    /// String values that do not deserialize directly are parsed as JSON, so
    /// route parameters such as `"42"` feed numeric arguments.
    pub fn value<T: DeserializeOwned>(&self, name: &str) -> DiResult<T> {
        match self.values.get(name) {
            Some(Argument::Value(value)) => deserialize(value).ok_or_else(|| {
                DiError::autowire(
                    &self.target,
                    name,
                    format!("value {} is not a {}", value, std::any::type_name::<T>()),
                )
            }),
            Some(Argument::Null) => serde_json::from_value(Value::Null)
                .map_err(|e| DiError::autowire(&self.target, name, e.to_string())),
            Some(Argument::Object(_)) => Err(DiError::TypeMismatch(std::any::type_name::<T>().to_string())),
            None => Err(self.missing(name)),
        }
    }

    /// A value argument that may be null or absent.
    pub fn optional<T: DeserializeOwned>(&self, name: &str) -> DiResult<Option<T>> {
        match self.values.get(name) {
            None | Some(Argument::Null) | Some(Argument::Value(Value::Null)) => Ok(None),
            Some(_) => self.value(name).map(Some),
        }
    }

    fn missing(&self, name: &str) -> DiError {
        DiError::autowire(&self.target, name, "argument was not declared")
    }
}

fn deserialize<T: DeserializeOwned>(value: &Value) -> Option<T> {
    if let Ok(parsed) = serde_json::from_value(value.clone()) {
        return Some(parsed);
    }
    match value {
        Value::String(s) => serde_json::from_str(s).ok(),
        _ => None,
    }
}

/// Request-scoped arguments for [`Container::call`](crate::Container::call).
///
/// Entries are matched against a callable's parameters by name first, then
/// by the parameter's declared type key.
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    entries: HashMap<String, Argument>,
}

impl Overrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, argument: Argument) {
        self.entries.insert(name.into(), argument);
    }

    pub fn with_object<T: Send + Sync + 'static>(mut self, name: impl Into<String>, value: Arc<T>) -> Self {
        self.insert(name, Argument::Object(value));
        self
    }

    pub fn with_value(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(name, Argument::Value(value.into()));
        self
    }

    pub fn get(&self, name: &str) -> Option<&Argument> {
        self.entries.get(name)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

type CallFn<R> = dyn Fn(&Arguments) -> crate::Result<R> + Send + Sync;

/// A function together with its declared parameters.
///
/// # Examples
///
/// ```rust
/// use ferrous_kernel::{Callable, Container, Overrides, Parameter};
///
/// let greet = Callable::new("greet", |args| {
///     let name: String = args.value("name")?;
///     Ok(format!("hello {name}"))
/// })
/// .param(Parameter::scalar("name"));
///
/// let container = Container::new();
/// let out = container
///     .call(&greet, &Overrides::new().with_value("name", "ada"))
///     .unwrap();
/// assert_eq!(out, "hello ada");
/// ```
pub struct Callable<R> {
    name: Arc<str>,
    params: Arc<[Parameter]>,
    func: Arc<CallFn<R>>,
}

impl<R> Callable<R> {
    pub fn new<F>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(&Arguments) -> crate::Result<R> + Send + Sync + 'static,
    {
        Callable {
            name: Arc::from(name.into()),
            params: Arc::from(Vec::new()),
            func: Arc::new(func),
        }
    }

    /// Appends a declared parameter.
    pub fn param(mut self, parameter: Parameter) -> Self {
        let mut params = self.params.to_vec();
        params.push(parameter);
        self.params = Arc::from(params);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parameters(&self) -> &[Parameter] {
        &self.params
    }

    pub(crate) fn invoke(&self, args: &Arguments) -> crate::Result<R> {
        (self.func)(args)
    }
}

impl<R> Clone for Callable<R> {
    fn clone(&self) -> Self {
        Callable {
            name: Arc::clone(&self.name),
            params: Arc::clone(&self.params),
            func: Arc::clone(&self.func),
        }
    }
}

impl<R> fmt::Debug for Callable<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Callable")
            .field("name", &self.name)
            .field("params", &self.params)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn string_values_parse_into_numbers() {
        let mut args = Arguments::new("show");
        args.insert("id", Argument::Value(json!("42")));
        let id: u64 = args.value("id").unwrap();
        assert_eq!(id, 42);

        let raw: String = args.value("id").unwrap();
        assert_eq!(raw, "42");
    }

    #[test]
    fn optional_treats_null_as_none() {
        let mut args = Arguments::new("list");
        args.insert("page", Argument::Null);
        assert_eq!(args.optional::<u32>("page").unwrap(), None);
        assert_eq!(args.optional::<u32>("missing").unwrap(), None);
    }

    #[test]
    fn builders_only_touch_scalars() {
        let p = Parameter::scalar("port").default(8080).nullable();
        match p.kind {
            ParameterKind::Scalar { default, nullable } => {
                assert_eq!(default, Some(json!(8080)));
                assert!(nullable);
            }
            _ => panic!("expected scalar"),
        }

        let o = Parameter::service("db", "database").default(1);
        assert!(matches!(o.kind, ParameterKind::Object { recipe: None, .. }));
    }
}
