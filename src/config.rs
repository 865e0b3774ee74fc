//! Configuration lookup over dotted keys.
//!
//! A [`ConfigProvider`] asks its [`ConfigSource`]s in priority order and
//! caches what it finds. Values are plain JSON values, so typed extraction
//! goes through serde.

use std::collections::HashMap;
use std::env;

use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Trait for configuration sources
pub trait ConfigSource: Send + Sync + std::fmt::Debug {
    /// Get a configuration value by dotted key (`"http.middleware"`)
    fn get(&self, key: &str) -> Option<Value>;

    /// List all available keys
    fn keys(&self) -> Vec<String>;
}

/// Configuration held as a JSON tree, addressed by dotted paths.
#[derive(Debug, Clone)]
pub struct JsonConfigSource {
    root: Value,
}

impl JsonConfigSource {
    pub fn new(root: Value) -> Self {
        Self { root }
    }

    /// Parses a JSON document.
    pub fn parse(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text).map(Self::new)
    }
}

impl ConfigSource for JsonConfigSource {
    fn get(&self, key: &str) -> Option<Value> {
        key.split('.')
            .try_fold(&self.root, |node, segment| match node {
                Value::Object(map) => map.get(segment),
                Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
                _ => None,
            })
            .cloned()
    }

    fn keys(&self) -> Vec<String> {
        let mut keys = Vec::new();
        collect_keys(&self.root, String::new(), &mut keys);
        keys
    }
}

fn collect_keys(node: &Value, prefix: String, out: &mut Vec<String>) {
    if let Value::Object(map) = node {
        for (name, child) in map {
            let path = if prefix.is_empty() {
                name.clone()
            } else {
                format!("{prefix}.{name}")
            };
            collect_keys(child, path.clone(), out);
            out.push(path);
        }
    }
}

/// Environment variable configuration source
///
/// `app.env` is read from `APP_ENV`, or `MYAPP_APP_ENV` with prefix
/// `myapp`. Values that parse as JSON (`true`, `42`, `["a","b"]`) are
/// returned parsed, anything else as a string.
#[derive(Debug, Default)]
pub struct EnvironmentConfigSource {
    /// Prefix to filter environment variables
    prefix: Option<String>,
}

impl EnvironmentConfigSource {
    pub fn new() -> Self {
        Self { prefix: None }
    }

    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: Some(prefix.into()),
        }
    }

    fn variable(&self, key: &str) -> String {
        let name = key.replace('.', "_").to_uppercase();
        match &self.prefix {
            Some(prefix) => format!("{}_{}", prefix.to_uppercase(), name),
            None => name,
        }
    }
}

impl ConfigSource for EnvironmentConfigSource {
    fn get(&self, key: &str) -> Option<Value> {
        env::var(self.variable(key))
            .ok()
            .map(|raw| serde_json::from_str(&raw).unwrap_or(Value::String(raw)))
    }

    fn keys(&self) -> Vec<String> {
        env::vars()
            .filter_map(|(key, _)| match &self.prefix {
                Some(prefix) => {
                    let prefix_upper = format!("{}_", prefix.to_uppercase());
                    key.strip_prefix(&prefix_upper).map(str::to_lowercase)
                }
                None => Some(key.to_lowercase()),
            })
            .collect()
    }
}

/// Configuration provider over prioritized sources
#[derive(Debug, Default)]
pub struct ConfigProvider {
    /// Configuration sources in priority order
    sources: Vec<Box<dyn ConfigSource>>,
    /// Cached configuration values
    cache: RwLock<HashMap<String, Value>>,
}

impl ConfigProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a configuration source (higher priority sources should be added first)
    pub fn add_source(&mut self, source: Box<dyn ConfigSource>) {
        self.sources.push(source);
        self.invalidate_cache();
    }

    /// Builder form of [`add_source`](Self::add_source).
    pub fn with_source(mut self, source: impl ConfigSource + 'static) -> Self {
        self.add_source(Box::new(source));
        self
    }

    /// Get a configuration value, checking sources in priority order
    pub fn get(&self, key: &str) -> Option<Value> {
        if let Some(value) = self.cache.read().get(key) {
            return Some(value.clone());
        }

        let value = self.sources.iter().find_map(|source| source.get(key))?;
        self.cache.write().insert(key.to_string(), value.clone());
        Some(value)
    }

    /// Get a configuration value with a default
    pub fn get_or(&self, key: &str, default: impl Into<Value>) -> Value {
        self.get(key).unwrap_or_else(|| default.into())
    }

    /// Get a value deserialized into `T`; `None` when missing or mistyped
    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.get(key).and_then(|v| serde_json::from_value(v).ok())
    }

    pub fn get_string_or(&self, key: &str, default: &str) -> String {
        match self.get(key) {
            Some(Value::String(s)) => s,
            Some(other @ (Value::Number(_) | Value::Bool(_))) => other.to_string(),
            _ => default.to_string(),
        }
    }

    pub fn get_bool_or(&self, key: &str, default: bool) -> bool {
        self.get_as(key).unwrap_or(default)
    }

    /// Clear the configuration cache (forces reload from sources)
    pub fn invalidate_cache(&self) {
        self.cache.write().clear();
    }

    /// Get all configuration keys from all sources
    pub fn all_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.sources.iter().flat_map(|s| s.keys()).collect();
        keys.sort();
        keys.dedup();
        keys
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_json_source_dotted_paths() {
        let source = JsonConfigSource::new(json!({
            "app": { "env": "local" },
            "http": { "middleware": ["auth", "cors"] }
        }));

        assert_eq!(source.get("app.env"), Some(json!("local")));
        assert_eq!(source.get("http.middleware.1"), Some(json!("cors")));
        assert_eq!(source.get("app.missing"), None);

        let keys = source.keys();
        assert!(keys.contains(&"app.env".to_string()));
        assert!(keys.contains(&"http".to_string()));
    }

    #[test]
    fn test_environment_config_with_prefix() {
        env::set_var("FKTEST_DATABASE_URL", "postgres://localhost");
        env::set_var("FKTEST_HTTP_DEBUG", "true");

        let source = EnvironmentConfigSource::with_prefix("fktest");

        assert_eq!(source.get("database.url"), Some(json!("postgres://localhost")));
        assert_eq!(source.get("http.debug"), Some(json!(true)));
        assert!(source.keys().contains(&"database_url".to_string()));

        env::remove_var("FKTEST_DATABASE_URL");
        env::remove_var("FKTEST_HTTP_DEBUG");
    }

    #[test]
    fn test_config_provider_priority() {
        #[derive(Debug)]
        struct MockSource;
        impl ConfigSource for MockSource {
            fn get(&self, key: &str) -> Option<Value> {
                match key {
                    "app.env" => Some(json!("production")),
                    "app.port" => Some(json!(8080)),
                    _ => None,
                }
            }

            fn keys(&self) -> Vec<String> {
                vec!["app.env".to_string(), "app.port".to_string()]
            }
        }

        let provider = ConfigProvider::new()
            .with_source(JsonConfigSource::new(json!({ "app": { "env": "local" } })))
            .with_source(MockSource);

        assert_eq!(provider.get_string_or("app.env", "x"), "local");
        assert_eq!(provider.get_as::<u16>("app.port"), Some(8080));
        assert_eq!(provider.get_string_or("app.name", "default"), "default");
        assert!(!provider.get_bool_or("app.debug", false));
        assert_eq!(provider.all_keys(), vec!["app", "app.env", "app.port"]);
    }
}
