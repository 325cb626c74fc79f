pub mod env_file;
pub mod tracing;

use std::collections::HashMap;
use std::env;
use std::str::FromStr;
use thiserror::Error;

pub use env_file::EnvFile;

/// Configuration error type
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration key '{0}' is required but not set")]
    MissingKey(String),

    #[error("Failed to parse configuration key '{key}': {details}")]
    ParseError { key: String, details: String },

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Failed to persist configuration to '{path}': {details}")]
    Persist { path: String, details: String },
}

/// Application environment (dev = local runs, prod = scheduled/unattended runs)
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    pub fn from_env() -> Self {
        Self::from_source(&ProcessEnv)
    }

    /// Reads `APP_ENV` from the given source; anything but "production" is development.
    pub fn from_source(source: &impl ConfigSource) -> Self {
        let app_env = value_or_default(source, "APP_ENV", "development");

        if app_env.eq_ignore_ascii_case("production") {
            Environment::Production
        } else {
            Environment::Development
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Environment::Production)
    }

    pub fn is_development(&self) -> bool {
        matches!(self, Environment::Development)
    }
}

/// A read-only key/value view over configuration.
pub trait ConfigSource {
    /// Returns the value for `key`, or `None` when unset.
    fn get(&self, key: &str) -> Option<String>;
}

/// A configuration source that can also be written back.
///
/// Implementations must make `set` durable before returning, so a crash right
/// after a successful `set` never leaves a half-written store behind.
pub trait ConfigStore: ConfigSource {
    fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError>;
}

/// Trait for configuration that can be loaded from a [`ConfigSource`]
pub trait FromSource: Sized {
    fn from_source(source: &impl ConfigSource) -> Result<Self, ConfigError>;
}

/// The process environment as a configuration source.
#[derive(Clone, Copy, Debug, Default)]
pub struct ProcessEnv;

impl ConfigSource for ProcessEnv {
    fn get(&self, key: &str) -> Option<String> {
        env::var(key).ok()
    }
}

/// In-memory store, mostly useful for tests and for layering overrides.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    values: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: &str, value: &str) -> Self {
        self.values.insert(key.to_string(), value.to_string());
        self
    }
}

impl ConfigSource for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }
}

impl ConfigStore for MemoryStore {
    fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

impl<S: ConfigSource + ?Sized> ConfigSource for &S {
    fn get(&self, key: &str) -> Option<String> {
        (**self).get(key)
    }
}

impl<S: ConfigSource + ?Sized> ConfigSource for &mut S {
    fn get(&self, key: &str) -> Option<String> {
        (**self).get(key)
    }
}

impl<S: ConfigStore + ?Sized> ConfigStore for &mut S {
    fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        (**self).set(key, value)
    }
}

/// Value for `key` with surrounding whitespace removed; blank values count as unset.
pub fn value_optional(source: &impl ConfigSource, key: &str) -> Option<String> {
    source
        .get(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Helper to load a value with a default
pub fn value_or_default(source: &impl ConfigSource, key: &str, default: &str) -> String {
    value_optional(source, key).unwrap_or_else(|| default.to_string())
}

/// Helper to load a value or return error
pub fn value_required(source: &impl ConfigSource, key: &str) -> Result<String, ConfigError> {
    value_optional(source, key).ok_or_else(|| ConfigError::MissingKey(key.to_string()))
}

/// Helper to load and parse a value, falling back to `default` when unset
pub fn value_parsed<T>(source: &impl ConfigSource, key: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match value_optional(source, key) {
        Some(raw) => raw.parse().map_err(|e: T::Err| ConfigError::ParseError {
            key: key.to_string(),
            details: e.to_string(),
        }),
        None => Ok(default),
    }
}
