//! Compiler configuration.
//!
//! A [`CompilerConfig`] is installed once per process with [`install`];
//! statements read it through [`current`] when they compile. Without an
//! explicit install the defaults apply.

use std::sync::OnceLock;

use serde::Deserialize;

/// Errors raised while loading a configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The JSON document could not be deserialized.
    #[error("invalid config document: {0}")]
    Json(#[from] serde_json::Error),

    /// An environment variable holds a value of the wrong type.
    #[error("invalid value for {var}: {value}")]
    InvalidEnv {
        /// Variable name.
        var: &'static str,
        /// Raw value found.
        value: String,
    },

    /// A configuration was already installed.
    #[error("compiler config already installed")]
    AlreadyInstalled,
}

/// Settings shared by every compilation in the process.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CompilerConfig {
    /// Schema written in front of every table reference. Empty means the
    /// connection's current database (`.table`).
    pub schema: String,
    /// Maximum number of idle compilation contexts kept for reuse.
    pub pool_capacity: usize,
    /// Text buffers larger than this are shrunk before going back to the pool.
    pub max_retained_bytes: usize,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            schema: String::new(),
            pool_capacity: 32,
            max_retained_bytes: 16 * 1024,
        }
    }
}

impl CompilerConfig {
    /// Creates a config with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the schema prefix.
    #[must_use]
    pub fn schema(mut self, schema: &str) -> Self {
        self.schema = String::from(schema);
        self
    }

    /// Sets the idle context pool capacity.
    #[must_use]
    pub const fn pool_capacity(mut self, capacity: usize) -> Self {
        self.pool_capacity = capacity;
        self
    }

    /// Sets the retained buffer size limit.
    #[must_use]
    pub const fn max_retained_bytes(mut self, bytes: usize) -> Self {
        self.max_retained_bytes = bytes;
        self
    }

    /// Parses a config from a JSON document. Missing keys keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Json`] for malformed documents or unknown keys.
    pub fn from_json(doc: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(doc)?)
    }

    /// Builds a config from `SQLC_SCHEMA`, `SQLC_POOL_CAPACITY` and
    /// `SQLC_MAX_RETAINED_BYTES`, falling back to defaults for unset ones.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidEnv`] when a numeric variable does not
    /// parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if let Some(schema) = lookup("SQLC_SCHEMA") {
            config.schema = schema;
        }
        if let Some(n) = parse_env(&lookup, "SQLC_POOL_CAPACITY")? {
            config.pool_capacity = n;
        }
        if let Some(n) = parse_env(&lookup, "SQLC_MAX_RETAINED_BYTES")? {
            config.max_retained_bytes = n;
        }
        Ok(config)
    }
}

fn parse_env(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
) -> Result<Option<usize>, ConfigError> {
    lookup(var)
        .map(|value| {
            value
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidEnv { var, value })
        })
        .transpose()
}

static CONFIG: OnceLock<CompilerConfig> = OnceLock::new();

/// Installs the process-wide config. Must happen before the first compile.
///
/// # Errors
///
/// Returns [`ConfigError::AlreadyInstalled`] if a config is already in use,
/// including the default one picked up by an earlier compile.
pub fn install(config: CompilerConfig) -> Result<(), ConfigError> {
    tracing::debug!(schema = %config.schema, pool_capacity = config.pool_capacity, "installing compiler config");
    CONFIG
        .set(config)
        .map_err(|_| ConfigError::AlreadyInstalled)
}

/// Returns the active config.
pub fn current() -> &'static CompilerConfig {
    CONFIG.get_or_init(CompilerConfig::default)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn test_defaults() {
        let config = CompilerConfig::new();
        assert_eq!(config.schema, "");
        assert_eq!(config.pool_capacity, 32);
    }

    #[test]
    fn test_from_json_partial() {
        let config = CompilerConfig::from_json(r#"{"schema": "app"}"#).unwrap();
        assert_eq!(config, CompilerConfig::new().schema("app"));
    }

    #[test]
    fn test_from_json_unknown_key() {
        let err = CompilerConfig::from_json(r#"{"shema": "app"}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Json(_)));
    }

    #[test]
    fn test_from_lookup() {
        let vars: HashMap<&str, &str> =
            HashMap::from([("SQLC_SCHEMA", "shop"), ("SQLC_POOL_CAPACITY", " 4 ")]);
        let config =
            CompilerConfig::from_lookup(|var| vars.get(var).map(|v| String::from(*v))).unwrap();
        assert_eq!(config.schema, "shop");
        assert_eq!(config.pool_capacity, 4);
        assert_eq!(config.max_retained_bytes, 16 * 1024);
    }

    #[test]
    fn test_from_lookup_invalid_number() {
        let err = CompilerConfig::from_lookup(|var| {
            (var == "SQLC_MAX_RETAINED_BYTES").then(|| String::from("lots"))
        })
        .unwrap_err();
        assert_eq!(err.to_string(), "invalid value for SQLC_MAX_RETAINED_BYTES: lots");
    }
}
