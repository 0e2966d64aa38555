//! Configurations and the store that holds them.
//!
//! A [`Configuration`] addresses one instance by provider name and optional
//! id and carries an arbitrary JSON payload. When an instance is configured,
//! its field default, the field's current value and the matching payload are
//! merged right-biased with [`merge_layers`].
//!
//! # Example
//!
//! ```
//! use serde_json::json;
//! use tna_di::configuration::{Configuration, merge_layers};
//!
//! let conf = Configuration::new("Worker", json!({ "threads": 4 })).with_id("foo");
//! assert_eq!(conf.id.as_deref(), Some("foo"));
//!
//! let merged = merge_layers([
//!     Some(json!({ "threads": 1, "name": "default" })),
//!     None,
//!     Some(conf.config),
//! ]);
//! assert_eq!(merged, json!({ "threads": 4, "name": "default" }));
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::DiError;
use crate::metadata::Injectable;

/// A configuration payload for one provider, optionally for one instance id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Configuration {
    /// Provider name the payload is for.
    pub for_module: String,
    /// The payload.
    pub config: Value,
    /// Instance id the payload is for; `None` addresses the default instance.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

impl Configuration {
    /// Creates a configuration for the default instance of `for_module`.
    #[must_use]
    pub fn new(for_module: impl Into<String>, config: Value) -> Self {
        Self {
            for_module: for_module.into(),
            config,
            id: None,
        }
    }

    /// Creates a configuration from any serializable payload.
    pub fn from_serialize(
        for_module: impl Into<String>,
        payload: &impl Serialize,
    ) -> Result<Self, serde_json::Error> {
        Ok(Self::new(for_module, serde_json::to_value(payload)?))
    }

    /// Addresses the configuration to the instance with `id`.
    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Returns `true` if this configuration addresses `(provides, id)`.
    #[must_use]
    pub fn addresses(&self, provides: &str, id: Option<&str>) -> bool {
        self.for_module == provides && self.id.as_deref() == id
    }
}

/// Creates a configuration for the default instance of `T`.
#[must_use]
pub fn config<T: Injectable>(config: Value) -> Configuration {
    Configuration::new(T::provides(), config)
}

/// Creates a configuration for the instance of `T` with `id`.
#[must_use]
pub fn config_for<T: Injectable>(config: Value, id: impl Into<String>) -> Configuration {
    Configuration::new(T::provides(), config).with_id(id)
}

/// Merges configuration layers, later layers winning.
///
/// Absent and `null` layers are skipped. Object layers are merged key by
/// key, one level deep. Any other layer replaces what was merged so far.
/// The result is an empty object when every layer is skipped.
pub fn merge_layers(layers: impl IntoIterator<Item = Option<Value>>) -> Value {
    let mut merged = Value::Object(Map::new());

    for layer in layers.into_iter().flatten() {
        match layer {
            Value::Null => {}
            Value::Object(entries) => {
                if let Value::Object(target) = &mut merged {
                    target.extend(entries);
                } else {
                    merged = Value::Object(entries);
                }
            }
            other => merged = other,
        }
    }

    merged
}

// ─────────────────────────────────────────────────────────────────────────────
// ConfigurationStore
// ─────────────────────────────────────────────────────────────────────────────

/// Ordered list of configurations known to a container.
///
/// Registration rejects duplicates; configurations contributed at runtime
/// are appended without a check and the first match wins on lookup.
#[derive(Debug, Clone, Default)]
pub(crate) struct ConfigurationStore {
    configurations: Vec<Configuration>,
}

impl ConfigurationStore {
    pub(crate) fn new(initial: Vec<Configuration>) -> Self {
        Self {
            configurations: initial,
        }
    }

    /// Registers `configs`, failing on the first `(for_module, id)` already
    /// present or repeated within `configs`. Nothing is registered on failure.
    pub(crate) fn register(
        &mut self,
        configs: impl IntoIterator<Item = Configuration>,
    ) -> Result<(), DiError> {
        let configs: Vec<Configuration> = configs.into_iter().collect();
        for (index, config) in configs.iter().enumerate() {
            let repeated = configs[..index]
                .iter()
                .any(|earlier| earlier.for_module == config.for_module && earlier.id == config.id);
            if repeated || self.find(&config.for_module, config.id.as_deref()).is_some() {
                return Err(DiError::UnspecificConfig {
                    for_module: config.for_module.clone(),
                    id: config.id.clone(),
                });
            }
        }
        self.configurations.extend(configs);
        Ok(())
    }

    pub(crate) fn append(&mut self, configs: impl IntoIterator<Item = Configuration>) {
        self.configurations.extend(configs);
    }

    pub(crate) fn find(&self, provides: &str, id: Option<&str>) -> Option<&Configuration> {
        self.configurations
            .iter()
            .find(|config| config.addresses(provides, id))
    }

    pub(crate) fn len(&self) -> usize {
        self.configurations.len()
    }
}
