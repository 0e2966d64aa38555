//! Field types the container assigns after construction.
//!
//! Instances are shared, so every field the container writes to uses
//! interior mutability. Each field type implements a slot trait; descriptors
//! keep type-erased accessors that return the slot of a given instance.

use core::fmt;
use std::sync::{Arc, OnceLock};

use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::component::Component;

/// A field that receives merged configuration.
pub trait ConfigurationSlot: Send + Sync {
    /// Returns the field's current value as a merge layer.
    fn current(&self) -> Option<Value>;

    /// Stores the merged configuration.
    fn assign(&self, merged: Value) -> Result<(), serde_json::Error>;
}

/// A field that receives a command line value.
pub trait CliSlot: Send + Sync {
    /// Stores the value, or clears the field when there is none.
    fn assign(&self, value: Option<Value>) -> Result<(), serde_json::Error>;
}

/// A field that receives a keyed instance.
pub trait InjectSlot: Send + Sync {
    /// Stores the instance. Returns `false` if it has the wrong type or the
    /// field is already filled.
    fn fill(&self, instance: Arc<dyn Component>) -> bool;
}

// ─────────────────────────────────────────────────────────────────────────────
// ConfigField
// ─────────────────────────────────────────────────────────────────────────────

/// Merged configuration of type `C`.
///
/// The field is assigned before `on_configure` runs. A field created with
/// [`ConfigField::seeded`] contributes its seed as the middle merge layer,
/// between the declared default and the registered configuration.
pub struct ConfigField<C> {
    seed: Option<Value>,
    assigned: RwLock<Option<(Value, Arc<C>)>>,
}

impl<C> Default for ConfigField<C> {
    fn default() -> Self {
        Self {
            seed: None,
            assigned: RwLock::new(None),
        }
    }
}

impl<C> fmt::Debug for ConfigField<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigField")
            .field("seed", &self.seed)
            .field("assigned", &self.raw())
            .finish()
    }
}

impl<C> ConfigField<C> {
    /// Creates an empty field.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a field whose value before configuration is `seed`.
    #[must_use]
    pub fn seeded(seed: Value) -> Self {
        Self {
            seed: Some(seed),
            assigned: RwLock::new(None),
        }
    }

    /// Returns the typed configuration once assigned.
    #[must_use]
    pub fn get(&self) -> Option<Arc<C>> {
        self.assigned
            .read()
            .as_ref()
            .map(|(_, typed)| Arc::clone(typed))
    }

    /// Returns the merged JSON once assigned.
    #[must_use]
    pub fn raw(&self) -> Option<Value> {
        self.assigned.read().as_ref().map(|(raw, _)| raw.clone())
    }
}

impl<C: DeserializeOwned + Send + Sync> ConfigurationSlot for ConfigField<C> {
    fn current(&self) -> Option<Value> {
        self.raw().or_else(|| self.seed.clone())
    }

    fn assign(&self, merged: Value) -> Result<(), serde_json::Error> {
        let typed = serde_json::from_value::<C>(merged.clone())?;
        *self.assigned.write() = Some((merged, Arc::new(typed)));
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// CliField
// ─────────────────────────────────────────────────────────────────────────────

/// A value taken from the command line.
///
/// String values that do not deserialize into `V` directly are retried as
/// JSON, so `--port 8080` fills a `CliField<u16>`.
pub struct CliField<V> {
    value: RwLock<Option<V>>,
}

impl<V> Default for CliField<V> {
    fn default() -> Self {
        Self {
            value: RwLock::new(None),
        }
    }
}

impl<V: fmt::Debug> fmt::Debug for CliField<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("CliField").field(&*self.value.read()).finish()
    }
}

impl<V: Clone> CliField<V> {
    /// Creates an empty field.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the bound value, if any.
    #[must_use]
    pub fn get(&self) -> Option<V> {
        self.value.read().clone()
    }
}

impl<V: DeserializeOwned + Send + Sync> CliSlot for CliField<V> {
    fn assign(&self, value: Option<Value>) -> Result<(), serde_json::Error> {
        let typed = match value {
            None => None,
            Some(Value::String(text)) => match serde_json::from_value(Value::String(text.clone())) {
                Ok(typed) => Some(typed),
                Err(err) => Some(serde_json::from_str(&text).map_err(|_| err)?),
            },
            Some(other) => Some(serde_json::from_value(other)?),
        };
        *self.value.write() = typed;
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Inject
// ─────────────────────────────────────────────────────────────────────────────

/// A keyed instance resolved right after construction.
pub struct Inject<D> {
    instance: OnceLock<Arc<D>>,
}

impl<D> Default for Inject<D> {
    fn default() -> Self {
        Self {
            instance: OnceLock::new(),
        }
    }
}

impl<D> fmt::Debug for Inject<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Inject")
            .field("filled", &self.instance.get().is_some())
            .finish()
    }
}

impl<D> Inject<D> {
    /// Creates an empty field.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the injected instance once filled.
    #[must_use]
    pub fn get(&self) -> Option<Arc<D>> {
        self.instance.get().cloned()
    }
}

impl<D: Component> InjectSlot for Inject<D> {
    fn fill(&self, instance: Arc<dyn Component>) -> bool {
        match instance.downcast_arc::<D>() {
            Ok(typed) => self.instance.set(typed).is_ok(),
            Err(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;
    use serde_json::json;
    use tna_logger::Logger;

    use super::*;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Settings {
        threads: u32,
    }

    #[test]
    fn config_field_assigns_typed_value() {
        let field = ConfigField::<Settings>::new();
        assert!(field.get().is_none());
        assert!(field.current().is_none());

        field.assign(json!({ "threads": 2 })).unwrap();
        assert_eq!(field.get().as_deref(), Some(&Settings { threads: 2 }));
        assert_eq!(field.current(), Some(json!({ "threads": 2 })));
    }

    #[test]
    fn config_field_rejects_mismatched_value() {
        let field = ConfigField::<Settings>::new();
        assert!(field.assign(json!({ "threads": "many" })).is_err());
        assert!(field.get().is_none());
    }

    #[test]
    fn seed_is_the_current_value_until_assigned() {
        let field = ConfigField::<Value>::seeded(json!({ "a": 1 }));
        assert_eq!(field.current(), Some(json!({ "a": 1 })));
        field.assign(json!({ "b": 2 })).unwrap();
        assert_eq!(field.current(), Some(json!({ "b": 2 })));
    }

    #[test]
    fn cli_field_parses_strings_as_json_fallback() {
        let port = CliField::<u16>::new();
        port.assign(Some(json!("8080"))).unwrap();
        assert_eq!(port.get(), Some(8080));

        let name = CliField::<String>::new();
        name.assign(Some(json!("8080"))).unwrap();
        assert_eq!(name.get().as_deref(), Some("8080"));

        name.assign(None).unwrap();
        assert_eq!(name.get(), None);

        assert!(port.assign(Some(json!("eighty"))).is_err());
    }

    #[test]
    fn inject_checks_type() {
        let field = Inject::<Logger>::new();
        let wrong: Arc<dyn Component> = Arc::new(tna_getopt::GetOpt::default());
        assert!(!field.fill(wrong));
        assert!(field.get().is_none());

        let right: Arc<dyn Component> = Arc::new(Logger::default());
        assert!(field.fill(Arc::clone(&right)));
        assert!(field.get().is_some());

        // Filled once; a second instance is refused.
        let other: Arc<dyn Component> = Arc::new(Logger::default());
        assert!(!field.fill(other));
        let kept: Arc<dyn Component> = field.get().unwrap();
        assert!(Arc::ptr_eq(&kept, &right));
    }
}
