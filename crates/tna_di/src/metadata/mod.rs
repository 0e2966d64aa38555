//! Provider descriptors: what a component provides, consumes and declares.
//!
//! A component type becomes injectable by implementing [`Injectable`]. Its
//! [`ProviderDescriptor`] is built once per process from
//! [`Injectable::describe`] and kept in a side registry keyed by type, see
//! [`descriptor_of`].
//!
//! # Example
//!
//! ```
//! use serde::Deserialize;
//! use serde_json::json;
//! use tna_di::component::{Component, HookError};
//! use tna_di::metadata::{ConfigField, DescriptorBuilder, Dependencies, Injectable};
//! use tna_logger::Logger;
//!
//! #[derive(Deserialize)]
//! struct PoolSettings {
//!     size: usize,
//! }
//!
//! struct Pool {
//!     logger: Logger,
//!     settings: ConfigField<PoolSettings>,
//! }
//!
//! impl Component for Pool {}
//!
//! impl Injectable for Pool {
//!     fn describe(d: DescriptorBuilder<Self>) -> DescriptorBuilder<Self> {
//!         d.consumes::<Logger>()
//!             .configuration_with_default("settings", |p| &p.settings, json!({ "size": 4 }))
//!     }
//!
//!     fn construct(deps: &mut Dependencies) -> Result<Self, HookError> {
//!         Ok(Self {
//!             logger: deps.take_logger()?,
//!             settings: ConfigField::new(),
//!         })
//!     }
//! }
//!
//! let descriptor = tna_di::metadata::descriptor_of::<Pool>();
//! assert_eq!(descriptor.provides(), "Pool");
//! assert_eq!(descriptor.consumes(), ["Logger"]);
//! ```

mod dependencies;
mod fields;
mod registry;

pub use dependencies::Dependencies;
pub use fields::{CliField, CliSlot, ConfigField, ConfigurationSlot, Inject, InjectSlot};
pub use registry::descriptor_of;

use core::fmt;
use core::marker::PhantomData;
use std::borrow::Cow;
use std::sync::Arc;

use downcast_rs::Downcast;
use hashbrown::HashMap;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tna_getopt::{GetOpt, GetOptConfiguration};
use tna_logger::Logger;
use variadics_please::all_tuples;

use crate::component::{Component, HookError};
use crate::configuration::Configuration;

/// Reserved provider name of the per-caller logger.
pub const LOGGER: &str = "Logger";

/// Reserved provider name of the parsed command line.
pub const GETOPT: &str = "GetOpt";

/// Returns the last path segment of a type's name, without generics.
#[must_use]
pub fn short_type_name<T: ?Sized>() -> &'static str {
    let full = core::any::type_name::<T>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}

// ─────────────────────────────────────────────────────────────────────────────
// Injectable / Dependency
// ─────────────────────────────────────────────────────────────────────────────

/// A component type the container can construct.
pub trait Injectable: Component + Sized {
    /// The name this type is registered and looked up under.
    ///
    /// Defaults to the type's short name.
    fn provides() -> Cow<'static, str> {
        Cow::Borrowed(short_type_name::<Self>())
    }

    /// Adds dependencies, declarations and field bindings to the descriptor.
    fn describe(descriptor: DescriptorBuilder<Self>) -> DescriptorBuilder<Self> {
        descriptor
    }

    /// Builds an instance from its resolved dependencies, in `consumes` order.
    fn construct(dependencies: &mut Dependencies) -> Result<Self, HookError>;
}

/// A type that can be consumed by name.
pub trait Dependency: Component {
    /// The provider name the container resolves.
    fn provider_name() -> Cow<'static, str>;
}

impl<T: Injectable> Dependency for T {
    fn provider_name() -> Cow<'static, str> {
        T::provides()
    }
}

impl Dependency for Logger {
    fn provider_name() -> Cow<'static, str> {
        Cow::Borrowed(LOGGER)
    }
}

impl Dependency for GetOpt {
    fn provider_name() -> Cow<'static, str> {
        Cow::Borrowed(GETOPT)
    }
}

/// One dependency or a tuple of dependencies, in constructor order.
pub trait DependencyList {
    /// Returns the provider names in order.
    fn provider_names() -> Vec<String>;
}

impl<D: Dependency> DependencyList for D {
    fn provider_names() -> Vec<String> {
        vec![D::provider_name().into_owned()]
    }
}

macro_rules! impl_dependency_list_for_tuple {
    ($($D:ident),*) => {
        impl<$($D: Dependency),*> DependencyList for ($($D,)*) {
            fn provider_names() -> Vec<String> {
                vec![$($D::provider_name().into_owned()),*]
            }
        }
    };
}

all_tuples!(impl_dependency_list_for_tuple, 2, 12, D);

// ─────────────────────────────────────────────────────────────────────────────
// Bindings
// ─────────────────────────────────────────────────────────────────────────────

/// Type-erased access to a field of a concrete component.
pub(crate) type Accessor<S> = Arc<dyn for<'a> Fn(&'a dyn Component) -> Option<&'a S> + Send + Sync>;

fn accessor<S, F>(project: F) -> Accessor<S>
where
    S: ?Sized + 'static,
    F: for<'a> Fn(&'a dyn Component) -> Option<&'a S> + Send + Sync + 'static,
{
    Arc::new(project)
}

pub(crate) type Constructor =
    Arc<dyn Fn(&mut Dependencies) -> Result<Arc<dyn Component>, HookError> + Send + Sync>;

/// The field receiving merged configuration.
#[derive(Clone)]
pub(crate) struct ConfigurationBinding {
    pub(crate) field: &'static str,
    pub(crate) default: Option<Value>,
    pub(crate) slot: Accessor<dyn ConfigurationSlot>,
}

/// Where a command line binding reads from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CliSource {
    /// A parsed option, by long name.
    Option(String),
    /// A dotted path into the positional tree.
    Argument(String),
    /// `true` when the dotted path exists in the positional tree.
    CommandState(String),
}

/// A field receiving a command line value.
#[derive(Clone)]
pub(crate) struct CliBinding {
    pub(crate) field: &'static str,
    pub(crate) source: CliSource,
    pub(crate) default: Option<Value>,
    pub(crate) slot: Accessor<dyn CliSlot>,
}

/// A field resolved to a keyed instance right after construction.
#[derive(Clone)]
pub struct KeyedInjection {
    /// Name of the field.
    pub field: &'static str,
    /// Provider name of the injected instance.
    pub provider: String,
    /// Instance id, with `<<name>>` ids already expanded.
    pub id: String,
    pub(crate) type_name: &'static str,
    pub(crate) slot: Accessor<dyn InjectSlot>,
}

impl fmt::Debug for KeyedInjection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyedInjection")
            .field("field", &self.field)
            .field("provider", &self.provider)
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}

#[derive(Clone)]
enum Declaration {
    Type(fn() -> Arc<ProviderDescriptor>),
    Descriptor(Arc<ProviderDescriptor>),
}

impl Declaration {
    fn resolve(&self) -> Arc<ProviderDescriptor> {
        match self {
            Declaration::Type(describe) => describe(),
            Declaration::Descriptor(descriptor) => Arc::clone(descriptor),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// ProviderDescriptor
// ─────────────────────────────────────────────────────────────────────────────

/// Everything the container needs to know about a component type.
#[derive(Clone)]
pub struct ProviderDescriptor {
    type_name: &'static str,
    provides: String,
    consumes: Vec<String>,
    declarations: Vec<Declaration>,
    registrable: bool,
    keyed_injections: Vec<KeyedInjection>,
    configuration: Option<ConfigurationBinding>,
    config_id_aliases: HashMap<String, String>,
    cli_bindings: Vec<CliBinding>,
    configs: Vec<Configuration>,
    cli: Option<GetOptConfiguration>,
    help_trap: bool,
    constructor: Option<Constructor>,
}

impl fmt::Debug for ProviderDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderDescriptor")
            .field("type_name", &self.type_name)
            .field("provides", &self.provides)
            .field("consumes", &self.consumes)
            .field("declarations", &self.declarations.len())
            .field("registrable", &self.registrable)
            .field("keyed_injections", &self.keyed_injections)
            .field("configuration", &self.configuration.as_ref().map(|c| c.field))
            .finish_non_exhaustive()
    }
}

impl ProviderDescriptor {
    /// Creates a descriptor that cannot be registered.
    ///
    /// Registering it fails with [`DiError::NotInjectable`](crate::DiError::NotInjectable).
    #[must_use]
    pub fn unregistrable(provides: impl Into<String>) -> Self {
        Self {
            type_name: "",
            provides: provides.into(),
            consumes: Vec::new(),
            declarations: Vec::new(),
            registrable: false,
            keyed_injections: Vec::new(),
            configuration: None,
            config_id_aliases: HashMap::new(),
            cli_bindings: Vec::new(),
            configs: Vec::new(),
            cli: None,
            help_trap: true,
            constructor: None,
        }
    }

    /// The lookup name.
    #[must_use]
    pub fn provides(&self) -> &str {
        &self.provides
    }

    /// The Rust type this descriptor was built for.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Constructor dependency names, in order.
    #[must_use]
    pub fn consumes(&self) -> &[String] {
        &self.consumes
    }

    /// Resolves the nested descriptors to register alongside this one.
    #[must_use]
    pub fn declarations(&self) -> Vec<Arc<ProviderDescriptor>> {
        self.declarations.iter().map(Declaration::resolve).collect()
    }

    /// Whether registration is allowed.
    #[must_use]
    pub fn registrable(&self) -> bool {
        self.registrable && self.constructor.is_some()
    }

    /// Fields resolved to keyed instances after construction.
    #[must_use]
    pub fn keyed_injections(&self) -> &[KeyedInjection] {
        &self.keyed_injections
    }

    /// Name of the configuration field and its default, if any.
    #[must_use]
    pub fn configuration(&self) -> Option<(&'static str, Option<&Value>)> {
        self.configuration
            .as_ref()
            .map(|binding| (binding.field, binding.default.as_ref()))
    }

    /// Maps declared ephemeral ids (`<<name>>`) to their expanded form.
    #[must_use]
    pub fn config_id_aliases(&self) -> &HashMap<String, String> {
        &self.config_id_aliases
    }

    /// Configurations registered together with this descriptor.
    #[must_use]
    pub fn configs(&self) -> &[Configuration] {
        &self.configs
    }

    /// The command line schema, for application roots.
    #[must_use]
    pub fn cli(&self) -> Option<&GetOptConfiguration> {
        self.cli.as_ref()
    }

    /// Whether `--help` stops bootstrapping and prints usage.
    #[must_use]
    pub fn help_trap(&self) -> bool {
        self.help_trap
    }

    /// Sources of the command line bindings, by field.
    #[must_use]
    pub fn cli_sources(&self) -> Vec<(&'static str, &CliSource)> {
        self.cli_bindings
            .iter()
            .map(|binding| (binding.field, &binding.source))
            .collect()
    }

    pub(crate) fn configuration_binding(&self) -> Option<&ConfigurationBinding> {
        self.configuration.as_ref()
    }

    pub(crate) fn cli_bindings(&self) -> &[CliBinding] {
        &self.cli_bindings
    }

    pub(crate) fn constructor(&self) -> Option<&Constructor> {
        self.constructor.as_ref()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// DescriptorBuilder
// ─────────────────────────────────────────────────────────────────────────────

/// Builder handed to [`Injectable::describe`].
pub struct DescriptorBuilder<T> {
    descriptor: ProviderDescriptor,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Injectable> DescriptorBuilder<T> {
    pub(crate) fn new() -> Self {
        let constructor: Constructor = Arc::new(|dependencies: &mut Dependencies| {
            T::construct(dependencies).map(|instance| Arc::new(instance) as Arc<dyn Component>)
        });

        Self {
            descriptor: ProviderDescriptor {
                type_name: core::any::type_name::<T>(),
                registrable: true,
                constructor: Some(constructor),
                ..ProviderDescriptor::unregistrable(T::provides())
            },
            _marker: PhantomData,
        }
    }

    pub(crate) fn finish(self) -> ProviderDescriptor {
        self.descriptor
    }

    /// Appends constructor dependencies, a single type or a tuple.
    #[must_use]
    pub fn consumes<D: DependencyList>(mut self) -> Self {
        self.descriptor.consumes.extend(D::provider_names());
        self
    }

    /// Appends a constructor dependency by provider name.
    #[must_use]
    pub fn consumes_name(mut self, provider: impl Into<String>) -> Self {
        self.descriptor.consumes.push(provider.into());
        self
    }

    /// Registers `D` whenever this type is registered.
    #[must_use]
    pub fn declare<D: Injectable>(mut self) -> Self {
        self.descriptor
            .declarations
            .push(Declaration::Type(descriptor_of::<D>));
        self
    }

    /// Registers `descriptor` whenever this type is registered.
    #[must_use]
    pub fn declare_descriptor(mut self, descriptor: Arc<ProviderDescriptor>) -> Self {
        self.descriptor
            .declarations
            .push(Declaration::Descriptor(descriptor));
        self
    }

    /// Registers `config` whenever this type is registered.
    #[must_use]
    pub fn with_config(mut self, config: Configuration) -> Self {
        self.descriptor.configs.push(config);
        self
    }

    /// Registers `configs` whenever this type is registered.
    #[must_use]
    pub fn with_configs(mut self, configs: impl IntoIterator<Item = Configuration>) -> Self {
        self.descriptor.configs.extend(configs);
        self
    }

    /// Sets the command line schema parsed when this type is bootstrapped.
    #[must_use]
    pub fn with_cli(mut self, schema: GetOptConfiguration) -> Self {
        self.descriptor.cli = Some(schema);
        self
    }

    /// Keeps bootstrapping when `--help` is given.
    #[must_use]
    pub fn without_help_trap(mut self) -> Self {
        self.descriptor.help_trap = false;
        self
    }

    /// Marks the type as not registrable.
    #[must_use]
    pub fn not_registrable(mut self) -> Self {
        self.descriptor.registrable = false;
        self
    }

    /// Binds the field that must receive a configuration.
    ///
    /// Configuring an instance without a matching configuration fails with
    /// [`DiError::MissingConfiguration`](crate::DiError::MissingConfiguration).
    /// A later call replaces the binding.
    #[must_use]
    pub fn configuration<C>(self, field: &'static str, project: fn(&T) -> &ConfigField<C>) -> Self
    where
        C: DeserializeOwned + Send + Sync + 'static,
    {
        self.bind_configuration(field, project, None)
    }

    /// Binds the configuration field with a default layer.
    ///
    /// A later call replaces the binding.
    #[must_use]
    pub fn configuration_with_default<C>(
        self,
        field: &'static str,
        project: fn(&T) -> &ConfigField<C>,
        default: Value,
    ) -> Self
    where
        C: DeserializeOwned + Send + Sync + 'static,
    {
        self.bind_configuration(field, project, Some(default))
    }

    fn bind_configuration<C>(
        mut self,
        field: &'static str,
        project: fn(&T) -> &ConfigField<C>,
        default: Option<Value>,
    ) -> Self
    where
        C: DeserializeOwned + Send + Sync + 'static,
    {
        let slot = accessor::<dyn ConfigurationSlot, _>(move |component| {
            component
                .as_any()
                .downcast_ref::<T>()
                .map(|target| project(target) as &dyn ConfigurationSlot)
        });
        self.descriptor.configuration = Some(ConfigurationBinding {
            field,
            default,
            slot,
        });
        self
    }

    /// Injects the instance of `D` with `id` into a field after construction.
    ///
    /// An id of the form `<<name>>` is expanded once per process to
    /// `name-<random>`, and configurations this type provides for
    /// `<<name>>` are redirected to the expanded id.
    #[must_use]
    pub fn inject_keyed<D: Dependency>(
        mut self,
        field: &'static str,
        project: fn(&T) -> &Inject<D>,
        id: &str,
    ) -> Self {
        let expanded = match id.strip_prefix("<<").and_then(|rest| rest.strip_suffix(">>")) {
            Some(name) if !name.is_empty() => {
                let expanded = format!("{name}-{}", nanoid::nanoid!(6));
                self.descriptor
                    .config_id_aliases
                    .insert(id.to_string(), expanded.clone());
                expanded
            }
            _ => id.to_string(),
        };

        let slot = accessor::<dyn InjectSlot, _>(move |component| {
            component
                .as_any()
                .downcast_ref::<T>()
                .map(|target| project(target) as &dyn InjectSlot)
        });
        self.descriptor.keyed_injections.push(KeyedInjection {
            field,
            provider: D::provider_name().into_owned(),
            id: expanded,
            type_name: core::any::type_name::<D>(),
            slot,
        });
        self
    }

    /// Binds a field to a parsed option.
    #[must_use]
    pub fn option<V>(self, field: &'static str, key: &str, project: fn(&T) -> &CliField<V>) -> Self
    where
        V: DeserializeOwned + Send + Sync + 'static,
    {
        self.bind_cli(field, CliSource::Option(key.to_string()), None, project)
    }

    /// Binds a field to a parsed option, with a fallback when no source has it.
    #[must_use]
    pub fn option_with_default<V>(
        self,
        field: &'static str,
        key: &str,
        project: fn(&T) -> &CliField<V>,
        default: Value,
    ) -> Self
    where
        V: DeserializeOwned + Send + Sync + 'static,
    {
        self.bind_cli(field, CliSource::Option(key.to_string()), Some(default), project)
    }

    /// Binds a field to a dotted path in the positional tree.
    #[must_use]
    pub fn argument<V>(self, field: &'static str, path: &str, project: fn(&T) -> &CliField<V>) -> Self
    where
        V: DeserializeOwned + Send + Sync + 'static,
    {
        self.bind_cli(field, CliSource::Argument(path.to_string()), None, project)
    }

    /// Binds a field to a dotted path in the positional tree, with a fallback.
    #[must_use]
    pub fn argument_with_default<V>(
        self,
        field: &'static str,
        path: &str,
        project: fn(&T) -> &CliField<V>,
        default: Value,
    ) -> Self
    where
        V: DeserializeOwned + Send + Sync + 'static,
    {
        self.bind_cli(field, CliSource::Argument(path.to_string()), Some(default), project)
    }

    /// Binds a field to whether a command path was given.
    #[must_use]
    pub fn command_state(
        self,
        field: &'static str,
        path: &str,
        project: fn(&T) -> &CliField<bool>,
    ) -> Self {
        self.bind_cli(field, CliSource::CommandState(path.to_string()), None, project)
    }

    fn bind_cli<V>(
        mut self,
        field: &'static str,
        source: CliSource,
        default: Option<Value>,
        project: fn(&T) -> &CliField<V>,
    ) -> Self
    where
        V: DeserializeOwned + Send + Sync + 'static,
    {
        let slot = accessor::<dyn CliSlot, _>(move |component| {
            component
                .as_any()
                .downcast_ref::<T>()
                .map(|target| project(target) as &dyn CliSlot)
        });
        self.descriptor.cli_bindings.push(CliBinding {
            field,
            source,
            default,
            slot,
        });
        self
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    struct Plain;
    impl Component for Plain {}
    impl Injectable for Plain {
        fn construct(_: &mut Dependencies) -> Result<Self, HookError> {
            Ok(Self)
        }
    }

    struct Renamed;
    impl Component for Renamed {}
    impl Injectable for Renamed {
        fn provides() -> Cow<'static, str> {
            Cow::Borrowed("Something")
        }
        fn construct(_: &mut Dependencies) -> Result<Self, HookError> {
            Ok(Self)
        }
    }

    struct Keyed {
        worker: Inject<Plain>,
        helper: Inject<Plain>,
        config: ConfigField<Value>,
        verbose: CliField<bool>,
    }
    impl Component for Keyed {}
    impl Injectable for Keyed {
        fn describe(d: DescriptorBuilder<Self>) -> DescriptorBuilder<Self> {
            d.consumes::<(Plain, Renamed, Logger)>()
                .inject_keyed("worker", |k| &k.worker, "<<worker>>")
                .inject_keyed("helper", |k| &k.helper, "fixed")
                .configuration_with_default("config", |k| &k.config, json!({}))
                .option("verbose", "verbose", |k| &k.verbose)
        }
        fn construct(_: &mut Dependencies) -> Result<Self, HookError> {
            Ok(Self {
                worker: Inject::new(),
                helper: Inject::new(),
                config: ConfigField::new(),
                verbose: CliField::new(),
            })
        }
    }

    #[test]
    fn short_names_strip_paths_and_generics() {
        assert_eq!(short_type_name::<Plain>(), "Plain");
        assert_eq!(short_type_name::<Vec<String>>(), "Vec");
        assert_eq!(short_type_name::<u8>(), "u8");
    }

    #[test]
    fn provides_defaults_to_short_name_and_can_be_renamed() {
        assert_eq!(descriptor_of::<Plain>().provides(), "Plain");
        assert_eq!(descriptor_of::<Renamed>().provides(), "Something");
    }

    #[test]
    fn tuples_expand_in_order() {
        let descriptor = descriptor_of::<Keyed>();
        assert_eq!(descriptor.consumes(), ["Plain", "Something", "Logger"]);
    }

    #[test]
    fn ephemeral_ids_expand_once_and_are_aliased() {
        let first = descriptor_of::<Keyed>();
        let second = descriptor_of::<Keyed>();

        let worker = &first.keyed_injections()[0];
        assert!(worker.id.starts_with("worker-"));
        assert_eq!(worker.id.len(), "worker-".len() + 6);
        assert_eq!(worker.id, second.keyed_injections()[0].id);
        assert_eq!(first.config_id_aliases().get("<<worker>>"), Some(&worker.id));

        let helper = &first.keyed_injections()[1];
        assert_eq!(helper.id, "fixed");
        assert_eq!(first.config_id_aliases().len(), 1);
    }

    #[test]
    fn accessors_reach_fields_of_the_right_type_only() {
        let descriptor = descriptor_of::<Keyed>();
        let keyed = Keyed::construct(&mut Dependencies::new("Keyed", Vec::new())).unwrap();

        let binding = descriptor.configuration_binding().unwrap();
        let erased: &dyn Component = &keyed;
        let slot = (binding.slot)(erased).unwrap();
        slot.assign(json!({ "a": 1 })).unwrap();
        assert_eq!(keyed.config.raw(), Some(json!({ "a": 1 })));

        let other: &dyn Component = &Plain;
        assert!((binding.slot)(other).is_none());
        assert_eq!(
            descriptor.cli_sources(),
            [("verbose", &CliSource::Option("verbose".into()))]
        );
    }

    #[test]
    fn unregistrable_descriptors_have_no_constructor() {
        let descriptor = ProviderDescriptor::unregistrable("Ghost");
        assert!(!descriptor.registrable());
        assert!(descriptor_of::<Plain>().registrable());
    }
}
