//! The container: templates, configurations and live instances.
//!
//! A [`Container`] is a cheap, cloneable handle. Instances are created on
//! demand by [`Container::gimme`], which resolves constructor dependencies
//! depth first and caches every instance by provider name and id. The
//! lifecycle sweeps live in [`crate::lifecycle`].
//!
//! # Example
//!
//! ```
//! use tna_di::component::{Component, HookError};
//! use tna_di::container::Container;
//! use tna_di::metadata::{Dependencies, Injectable};
//!
//! struct Clock;
//! impl Component for Clock {}
//! impl Injectable for Clock {
//!     fn construct(_: &mut Dependencies) -> Result<Self, HookError> {
//!         Ok(Clock)
//!     }
//! }
//!
//! let container = Container::new();
//! container.register::<Clock>("main").unwrap();
//!
//! let first = container.gimme_as::<Clock>("main", None).unwrap();
//! let second = container.gimme_as::<Clock>("main", None).unwrap();
//! assert!(std::sync::Arc::ptr_eq(&first, &second));
//! ```

use core::fmt;
use std::sync::{Arc, Weak};

use hashbrown::HashMap;
use parking_lot::Mutex;
use serde_json::Value;
use tna_getopt::{GetOpt, GetOptConfiguration};
use tna_logger::{LogLevels, Logger};
use tokio::task::JoinHandle;

use crate::component::Component;
use crate::configuration::{Configuration, ConfigurationStore};
use crate::error::{DiError, label};
use crate::metadata::{
    Dependencies, Dependency, GETOPT, Injectable, LOGGER, ProviderDescriptor, descriptor_of,
};
use crate::shutdown::{Shutdown, ShutdownOutcome, ShutdownReason, termination_signal};
use crate::state::HookState;
use crate::template::{Template, TemplateRegistry};

// ─────────────────────────────────────────────────────────────────────────────
// Instance bookkeeping
// ─────────────────────────────────────────────────────────────────────────────

/// A constructor dependency of a managed instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsumedDependency {
    /// Provider name.
    pub token: String,
    /// Instance id; constructor dependencies are always unkeyed.
    pub id: Option<String>,
}

/// A managed instance together with its identity and lifecycle state.
#[derive(Clone)]
pub struct InstancePackage {
    /// Provider name.
    pub provides: String,
    /// The instance.
    pub instance: Arc<dyn Component>,
    /// Instance id.
    pub id: Option<String>,
    /// Constructor dependencies, in order.
    pub consumes: Vec<ConsumedDependency>,
    /// Current lifecycle state.
    pub init_state: HookState,
}

impl fmt::Debug for InstancePackage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InstancePackage")
            .field("provides", &self.provides)
            .field("id", &self.id)
            .field("consumes", &self.consumes)
            .field("init_state", &self.init_state)
            .finish_non_exhaustive()
    }
}

pub(crate) struct InstanceEntry {
    pub(crate) package: InstancePackage,
    pub(crate) descriptor: Option<Arc<ProviderDescriptor>>,
    pub(crate) creation_announced: bool,
}

/// A consistent view of one instance, taken under the lock.
pub(crate) struct EntrySnapshot {
    pub(crate) provides: String,
    pub(crate) id: Option<String>,
    pub(crate) instance: Arc<dyn Component>,
    pub(crate) state: HookState,
    pub(crate) descriptor: Option<Arc<ProviderDescriptor>>,
}

#[derive(Default)]
pub(crate) struct ContainerState {
    pub(crate) instances: Vec<InstanceEntry>,
    pub(crate) templates: TemplateRegistry,
    pub(crate) configurations: ConfigurationStore,
    pub(crate) getopt: Option<Arc<GetOpt>>,
}

impl ContainerState {
    fn find_instance(&self, provides: &str, id: Option<&str>) -> Option<&InstanceEntry> {
        self.instances
            .iter()
            .find(|entry| entry.package.provides == provides && entry.package.id.as_deref() == id)
    }

    fn position_of(&self, instance: &dyn Component) -> Option<usize> {
        let address = core::ptr::from_ref(instance).cast::<()>();
        self.instances
            .iter()
            .position(|entry| Arc::as_ptr(&entry.package.instance).cast::<()>() == address)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Options
// ─────────────────────────────────────────────────────────────────────────────

/// Options for [`Container::with_options`].
#[derive(Debug, Clone, Default)]
pub struct ContainerOptions {
    /// Configurations known before anything is registered.
    pub configurations: Vec<Configuration>,
    /// Log level per class name.
    pub log_levels: LogLevels,
    /// A shutdown shared with the caller; a fresh one is created otherwise.
    pub shutdown: Option<Shutdown>,
}

impl ContainerOptions {
    /// Sets the initial configurations.
    #[must_use]
    pub fn with_configurations(mut self, configurations: Vec<Configuration>) -> Self {
        self.configurations = configurations;
        self
    }

    /// Sets the log levels.
    #[must_use]
    pub fn with_log_levels(mut self, log_levels: LogLevels) -> Self {
        self.log_levels = log_levels;
        self
    }

    /// Shares `shutdown` with the container.
    #[must_use]
    pub fn with_shutdown(mut self, shutdown: Shutdown) -> Self {
        self.shutdown = Some(shutdown);
        self
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Container
// ─────────────────────────────────────────────────────────────────────────────

pub(crate) struct ContainerInner {
    pub(crate) state: Mutex<ContainerState>,
    pub(crate) logger: Logger,
    pub(crate) log_levels: LogLevels,
    pub(crate) shutdown: Shutdown,
    listener: Mutex<Option<JoinHandle<()>>>,
}

impl Drop for ContainerInner {
    fn drop(&mut self) {
        if let Some(listener) = self.listener.get_mut().take() {
            listener.abort();
        }
    }
}

/// Holds templates, configurations and the instances created from them.
#[derive(Clone)]
pub struct Container {
    pub(crate) inner: Arc<ContainerInner>,
}

/// A non-owning [`Container`] handle.
#[derive(Clone)]
pub struct WeakContainer {
    inner: Weak<ContainerInner>,
}

impl WeakContainer {
    /// Returns the container if it is still alive.
    #[must_use]
    pub fn upgrade(&self) -> Option<Container> {
        self.inner.upgrade().map(|inner| Container { inner })
    }
}

impl fmt::Debug for WeakContainer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeakContainer")
            .field("alive", &(self.inner.strong_count() > 0))
            .finish()
    }
}

impl Default for Container {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("Container")
            .field("templates", &state.templates.names())
            .field("instances", &state.instances.len())
            .field("configurations", &state.configurations.len())
            .finish_non_exhaustive()
    }
}

impl Container {
    /// Creates an empty container.
    #[must_use]
    pub fn new() -> Self {
        Self::with_options(ContainerOptions::default())
    }

    /// Creates a container from `options`.
    #[must_use]
    pub fn with_options(options: ContainerOptions) -> Self {
        let logger = Logger::build()
            .class_name("Container")
            .level(options.log_levels.level_of("Container"))
            .create();

        Self {
            inner: Arc::new(ContainerInner {
                state: Mutex::new(ContainerState {
                    configurations: ConfigurationStore::new(options.configurations),
                    ..ContainerState::default()
                }),
                logger,
                log_levels: options.log_levels,
                shutdown: options.shutdown.unwrap_or_default(),
                listener: Mutex::new(None),
            }),
        }
    }

    /// Returns a handle that does not keep the container alive.
    #[must_use]
    pub fn downgrade(&self) -> WeakContainer {
        WeakContainer {
            inner: Arc::downgrade(&self.inner),
        }
    }

    /// The container's own logger.
    #[must_use]
    pub fn logger(&self) -> &Logger {
        &self.inner.logger
    }

    /// The log levels handed to per-caller loggers.
    #[must_use]
    pub fn log_levels(&self) -> &LogLevels {
        &self.inner.log_levels
    }

    /// Creates a logger for `class`, with the level configured for it.
    #[must_use]
    pub fn logger_for(&self, class: &str, id: Option<&str>) -> Logger {
        Logger::build()
            .class_name(class)
            .maybe_id(id.map(str::to_string))
            .level(self.inner.log_levels.level_of(class))
            .create()
    }

    // ─────────────────────────────────────────────────────────────────────
    // Registration
    // ─────────────────────────────────────────────────────────────────────

    /// Registers `T` and everything it declares.
    pub fn register<T: Injectable>(&self, registrar: &str) -> Result<(), DiError> {
        self.register_descriptor(descriptor_of::<T>(), registrar)
    }

    /// Registers `descriptor` and everything it declares.
    ///
    /// A provider name that is already registered is replaced. Instances
    /// created from the old template stay cached.
    pub fn register_descriptor(
        &self,
        descriptor: Arc<ProviderDescriptor>,
        registrar: &str,
    ) -> Result<(), DiError> {
        let mut state = self.inner.state.lock();
        let ContainerState {
            templates,
            configurations,
            ..
        } = &mut *state;
        templates.register(descriptor, registrar, configurations, &self.inner.logger)
    }

    /// Registers configurations, rejecting duplicates of known ones.
    pub fn register_configs(
        &self,
        configs: impl IntoIterator<Item = Configuration>,
    ) -> Result<(), DiError> {
        self.inner.state.lock().configurations.register(configs)
    }

    /// The first configuration addressed to `provides` and `id`.
    #[must_use]
    pub fn configuration_for(&self, provides: &str, id: Option<&str>) -> Option<Configuration> {
        self.inner
            .state
            .lock()
            .configurations
            .find(provides, id)
            .cloned()
    }

    /// Every registered provider name, in registration order.
    #[must_use]
    pub fn provider_names(&self) -> Vec<String> {
        self.inner.state.lock().templates.names()
    }

    /// The template registered under `provides`.
    #[must_use]
    pub fn template(&self, provides: &str) -> Option<Template> {
        self.inner.state.lock().templates.find(provides).cloned()
    }

    // ─────────────────────────────────────────────────────────────────────
    // Resolution
    // ─────────────────────────────────────────────────────────────────────

    /// Returns the instance of `provider` with `id`, creating it if needed.
    ///
    /// `caller` and `caller_id` identify who is asking; they name the logger
    /// handed out for [`LOGGER`], which is created fresh on every call.
    pub fn gimme(
        &self,
        provider: &str,
        caller: &str,
        id: Option<&str>,
        caller_id: Option<&str>,
    ) -> Result<Arc<dyn Component>, DiError> {
        let mut stack = Vec::new();
        self.resolve(provider, caller, id, caller_id, &mut stack)
    }

    /// Typed [`gimme`](Self::gimme).
    pub fn gimme_as<T: Dependency>(&self, caller: &str, id: Option<&str>) -> Result<Arc<T>, DiError> {
        let provider = T::provider_name();
        let instance = self.gimme(&provider, caller, id, None)?;
        instance
            .downcast_arc::<T>()
            .map_err(|_| DiError::DependencyType {
                provides: caller.to_string(),
                dependency: provider.into_owned(),
                expected: core::any::type_name::<T>(),
            })
    }

    fn resolve(
        &self,
        provider: &str,
        caller: &str,
        id: Option<&str>,
        caller_id: Option<&str>,
        stack: &mut Vec<(String, Option<String>)>,
    ) -> Result<Arc<dyn Component>, DiError> {
        let logger = &self.inner.logger;
        logger.spam(format_args!("{caller} requires {}", label(provider, id)));

        if provider == LOGGER {
            return Ok(Arc::new(self.logger_for(caller, caller_id)));
        }

        let template = {
            let state = self.inner.state.lock();
            if let Some(existing) = state.find_instance(provider, id) {
                logger.spam(format_args!("Already have instance of {}", label(provider, id)));
                return Ok(Arc::clone(&existing.package.instance));
            }
            match state.templates.find(provider) {
                Some(template) => template.clone(),
                None => {
                    let known = state.templates.names();
                    logger.warn(format_args!(
                        "{caller} requested {provider}, which is not declared"
                    ));
                    return Err(DiError::MissingDeclaration {
                        name: provider.to_string(),
                        known,
                    });
                }
            }
        };

        if stack
            .iter()
            .any(|(pending, pending_id)| pending == provider && pending_id.as_deref() == id)
        {
            let mut chain: Vec<String> = stack
                .iter()
                .map(|(pending, pending_id)| label(pending, pending_id.as_deref()))
                .collect();
            chain.push(label(provider, id));
            return Err(DiError::CyclicDependency { chain });
        }

        stack.push((provider.to_string(), id.map(str::to_string)));
        let created = self.create(&template, id, stack);
        stack.pop();
        created
    }

    fn create(
        &self,
        template: &Template,
        id: Option<&str>,
        stack: &mut Vec<(String, Option<String>)>,
    ) -> Result<Arc<dyn Component>, DiError> {
        let logger = &self.inner.logger;
        let provides = template.provides.as_str();

        let mut resolved = Vec::with_capacity(template.constructor_args.len());
        if !template.constructor_args.is_empty() {
            logger.spam(format_args!("Creating constructor arguments of {provides}"));
        }
        for dependency in &template.constructor_args {
            let instance = self.resolve(dependency, provides, None, id, stack)?;
            resolved.push((dependency.clone(), instance));
        }

        logger.info(format_args!("Creating new instance of {}", label(provides, id)));
        let constructor = template
            .descriptor
            .constructor()
            .ok_or_else(|| DiError::NotInjectable(provides.to_string()))?;
        let instance = constructor(&mut Dependencies::new(provides, resolved)).map_err(|source| {
            match source.downcast::<DiError>() {
                Ok(err) => *err,
                Err(source) => DiError::Construction {
                    provides: provides.to_string(),
                    source,
                },
            }
        })?;

        for injection in template.descriptor.keyed_injections() {
            let injected = self.resolve(&injection.provider, provides, Some(&injection.id), id, stack)?;
            let filled = (injection.slot)(&*instance).is_some_and(|slot| slot.fill(injected));
            if !filled {
                return Err(DiError::DependencyType {
                    provides: provides.to_string(),
                    dependency: label(&injection.provider, Some(&injection.id)),
                    expected: injection.type_name,
                });
            }
        }

        let mut state = self.inner.state.lock();
        // A hook may have created the same instance while we were constructing.
        if let Some(existing) = state.find_instance(provides, id) {
            return Ok(Arc::clone(&existing.package.instance));
        }
        state.instances.push(InstanceEntry {
            package: InstancePackage {
                provides: provides.to_string(),
                instance: Arc::clone(&instance),
                id: id.map(str::to_string),
                consumes: template
                    .constructor_args
                    .iter()
                    .map(|token| ConsumedDependency {
                        token: token.clone(),
                        id: None,
                    })
                    .collect(),
                init_state: HookState::Unset,
            },
            descriptor: Some(Arc::clone(&template.descriptor)),
            creation_announced: false,
        });
        drop(state);

        logger.spam(format_args!("Finished creating {}", label(provides, id)));
        Ok(instance)
    }

    // ─────────────────────────────────────────────────────────────────────
    // Introspection
    // ─────────────────────────────────────────────────────────────────────

    /// Returns the package of a managed instance.
    pub fn instance_package_containing(
        &self,
        instance: &dyn Component,
    ) -> Result<InstancePackage, DiError> {
        let state = self.inner.state.lock();
        state
            .position_of(instance)
            .map(|index| state.instances[index].package.clone())
            .ok_or(DiError::UnknownInstance)
    }

    /// Returns the lifecycle state of a managed instance.
    pub fn instance_state(&self, instance: &dyn Component) -> Result<HookState, DiError> {
        self.instance_package_containing(instance)
            .map(|package| package.init_state)
    }

    /// Returns the provider name and id of a managed instance.
    pub fn identity_of(&self, instance: &dyn Component) -> Result<(String, Option<String>), DiError> {
        self.instance_package_containing(instance)
            .map(|package| (package.provides, package.id))
    }

    /// The lifecycle state of the instance of `provides` with `id`, if created.
    #[must_use]
    pub fn state_of(&self, provides: &str, id: Option<&str>) -> Option<HookState> {
        self.inner
            .state
            .lock()
            .find_instance(provides, id)
            .map(|entry| entry.package.init_state)
    }

    /// Every managed instance, in creation order.
    #[must_use]
    pub fn instances(&self) -> Vec<InstancePackage> {
        self.inner
            .state
            .lock()
            .instances
            .iter()
            .map(|entry| entry.package.clone())
            .collect()
    }

    pub(crate) fn instance_count(&self) -> usize {
        self.inner.state.lock().instances.len()
    }

    pub(crate) fn snapshot(&self, index: usize) -> Option<EntrySnapshot> {
        let state = self.inner.state.lock();
        state.instances.get(index).map(|entry| EntrySnapshot {
            provides: entry.package.provides.clone(),
            id: entry.package.id.clone(),
            instance: Arc::clone(&entry.package.instance),
            state: entry.package.init_state,
            descriptor: entry.descriptor.clone(),
        })
    }

    /// Moves the instance at `index` to `next`, if the state machine allows it.
    pub(crate) fn transition(&self, index: usize, next: HookState) -> Result<(), DiError> {
        let mut state = self.inner.state.lock();
        let entry = state
            .instances
            .get_mut(index)
            .ok_or(DiError::UnknownInstance)?;
        let current = entry.package.init_state;
        if !current.can_transition_to(next) {
            return Err(DiError::BootstrapPhase(format!(
                "cannot move {} from {current} to {next}",
                label(&entry.package.provides, entry.package.id.as_deref())
            )));
        }
        entry.package.init_state = next;
        Ok(())
    }

    /// Marks the instance at `index` as announced; `false` if it already was.
    pub(crate) fn mark_announced(&self, index: usize) -> bool {
        let mut state = self.inner.state.lock();
        match state.instances.get_mut(index) {
            Some(entry) if !entry.creation_announced => {
                entry.creation_announced = true;
                true
            }
            _ => false,
        }
    }

    pub(crate) fn find_configuration(&self, provides: &str, id: Option<&str>) -> Option<Value> {
        self.inner
            .state
            .lock()
            .configurations
            .find(provides, id)
            .map(|config| config.config.clone())
    }

    pub(crate) fn append_configurations(&self, configs: Vec<Configuration>) {
        self.inner.state.lock().configurations.append(configs);
    }

    // ─────────────────────────────────────────────────────────────────────
    // Command line
    // ─────────────────────────────────────────────────────────────────────

    /// Parses `argv` against `schema` and installs the result.
    ///
    /// `env` replaces the process environment when given.
    pub fn create_getopt(
        &self,
        schema: &GetOptConfiguration,
        argv: Vec<String>,
        env: Option<&HashMap<String, String>>,
    ) -> Result<Arc<GetOpt>, DiError> {
        let getopt = match env {
            Some(env) => GetOpt::parse_with_env(schema, argv, env)?,
            None => GetOpt::parse(schema, argv)?,
        };
        Ok(self.install_getopt(getopt))
    }

    /// Installs a parsed command line as the [`GETOPT`] instance.
    pub fn install_getopt(&self, getopt: GetOpt) -> Arc<GetOpt> {
        let getopt = Arc::new(getopt);
        let mut state = self.inner.state.lock();
        state.getopt = Some(Arc::clone(&getopt));

        let erased: Arc<dyn Component> = Arc::clone(&getopt) as Arc<dyn Component>;
        match state
            .instances
            .iter_mut()
            .find(|entry| entry.package.provides == GETOPT && entry.package.id.is_none())
        {
            Some(entry) => entry.package.instance = erased,
            None => state.instances.push(InstanceEntry {
                package: InstancePackage {
                    provides: GETOPT.to_string(),
                    instance: erased,
                    id: None,
                    consumes: Vec::new(),
                    init_state: HookState::Unset,
                },
                descriptor: None,
                creation_announced: false,
            }),
        }
        getopt
    }

    /// The installed command line, if any.
    #[must_use]
    pub fn getopt(&self) -> Option<Arc<GetOpt>> {
        self.inner.state.lock().getopt.clone()
    }

    // ─────────────────────────────────────────────────────────────────────
    // Shutdown
    // ─────────────────────────────────────────────────────────────────────

    /// The container's shutdown trigger.
    #[must_use]
    pub fn shutdown(&self) -> &Shutdown {
        &self.inner.shutdown
    }

    /// Spawns a task triggering shutdown on the first termination signal,
    /// and makes any panic trigger a [`Fault`](ShutdownReason::Fault).
    ///
    /// Only the first call installs; later calls return `false`. Must be
    /// called from within a tokio runtime.
    pub fn install_shutdown(&self) -> bool {
        let mut listener = self.inner.listener.lock();
        if listener.is_some() {
            return false;
        }

        let shutdown = self.inner.shutdown.clone();
        shutdown.trigger_on_panic();
        *listener = Some(tokio::spawn(async move {
            let signal = termination_signal().await;
            shutdown.trigger(ShutdownReason::Signal(signal));
        }));
        true
    }

    /// Waits for shutdown, then destroys every instance.
    pub async fn wait_for_shutdown(&self) -> Result<ShutdownOutcome, DiError> {
        let reason = self.inner.shutdown.triggered().await;
        let errors = self.destroy_instances().await?;
        Ok(ShutdownOutcome { reason, errors })
    }
}

#[cfg(test)]
mod tests {
    use core::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::component::HookError;
    use crate::metadata::{DescriptorBuilder, Inject};

    static CONSTRUCTED: AtomicUsize = AtomicUsize::new(0);

    struct Store {
        logger: Logger,
    }
    impl Component for Store {}
    impl Injectable for Store {
        fn describe(d: DescriptorBuilder<Self>) -> DescriptorBuilder<Self> {
            d.consumes::<Logger>()
        }
        fn construct(deps: &mut Dependencies) -> Result<Self, HookError> {
            CONSTRUCTED.fetch_add(1, Ordering::SeqCst);
            Ok(Self {
                logger: deps.take_logger()?,
            })
        }
    }

    struct Ping;
    impl Component for Ping {}
    impl Injectable for Ping {
        fn describe(d: DescriptorBuilder<Self>) -> DescriptorBuilder<Self> {
            d.consumes::<Pong>().declare::<Pong>()
        }
        fn construct(_: &mut Dependencies) -> Result<Self, HookError> {
            Ok(Self)
        }
    }

    struct Pong;
    impl Component for Pong {}
    impl Injectable for Pong {
        fn describe(d: DescriptorBuilder<Self>) -> DescriptorBuilder<Self> {
            d.consumes::<Ping>()
        }
        fn construct(_: &mut Dependencies) -> Result<Self, HookError> {
            Ok(Self)
        }
    }

    struct Shard;
    impl Component for Shard {}
    impl Injectable for Shard {
        fn construct(_: &mut Dependencies) -> Result<Self, HookError> {
            Ok(Self)
        }
    }

    struct Cluster {
        left: Inject<Shard>,
        right: Inject<Shard>,
    }
    impl Component for Cluster {}
    impl Injectable for Cluster {
        fn describe(d: DescriptorBuilder<Self>) -> DescriptorBuilder<Self> {
            d.declare::<Shard>()
                .inject_keyed("left", |c| &c.left, "left")
                .inject_keyed("right", |c| &c.right, "right")
        }
        fn construct(_: &mut Dependencies) -> Result<Self, HookError> {
            Ok(Self {
                left: Inject::new(),
                right: Inject::new(),
            })
        }
    }

    #[test]
    fn instances_are_cached_and_loggers_are_fresh() {
        let container = Container::new();
        container.register::<Store>("test").unwrap();

        let before = CONSTRUCTED.load(Ordering::SeqCst);
        let first = container.gimme_as::<Store>("test", None).unwrap();
        let second = container.gimme_as::<Store>("test", None).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(CONSTRUCTED.load(Ordering::SeqCst), before + 1);
        assert_eq!(first.logger.class_name(), "Store");

        let a = container.gimme(LOGGER, "Somebody", None, None).unwrap();
        let b = container.gimme(LOGGER, "Somebody", None, None).unwrap();
        assert!(!Arc::ptr_eq(&a, &b));
        assert_eq!(container.instances().len(), 1);
    }

    #[test]
    fn unknown_provider_lists_known_names() {
        let container = Container::new();
        container.register::<Store>("test").unwrap();
        let err = container.gimme("Nonexistent", "test", None, None).err().unwrap();
        assert!(matches!(
            err,
            DiError::MissingDeclaration { ref name, ref known } if name == "Nonexistent" && known == &["Store"]
        ));
    }

    #[test]
    fn cycles_are_reported_with_the_chain() {
        let container = Container::new();
        container.register::<Ping>("test").unwrap();
        let err = container.gimme("Ping", "test", None, None).err().unwrap();
        let DiError::CyclicDependency { chain } = err else {
            panic!("expected a cycle, got {err}");
        };
        assert_eq!(chain, ["Ping", "Pong", "Ping"]);
        assert!(container.instances().is_empty());
    }

    #[test]
    fn keyed_injections_create_one_instance_per_id() {
        let container = Container::new();
        container.register::<Cluster>("test").unwrap();
        let cluster = container.gimme_as::<Cluster>("test", None).unwrap();

        let left = cluster.left.get().unwrap();
        let right = cluster.right.get().unwrap();
        assert!(!Arc::ptr_eq(&left, &right));

        let again = container.gimme_as::<Shard>("test", Some("left")).unwrap();
        assert!(Arc::ptr_eq(&left, &again));
        assert_eq!(
            container.identity_of(&*right).unwrap(),
            ("Shard".to_string(), Some("right".to_string()))
        );
    }

    #[test]
    fn foreign_instances_are_unknown() {
        let container = Container::new();
        assert!(matches!(
            container.instance_state(&Shard),
            Err(DiError::UnknownInstance)
        ));
    }

    #[test]
    fn weak_handles_do_not_keep_the_container_alive() {
        let container = Container::new();
        let weak = container.downgrade();
        assert!(weak.upgrade().is_some());
        drop(container);
        assert!(weak.upgrade().is_none());
    }

    #[test]
    fn getopt_is_installed_as_an_instance() {
        let container = Container::new();
        let env = HashMap::new();
        let getopt = container
            .create_getopt(&GetOptConfiguration::new(), Vec::new(), Some(&env))
            .unwrap();
        let resolved = container.gimme_as::<GetOpt>("test", None).unwrap();
        assert!(Arc::ptr_eq(&getopt, &resolved));
    }
}
