//! Drives one component through its lifecycle, a step at a time.
//!
//! Meant for tests: each step runs at most once, however often it is
//! called.
//!
//! # Example
//!
//! ```ignore
//! let mut tester = StepTester::<Cache>::builder()
//!     .options(StepTesterOptions::new().with_config(config::<Cache>(json!({ "size": 2 }))))
//!     .run_until(RunPhase::Init)
//!     .build()
//!     .await?;
//!
//! let cache = tester.ready()?;
//! ```

use std::marker::PhantomData;
use std::sync::Arc;

use hashbrown::HashSet;
use serde_json::{Map, Value};
use tna_getopt::GetOpt;
use tna_logger::LogLevels;

use crate::component::{Component, HookError};
use crate::configuration::Configuration;
use crate::container::{Container, ContainerOptions};
use crate::error::{DestroyError, DiError};
use crate::metadata::{Dependencies, Injectable, ProviderDescriptor, descriptor_of};

const CALLER: &str = "StepTester";

/// How far [`StepTesterBuilder::build`] drives the lifecycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RunPhase {
    /// Only resolve the target.
    #[default]
    NotAtAll,
    /// Up to and including configure.
    Configure,
    /// Up to and including init.
    Init,
    /// Up to and including ready.
    Ready,
    /// Through destroy.
    Destroy,
}

/// What the tester's container starts with.
#[derive(Debug, Clone, Default)]
pub struct StepTesterOptions {
    /// Initial configurations.
    pub configurations: Vec<Configuration>,
    /// Descriptors registered next to the target.
    pub declarations: Vec<Arc<ProviderDescriptor>>,
    /// Parsed option values, by long name.
    pub options: Map<String, Value>,
    /// Log level per class name.
    pub log_levels: LogLevels,
}

impl StepTesterOptions {
    /// Creates empty options.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an initial configuration.
    #[must_use]
    pub fn with_config(mut self, config: Configuration) -> Self {
        self.configurations.push(config);
        self
    }

    /// Registers `D` next to the target.
    #[must_use]
    pub fn declare<D: Injectable>(mut self) -> Self {
        self.declarations.push(descriptor_of::<D>());
        self
    }

    /// Sets a parsed option value.
    #[must_use]
    pub fn with_option(mut self, long: impl Into<String>, value: impl Into<Value>) -> Self {
        self.options.insert(long.into(), value.into());
        self
    }

    /// Sets the log levels.
    #[must_use]
    pub fn with_log_levels(mut self, log_levels: impl Into<LogLevels>) -> Self {
        self.log_levels = log_levels.into();
        self
    }
}

/// A container holding one resolved `T`, with idempotent lifecycle steps.
pub struct StepTester<T> {
    container: Container,
    instance: Arc<T>,
    done: HashSet<RunPhase>,
    destroy_errors: Vec<DestroyError>,
}

impl<T: Injectable> StepTester<T> {
    /// Returns a builder targeting `T`.
    #[must_use]
    pub fn builder() -> StepTesterBuilder<T> {
        StepTesterBuilder {
            run_until: RunPhase::NotAtAll,
            options: StepTesterOptions::default(),
            _target: PhantomData,
        }
    }

    /// Registers `T` and the declarations in `options`, then resolves `T`.
    pub fn new(options: StepTesterOptions) -> Result<Self, DiError> {
        let container = Container::with_options(ContainerOptions {
            configurations: options.configurations,
            log_levels: options.log_levels,
            shutdown: None,
        });
        container.install_getopt(GetOpt::from_options(options.options));

        container.register::<T>(CALLER)?;
        for declaration in options.declarations {
            container.register_descriptor(declaration, CALLER)?;
        }

        let instance = container.gimme_as::<T>(CALLER, None)?;

        Ok(Self {
            container,
            instance,
            done: HashSet::new(),
            destroy_errors: Vec::new(),
        })
    }
}

impl<T> StepTester<T> {
    /// The resolved target.
    #[must_use]
    pub fn instance(&self) -> &Arc<T> {
        &self.instance
    }

    /// The container behind the tester.
    #[must_use]
    pub fn container(&self) -> &Container {
        &self.container
    }

    /// Runs the configure sweep, once.
    pub async fn configure(&mut self) -> Result<Arc<T>, DiError> {
        if self.done.insert(RunPhase::Configure) {
            self.container.configure_instances().await?;
        }
        Ok(Arc::clone(&self.instance))
    }

    /// Runs the init sweep, once.
    pub async fn init(&mut self) -> Result<Arc<T>, DiError> {
        if self.done.insert(RunPhase::Init) {
            self.container.init_instances().await?;
        }
        Ok(Arc::clone(&self.instance))
    }

    /// Announces ready state, once.
    pub fn ready(&mut self) -> Result<Arc<T>, DiError> {
        if self.done.insert(RunPhase::Ready) {
            self.container.announce_ready()?;
        }
        Ok(Arc::clone(&self.instance))
    }

    /// Runs the destroy sweep, once, and returns its failed hooks.
    pub async fn destroy(&mut self) -> Result<&[DestroyError], DiError> {
        if self.done.insert(RunPhase::Destroy) {
            self.destroy_errors = self.container.destroy_instances().await?;
        }
        Ok(&self.destroy_errors)
    }

    /// Configures, initializes and announces ready state.
    pub async fn get_ready(&mut self) -> Result<Arc<T>, DiError> {
        self.configure().await?;
        self.init().await?;
        self.ready()
    }
}

/// Builds a [`StepTester`].
pub struct StepTesterBuilder<T> {
    run_until: RunPhase,
    options: StepTesterOptions,
    _target: PhantomData<fn() -> T>,
}

impl Default for StepTesterBuilder<DefaultTarget> {
    fn default() -> Self {
        StepTester::<DefaultTarget>::builder()
    }
}

impl<T: Injectable> StepTesterBuilder<T> {
    /// Targets `U` instead.
    #[must_use]
    pub fn target<U: Injectable>(self) -> StepTesterBuilder<U> {
        StepTesterBuilder {
            run_until: self.run_until,
            options: self.options,
            _target: PhantomData,
        }
    }

    /// Drives the lifecycle up to `phase` when building.
    #[must_use]
    pub fn run_until(mut self, phase: RunPhase) -> Self {
        self.run_until = phase;
        self
    }

    /// Sets the container options.
    #[must_use]
    pub fn options(mut self, options: StepTesterOptions) -> Self {
        self.options = options;
        self
    }

    /// Creates the tester and runs the requested steps.
    pub async fn build(self) -> Result<StepTester<T>, DiError> {
        let mut tester = StepTester::<T>::new(self.options)?;

        if self.run_until >= RunPhase::Configure {
            tester.configure().await?;
        }
        if self.run_until >= RunPhase::Init {
            tester.init().await?;
        }
        if self.run_until >= RunPhase::Ready {
            tester.ready()?;
        }
        if self.run_until >= RunPhase::Destroy {
            tester.destroy().await?;
        }

        Ok(tester)
    }
}

/// An empty component, targeted when the builder is not given one.
#[derive(Debug, Default)]
pub struct DefaultTarget;

impl Component for DefaultTarget {}

impl Injectable for DefaultTarget {
    fn construct(_: &mut Dependencies) -> Result<Self, HookError> {
        Ok(Self)
    }
}
