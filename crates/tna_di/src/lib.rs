//! Dependency-injection container with a strict component lifecycle.
//!
//! Components declare what they provide and consume through
//! [`Injectable`](metadata::Injectable). The [`Container`] creates them on
//! demand, resolving constructor dependencies depth first, and drives every
//! instance through the same lifecycle:
//!
//! `configure → init → ready → destroy`
//!
//! Hooks for each step are optional capabilities, see [`component`].
//! [`bootstrap`](bootstrap::bootstrap) wires a root component, its command
//! line and the process signals together; [`StepTester`](step_tester::StepTester)
//! drives a single component step by step in tests.
//!
//! # Example
//!
//! ```
//! use async_trait::async_trait;
//! use serde::Deserialize;
//! use serde_json::json;
//! use tna_di::prelude::*;
//!
//! #[derive(Deserialize)]
//! struct Settings {
//!     greeting: String,
//! }
//!
//! struct Greeter {
//!     logger: Logger,
//!     settings: ConfigField<Settings>,
//! }
//!
//! impl Component for Greeter {
//!     fn as_on_init(&self) -> Option<&dyn OnInit> {
//!         Some(self)
//!     }
//! }
//!
//! #[async_trait]
//! impl OnInit for Greeter {
//!     async fn on_init(&self) -> HookResult {
//!         let settings = self.settings.get().ok_or("not configured")?;
//!         self.logger.info(&settings.greeting);
//!         Ok(())
//!     }
//! }
//!
//! impl Injectable for Greeter {
//!     fn describe(d: DescriptorBuilder<Self>) -> DescriptorBuilder<Self> {
//!         d.consumes::<Logger>()
//!             .configuration("settings", |g| &g.settings)
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
//! # tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(async {
//! let mut tester = StepTester::<Greeter>::new(
//!     StepTesterOptions::new().with_config(config::<Greeter>(json!({ "greeting": "hello" }))),
//! )?;
//! tester.get_ready().await?;
//! # Ok::<(), DiError>(())
//! # }).unwrap();
//! ```

pub mod bootstrap;
pub mod component;
pub mod configuration;
pub mod container;
mod error;
pub mod eventbus;
pub mod lifecycle;
pub mod metadata;
pub mod shutdown;
pub mod state;
pub mod step_tester;
pub mod template;

pub use bootstrap::{BootstrapOptions, bootstrap, bootstrap_descriptor, run, run_descriptor};
pub use container::{Container, ContainerOptions, InstancePackage, WeakContainer};
pub use error::{DestroyError, DiError, LifecyclePhase};
pub use state::HookState;

/// Re-export all common types for easy access.
pub mod prelude {
    pub use crate::bootstrap::{BootstrapOptions, bootstrap, run};
    pub use crate::component::{
        Component, HookError, HookResult, OnConfigure, OnDestroy, OnInit, OnInstancesCreated,
        OnReady, ProvideConfigurations,
    };
    pub use crate::configuration::{Configuration, config, config_for};
    pub use crate::container::{Container, ContainerOptions, WeakContainer};
    pub use crate::error::{DestroyError, DiError};
    pub use crate::eventbus::{BusEvent, Eventbus, Subscription};
    pub use crate::metadata::{
        CliField, ConfigField, Dependencies, DescriptorBuilder, Inject, Injectable,
    };
    pub use crate::shutdown::{Shutdown, ShutdownReason};
    pub use crate::state::HookState;
    pub use crate::step_tester::{RunPhase, StepTester, StepTesterOptions};

    pub use tna_getopt::{GetOpt, GetOptConfiguration, GetOptOption, PositionalArgument};
    pub use tna_logger::{LogLevels, Logger, Loglevel};
}
