//! The [`Component`] trait and the lifecycle hook capabilities.
//!
//! Everything the container manages is a [`Component`]. Hooks are optional:
//! a component opts into a lifecycle step by implementing the matching hook
//! trait and returning itself from the corresponding accessor.
//!
//! # Example
//!
//! ```
//! use async_trait::async_trait;
//! use tna_di::component::{Component, HookResult, OnInit, OnReady};
//!
//! struct Cache;
//!
//! impl Component for Cache {
//!     fn as_on_init(&self) -> Option<&dyn OnInit> {
//!         Some(self)
//!     }
//!
//!     fn as_on_ready(&self) -> Option<&dyn OnReady> {
//!         Some(self)
//!     }
//! }
//!
//! #[async_trait]
//! impl OnInit for Cache {
//!     async fn on_init(&self) -> HookResult {
//!         Ok(())
//!     }
//! }
//!
//! impl OnReady for Cache {
//!     fn on_ready(&self) -> HookResult {
//!         Ok(())
//!     }
//! }
//! ```

use async_trait::async_trait;
use downcast_rs::{DowncastSync, impl_downcast};
use serde_json::Value;
use tna_getopt::GetOpt;
use tna_logger::Logger;

use crate::configuration::Configuration;
use crate::container::Container;

/// Error type returned by constructors and hooks.
pub type HookError = Box<dyn core::error::Error + Send + Sync>;

/// Result type returned by hooks.
pub type HookResult = Result<(), HookError>;

// ─────────────────────────────────────────────────────────────────────────────
// Component
// ─────────────────────────────────────────────────────────────────────────────

/// A value managed by the container.
///
/// Instances are shared as `Arc<dyn Component>`, so hooks take `&self`.
/// Fields that the container assigns after construction use the interior
/// mutable field types in [`crate::metadata`].
pub trait Component: DowncastSync {
    /// Returns the configure hook, if implemented.
    fn as_on_configure(&self) -> Option<&dyn OnConfigure> {
        None
    }

    /// Returns the init hook, if implemented.
    fn as_on_init(&self) -> Option<&dyn OnInit> {
        None
    }

    /// Returns the ready hook, if implemented.
    fn as_on_ready(&self) -> Option<&dyn OnReady> {
        None
    }

    /// Returns the destroy hook, if implemented.
    fn as_on_destroy(&self) -> Option<&dyn OnDestroy> {
        None
    }

    /// Returns the configuration provider, if implemented.
    fn as_configuration_provider(&self) -> Option<&dyn ProvideConfigurations> {
        None
    }

    /// Returns the instances-created hook, if implemented.
    fn as_on_instances_created(&self) -> Option<&dyn OnInstancesCreated> {
        None
    }
}

impl_downcast!(sync Component);

// ─────────────────────────────────────────────────────────────────────────────
// Hooks
// ─────────────────────────────────────────────────────────────────────────────

/// Runs after the configuration field has been assigned.
#[async_trait]
pub trait OnConfigure: Send + Sync {
    /// Called once, during the configure sweep.
    async fn on_configure(&self) -> HookResult;
}

/// Runs after every instance has been configured.
#[async_trait]
pub trait OnInit: Send + Sync {
    /// Called once, during the init sweep.
    async fn on_init(&self) -> HookResult;
}

/// Runs after every instance has been initialized.
pub trait OnReady: Send + Sync {
    /// Called once, synchronously, during the ready announcement.
    fn on_ready(&self) -> HookResult;
}

/// Runs when the application shuts down.
///
/// Failures are collected; the destroy sweep always visits every instance.
#[async_trait]
pub trait OnDestroy: Send + Sync {
    /// Called once, during the destroy sweep.
    async fn on_destroy(&self) -> HookResult;
}

/// Contributes configurations for instances configured later in the sweep.
///
/// Ids of the returned configurations that match a declared keyed-injection
/// id (such as `<<worker>>`) are rewritten to the expanded id.
#[async_trait]
pub trait ProvideConfigurations: Send + Sync {
    /// Called once, right after this instance is configured.
    async fn provide_configurations(&self) -> Result<Vec<Configuration>, HookError>;
}

/// Receives the container once the instance has been created.
///
/// This is where components that create children on demand get hold of
/// the container. Keep a [`WeakContainer`](crate::container::WeakContainer)
/// rather than a [`Container`] to avoid a reference cycle.
pub trait OnInstancesCreated: Send + Sync {
    /// Called once per instance with its registered configuration, if any.
    fn on_instances_created(
        &self,
        configuration: Option<&Value>,
        container: &Container,
    ) -> HookResult;
}

// Collaborators the container hands out by reserved name.
impl Component for Logger {}
impl Component for GetOpt {}
