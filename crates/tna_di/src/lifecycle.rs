//! The lifecycle sweeps: configure, init, ready and destroy.
//!
//! Every sweep visits instances one at a time and never holds the container
//! lock while a hook runs, so hooks may call back into the container.
//!
//! | Sweep | Order | Required state |
//! |-------|-------|----------------|
//! | [`configure_instances`](Container::configure_instances) | newest first | `Unset` |
//! | [`init_instances`](Container::init_instances) | oldest first | `Unset` or `Configured` |
//! | [`announce_ready`](Container::announce_ready) | oldest first | `Initialized` |
//! | [`destroy_instances`](Container::destroy_instances) | oldest first | anything but `Destroying`/`Destroyed` |
//!
//! Instances created while a forward sweep runs are visited by that sweep.

use std::sync::Arc;

use serde_json::Value;
use tna_getopt::GetOpt;

use crate::component::HookError;
use crate::configuration::merge_layers;
use crate::container::{Container, EntrySnapshot};
use crate::error::{DestroyError, DiError, LifecyclePhase, label};
use crate::metadata::{CliSource, ProviderDescriptor};
use crate::state::HookState;

fn hook_error(entry: &EntrySnapshot, phase: LifecyclePhase, source: HookError) -> DiError {
    DiError::Hook {
        provides: entry.provides.clone(),
        id: entry.id.clone(),
        phase,
        source,
    }
}

/// Follows a dotted path through the positional tree.
///
/// A missing segment yields `default`.
fn walk_argument(tree: &Value, path: &str, default: Option<&Value>) -> Option<Value> {
    let mut current = tree;
    for segment in path.split('.') {
        match current.get(segment) {
            Some(next) => current = next,
            None => return default.cloned(),
        }
    }
    Some(current.clone())
}

fn command_given(tree: &Value, path: &str) -> bool {
    let mut current = tree;
    for segment in path.split('.') {
        match current.get(segment) {
            Some(next) => current = next,
            None => return false,
        }
    }
    true
}

impl Container {
    /// Calls `on_instances_created` once on every instance not yet announced.
    ///
    /// Instances created by a hook during the announcement are announced too.
    pub fn announce_instance_creation(&self) -> Result<(), DiError> {
        let mut index = 0;
        while let Some(entry) = self.snapshot(index) {
            if self.mark_announced(index)
                && let Some(hook) = entry.instance.as_on_instances_created()
            {
                let configuration = self.find_configuration(&entry.provides, entry.id.as_deref());
                hook.on_instances_created(configuration.as_ref(), self)
                    .map_err(|source| hook_error(&entry, LifecyclePhase::Created, source))?;
            }
            index += 1;
        }
        Ok(())
    }

    /// Applies command line bindings, then configures every instance,
    /// newest first.
    ///
    /// Instances created during the sweep are left `Unset`; the init sweep
    /// configures them.
    pub async fn configure_instances(&self) -> Result<(), DiError> {
        let count = self.instance_count();
        self.inner
            .logger
            .info(format_args!("Configuring {count} instances"));

        self.apply_cli_bindings(count)?;

        for index in (0..count).rev() {
            self.apply_configuration(index).await?;
        }

        self.inner.logger.info("Done configuring");
        Ok(())
    }

    fn apply_cli_bindings(&self, count: usize) -> Result<(), DiError> {
        let getopt: Arc<GetOpt> = self.getopt().unwrap_or_default();

        for index in 0..count {
            let Some(entry) = self.snapshot(index) else {
                break;
            };
            if entry.state != HookState::Unset {
                continue;
            }
            let Some(descriptor) = entry.descriptor.as_deref() else {
                continue;
            };

            for binding in descriptor.cli_bindings() {
                let value = match &binding.source {
                    CliSource::Option(key) => getopt
                        .option(key)
                        .cloned()
                        .or_else(|| binding.default.clone()),
                    CliSource::Argument(path) => {
                        walk_argument(getopt.pos_tree(), path, binding.default.as_ref())
                    }
                    CliSource::CommandState(path) => {
                        Some(Value::Bool(command_given(getopt.pos_tree(), path)))
                    }
                };

                self.inner.logger.spam(format_args!(
                    "Setting '{}' on {} from {:?}",
                    binding.field,
                    label(&entry.provides, entry.id.as_deref()),
                    binding.source
                ));

                if let Some(slot) = (binding.slot)(&*entry.instance) {
                    slot.assign(value)
                        .map_err(|source| DiError::InvalidBinding {
                            provides: entry.provides.clone(),
                            field: binding.field,
                            source,
                        })?;
                }
            }
        }
        Ok(())
    }

    async fn apply_configuration(&self, index: usize) -> Result<(), DiError> {
        let entry = self.snapshot(index).ok_or(DiError::UnknownInstance)?;
        let name = label(&entry.provides, entry.id.as_deref());

        if entry.state != HookState::Unset {
            return Err(DiError::BootstrapPhase(format!(
                "trying to configure {name}, which has already been touched"
            )));
        }

        let matched = self.find_configuration(&entry.provides, entry.id.as_deref());
        let binding = entry
            .descriptor
            .as_deref()
            .and_then(ProviderDescriptor::configuration_binding);

        if let Some(binding) = binding
            && matched.is_none()
            && binding.default.is_none()
        {
            return Err(DiError::MissingConfiguration {
                provides: entry.provides.clone(),
                id: entry.id.clone(),
            });
        }

        self.transition(index, HookState::Configuring)?;

        if let Some(binding) = binding
            && let Some(slot) = (binding.slot)(&*entry.instance)
        {
            let merged = merge_layers([binding.default.clone(), slot.current(), matched]);
            slot.assign(merged)
                .map_err(|source| DiError::InvalidConfiguration {
                    provides: entry.provides.clone(),
                    source,
                })?;
        }

        if let Some(hook) = entry.instance.as_on_configure() {
            self.inner
                .logger
                .spam(format_args!("Starting to configure {name}"));
            hook.on_configure()
                .await
                .map_err(|source| hook_error(&entry, LifecyclePhase::Configure, source))?;
            self.inner.logger.spam(format_args!("{name} is configured"));
        }

        self.transition(index, HookState::Configured)?;

        if let Some(provider) = entry.instance.as_configuration_provider() {
            let mut configs = provider
                .provide_configurations()
                .await
                .map_err(|source| hook_error(&entry, LifecyclePhase::Configure, source))?;

            if let Some(descriptor) = entry.descriptor.as_deref() {
                let aliases = descriptor.config_id_aliases();
                for config in &mut configs {
                    if let Some(expanded) = config.id.as_ref().and_then(|id| aliases.get(id)) {
                        config.id = Some(expanded.clone());
                    }
                }
            }

            self.inner.logger.spam(format_args!(
                "{name} provided {} configurations",
                configs.len()
            ));
            self.append_configurations(configs);
        }

        Ok(())
    }

    /// Initializes every instance, oldest first.
    ///
    /// `Unset` instances are configured first.
    pub async fn init_instances(&self) -> Result<(), DiError> {
        self.inner.logger.info(format_args!(
            "Initializing {} instances",
            self.instance_count()
        ));

        let mut index = 0;
        while let Some(entry) = self.snapshot(index) {
            let name = label(&entry.provides, entry.id.as_deref());
            match entry.state {
                HookState::Configured => {}
                HookState::Unset => self.apply_configuration(index).await?,
                other => {
                    return Err(DiError::BootstrapPhase(format!(
                        "trying to init {name}, which is already {other}"
                    )));
                }
            }

            self.transition(index, HookState::Initializing)?;
            if let Some(hook) = entry.instance.as_on_init() {
                self.inner
                    .logger
                    .spam(format_args!("Starting to initialize {name}"));
                hook.on_init()
                    .await
                    .map_err(|source| hook_error(&entry, LifecyclePhase::Init, source))?;
                self.inner.logger.spam(format_args!("{name} is initialized"));
            }
            self.transition(index, HookState::Initialized)?;

            index += 1;
        }

        self.inner.logger.info("Initialization complete");
        Ok(())
    }

    /// Calls `on_ready` on every instance, oldest first.
    pub fn announce_ready(&self) -> Result<(), DiError> {
        self.inner.logger.info(format_args!(
            "Announcing ready state to {} instances",
            self.instance_count()
        ));

        let mut index = 0;
        while let Some(entry) = self.snapshot(index) {
            if entry.state != HookState::Initialized {
                return Err(DiError::BootstrapPhase(format!(
                    "trying to announce ready state to {}, which is not initialized yet",
                    label(&entry.provides, entry.id.as_deref())
                )));
            }

            if let Some(hook) = entry.instance.as_on_ready() {
                hook.on_ready()
                    .map_err(|source| hook_error(&entry, LifecyclePhase::Ready, source))?;
            }
            self.transition(index, HookState::Ready)?;

            index += 1;
        }
        Ok(())
    }

    /// Destroys every instance, oldest first, and returns the failed hooks.
    ///
    /// A failing `on_destroy` does not stop the sweep. Destroying an
    /// instance twice is a [`DiError::BootstrapPhase`].
    pub async fn destroy_instances(&self) -> Result<Vec<DestroyError>, DiError> {
        self.inner.logger.info(format_args!(
            "Destroying {} instances",
            self.instance_count()
        ));

        let mut errors = Vec::new();
        let mut index = 0;
        while let Some(entry) = self.snapshot(index) {
            let name = label(&entry.provides, entry.id.as_deref());
            if matches!(entry.state, HookState::Destroying | HookState::Destroyed) {
                return Err(DiError::BootstrapPhase(format!(
                    "trying to destroy {name}, which is already {}",
                    entry.state
                )));
            }

            self.transition(index, HookState::Destroying)?;
            if let Some(hook) = entry.instance.as_on_destroy() {
                self.inner
                    .logger
                    .spam(format_args!("Calling on_destroy on {name}"));
                if let Err(source) = hook.on_destroy().await {
                    self.inner
                        .logger
                        .error(format_args!("Failed to destroy {name}: {source}"));
                    errors.push(DestroyError {
                        provides: entry.provides.clone(),
                        id: entry.id.clone(),
                        source,
                    });
                }
            }
            self.transition(index, HookState::Destroyed)?;

            index += 1;
        }

        self.inner.logger.info("All instances destroyed");
        Ok(errors)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn argument_paths_fall_back_on_the_first_missing_segment() {
        let tree = json!({ "serve": { "port": "8080" } });
        assert_eq!(
            walk_argument(&tree, "serve.port", None),
            Some(json!("8080"))
        );
        assert_eq!(
            walk_argument(&tree, "serve.host", Some(&json!("localhost"))),
            Some(json!("localhost"))
        );
        assert_eq!(walk_argument(&tree, "build.target", None), None);
    }

    #[test]
    fn command_state_requires_the_full_path() {
        let tree = json!({ "remote": { "add": { "name": "origin" } } });
        assert!(command_given(&tree, "remote"));
        assert!(command_given(&tree, "remote.add"));
        assert!(!command_given(&tree, "remote.remove"));
        assert!(!command_given(&Value::Null, "remote"));
    }
}
