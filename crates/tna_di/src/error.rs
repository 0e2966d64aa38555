//! Error types for the container and its lifecycle.

use core::fmt;

use tna_getopt::GetOptError;

use crate::component::HookError;

/// Formats an instance identity as `Provides` or `Provides[id]`.
pub(crate) fn label(provides: &str, id: Option<&str>) -> String {
    match id {
        Some(id) => format!("{provides}[{id}]"),
        None => provides.to_string(),
    }
}

/// The lifecycle step a hook failed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecyclePhase {
    /// `on_instances_created`.
    Created,
    /// `on_configure` or `provide_configurations`.
    Configure,
    /// `on_init`.
    Init,
    /// `on_ready`.
    Ready,
    /// `on_destroy`.
    Destroy,
}

impl fmt::Display for LifecyclePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LifecyclePhase::Created => "created",
            LifecyclePhase::Configure => "configure",
            LifecyclePhase::Init => "init",
            LifecyclePhase::Ready => "ready",
            LifecyclePhase::Destroy => "destroy",
        })
    }
}

/// Errors raised by the container, the lifecycle sweeps and bootstrapping.
#[derive(Debug, thiserror::Error)]
pub enum DiError {
    /// No template is registered under the requested name.
    #[error("no declaration for {name} (known: {})", known.join(", "))]
    MissingDeclaration {
        /// The requested provider name.
        name: String,
        /// Every registered provider name.
        known: Vec<String>,
    },

    /// An instance requires configuration but none was registered for it.
    #[error("{} requires configuration, but none is present", label(provides, id.as_deref()))]
    MissingConfiguration {
        /// Provider name of the instance.
        provides: String,
        /// Instance id.
        id: Option<String>,
    },

    /// A lifecycle step was attempted out of order.
    #[error("bootstrap phase violation: {0}")]
    BootstrapPhase(String),

    /// A configuration for the same provider and id was registered twice.
    #[error("configuration for {} is already present", label(for_module, id.as_deref()))]
    UnspecificConfig {
        /// Provider name the configuration is for.
        for_module: String,
        /// Instance id the configuration is for.
        id: Option<String>,
    },

    /// The instance is not managed by this container.
    #[error("instance is not managed by this container")]
    UnknownInstance,

    /// The descriptor is not registrable.
    #[error("'{0}' is not injectable")]
    NotInjectable(String),

    /// Resolving the dependencies of an instance leads back to itself.
    #[error("cyclic dependency: {}", chain.join(" -> "))]
    CyclicDependency {
        /// The resolution chain, starting and ending with the repeated instance.
        chain: Vec<String>,
    },

    /// A constructor returned an error.
    #[error("failed to construct {provides}: {source}")]
    Construction {
        /// Provider name of the failed instance.
        provides: String,
        /// The constructor's error.
        source: HookError,
    },

    /// A resolved dependency is not of the type the constructor asked for.
    #[error("{provides} expected {dependency} to be a {expected}")]
    DependencyType {
        /// Provider name of the instance being constructed.
        provides: String,
        /// Provider name of the dependency.
        dependency: String,
        /// The requested Rust type.
        expected: &'static str,
    },

    /// A constructor asked for more dependencies than it consumes.
    #[error("{provides} asked for a {expected}, but all declared dependencies are taken")]
    MissingDependency {
        /// Provider name of the instance being constructed.
        provides: String,
        /// The requested Rust type.
        expected: &'static str,
    },

    /// The merged configuration does not fit the configuration field.
    #[error("invalid configuration for {provides}: {source}")]
    InvalidConfiguration {
        /// Provider name of the instance.
        provides: String,
        /// The deserialization error.
        source: serde_json::Error,
    },

    /// A command line value does not fit the bound field.
    #[error("invalid command line value for {provides}.{field}: {source}")]
    InvalidBinding {
        /// Provider name of the instance.
        provides: String,
        /// Name of the bound field.
        field: &'static str,
        /// The deserialization error.
        source: serde_json::Error,
    },

    /// A lifecycle hook returned an error.
    #[error("{phase} hook of {} failed: {source}", label(provides, id.as_deref()))]
    Hook {
        /// Provider name of the instance.
        provides: String,
        /// Instance id.
        id: Option<String>,
        /// The lifecycle step.
        phase: LifecyclePhase,
        /// The hook's error.
        source: HookError,
    },

    /// The command line could not be parsed.
    #[error(transparent)]
    GetOpt(#[from] GetOptError),

    /// `--help` was given; bootstrapping stopped before any instance was created.
    #[error("help requested")]
    HelpRequested {
        /// The rendered usage text.
        usage: String,
    },
}

/// A failed `on_destroy` hook, collected by the destroy sweep.
#[derive(Debug, thiserror::Error)]
#[error("failed to destroy {}: {source}", label(provides, id.as_deref()))]
pub struct DestroyError {
    /// Provider name of the instance.
    pub provides: String,
    /// Instance id.
    pub id: Option<String>,
    /// The hook's error.
    pub source: HookError,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_declaration_names_provider() {
        let err = DiError::MissingDeclaration {
            name: "Nonexistent".into(),
            known: vec!["App".into(), "Worker".into()],
        };
        let text = err.to_string();
        assert!(text.contains("Nonexistent"));
        assert!(text.contains("App, Worker"));
    }

    #[test]
    fn labels_include_ids() {
        assert_eq!(label("Worker", Some("foo")), "Worker[foo]");
        assert_eq!(label("Worker", None), "Worker");

        let err = DiError::MissingConfiguration {
            provides: "Worker".into(),
            id: Some("bar".into()),
        };
        assert!(err.to_string().starts_with("Worker[bar] requires configuration"));
    }

    #[test]
    fn cycle_chain_is_joined() {
        let err = DiError::CyclicDependency {
            chain: vec!["A".into(), "B".into(), "A".into()],
        };
        assert_eq!(err.to_string(), "cyclic dependency: A -> B -> A");
    }
}
