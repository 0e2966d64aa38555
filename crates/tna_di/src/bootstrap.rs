//! Bootstrapping: from a root component type to a running application.
//!
//! # Example
//!
//! ```ignore
//! use tna_di::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> std::process::ExitCode {
//!     run::<App>(BootstrapOptions::default()).await
//! }
//! ```

use std::io::Write as _;
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

use hashbrown::HashMap;
use tna_logger::{LogLevels, Logger, TracingSetup};

use crate::container::{Container, ContainerOptions};
use crate::error::DiError;
use crate::metadata::{Injectable, ProviderDescriptor, descriptor_of};
use crate::shutdown::Shutdown;

/// Name the facade registers and resolves the root as.
const REGISTRAR: &str = "bootstrap";

/// Options for [`bootstrap`] and [`run`].
#[derive(Debug, Clone)]
pub struct BootstrapOptions {
    /// Log level per class name.
    pub log_levels: LogLevels,
    /// A container to reuse instead of creating one.
    pub container: Option<Container>,
    /// Arguments without the program name; the process arguments otherwise.
    pub argv: Option<Vec<String>>,
    /// Environment used for option aliases; the process environment otherwise.
    pub env: Option<HashMap<String, String>>,
    /// Installs a tracing subscriber before anything else happens.
    pub tracing: Option<TracingSetup>,
    /// A shutdown shared with the caller, used by a freshly created container.
    pub shutdown: Option<Shutdown>,
    /// Program name shown in the usage text.
    pub program: Option<String>,
    /// Whether termination signals trigger shutdown.
    pub install_signal_handlers: bool,
}

impl Default for BootstrapOptions {
    fn default() -> Self {
        Self {
            log_levels: LogLevels::default(),
            container: None,
            argv: None,
            env: None,
            tracing: None,
            shutdown: None,
            program: None,
            install_signal_handlers: true,
        }
    }
}

impl BootstrapOptions {
    /// Creates the default options.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the log levels.
    #[must_use]
    pub fn with_log_levels(mut self, log_levels: impl Into<LogLevels>) -> Self {
        self.log_levels = log_levels.into();
        self
    }

    /// Bootstraps into `container` instead of a fresh one.
    #[must_use]
    pub fn with_container(mut self, container: Container) -> Self {
        self.container = Some(container);
        self
    }

    /// Parses `argv` instead of the process arguments.
    #[must_use]
    pub fn with_argv<I, S>(mut self, argv: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.argv = Some(argv.into_iter().map(Into::into).collect());
        self
    }

    /// Reads option aliases from `env` instead of the process environment.
    #[must_use]
    pub fn with_env(mut self, env: HashMap<String, String>) -> Self {
        self.env = Some(env);
        self
    }

    /// Installs `setup` as the tracing subscriber.
    #[must_use]
    pub fn with_tracing(mut self, setup: TracingSetup) -> Self {
        self.tracing = Some(setup);
        self
    }

    /// Shares `shutdown` with the container.
    #[must_use]
    pub fn with_shutdown(mut self, shutdown: Shutdown) -> Self {
        self.shutdown = Some(shutdown);
        self
    }

    /// Sets the program name shown in the usage text.
    #[must_use]
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = Some(program.into());
        self
    }

    /// Leaves termination signals alone.
    #[must_use]
    pub fn without_signal_handlers(mut self) -> Self {
        self.install_signal_handlers = false;
        self
    }
}

fn program_name(provides: &str) -> String {
    std::env::args()
        .next()
        .and_then(|path| {
            Path::new(&path)
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
        })
        .unwrap_or_else(|| provides.to_lowercase())
}

/// Bootstraps `T` as the application root.
///
/// See [`bootstrap_descriptor`].
pub async fn bootstrap<T: Injectable>(options: BootstrapOptions) -> Result<Container, DiError> {
    bootstrap_descriptor(descriptor_of::<T>(), options).await
}

/// Bootstraps `root` as the application root.
///
/// This function:
/// 1. Installs the tracing subscriber, if one is given
/// 2. Parses the command line against the root's schema and installs the
///    result as the `GetOpt` instance
/// 3. Stops with [`DiError::HelpRequested`] on `--help`, unless the root
///    turned the help trap off
/// 4. Starts listening for termination signals
/// 5. Registers and resolves the root, then announces instance creation
/// 6. Runs the configure, init and ready sweeps
///
/// Errors are logged and returned; nothing is torn down.
pub async fn bootstrap_descriptor(
    root: Arc<ProviderDescriptor>,
    options: BootstrapOptions,
) -> Result<Container, DiError> {
    if let Some(setup) = &options.tracing {
        setup.install();
    }

    let logger = Logger::build()
        .class_name(REGISTRAR)
        .level(options.log_levels.level_of(REGISTRAR))
        .create();
    let provides = root.provides().to_string();
    logger.info(format_args!("Target: {provides}"));

    let result = start(&logger, root, options).await;
    match &result {
        Ok(_) => logger.info(format_args!("Done bootstrapping {provides}.")),
        Err(DiError::HelpRequested { .. }) => logger.spam("Help requested"),
        Err(err) => logger.error(err),
    };
    result
}

async fn start(
    logger: &Logger,
    root: Arc<ProviderDescriptor>,
    options: BootstrapOptions,
) -> Result<Container, DiError> {
    let provides = root.provides().to_string();

    let container = match options.container {
        Some(container) => {
            logger.info("Reusing container.");
            container
        }
        None => Container::with_options(ContainerOptions {
            configurations: Vec::new(),
            log_levels: options.log_levels,
            shutdown: options.shutdown,
        }),
    };

    let schema = root.cli().cloned().unwrap_or_default();
    let argv = options
        .argv
        .unwrap_or_else(|| std::env::args().skip(1).collect());
    let getopt = container.create_getopt(&schema, argv, options.env.as_ref())?;

    if root.help_trap() && getopt.help_requested() {
        let program = options.program.unwrap_or_else(|| program_name(&provides));
        return Err(DiError::HelpRequested {
            usage: getopt.usage(&program),
        });
    }

    if options.install_signal_handlers {
        container.install_shutdown();
    }

    container.register_descriptor(root, REGISTRAR)?;
    container.gimme(&provides, REGISTRAR, None, None)?;
    container.announce_instance_creation()?;

    container.configure_instances().await?;
    container.init_instances().await?;
    container.announce_ready()?;

    Ok(container)
}

/// Bootstraps `T`, waits for shutdown and tears everything down.
///
/// See [`run_descriptor`].
pub async fn run<T: Injectable>(options: BootstrapOptions) -> ExitCode {
    run_descriptor(descriptor_of::<T>(), options).await
}

/// Bootstraps `root`, waits for shutdown and tears everything down.
///
/// Returns `SUCCESS` after a clean shutdown or when usage was printed for
/// `--help`; `FAILURE` when bootstrapping failed, a fault triggered the
/// shutdown or a destroy hook failed.
pub async fn run_descriptor(root: Arc<ProviderDescriptor>, options: BootstrapOptions) -> ExitCode {
    let container = match bootstrap_descriptor(root, options).await {
        Ok(container) => container,
        Err(DiError::HelpRequested { usage }) => {
            let mut stdout = std::io::stdout().lock();
            return match writeln!(stdout, "{usage}") {
                Ok(()) => ExitCode::SUCCESS,
                Err(_) => ExitCode::FAILURE,
            };
        }
        Err(_) => return ExitCode::FAILURE,
    };

    let logger = container.logger_for(REGISTRAR, None);
    match container.wait_for_shutdown().await {
        Ok(outcome) => {
            if outcome.errors.is_empty() {
                logger.info("Exiting gracefully");
            } else {
                logger.info(format_args!(
                    "Exiting with {} destroy errors",
                    outcome.errors.len()
                ));
            }
            outcome.exit_code()
        }
        Err(err) => {
            logger.error(err);
            ExitCode::FAILURE
        }
    }
}
