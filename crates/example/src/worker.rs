//! A component ticking at a configured interval.

use core::sync::atomic::{AtomicBool, Ordering};
use core::time::Duration;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::Deserialize;
use tna_di::prelude::*;
use tokio::task::JoinHandle;

/// Configuration of one [`Worker`].
#[derive(Debug, Clone, Deserialize)]
pub struct WorkerSettings {
    /// Time between ticks.
    pub interval_ms: u64,
    /// Printed with every tick.
    pub label: String,
}

/// Ticks until destroyed.
///
/// Ticks are logged at `info` level unless the worker is switched to
/// verbose, in which case they are logged at `log` level.
#[derive(Debug)]
pub struct Worker {
    logger: Logger,
    settings: ConfigField<WorkerSettings>,
    verbose: Arc<AtomicBool>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl Worker {
    /// Switches tick logging between `info` and `log` level.
    pub fn set_verbose(&self, verbose: bool) {
        self.verbose.store(verbose, Ordering::Relaxed);
    }

    /// Whether ticks are logged at `log` level.
    #[must_use]
    pub fn is_verbose(&self) -> bool {
        self.verbose.load(Ordering::Relaxed)
    }

    /// Whether the worker task is running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.task
            .lock()
            .as_ref()
            .is_some_and(|task| !task.is_finished())
    }
}

impl Component for Worker {
    fn as_on_init(&self) -> Option<&dyn OnInit> {
        Some(self)
    }

    fn as_on_destroy(&self) -> Option<&dyn OnDestroy> {
        Some(self)
    }
}

impl Injectable for Worker {
    fn describe(d: DescriptorBuilder<Self>) -> DescriptorBuilder<Self> {
        d.consumes::<Logger>()
            .configuration("settings", |w| &w.settings)
    }

    fn construct(deps: &mut Dependencies) -> Result<Self, HookError> {
        Ok(Self {
            logger: deps.take_logger()?,
            settings: ConfigField::new(),
            verbose: Arc::new(AtomicBool::new(false)),
            task: Mutex::new(None),
        })
    }
}

#[async_trait]
impl OnInit for Worker {
    async fn on_init(&self) -> HookResult {
        let settings = self.settings.get().ok_or("worker is not configured")?;
        if settings.interval_ms == 0 {
            return Err(format!("{}: interval_ms must be greater than zero", settings.label).into());
        }
        let logger = self.logger.clone();
        let verbose = Arc::clone(&self.verbose);

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(Duration::from_millis(settings.interval_ms));
            let mut count: u64 = 0;
            loop {
                ticker.tick().await;
                count += 1;
                let line = format!("{} tick #{count}", settings.label);
                if verbose.load(Ordering::Relaxed) {
                    logger.log(line);
                } else {
                    logger.info(line);
                }
            }
        });
        *self.task.lock() = Some(task);
        Ok(())
    }
}

#[async_trait]
impl OnDestroy for Worker {
    async fn on_destroy(&self) -> HookResult {
        let task = self.task.lock().take();
        if let Some(task) = task {
            task.abort();
            self.logger.warn("stopped");
        }
        Ok(())
    }
}
