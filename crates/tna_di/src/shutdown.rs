//! Process shutdown: a one-shot trigger, signal handling and the outcome.
//!
//! A [`Shutdown`] is shared by the container and whatever waits on it. The
//! first [`Shutdown::trigger`] wins; later calls are logged and ignored.
//!
//! # Example
//!
//! ```
//! use tna_di::shutdown::{Shutdown, ShutdownReason};
//!
//! let shutdown = Shutdown::new();
//! assert!(shutdown.trigger(ShutdownReason::Requested));
//! assert!(!shutdown.trigger(ShutdownReason::Fault));
//! assert_eq!(shutdown.reason(), Some(ShutdownReason::Requested));
//! ```

use core::fmt;
use std::process::ExitCode;
use std::sync::{Arc, Weak};
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::watch;

use crate::error::DestroyError;

/// Why the application is shutting down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShutdownReason {
    /// A process signal, by name.
    Signal(&'static str),
    /// Shutdown was requested programmatically.
    Requested,
    /// An unrecoverable error occurred.
    Fault,
}

impl fmt::Display for ShutdownReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShutdownReason::Signal(name) => write!(f, "signal {name}"),
            ShutdownReason::Requested => f.write_str("requested"),
            ShutdownReason::Fault => f.write_str("fault"),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Shutdown
// ─────────────────────────────────────────────────────────────────────────────

struct ShutdownInner {
    triggered: AtomicBool,
    reason: watch::Sender<Option<ShutdownReason>>,
}

/// A cloneable, one-shot shutdown trigger.
#[derive(Clone)]
pub struct Shutdown {
    inner: Arc<ShutdownInner>,
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Shutdown {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Shutdown")
            .field("reason", &self.reason())
            .finish()
    }
}

impl Shutdown {
    /// Creates an untriggered shutdown.
    #[must_use]
    pub fn new() -> Self {
        let (reason, _) = watch::channel(None);
        Self {
            inner: Arc::new(ShutdownInner {
                triggered: AtomicBool::new(false),
                reason,
            }),
        }
    }

    /// Triggers shutdown. Returns `false` if it was already triggered.
    pub fn trigger(&self, reason: ShutdownReason) -> bool {
        if self.inner.triggered.swap(true, Ordering::AcqRel) {
            tracing::warn!(%reason, "Ignoring shutdown call! Already shutting down");
            return false;
        }
        tracing::info!(%reason, "Shutting down");
        self.inner.reason.send_replace(Some(reason));
        true
    }

    /// Whether [`trigger`](Self::trigger) has been called.
    #[must_use]
    pub fn is_triggered(&self) -> bool {
        self.inner.triggered.load(Ordering::Acquire)
    }

    /// The reason of the first trigger.
    #[must_use]
    pub fn reason(&self) -> Option<ShutdownReason> {
        *self.inner.reason.borrow()
    }

    /// Installs a process-wide panic hook that triggers a
    /// [`Fault`](ShutdownReason::Fault) shutdown.
    ///
    /// The previous hook still runs first. The hook only holds a weak
    /// reference, so it does nothing once every clone of `self` is gone.
    pub fn trigger_on_panic(&self) {
        let weak: Weak<ShutdownInner> = Arc::downgrade(&self.inner);
        let previous = std::panic::take_hook();

        std::panic::set_hook(Box::new(move |info| {
            previous(info);
            if let Some(inner) = weak.upgrade() {
                tracing::error!(%info, "Uncaught panic");
                Shutdown { inner }.trigger(ShutdownReason::Fault);
            }
        }));
    }

    /// Resolves once shutdown has been triggered.
    pub async fn triggered(&self) -> ShutdownReason {
        let mut receiver = self.inner.reason.subscribe();
        match receiver.wait_for(Option::is_some).await {
            Ok(reason) => (*reason).unwrap_or(ShutdownReason::Requested),
            // The sender lives in `self`, so the channel cannot close here.
            Err(_) => ShutdownReason::Requested,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Signals
// ─────────────────────────────────────────────────────────────────────────────

/// Waits for the first termination signal and returns its name.
///
/// Listens for Ctrl-C everywhere, plus `SIGTERM`, `SIGUSR1` and `SIGUSR2` on
/// unix. A signal that cannot be listened for is skipped.
pub async fn termination_signal() -> &'static str {
    #[cfg(unix)]
    {
        use tokio::signal::unix::SignalKind;

        tokio::select! {
            () = ctrl_c() => "SIGINT",
            () = unix_signal(SignalKind::terminate()) => "SIGTERM",
            () = unix_signal(SignalKind::user_defined1()) => "SIGUSR1",
            () = unix_signal(SignalKind::user_defined2()) => "SIGUSR2",
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c().await;
        "SIGINT"
    }
}

async fn ctrl_c() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::warn!(%err, "Cannot listen for Ctrl-C");
        core::future::pending::<()>().await;
    }
}

#[cfg(unix)]
async fn unix_signal(kind: tokio::signal::unix::SignalKind) {
    match tokio::signal::unix::signal(kind) {
        Ok(mut signal) => {
            signal.recv().await;
        }
        Err(err) => {
            tracing::warn!(%err, "Cannot listen for signal");
            core::future::pending::<()>().await;
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// ShutdownOutcome
// ─────────────────────────────────────────────────────────────────────────────

/// What happened once the application has been torn down.
#[derive(Debug)]
pub struct ShutdownOutcome {
    /// Why the application shut down.
    pub reason: ShutdownReason,
    /// Every failed `on_destroy` hook, in destroy order.
    pub errors: Vec<DestroyError>,
}

impl ShutdownOutcome {
    /// `true` if every destroy hook succeeded and no fault triggered shutdown.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty() && self.reason != ShutdownReason::Fault
    }

    /// `SUCCESS` when clean, `FAILURE` otherwise.
    #[must_use]
    pub fn exit_code(&self) -> ExitCode {
        if self.is_clean() {
            ExitCode::SUCCESS
        } else {
            ExitCode::FAILURE
        }
    }
}
