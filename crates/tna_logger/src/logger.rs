//! The class-scoped [`Logger`].

use core::fmt::Display;

use crate::level::Loglevel;

/// A logger bound to a class name and an optional instance id.
///
/// Messages below the logger's level are dropped. Messages that pass are
/// emitted as `tracing` events with `class` and `id` fields. Every emitting
/// method returns whether the message passed the level check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Logger {
    class_name: String,
    id: Option<String>,
    level: Loglevel,
}

impl Default for Logger {
    fn default() -> Self {
        Self {
            class_name: "Logger".to_string(),
            id: None,
            level: Loglevel::Spam,
        }
    }
}

impl Logger {
    /// Starts building a logger.
    #[must_use]
    pub fn build() -> LoggerBuilder {
        LoggerBuilder::default()
    }

    /// Returns the class name messages are attributed to.
    #[must_use]
    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    /// Returns the instance id messages are attributed to, if any.
    #[must_use]
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    /// Returns the minimum level this logger emits.
    #[must_use]
    pub fn level(&self) -> Loglevel {
        self.level
    }

    /// Changes the minimum level this logger emits.
    pub fn set_level(&mut self, level: Loglevel) {
        self.level = level;
    }

    /// Returns `true` if a message at `level` would be emitted.
    #[must_use]
    pub fn enabled(&self, level: Loglevel) -> bool {
        level >= self.level
    }

    /// Emits `message` at `level`.
    pub fn emit(&self, level: Loglevel, message: impl Display) -> bool {
        if !self.enabled(level) {
            return false;
        }

        let class = self.class_name.as_str();
        let id = self.id.as_deref().unwrap_or("");
        match level {
            Loglevel::Spam => tracing::trace!(class, id, "{}", message),
            Loglevel::Info => tracing::debug!(class, id, "{}", message),
            Loglevel::Log => tracing::info!(class, id, "{}", message),
            Loglevel::Warn => tracing::warn!(class, id, "{}", message),
            Loglevel::Error => tracing::error!(class, id, "{}", message),
        }
        true
    }

    /// Emits at [`Loglevel::Spam`].
    pub fn spam(&self, message: impl Display) -> bool {
        self.emit(Loglevel::Spam, message)
    }

    /// Emits at [`Loglevel::Info`].
    pub fn info(&self, message: impl Display) -> bool {
        self.emit(Loglevel::Info, message)
    }

    /// Emits at [`Loglevel::Log`].
    pub fn log(&self, message: impl Display) -> bool {
        self.emit(Loglevel::Log, message)
    }

    /// Emits at [`Loglevel::Warn`].
    pub fn warn(&self, message: impl Display) -> bool {
        self.emit(Loglevel::Warn, message)
    }

    /// Emits at [`Loglevel::Error`].
    pub fn error(&self, message: impl Display) -> bool {
        self.emit(Loglevel::Error, message)
    }
}

/// Builder for [`Logger`].
///
/// # Example
///
/// ```
/// use tna_logger::{Logger, Loglevel};
///
/// let logger = Logger::build()
///     .class_name("Bootstrap")
///     .level(Loglevel::Warn)
///     .create();
///
/// assert!(!logger.log("suppressed"));
/// assert!(logger.error("shown"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct LoggerBuilder {
    class_name: Option<String>,
    id: Option<String>,
    level: Option<Loglevel>,
}

impl LoggerBuilder {
    /// Sets the class name.
    #[must_use]
    pub fn class_name(mut self, class_name: impl Into<String>) -> Self {
        self.class_name = Some(class_name.into());
        self
    }

    /// Sets the instance id.
    #[must_use]
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Sets the instance id when one is given.
    #[must_use]
    pub fn maybe_id(mut self, id: Option<impl Into<String>>) -> Self {
        self.id = id.map(Into::into);
        self
    }

    /// Sets the minimum level.
    #[must_use]
    pub fn level(mut self, level: Loglevel) -> Self {
        self.level = Some(level);
        self
    }

    /// Finishes the logger.
    #[must_use]
    pub fn create(self) -> Logger {
        let defaults = Logger::default();
        Logger {
            class_name: self.class_name.unwrap_or(defaults.class_name),
            id: self.id,
            level: self.level.unwrap_or(defaults.level),
        }
    }
}
