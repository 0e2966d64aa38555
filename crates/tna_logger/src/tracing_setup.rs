//! Installation of the `tracing` subscriber loggers write to.
//!
//! The subscriber is derived from the same [`LogLevels`] table the container
//! hands to its loggers, so a class configured at `warn` stays quiet even
//! when its logger is driven directly through `tracing`. Two filters are
//! stacked under one output layer:
//!
//! - an `EnvFilter` whose default is the wildcard level; events from
//!   [`Logger`](crate::Logger) are admitted down to the most verbose level
//!   the table mentions, and extra directives can raise or lower any target
//! - a class filter that reads the `class` field of each logger event and
//!   checks it against that class's entry
//!
//! Events without a `class` field only go through the `EnvFilter`.
//!
//! # Example
//!
//! ```
//! use tna_logger::{LogLevels, Loglevel, TracingFormat, TracingSetup};
//!
//! let levels = LogLevels::wildcard(Loglevel::Log).with("Worker", Loglevel::Warn);
//!
//! TracingSetup::from_levels(&levels)
//!     .with_format(TracingFormat::Compact)
//!     .with_directive("tna_di=debug")
//!     .install();
//! ```

use core::fmt;

use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

use crate::level::{LogLevels, Loglevel};

/// Target prefix of the events [`Logger`](crate::Logger) emits.
const LOGGER_TARGET: &str = "tna_logger";

/// How events are rendered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TracingFormat {
    /// Multi-line output with colors, for a terminal.
    #[default]
    Pretty,
    /// One line per event.
    Compact,
    /// One JSON object per line; `class` and `id` become JSON fields.
    Json,
}

/// Describes the global subscriber: a level table, an output format and
/// optional extra `EnvFilter` directives.
///
/// The default admits `log` and above for every class and renders with
/// [`TracingFormat::Pretty`].
#[derive(Debug, Clone)]
pub struct TracingSetup {
    levels: LogLevels,
    format: TracingFormat,
    directives: Vec<String>,
}

impl Default for TracingSetup {
    fn default() -> Self {
        Self::from_levels(&LogLevels::wildcard(Loglevel::Log))
    }
}

impl TracingSetup {
    /// Same as [`TracingSetup::default`].
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a setup that filters by `levels`.
    #[must_use]
    pub fn from_levels(levels: &LogLevels) -> Self {
        Self {
            levels: levels.clone(),
            format: TracingFormat::default(),
            directives: Vec::new(),
        }
    }

    /// Replaces the level table.
    #[must_use]
    pub fn with_levels(mut self, levels: LogLevels) -> Self {
        self.levels = levels;
        self
    }

    /// Sets the output format.
    #[must_use]
    pub fn with_format(mut self, format: TracingFormat) -> Self {
        self.format = format;
        self
    }

    /// Appends an `EnvFilter` directive such as `tna_di=debug`.
    ///
    /// Directives that do not parse are dropped when the subscriber is built.
    #[must_use]
    pub fn with_directive(mut self, directive: impl Into<String>) -> Self {
        self.directives.push(directive.into());
        self
    }

    /// Level table the filters are derived from.
    #[must_use]
    pub fn levels(&self) -> &LogLevels {
        &self.levels
    }

    /// Output format.
    #[must_use]
    pub fn format(&self) -> TracingFormat {
        self.format
    }

    /// Returns the `EnvFilter` directives derived from the level table,
    /// followed by the extra directives in the order they were added.
    #[must_use]
    pub fn directives(&self) -> Vec<String> {
        let mut directives = vec![
            level_name(self.levels.wildcard_level()).to_string(),
            format!("{LOGGER_TARGET}={}", level_name(self.levels.most_verbose())),
        ];
        directives.extend(self.directives.iter().cloned());
        directives
    }

    /// Installs the subscriber globally.
    ///
    /// Returns `false` when a global subscriber was already installed, in
    /// which case the existing one is left alone.
    pub fn install(&self) -> bool {
        let filter = EnvFilter::builder().parse_lossy(self.directives().join(","));

        tracing_subscriber::registry()
            .with(self.output())
            .with(filter)
            .with(ClassFilter::new(self.levels.clone()))
            .try_init()
            .is_ok()
    }

    fn output(&self) -> Box<dyn Layer<Registry> + Send + Sync> {
        let layer = tracing_subscriber::fmt::layer();
        match self.format {
            TracingFormat::Pretty => layer.pretty().boxed(),
            TracingFormat::Compact => layer.compact().boxed(),
            TracingFormat::Json => layer.json().boxed(),
        }
    }
}

fn level_name(level: Loglevel) -> &'static str {
    match level {
        Loglevel::Spam => "trace",
        Loglevel::Info => "debug",
        Loglevel::Log => "info",
        Loglevel::Warn => "warn",
        Loglevel::Error => "error",
    }
}

/// Drops logger events whose level is below their class's entry.
#[derive(Debug)]
pub(crate) struct ClassFilter {
    levels: LogLevels,
}

impl ClassFilter {
    pub(crate) fn new(levels: LogLevels) -> Self {
        Self { levels }
    }
}

impl<S: Subscriber> Layer<S> for ClassFilter {
    fn event_enabled(&self, event: &Event<'_>, _ctx: Context<'_, S>) -> bool {
        let mut class = ClassField(None);
        event.record(&mut class);
        match class.0 {
            Some(name) => *event.metadata().level() <= self.levels.level_of(&name).as_tracing(),
            None => true,
        }
    }
}

struct ClassField(Option<String>);

impl Visit for ClassField {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "class" {
            self.0 = Some(value.to_string());
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "class" && self.0.is_none() {
            self.0 = Some(format!("{value:?}").trim_matches('"').to_string());
        }
    }
}
