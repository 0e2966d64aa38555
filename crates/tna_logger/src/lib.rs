//! Class-scoped logging for tna components.
//!
//! This crate provides the logger the dependency-injection container hands
//! to every component that asks for one:
//!
//! - [`Logger`] - A logger attributed to a class name and an optional instance id
//! - [`Loglevel`] / [`LogLevels`] - Per-class level selection with a `*` wildcard
//! - [`TracingSetup`] - Installs the `tracing` subscriber the loggers write to
//!
//! Loggers do not format anything themselves. Every message that passes the
//! logger's level becomes a `tracing` event carrying `class` and `id` fields,
//! and the installed subscriber decides how it is rendered.
//!
//! # Example
//!
//! ```
//! use tna_logger::{Logger, LogLevels, Loglevel};
//!
//! let levels = LogLevels::wildcard(Loglevel::Log).with("Worker", Loglevel::Spam);
//!
//! let logger = Logger::build()
//!     .class_name("Worker")
//!     .id("foo")
//!     .level(levels.level_of("Worker"))
//!     .create();
//!
//! assert!(logger.spam("alive"));
//! ```

mod level;
mod logger;
mod tracing_setup;

pub use level::{LogLevels, Loglevel, ParseLoglevelError};
pub use logger::{Logger, LoggerBuilder};
pub use tracing_setup::{TracingFormat, TracingSetup};
