//! A dependency-injection runtime with a strict component lifecycle.
//!
//! Re-exports the tna crates for convenience.

/// Dependency-injection core: container, lifecycle and bootstrapping.
pub use tna_di;

/// Argument-parser collaborator.
pub use tna_getopt;

/// Logger component and tracing setup.
pub use tna_logger;

/// Re-export all common types for easy access.
pub mod prelude {
    pub use tna_di::prelude::*;
}
