//! Example ticker application built with tna.
//!
//! Two keyed [`Worker`]s tick at their own configured interval until the
//! process receives a termination signal.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │  App  (--greeting, --verbose)                │
//! │                                              │
//! │   ┌──────────────┐      ┌──────────────┐     │
//! │   │ Worker[foo]  │      │ Worker[bar]  │     │
//! │   │ every 500ms  │      │ every 1200ms │     │
//! │   └──────────────┘      └──────────────┘     │
//! └──────────────────────────────────────────────┘
//! ```

mod app;
mod worker;

pub use app::{App, AppSettings};
pub use worker::{Worker, WorkerSettings};
