//! Shared helpers for `tna_di` integration tests.

#![allow(
    dead_code,
    missing_docs,
    reason = "shared test utilities, not all items used in every test binary"
)]

use hashbrown::HashMap;
use parking_lot::Mutex;
use tna_di::prelude::*;

/// Records lifecycle events in the order they happen.
#[derive(Default)]
pub struct Journal {
    events: Mutex<Vec<String>>,
}

impl Component for Journal {}

impl Injectable for Journal {
    fn construct(_: &mut Dependencies) -> Result<Self, HookError> {
        Ok(Self::default())
    }
}

impl Journal {
    pub fn record(&self, event: impl Into<String>) {
        self.events.lock().push(event.into());
    }

    pub fn events(&self) -> Vec<String> {
        self.events.lock().clone()
    }
}

/// Options that ignore the process arguments, environment and signals.
pub fn quiet() -> BootstrapOptions {
    BootstrapOptions::new()
        .with_argv(Vec::<String>::new())
        .with_env(HashMap::new())
        .with_program("app")
        .without_signal_handlers()
}
