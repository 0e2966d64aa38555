//! The per-instance lifecycle state machine.

use core::fmt;

/// Lifecycle state of a managed instance.
///
/// States only move forward, one step at a time:
///
/// `Unset → Configuring → Configured → Initializing → Initialized → Ready`
///
/// Any state before `Destroying` may move to `Destroying`, which is followed
/// by `Destroyed`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum HookState {
    /// Created, nothing has run yet.
    #[default]
    Unset,
    /// Configuration is being applied.
    Configuring,
    /// Configuration has been applied.
    Configured,
    /// `on_init` is running.
    Initializing,
    /// `on_init` has finished.
    Initialized,
    /// `on_ready` has been called.
    Ready,
    /// `on_destroy` is running.
    Destroying,
    /// Terminal.
    Destroyed,
}

impl HookState {
    /// Returns the state that follows in the regular lifecycle.
    #[must_use]
    pub fn successor(self) -> Option<HookState> {
        match self {
            HookState::Unset => Some(HookState::Configuring),
            HookState::Configuring => Some(HookState::Configured),
            HookState::Configured => Some(HookState::Initializing),
            HookState::Initializing => Some(HookState::Initialized),
            HookState::Initialized => Some(HookState::Ready),
            HookState::Ready => None,
            HookState::Destroying => Some(HookState::Destroyed),
            HookState::Destroyed => None,
        }
    }

    /// Returns `true` if moving from `self` to `next` is allowed.
    #[must_use]
    pub fn can_transition_to(self, next: HookState) -> bool {
        self.successor() == Some(next) || (next == HookState::Destroying && self < HookState::Destroying)
    }

    /// Returns the lowercase name of the state.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            HookState::Unset => "unset",
            HookState::Configuring => "configuring",
            HookState::Configured => "configured",
            HookState::Initializing => "initializing",
            HookState::Initialized => "initialized",
            HookState::Ready => "ready",
            HookState::Destroying => "destroying",
            HookState::Destroyed => "destroyed",
        }
    }
}

impl fmt::Display for HookState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
