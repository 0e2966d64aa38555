//! Log levels and per-class level tables.

use core::fmt;
use core::str::FromStr;

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};
use tracing::Level;

/// Key that matches every class without an explicit entry.
const WILDCARD: &str = "*";

/// Severity of a log message, from `Spam` (most verbose) to `Error`.
///
/// A logger emits a message when the message level is greater than or equal
/// to the logger's own level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Loglevel {
    /// Internal chatter, mapped to [`Level::TRACE`].
    #[default]
    Spam,
    /// Informational detail, mapped to [`Level::DEBUG`].
    Info,
    /// Regular output, mapped to [`Level::INFO`].
    Log,
    /// Something looks wrong, mapped to [`Level::WARN`].
    Warn,
    /// Something failed, mapped to [`Level::ERROR`].
    Error,
}

impl Loglevel {
    /// All levels in ascending severity.
    pub const ALL: [Loglevel; 5] = [
        Loglevel::Spam,
        Loglevel::Info,
        Loglevel::Log,
        Loglevel::Warn,
        Loglevel::Error,
    ];

    /// Returns the `tracing` level this level is emitted at.
    #[must_use]
    pub fn as_tracing(self) -> Level {
        match self {
            Loglevel::Spam => Level::TRACE,
            Loglevel::Info => Level::DEBUG,
            Loglevel::Log => Level::INFO,
            Loglevel::Warn => Level::WARN,
            Loglevel::Error => Level::ERROR,
        }
    }

    /// Returns the lowercase name of the level.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Loglevel::Spam => "spam",
            Loglevel::Info => "info",
            Loglevel::Log => "log",
            Loglevel::Warn => "warn",
            Loglevel::Error => "error",
        }
    }
}

impl fmt::Display for Loglevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a string does not name a [`Loglevel`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown log level '{0}' (expected one of spam, info, log, warn, error)")]
pub struct ParseLoglevelError(String);

impl FromStr for Loglevel {
    type Err = ParseLoglevelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "spam" => Ok(Loglevel::Spam),
            "info" => Ok(Loglevel::Info),
            "log" => Ok(Loglevel::Log),
            "warn" | "warning" => Ok(Loglevel::Warn),
            "error" => Ok(Loglevel::Error),
            _ => Err(ParseLoglevelError(s.to_string())),
        }
    }
}

/// Per-class log level table.
///
/// Lookups fall back to the `*` entry when a class has no entry of its own.
/// A table built from a single level applies that level to every class; a
/// table built from a map starts from `* = spam` and overlays the map.
///
/// # Example
///
/// ```
/// use tna_logger::{LogLevels, Loglevel};
///
/// let levels = LogLevels::default().with("Worker", Loglevel::Info);
///
/// assert_eq!(levels.level_of("Worker"), Loglevel::Info);
/// assert_eq!(levels.level_of("App"), Loglevel::Spam);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogLevels {
    levels: HashMap<String, Loglevel>,
}

impl Default for LogLevels {
    fn default() -> Self {
        Self::wildcard(Loglevel::Spam)
    }
}

impl LogLevels {
    /// Creates a table that applies `level` to every class.
    #[must_use]
    pub fn wildcard(level: Loglevel) -> Self {
        let mut levels = HashMap::new();
        levels.insert(WILDCARD.to_string(), level);
        Self { levels }
    }

    /// Creates a table from explicit per-class entries.
    ///
    /// The wildcard defaults to [`Loglevel::Spam`] unless the entries
    /// override `*` themselves.
    #[must_use]
    pub fn from_entries<I, K>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, Loglevel)>,
        K: Into<String>,
    {
        let mut table = Self::default();
        for (class, level) in entries {
            table.levels.insert(class.into(), level);
        }
        table
    }

    /// Adds or replaces the entry for `class`.
    #[must_use]
    pub fn with(mut self, class: impl Into<String>, level: Loglevel) -> Self {
        self.levels.insert(class.into(), level);
        self
    }

    /// Returns the level configured for `class`, falling back to `*`.
    #[must_use]
    pub fn level_of(&self, class: &str) -> Loglevel {
        self.levels
            .get(class)
            .or_else(|| self.levels.get(WILDCARD))
            .copied()
            .unwrap_or_default()
    }

    /// Returns the wildcard level.
    #[must_use]
    pub fn wildcard_level(&self) -> Loglevel {
        self.level_of(WILDCARD)
    }

    /// Returns the most verbose level any entry allows.
    pub(crate) fn most_verbose(&self) -> Loglevel {
        self.levels.values().copied().min().unwrap_or_default()
    }
}

impl From<Loglevel> for LogLevels {
    fn from(level: Loglevel) -> Self {
        Self::wildcard(level)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn levels_are_ordered_by_severity() {
        for pair in Loglevel::ALL.windows(2) {
            assert!(pair[0] < pair[1]);
        }
    }

    #[test]
    fn parse_accepts_all_names() {
        for level in Loglevel::ALL {
            assert_eq!(level.as_str().parse::<Loglevel>(), Ok(level));
        }
        assert_eq!("WARNING".parse::<Loglevel>(), Ok(Loglevel::Warn));
        assert!("verbose".parse::<Loglevel>().is_err());
    }

    #[test]
    fn tracing_mapping() {
        assert_eq!(Loglevel::Spam.as_tracing(), Level::TRACE);
        assert_eq!(Loglevel::Log.as_tracing(), Level::INFO);
        assert_eq!(Loglevel::Error.as_tracing(), Level::ERROR);
    }

    #[test]
    fn wildcard_applies_to_unknown_classes() {
        let levels = LogLevels::wildcard(Loglevel::Warn);
        assert_eq!(levels.level_of("Anything"), Loglevel::Warn);
    }

    #[test]
    fn entries_overlay_default_wildcard() {
        let levels = LogLevels::from_entries([("Worker", Loglevel::Info)]);
        assert_eq!(levels.level_of("Worker"), Loglevel::Info);
        assert_eq!(levels.level_of("App"), Loglevel::Spam);
    }

    #[test]
    fn entries_can_override_wildcard() {
        let levels = LogLevels::from_entries([("*", Loglevel::Log), ("Worker", Loglevel::Info)]);
        assert_eq!(levels.wildcard_level(), Loglevel::Log);
        assert_eq!(levels.level_of("App"), Loglevel::Log);
    }

    #[test]
    fn most_verbose_spans_all_entries() {
        let levels = LogLevels::wildcard(Loglevel::Warn).with("Worker", Loglevel::Info);
        assert_eq!(levels.most_verbose(), Loglevel::Info);
        assert_eq!(LogLevels::wildcard(Loglevel::Error).most_verbose(), Loglevel::Error);
    }

    #[test]
    fn display_matches_parse() {
        for level in Loglevel::ALL {
            assert_eq!(level.to_string().parse::<Loglevel>(), Ok(level));
        }
    }
}
