//! Parse errors.

use clap::error::{ContextKind, ContextValue, ErrorKind};

use crate::schema::{GetOptOption, OptionType};

/// Errors raised while parsing a command line.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GetOptError {
    /// An option was given that the schema does not know.
    #[error("option {0} was provided, but is not configured")]
    UnknownOption(String),

    /// A value-taking option was not followed by a value.
    #[error("value missing for option '{option}', configured type: '{kind}'")]
    MissingValue {
        /// The option's long form.
        option: String,
        /// The configured value type.
        kind: &'static str,
    },

    /// A string option was given more than once.
    #[error("option {0} was provided twice")]
    DuplicateOption(String),

    /// A required option has no value from argv, environment or default.
    #[error("option --{0} was not provided, but is required")]
    OptionNotProvided(String),

    /// The positional at a command position names no known command.
    #[error("unknown command '{0}'")]
    UnknownCommand(String),

    /// Any other rejection by the tokenizer.
    #[error("invalid command line: {0}")]
    Rejected(String),
}

impl GetOptError {
    /// Translates a tokenizer error, looking up option types in `known`.
    pub(crate) fn from_clap(err: &clap::Error, known: &[GetOptOption]) -> Self {
        let context = |kind| match err.get(kind) {
            Some(ContextValue::String(value)) => Some(value.clone()),
            _ => None,
        };
        // Rendered as `--long <val>`; the flag is the first word.
        let offending = context(ContextKind::InvalidArg).unwrap_or_default();
        let flag = offending
            .split_whitespace()
            .next()
            .unwrap_or_default()
            .to_string();

        match err.kind() {
            ErrorKind::UnknownArgument => GetOptError::UnknownOption(offending),
            ErrorKind::InvalidSubcommand => GetOptError::UnknownCommand(
                context(ContextKind::InvalidSubcommand).unwrap_or(offending),
            ),
            ErrorKind::InvalidValue | ErrorKind::NoEquals => {
                let kind = known
                    .iter()
                    .find(|option| flag.strip_prefix("--") == Some(option.long.as_str()))
                    .map_or(OptionType::String, |option| option.kind);
                GetOptError::MissingValue {
                    option: flag,
                    kind: kind.as_str(),
                }
            }
            ErrorKind::ArgumentConflict => GetOptError::DuplicateOption(flag),
            other => GetOptError::Rejected(
                other
                    .as_str()
                    .map_or_else(|| err.to_string(), str::to_string),
            ),
        }
    }
}
