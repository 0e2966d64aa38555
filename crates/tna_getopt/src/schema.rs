//! The command line schema: options and the positional tree.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Value type of an option.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptionType {
    /// A flag; present means `true`.
    #[default]
    Boolean,
    /// A single string value; giving it twice is an error.
    String,
    /// A list of strings; every occurrence appends.
    Array,
}

impl OptionType {
    /// Returns `true` if the option consumes a value.
    #[must_use]
    pub fn takes_value(self) -> bool {
        !matches!(self, OptionType::Boolean)
    }

    /// Returns the lowercase name used in usage text.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            OptionType::Boolean => "boolean",
            OptionType::String => "string",
            OptionType::Array => "array",
        }
    }
}

/// A single command line option.
///
/// # Example
///
/// ```
/// use tna_getopt::GetOptOption;
///
/// let greeting = GetOptOption::string("greeting")
///     .short('g')
///     .env("GREETING")
///     .default_value("hello")
///     .info("Word to greet with.");
///
/// assert_eq!(greeting.long, "greeting");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GetOptOption {
    /// Value type.
    #[serde(default, rename = "type")]
    pub kind: OptionType,
    /// Long name, also the key in the parsed options.
    pub long: String,
    /// Single character short name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub short: Option<char>,
    /// Environment variable consulted when the option is not given.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub env: Option<String>,
    /// Value used when neither argv nor the environment provides one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    /// Fail parsing when no value can be found.
    #[serde(default)]
    pub required: bool,
    /// Description shown in usage text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub info: Option<String>,
}

impl GetOptOption {
    /// Creates an option of the given type.
    #[must_use]
    pub fn new(kind: OptionType, long: impl Into<String>) -> Self {
        Self {
            kind,
            long: long.into(),
            short: None,
            env: None,
            default: None,
            required: false,
            info: None,
        }
    }

    /// Creates a boolean flag.
    #[must_use]
    pub fn boolean(long: impl Into<String>) -> Self {
        Self::new(OptionType::Boolean, long)
    }

    /// Creates a string option.
    #[must_use]
    pub fn string(long: impl Into<String>) -> Self {
        Self::new(OptionType::String, long)
    }

    /// Creates an array option.
    #[must_use]
    pub fn array(long: impl Into<String>) -> Self {
        Self::new(OptionType::Array, long)
    }

    /// Sets the short name.
    #[must_use]
    pub fn short(mut self, short: char) -> Self {
        self.short = Some(short);
        self
    }

    /// Sets the environment alias.
    #[must_use]
    pub fn env(mut self, name: impl Into<String>) -> Self {
        self.env = Some(name.into());
        self
    }

    /// Sets the default value.
    #[must_use]
    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    /// Marks the option as required.
    #[must_use]
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Sets the usage description.
    #[must_use]
    pub fn info(mut self, info: impl Into<String>) -> Self {
        self.info = Some(info.into());
        self
    }
}

/// A node of the positional argument tree.
///
/// Siblings that are all commands form a choice: the next positional must
/// name one of them, and the chosen command's children describe what
/// follows. Plain siblings take one positional each, in order, and a
/// spreading node takes every remaining positional as a list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionalArgument {
    /// Name of the node, also its key in the parsed tree.
    pub name: String,
    /// Description shown in usage text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub info: Option<String>,
    /// This node is a command word rather than a value.
    #[serde(default)]
    pub command: bool,
    /// This node collects all remaining positionals.
    #[serde(default)]
    pub spreads: bool,
    /// Nodes that follow a command.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<PositionalArgument>,
}

impl PositionalArgument {
    /// Creates a plain value node.
    #[must_use]
    pub fn value(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            info: None,
            command: false,
            spreads: false,
            children: Vec::new(),
        }
    }

    /// Creates a command node.
    #[must_use]
    pub fn command(name: impl Into<String>) -> Self {
        Self {
            command: true,
            ..Self::value(name)
        }
    }

    /// Creates a spreading node.
    #[must_use]
    pub fn spread(name: impl Into<String>) -> Self {
        Self {
            spreads: true,
            ..Self::value(name)
        }
    }

    /// Sets the usage description.
    #[must_use]
    pub fn info(mut self, info: impl Into<String>) -> Self {
        self.info = Some(info.into());
        self
    }

    /// Appends a child node.
    #[must_use]
    pub fn child(mut self, child: PositionalArgument) -> Self {
        self.children.push(child);
        self
    }
}

/// The complete command line schema of an application.
///
/// A `help`/`h` flag is always available in addition to the configured
/// options.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GetOptConfiguration {
    /// Known options.
    #[serde(default)]
    pub options: Vec<GetOptOption>,
    /// Top level positional nodes.
    #[serde(default, rename = "args")]
    pub positionals: Vec<PositionalArgument>,
}

impl GetOptConfiguration {
    /// Creates an empty schema.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an option.
    #[must_use]
    pub fn option(mut self, option: GetOptOption) -> Self {
        self.options.push(option);
        self
    }

    /// Appends a top level positional node.
    #[must_use]
    pub fn positional(mut self, node: PositionalArgument) -> Self {
        self.positionals.push(node);
        self
    }

    /// Returns the options including the implicit help flag.
    pub(crate) fn effective_options(&self) -> Vec<GetOptOption> {
        let mut options = self.options.clone();
        if !options.iter().any(|o| o.long == HELP) {
            options.push(
                GetOptOption::boolean(HELP)
                    .short('h')
                    .info("Print command info."),
            );
        }
        options
    }
}

/// Long name of the implicit help flag.
pub(crate) const HELP: &str = "help";
