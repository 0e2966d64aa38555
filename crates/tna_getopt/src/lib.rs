//! Command line parsing for tna applications.
//!
//! An application describes its command line with a [`GetOptConfiguration`]:
//! typed [`GetOptOption`]s and a tree of [`PositionalArgument`]s. Parsing
//! produces a [`GetOpt`], which the dependency-injection container exposes as
//! a managed instance so components can bind options and arguments to their
//! fields.
//!
//! # Option sources
//!
//! The command line itself is tokenized by a [`clap::Command`] built from
//! the schema. For every option the first source that has a value wins:
//!
//! 1. the command line (`--long value`, `--long=value`, `-s value`, `-abc`)
//! 2. the option's environment alias
//! 3. the option's default
//!
//! # Example
//!
//! ```
//! use tna_getopt::{GetOpt, GetOptConfiguration, GetOptOption};
//!
//! let schema = GetOptConfiguration::new()
//!     .option(GetOptOption::boolean("verbose").short('v'))
//!     .option(GetOptOption::array("tag").short('t'));
//!
//! let getopt = GetOpt::parse_with_env(&schema, ["-v", "-t", "a", "-t", "b"], &Default::default()).unwrap();
//!
//! assert_eq!(getopt.option("verbose"), Some(&true.into()));
//! assert_eq!(getopt.option("tag"), Some(&serde_json::json!(["a", "b"])));
//! ```

mod command;
mod error;
mod getopt;
mod schema;
mod usage;

pub use error::GetOptError;
pub use getopt::GetOpt;
pub use schema::{GetOptConfiguration, GetOptOption, OptionType, PositionalArgument};
