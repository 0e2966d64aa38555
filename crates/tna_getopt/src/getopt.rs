//! The parser and its result.

use clap::ArgMatches;
use clap::parser::ValueSource;
use hashbrown::HashMap;
use serde_json::{Map, Value};

use crate::command::{self, SURPLUS, positional_id};
use crate::error::GetOptError;
use crate::schema::{GetOptConfiguration, GetOptOption, OptionType, PositionalArgument, HELP};

/// A parsed command line.
///
/// Options are keyed by their long name. Values come from argv first, then
/// from the option's environment alias, then from its default. Positionals
/// are kept in order and also arranged into a tree following the schema's
/// positional nodes.
///
/// # Example
///
/// ```
/// use tna_getopt::{GetOpt, GetOptConfiguration, GetOptOption, PositionalArgument};
///
/// let schema = GetOptConfiguration::new()
///     .option(GetOptOption::string("greeting").short('g').default_value("hello"))
///     .positional(PositionalArgument::command("greet").child(PositionalArgument::value("entity")));
///
/// let getopt = GetOpt::parse_with_env(&schema, ["-g", "hi", "greet", "world"], &Default::default()).unwrap();
///
/// assert_eq!(getopt.option("greeting"), Some(&"hi".into()));
/// assert_eq!(getopt.pos_tree()["greet"]["entity"], "world");
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GetOpt {
    options: Map<String, Value>,
    positional: Vec<String>,
    pos_tree: Value,
    schema: GetOptConfiguration,
}

impl GetOpt {
    /// Parses `argv` (without the program name) against `schema`, reading
    /// environment aliases from the process environment.
    pub fn parse<I, S>(schema: &GetOptConfiguration, argv: I) -> Result<Self, GetOptError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let env: HashMap<String, String> = std::env::vars().collect();
        Self::parse_with_env(schema, argv, &env)
    }

    /// Parses `argv` (without the program name) against `schema`, reading
    /// environment aliases from `env`.
    pub fn parse_with_env<I, S>(
        schema: &GetOptConfiguration,
        argv: I,
        env: &HashMap<String, String>,
    ) -> Result<Self, GetOptError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let known = schema.effective_options();
        let matches = command::build(schema, "app")
            .try_get_matches_from(argv.into_iter().map(Into::<String>::into))
            .map_err(|err| GetOptError::from_clap(&err, &known))?;

        let mut getopt = Self {
            options: Map::new(),
            positional: Vec::new(),
            pos_tree: Value::Null,
            schema: schema.clone(),
        };
        getopt.read_options(&matches, &known, env)?;

        let mut tree = Map::new();
        arrange(&schema.positionals, &matches, &mut tree, &mut getopt.positional);
        getopt.pos_tree = Value::Object(tree);

        Ok(getopt)
    }

    /// Creates a result from already known option values.
    ///
    /// No schema is involved; this is meant for tests and embedding.
    #[must_use]
    pub fn from_options(options: Map<String, Value>) -> Self {
        Self {
            options,
            positional: Vec::new(),
            pos_tree: Value::Object(Map::new()),
            schema: GetOptConfiguration::default(),
        }
    }

    /// Replaces the positional tree.
    #[must_use]
    pub fn with_pos_tree(mut self, tree: Value) -> Self {
        self.pos_tree = tree;
        self
    }

    /// Returns the value of an option, if any source provided one.
    #[must_use]
    pub fn option(&self, name: &str) -> Option<&Value> {
        self.options.get(name)
    }

    /// Returns all option values.
    #[must_use]
    pub fn options(&self) -> &Map<String, Value> {
        &self.options
    }

    /// Returns the positionals in order.
    #[must_use]
    pub fn positional(&self) -> &[String] {
        &self.positional
    }

    /// Returns the positional tree.
    #[must_use]
    pub fn pos_tree(&self) -> &Value {
        &self.pos_tree
    }

    /// Returns the schema this result was parsed with.
    #[must_use]
    pub fn schema(&self) -> &GetOptConfiguration {
        &self.schema
    }

    /// Returns `true` if `--help` or `-h` was given.
    #[must_use]
    pub fn help_requested(&self) -> bool {
        matches!(self.options.get(HELP), Some(Value::Bool(true)))
    }

    fn read_options(
        &mut self,
        matches: &ArgMatches,
        known: &[GetOptOption],
        env: &HashMap<String, String>,
    ) -> Result<(), GetOptError> {
        for option in known {
            if matches.value_source(&option.long) != Some(ValueSource::CommandLine) {
                continue;
            }
            let value = match option.kind {
                OptionType::Boolean => Value::Bool(true),
                OptionType::String => match matches.get_one::<String>(&option.long) {
                    Some(value) => Value::String(value.clone()),
                    None => continue,
                },
                OptionType::Array => Value::Array(
                    matches
                        .get_many::<String>(&option.long)
                        .into_iter()
                        .flatten()
                        .cloned()
                        .map(Value::String)
                        .collect(),
                ),
            };
            self.options.insert(option.long.clone(), value);
        }

        self.fill_missing(known, env)
    }

    fn fill_missing(
        &mut self,
        known: &[GetOptOption],
        env: &HashMap<String, String>,
    ) -> Result<(), GetOptError> {
        let help = self.help_requested();

        for option in known {
            if self.options.contains_key(&option.long) {
                continue;
            }

            let from_env = option.env.as_ref().and_then(|name| env.get(name));
            let value = match (from_env, &option.default) {
                (Some(raw), _) => match option.kind {
                    OptionType::String => Value::String(raw.clone()),
                    OptionType::Array => Value::Array(
                        raw.split(',').map(|part| Value::String(part.to_string())).collect(),
                    ),
                    OptionType::Boolean => Value::Bool(true),
                },
                (None, Some(default)) => default.clone(),
                (None, None) if option.required && !help => {
                    return Err(GetOptError::OptionNotProvided(option.long.clone()));
                }
                (None, None) => continue,
            };
            self.options.insert(option.long.clone(), value);
        }

        Ok(())
    }
}

/// Arranges matched positionals into a tree following `nodes`, recording
/// them in order on the way.
///
/// A level whose first node is a command is a choice between its command
/// nodes. Any other level assigns positionals to its value nodes in order.
fn arrange(
    nodes: &[PositionalArgument],
    matches: &ArgMatches,
    tree: &mut Map<String, Value>,
    positional: &mut Vec<String>,
) {
    if nodes.first().is_some_and(|node| node.command) {
        let Some((name, sub)) = matches.subcommand() else {
            return;
        };
        positional.push(name.to_string());
        let children = nodes
            .iter()
            .find(|node| node.command && node.name == name)
            .map(|node| node.children.as_slice())
            .unwrap_or_default();

        let mut inner = Map::new();
        arrange(children, sub, &mut inner, positional);
        tree.insert(name.to_string(), Value::Object(inner));
        return;
    }

    for node in nodes.iter().filter(|node| !node.command) {
        let id = positional_id(&node.name);
        if node.spreads {
            let values: Vec<String> = matches
                .get_many::<String>(&id)
                .into_iter()
                .flatten()
                .cloned()
                .collect();
            positional.extend(values.iter().cloned());
            tree.insert(
                node.name.clone(),
                Value::Array(values.into_iter().map(Value::String).collect()),
            );
            return;
        }
        let Some(value) = matches.get_one::<String>(&id) else {
            return;
        };
        positional.push(value.clone());
        tree.insert(node.name.clone(), Value::String(value.clone()));
    }

    positional.extend(matches.get_many::<String>(SURPLUS).into_iter().flatten().cloned());
}
