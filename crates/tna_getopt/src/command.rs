//! Translation of a [`GetOptConfiguration`] into a [`clap::Command`].
//!
//! Options become global arguments, so they are accepted before and after
//! any command word. A level of command nodes becomes a set of
//! subcommands; a level of value nodes becomes ordered positionals,
//! followed by a hidden catch-all for surplus words.

use core::fmt::Write;

use clap::{Arg, ArgAction, Command};

use crate::schema::{GetOptConfiguration, GetOptOption, OptionType, PositionalArgument};

/// Id of the hidden positional that collects surplus words.
pub(crate) const SURPLUS: &str = "@surplus";

const TEMPLATE: &str = "USAGE\n  {usage}\n\n{all-args}{after-help}";

/// Builds the command for `schema`, named `program` in usage text.
///
/// Schemas reusing a short name or a long name trip clap's debug
/// assertions.
pub(crate) fn build(schema: &GetOptConfiguration, program: &str) -> Command {
    let command = Command::new(program.to_string())
        .no_binary_name(true)
        .disable_help_subcommand(true)
        .help_template(TEMPLATE);

    let command = schema
        .effective_options()
        .iter()
        .fold(bare(command), |command, option| command.arg(option_arg(option)));

    positional_level(command, &schema.positionals)
}

/// Positional ids are prefixed so they never collide with option names.
pub(crate) fn positional_id(name: &str) -> String {
    format!("@{name}")
}

fn bare(command: Command) -> Command {
    command.disable_help_flag(true).disable_version_flag(true)
}

fn option_arg(option: &GetOptOption) -> Arg {
    let mut arg = Arg::new(option.long.clone())
        .long(option.long.clone())
        .global(true)
        .help(describe(option));
    if let Some(short) = option.short {
        arg = arg.short(short);
    }

    match option.kind {
        // A repeated flag is still just `true`.
        OptionType::Boolean => arg
            .action(ArgAction::SetTrue)
            .overrides_with(option.long.clone()),
        OptionType::String => arg.action(ArgAction::Set).value_name("val"),
        OptionType::Array => arg.action(ArgAction::Append).value_name("val"),
    }
}

fn describe(option: &GetOptOption) -> String {
    let mut help = option.info.clone().unwrap_or_default();
    if let Some(env) = &option.env {
        let _ = write!(help, " [env: {env}]");
    }
    if let Some(default) = &option.default {
        let shown = default
            .as_str()
            .map_or_else(|| default.to_string(), str::to_string);
        let _ = write!(help, " [default: {shown}]");
    }
    help.trim_start().to_string()
}

fn positional_level(mut command: Command, nodes: &[PositionalArgument]) -> Command {
    if nodes.first().is_some_and(|node| node.command) {
        for node in nodes.iter().filter(|node| node.command) {
            let mut sub = bare(Command::new(node.name.clone()));
            if let Some(info) = &node.info {
                sub = sub.about(info.clone());
            }
            command = command.subcommand(positional_level(sub, &node.children));
        }
        return command;
    }

    for node in nodes.iter().filter(|node| !node.command) {
        let arg = Arg::new(positional_id(&node.name))
            .value_name(node.name.clone())
            .help(node.info.clone().unwrap_or_default());
        if node.spreads {
            return command.arg(arg.num_args(1..).action(ArgAction::Append));
        }
        command = command.arg(arg.action(ArgAction::Set));
    }

    command.arg(
        Arg::new(SURPLUS)
            .num_args(1..)
            .action(ArgAction::Append)
            .hide(true),
    )
}
