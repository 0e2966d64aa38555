//! Usage text rendering.

use crate::command;
use crate::getopt::GetOpt;

impl GetOpt {
    /// Renders the usage text for `program`.
    ///
    /// # Example
    ///
    /// ```
    /// use tna_getopt::{GetOpt, GetOptConfiguration, GetOptOption};
    ///
    /// let schema = GetOptConfiguration::new()
    ///     .option(GetOptOption::string("greeting").short('g').info("Word to greet with."));
    /// let getopt = GetOpt::parse_with_env(&schema, ["-h"], &Default::default()).unwrap();
    ///
    /// let usage = getopt.usage("demo");
    /// assert!(usage.starts_with("USAGE\n  demo"));
    /// assert!(usage.contains("--greeting <val>"));
    /// ```
    #[must_use]
    pub fn usage(&self, program: &str) -> String {
        command::build(self.schema(), program).render_help().to_string()
    }
}

#[cfg(test)]
mod tests {
    use hashbrown::HashMap;

    use crate::{GetOpt, GetOptConfiguration, GetOptOption, PositionalArgument};

    #[test]
    fn usage_lists_env_default_and_commands() {
        let schema = GetOptConfiguration::new()
            .option(GetOptOption::string("greeting").env("GREETING").default_value("hello"))
            .positional(PositionalArgument::command("greet").info("say hi"));
        let getopt = GetOpt::parse_with_env(&schema, Vec::<String>::new(), &HashMap::new()).unwrap();

        let usage = getopt.usage("demo");
        assert!(usage.contains("[env: GREETING]"));
        assert!(usage.contains("[default: hello]"));
        assert!(usage.contains("greet"));
        assert!(usage.contains("say hi"));
        assert!(usage.contains("-h, --help"));
    }
}
