//! The application root.

use serde::Deserialize;
use serde_json::json;
use tna_di::prelude::*;

use crate::worker::Worker;

/// Configuration of the [`App`].
#[derive(Debug, Clone, Deserialize)]
pub struct AppSettings {
    /// Shown in the greeting.
    pub name: String,
}

/// Greets, then leaves the workers ticking.
pub struct App {
    logger: Logger,
    settings: ConfigField<AppSettings>,
    greeting: CliField<String>,
    verbose: CliField<bool>,
    foo: Inject<Worker>,
    bar: Inject<Worker>,
}

fn command_line() -> GetOptConfiguration {
    GetOptConfiguration::new()
        .option(
            GetOptOption::string("greeting")
                .short('g')
                .env("TICKER_GREETING")
                .info("Word to greet with."),
        )
        .option(
            GetOptOption::boolean("verbose")
                .short('v')
                .info("Log every tick of every worker."),
        )
}

impl Component for App {
    fn as_on_ready(&self) -> Option<&dyn OnReady> {
        Some(self)
    }
}

impl Injectable for App {
    fn describe(d: DescriptorBuilder<Self>) -> DescriptorBuilder<Self> {
        d.consumes::<Logger>()
            .declare::<Worker>()
            .with_cli(command_line())
            .with_configs([
                config_for::<Worker>(json!({ "interval_ms": 500, "label": "foo" }), "foo"),
                config_for::<Worker>(json!({ "interval_ms": 1200, "label": "bar" }), "bar"),
            ])
            .configuration_with_default("settings", |a| &a.settings, json!({ "name": "ticker" }))
            .option_with_default("greeting", "greeting", |a| &a.greeting, json!("hello"))
            .option("verbose", "verbose", |a| &a.verbose)
            .inject_keyed("foo", |a| &a.foo, "foo")
            .inject_keyed("bar", |a| &a.bar, "bar")
    }

    fn construct(deps: &mut Dependencies) -> Result<Self, HookError> {
        Ok(Self {
            logger: deps.take_logger()?,
            settings: ConfigField::new(),
            greeting: CliField::new(),
            verbose: CliField::new(),
            foo: Inject::new(),
            bar: Inject::new(),
        })
    }
}

impl OnReady for App {
    fn on_ready(&self) -> HookResult {
        let name = self
            .settings
            .get()
            .map(|settings| settings.name.clone())
            .unwrap_or_default();
        let greeting = self.greeting.get().unwrap_or_default();
        let workers: Vec<_> = [self.foo.get(), self.bar.get()].into_iter().flatten().collect();
        for worker in &workers {
            worker.set_verbose(self.verbose());
        }
        let workers = workers.len();

        self.logger.log(format_args!(
            "{greeting} from {name}, {workers} workers running; press Ctrl-C to stop"
        ));
        Ok(())
    }
}

impl App {
    /// Whether `--verbose` was given.
    #[must_use]
    pub fn verbose(&self) -> bool {
        self.verbose.get().unwrap_or(false)
    }
}
