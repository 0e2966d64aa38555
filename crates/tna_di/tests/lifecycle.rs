//! Lifecycle sweeps: ordering, configuration and phase violations.

mod common;

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tna_di::prelude::*;

use common::{Journal, quiet};

// ─────────────────────────────────────────────────────────────────────────────
// Components
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize, PartialEq)]
struct DatabaseSettings {
    url: String,
    pool: u32,
}

struct Database {
    journal: Arc<Journal>,
    settings: ConfigField<DatabaseSettings>,
}

impl Component for Database {
    fn as_on_configure(&self) -> Option<&dyn OnConfigure> {
        Some(self)
    }
    fn as_on_init(&self) -> Option<&dyn OnInit> {
        Some(self)
    }
    fn as_on_ready(&self) -> Option<&dyn OnReady> {
        Some(self)
    }
    fn as_on_destroy(&self) -> Option<&dyn OnDestroy> {
        Some(self)
    }
}

#[async_trait]
impl OnConfigure for Database {
    async fn on_configure(&self) -> HookResult {
        // The merged configuration is in place before the hook runs.
        self.settings.get().ok_or("settings missing")?;
        self.journal.record("configure Database");
        Ok(())
    }
}

#[async_trait]
impl OnInit for Database {
    async fn on_init(&self) -> HookResult {
        self.journal.record("init Database");
        Ok(())
    }
}

impl OnReady for Database {
    fn on_ready(&self) -> HookResult {
        self.journal.record("ready Database");
        Ok(())
    }
}

#[async_trait]
impl OnDestroy for Database {
    async fn on_destroy(&self) -> HookResult {
        self.journal.record("destroy Database");
        Ok(())
    }
}

impl Injectable for Database {
    fn describe(d: DescriptorBuilder<Self>) -> DescriptorBuilder<Self> {
        d.consumes::<Journal>().configuration_with_default(
            "settings",
            |db| &db.settings,
            json!({ "url": "memory://", "pool": 1 }),
        )
    }

    fn construct(deps: &mut Dependencies) -> Result<Self, HookError> {
        Ok(Self {
            journal: deps.take()?,
            settings: ConfigField::new(),
        })
    }
}

struct App {
    journal: Arc<Journal>,
    database: Arc<Database>,
}

impl Component for App {
    fn as_on_configure(&self) -> Option<&dyn OnConfigure> {
        Some(self)
    }
    fn as_on_init(&self) -> Option<&dyn OnInit> {
        Some(self)
    }
    fn as_on_ready(&self) -> Option<&dyn OnReady> {
        Some(self)
    }
    fn as_on_destroy(&self) -> Option<&dyn OnDestroy> {
        Some(self)
    }
}

#[async_trait]
impl OnConfigure for App {
    async fn on_configure(&self) -> HookResult {
        self.journal.record("configure App");
        Ok(())
    }
}

#[async_trait]
impl OnInit for App {
    async fn on_init(&self) -> HookResult {
        self.journal.record("init App");
        Ok(())
    }
}

impl OnReady for App {
    fn on_ready(&self) -> HookResult {
        self.journal.record("ready App");
        Ok(())
    }
}

#[async_trait]
impl OnDestroy for App {
    async fn on_destroy(&self) -> HookResult {
        self.journal.record("destroy App");
        Ok(())
    }
}

impl Injectable for App {
    fn describe(d: DescriptorBuilder<Self>) -> DescriptorBuilder<Self> {
        d.consumes::<(Journal, Database)>()
            .declare::<Journal>()
            .declare::<Database>()
            .with_config(config::<Database>(json!({ "pool": 4 })))
    }

    fn construct(deps: &mut Dependencies) -> Result<Self, HookError> {
        Ok(Self {
            journal: deps.take()?,
            database: deps.take()?,
        })
    }
}

// A required configuration that nobody provides.
#[derive(Deserialize)]
struct StrictSettings {
    #[expect(dead_code, reason = "only deserialized")]
    level: u8,
}

struct Strict {
    settings: ConfigField<StrictSettings>,
}

impl Component for Strict {}

impl Injectable for Strict {
    fn describe(d: DescriptorBuilder<Self>) -> DescriptorBuilder<Self> {
        d.configuration("settings", |s| &s.settings)
    }

    fn construct(_: &mut Dependencies) -> Result<Self, HookError> {
        Ok(Self {
            settings: ConfigField::new(),
        })
    }
}

struct Fragile {
    journal: Arc<Journal>,
}

impl Component for Fragile {
    fn as_on_init(&self) -> Option<&dyn OnInit> {
        Some(self)
    }
}

#[async_trait]
impl OnInit for Fragile {
    async fn on_init(&self) -> HookResult {
        self.journal.record("init Fragile");
        Ok(())
    }
}

impl Injectable for Fragile {
    fn describe(d: DescriptorBuilder<Self>) -> DescriptorBuilder<Self> {
        d.consumes::<(Journal, Strict)>()
            .declare::<Journal>()
            .declare::<Strict>()
    }

    fn construct(deps: &mut Dependencies) -> Result<Self, HookError> {
        Ok(Self {
            journal: deps.take()?,
        })
    }
}

// Destroy hooks with mixed outcomes.
macro_rules! destroyable {
    ($name:ident, $outcome:expr) => {
        struct $name;

        impl Component for $name {
            fn as_on_destroy(&self) -> Option<&dyn OnDestroy> {
                Some(self)
            }
        }

        #[async_trait]
        impl OnDestroy for $name {
            async fn on_destroy(&self) -> HookResult {
                $outcome
            }
        }

        impl Injectable for $name {
            fn construct(_: &mut Dependencies) -> Result<Self, HookError> {
                Ok(Self)
            }
        }
    };
}

destroyable!(Flaky, Err("flaky".into()));
destroyable!(Solid, Ok(()));
destroyable!(Brittle, Err("brittle".into()));

struct Trio;

impl Component for Trio {}

impl Injectable for Trio {
    fn describe(d: DescriptorBuilder<Self>) -> DescriptorBuilder<Self> {
        d.consumes::<(Flaky, Solid, Brittle)>()
            .declare::<Flaky>()
            .declare::<Solid>()
            .declare::<Brittle>()
    }

    fn construct(_: &mut Dependencies) -> Result<Self, HookError> {
        Ok(Self)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn declared_dependencies_reach_ready_in_order() {
    let container = bootstrap::<App>(quiet()).await.unwrap();

    assert_eq!(container.state_of("App", None), Some(HookState::Ready));
    assert_eq!(container.state_of("Database", None), Some(HookState::Ready));
    assert_eq!(container.state_of("Journal", None), Some(HookState::Ready));

    let journal = container.gimme_as::<Journal>("test", None).unwrap();
    assert_eq!(
        journal.events(),
        [
            "configure App",
            "configure Database",
            "init Database",
            "init App",
            "ready Database",
            "ready App",
        ]
    );

    let errors = container.destroy_instances().await.unwrap();
    assert!(errors.is_empty());
    assert_eq!(
        journal.events()[6..],
        ["destroy Database", "destroy App"]
    );
}

#[tokio::test]
async fn configuration_layers_merge_right_biased() {
    let container = bootstrap::<App>(quiet()).await.unwrap();
    let app = container.gimme_as::<App>("test", None).unwrap();

    let settings = app.database.settings.get().unwrap();
    assert_eq!(
        *settings,
        DatabaseSettings {
            url: "memory://".into(),
            pool: 4,
        }
    );
}

#[tokio::test]
async fn missing_configuration_fails_before_any_init() {
    let container = Container::new();
    let err = bootstrap::<Fragile>(quiet().with_container(container.clone()))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        DiError::MissingConfiguration { ref provides, id: None } if provides == "Strict"
    ));
    let journal = container.gimme_as::<Journal>("test", None).unwrap();
    assert!(journal.events().iter().all(|event| !event.starts_with("init")));
    assert_eq!(container.state_of("Strict", None), Some(HookState::Unset));
}

#[tokio::test]
async fn destroy_collects_every_failure_in_instance_order() {
    let mut tester = StepTester::<Trio>::builder()
        .run_until(RunPhase::Ready)
        .build()
        .await
        .unwrap();

    let errors = tester.destroy().await.unwrap();
    let failed: Vec<_> = errors.iter().map(|err| err.provides.as_str()).collect();
    assert_eq!(failed, ["Flaky", "Brittle"]);
    assert_eq!(errors[1].source.to_string(), "brittle");

    for package in tester.container().instances() {
        assert_eq!(package.init_state, HookState::Destroyed, "{}", package.provides);
    }
}

#[tokio::test]
async fn phases_cannot_be_skipped_or_repeated() {
    let container = Container::new();
    container.register::<Trio>("test").unwrap();
    container.gimme("Trio", "test", None, None).unwrap();

    assert!(matches!(
        container.announce_ready(),
        Err(DiError::BootstrapPhase(_))
    ));

    container.configure_instances().await.unwrap();
    assert!(matches!(
        container.configure_instances().await,
        Err(DiError::BootstrapPhase(_))
    ));

    container.init_instances().await.unwrap();
    assert!(matches!(
        container.init_instances().await,
        Err(DiError::BootstrapPhase(_))
    ));

    container.announce_ready().unwrap();
    assert_eq!(container.destroy_instances().await.unwrap().len(), 2);
    assert!(matches!(
        container.destroy_instances().await,
        Err(DiError::BootstrapPhase(_))
    ));
}

#[tokio::test]
async fn instances_created_during_init_are_configured_first() {
    let container = Container::new();
    container.register::<App>("test").unwrap();
    container.gimme("Database", "test", None, None).unwrap();
    container.configure_instances().await.unwrap();

    // Created after the configure sweep; the init sweep picks it up.
    container.gimme("App", "test", None, None).unwrap();
    container.init_instances().await.unwrap();

    let journal = container.gimme_as::<Journal>("test", None).unwrap();
    assert_eq!(
        journal.events(),
        [
            "configure Database",
            "init Database",
            "configure App",
            "init App",
        ]
    );
}
