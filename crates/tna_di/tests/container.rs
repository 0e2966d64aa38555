//! Resolution, registration and keyed instances.

mod common;

use std::borrow::Cow;
use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};
use tna_di::prelude::*;

use common::{Journal, quiet};

#[derive(Debug, Deserialize)]
struct WorkerSettings {
    name: String,
}

struct Worker {
    settings: ConfigField<WorkerSettings>,
}

impl Component for Worker {}

impl Injectable for Worker {
    fn describe(d: DescriptorBuilder<Self>) -> DescriptorBuilder<Self> {
        d.configuration("settings", |w| &w.settings)
    }

    fn construct(_: &mut Dependencies) -> Result<Self, HookError> {
        Ok(Self {
            settings: ConfigField::new(),
        })
    }
}

impl Worker {
    fn name(&self) -> String {
        self.settings
            .get()
            .map(|settings| settings.name.clone())
            .unwrap_or_default()
    }
}

struct Pool {
    foo: Inject<Worker>,
    bar: Inject<Worker>,
}

impl Component for Pool {}

impl Injectable for Pool {
    fn describe(d: DescriptorBuilder<Self>) -> DescriptorBuilder<Self> {
        d.declare::<Worker>()
            .inject_keyed("foo", |p| &p.foo, "foo")
            .inject_keyed("bar", |p| &p.bar, "bar")
            .with_configs([
                config_for::<Worker>(json!({ "name": "first" }), "foo"),
                config_for::<Worker>(json!({ "name": "second" }), "bar"),
            ])
    }

    fn construct(_: &mut Dependencies) -> Result<Self, HookError> {
        Ok(Self {
            foo: Inject::new(),
            bar: Inject::new(),
        })
    }
}

// Provides the configuration of its own ephemeral worker.
struct Spawner {
    scratch: Inject<Worker>,
}

impl Component for Spawner {
    fn as_configuration_provider(&self) -> Option<&dyn ProvideConfigurations> {
        Some(self)
    }
}

#[async_trait]
impl ProvideConfigurations for Spawner {
    async fn provide_configurations(&self) -> Result<Vec<Configuration>, HookError> {
        Ok(vec![config_for::<Worker>(
            json!({ "name": "scratch" }),
            "<<scratch>>",
        )])
    }
}

impl Injectable for Spawner {
    fn describe(d: DescriptorBuilder<Self>) -> DescriptorBuilder<Self> {
        d.declare::<Worker>()
            .inject_keyed("scratch", |s| &s.scratch, "<<scratch>>")
    }

    fn construct(_: &mut Dependencies) -> Result<Self, HookError> {
        Ok(Self {
            scratch: Inject::new(),
        })
    }
}

struct First;
impl Component for First {}
impl Injectable for First {
    fn provides() -> Cow<'static, str> {
        Cow::Borrowed("Service")
    }
    fn construct(_: &mut Dependencies) -> Result<Self, HookError> {
        Ok(Self)
    }
}

struct Second;
impl Component for Second {}
impl Injectable for Second {
    fn provides() -> Cow<'static, str> {
        Cow::Borrowed("Service")
    }
    fn construct(_: &mut Dependencies) -> Result<Self, HookError> {
        Ok(Self)
    }
}

// Replaces First, but brings a configuration that clashes.
struct Third;
impl Component for Third {}
impl Injectable for Third {
    fn provides() -> Cow<'static, str> {
        Cow::Borrowed("Service")
    }
    fn describe(d: DescriptorBuilder<Self>) -> DescriptorBuilder<Self> {
        d.with_config(Configuration::new("Other", json!({ "from": "third" })))
    }
    fn construct(_: &mut Dependencies) -> Result<Self, HookError> {
        Ok(Self)
    }
}

struct Chicken;
impl Component for Chicken {}
impl Injectable for Chicken {
    fn describe(d: DescriptorBuilder<Self>) -> DescriptorBuilder<Self> {
        d.consumes::<Egg>().declare::<Egg>()
    }
    fn construct(_: &mut Dependencies) -> Result<Self, HookError> {
        Ok(Self)
    }
}

struct Egg;
impl Component for Egg {}
impl Injectable for Egg {
    fn describe(d: DescriptorBuilder<Self>) -> DescriptorBuilder<Self> {
        d.consumes::<Chicken>()
    }
    fn construct(_: &mut Dependencies) -> Result<Self, HookError> {
        Ok(Self)
    }
}

// Creates a child on demand once the container hands itself over.
struct Parent {
    journal: Arc<Journal>,
    container: OnceLock<WeakContainer>,
}

impl Component for Parent {
    fn as_on_instances_created(&self) -> Option<&dyn OnInstancesCreated> {
        Some(self)
    }
}

impl OnInstancesCreated for Parent {
    fn on_instances_created(
        &self,
        configuration: Option<&Value>,
        container: &Container,
    ) -> HookResult {
        let greeting = configuration
            .and_then(|config| config.get("greeting"))
            .and_then(Value::as_str)
            .unwrap_or("none");
        self.journal.record(format!("created Parent with {greeting}"));

        container.gimme("Journal", "Parent", Some("child"), None)?;
        let _ = self.container.set(container.downgrade());
        Ok(())
    }
}

impl Injectable for Parent {
    fn describe(d: DescriptorBuilder<Self>) -> DescriptorBuilder<Self> {
        d.consumes::<Journal>()
            .declare::<Journal>()
            .with_config(config::<Parent>(json!({ "greeting": "hi" })))
    }

    fn construct(deps: &mut Dependencies) -> Result<Self, HookError> {
        Ok(Self {
            journal: deps.take()?,
            container: OnceLock::new(),
        })
    }
}

#[tokio::test]
async fn keyed_instances_are_configured_from_their_own_id() {
    let mut tester = StepTester::<Pool>::new(StepTesterOptions::new()).unwrap();
    let pool = tester.get_ready().await.unwrap();

    let foo = pool.foo.get().unwrap();
    let bar = pool.bar.get().unwrap();
    assert!(!Arc::ptr_eq(&foo, &bar));
    assert_eq!(foo.name(), "first");
    assert_eq!(bar.name(), "second");

    let container = tester.container();
    assert_eq!(container.state_of("Worker", Some("foo")), Some(HookState::Ready));
    assert_eq!(container.state_of("Worker", None), None);
}

#[tokio::test]
async fn provided_configurations_follow_ephemeral_ids() {
    let mut tester = StepTester::<Spawner>::new(StepTesterOptions::new()).unwrap();
    let spawner = tester.get_ready().await.unwrap();

    let scratch = spawner.scratch.get().unwrap();
    assert_eq!(scratch.name(), "scratch");

    let (provides, id) = tester.container().identity_of(&*scratch).unwrap();
    assert_eq!(provides, "Worker");
    let id = id.unwrap();
    assert!(id.starts_with("scratch-"), "{id}");
    assert_ne!(id, "<<scratch>>");
}

#[test]
fn reregistration_replaces_the_template_but_not_the_instance() {
    let container = Container::new();
    container.register::<First>("first").unwrap();
    let before = container.gimme("Service", "test", None, None).unwrap();

    container.register::<Second>("second").unwrap();
    let template = container.template("Service").unwrap();
    assert_eq!(template.declared_by, "second");
    assert!(template.descriptor.type_name().ends_with("Second"));

    let after = container.gimme("Service", "test", None, None).unwrap();
    assert!(Arc::ptr_eq(&before, &after));
    assert!(after.is::<First>());

    let fresh = Container::new();
    fresh.register::<First>("first").unwrap();
    fresh.register::<Second>("second").unwrap();
    assert!(fresh.gimme("Service", "test", None, None).unwrap().is::<Second>());
}

#[test]
fn failed_reregistration_keeps_the_previous_template() {
    let container = Container::new();
    container.register::<First>("first").unwrap();
    container
        .register_configs([Configuration::new("Other", json!({ "from": "outside" }))])
        .unwrap();

    let err = container.register::<Third>("third").unwrap_err();
    assert!(matches!(err, DiError::UnspecificConfig { .. }));

    let template = container.template("Service").unwrap();
    assert_eq!(template.declared_by, "first");
    assert!(container.gimme("Service", "test", None, None).unwrap().is::<First>());
    assert_eq!(
        container.configuration_for("Other", None).unwrap().config,
        json!({ "from": "outside" })
    );
}

#[test]
fn unknown_providers_are_named_in_the_error() {
    let err = Container::new()
        .gimme("Nonexistent", "test", None, None)
        .err().unwrap();
    assert!(matches!(err, DiError::MissingDeclaration { .. }));
    assert!(err.to_string().contains("Nonexistent"));
}

#[test]
fn duplicate_configurations_are_rejected() {
    let container = Container::new();
    container
        .register_configs([config_for::<Worker>(json!({ "name": "a" }), "foo")])
        .unwrap();
    let err = container
        .register_configs([config_for::<Worker>(json!({ "name": "b" }), "foo")])
        .unwrap_err();
    assert!(matches!(err, DiError::UnspecificConfig { .. }));

    let config = container.configuration_for("Worker", Some("foo")).unwrap();
    assert_eq!(config.config, json!({ "name": "a" }));
}

#[tokio::test]
async fn cyclic_roots_fail_to_bootstrap() {
    let err = bootstrap::<Chicken>(quiet()).await.unwrap_err();
    let DiError::CyclicDependency { chain } = err else {
        panic!("expected a cycle, got {err}");
    };
    assert_eq!(chain, ["Chicken", "Egg", "Chicken"]);
}

#[tokio::test]
async fn instances_created_from_hooks_join_the_lifecycle() {
    let container = bootstrap::<Parent>(quiet()).await.unwrap();

    assert_eq!(
        container.state_of("Journal", Some("child")),
        Some(HookState::Ready)
    );

    let parent = container.gimme_as::<Parent>("test", None).unwrap();
    assert_eq!(parent.journal.events(), ["created Parent with hi"]);

    let weak = parent.container.get().unwrap();
    assert!(weak.upgrade().is_some());
}

#[test]
fn packages_expose_identity_and_dependencies() {
    let container = Container::new();
    container.register::<Parent>("test").unwrap();
    let parent = container.gimme("Parent", "test", None, None).unwrap();

    let package = container.instance_package_containing(&*parent).unwrap();
    assert_eq!(package.provides, "Parent");
    assert_eq!(package.init_state, HookState::Unset);
    let tokens: Vec<_> = package.consumes.iter().map(|dep| dep.token.as_str()).collect();
    assert_eq!(tokens, ["Journal"]);
}
