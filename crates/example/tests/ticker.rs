//! The ticker app driven step by step.

use example::{App, Worker};
use serde_json::json;
use tna_di::LifecyclePhase;
use tna_di::prelude::*;

#[tokio::test]
async fn zero_interval_fails_init() {
    let mut tester = StepTester::<Worker>::new(
        StepTesterOptions::new()
            .with_config(config::<Worker>(json!({ "interval_ms": 0, "label": "idle" }))),
    )
    .unwrap();
    tester.configure().await.unwrap();

    let err = tester.init().await.unwrap_err();
    assert!(matches!(
        err,
        DiError::Hook { phase: LifecyclePhase::Init, ref provides, .. } if provides == "Worker"
    ));
    assert!(err.to_string().contains("interval_ms must be greater than zero"));
    assert!(!tester.instance().is_running());
}

#[tokio::test]
async fn verbose_reaches_both_workers() {
    let mut tester = StepTester::<App>::new(StepTesterOptions::new().with_option("verbose", true))
        .unwrap();
    let app = tester.get_ready().await.unwrap();
    assert!(app.verbose());

    for id in ["foo", "bar"] {
        let worker = tester.container().gimme_as::<Worker>("test", Some(id)).unwrap();
        assert!(worker.is_verbose(), "{id}");
        assert!(worker.is_running(), "{id}");
    }
}

#[tokio::test]
async fn workers_stay_quiet_without_verbose() {
    let mut tester = StepTester::<App>::new(StepTesterOptions::new()).unwrap();
    let app = tester.get_ready().await.unwrap();
    assert!(!app.verbose());

    let foo = tester.container().gimme_as::<Worker>("test", Some("foo")).unwrap();
    assert!(!foo.is_verbose());

    assert!(tester.destroy().await.unwrap().is_empty());
    tokio::task::yield_now().await;
    assert!(!foo.is_running());
}
