//! Verb routing behavior against mock execution collaborators.

use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};

use fnv::FnvHashMap;
use tempfile::tempdir;

use crucible_core::config::{field, ComposedConfig, FieldValue};
use crucible_core::error::{Error, Result};
use crucible_core::exec::{
    ContentGenerator, Dashboard, EvalOptions, EvalReport, ScriptedRunner, TrainingEngine,
    TrainingHandle,
};
use crucible_core::job::JobSpec;
use crucible_core::profiles;
use crucible_cli::router::{Router, RouterState};

type CallLog = Arc<Mutex<Vec<String>>>;

fn push(calls: &CallLog, entry: &str) {
    calls.lock().unwrap().push(entry.to_string());
}

struct MockEngine {
    calls: CallLog,
}

impl TrainingEngine for MockEngine {
    fn ensure_ready(&mut self, _local_mode: bool) -> Result<()> {
        push(&self.calls, "ready");
        Ok(())
    }

    fn run(&mut self, spec: &JobSpec) -> Result<TrainingHandle> {
        push(&self.calls, &format!("run:{}", spec.env.profile));
        Ok(TrainingHandle {
            run_dir: spec.run_dir.clone(),
            iteration: 0,
        })
    }

    fn restore(&mut self, _handle: &mut TrainingHandle, checkpoint: &Path) -> Result<()> {
        push(
            &self.calls,
            &format!("restore:{}", checkpoint.file_name().unwrap().to_string_lossy()),
        );
        Ok(())
    }

    fn train(&mut self, _handle: &mut TrainingHandle, _running: &AtomicBool) -> Result<()> {
        push(&self.calls, "train");
        Ok(())
    }

    fn evaluate(
        &mut self,
        _handle: &mut TrainingHandle,
        _opts: &EvalOptions,
    ) -> Result<EvalReport> {
        push(&self.calls, "evaluate");
        Ok(EvalReport::default())
    }

    fn render(&mut self, _handle: &mut TrainingHandle, _running: &AtomicBool) -> Result<()> {
        push(&self.calls, "render");
        Ok(())
    }
}

struct MockScripted {
    calls: CallLog,
}

impl ScriptedRunner for MockScripted {
    fn evaluate(
        &mut self,
        _config: &ComposedConfig,
        policy: &str,
        _opts: &EvalOptions,
    ) -> Result<EvalReport> {
        push(&self.calls, &format!("scripted:{}", policy));
        Ok(EvalReport::default())
    }
}

struct MockGenerator {
    calls: CallLog,
}

impl ContentGenerator for MockGenerator {
    fn generate(&mut self, config: &ComposedConfig) -> Result<()> {
        push(&self.calls, &format!("generate:{}", config.profile()));
        Ok(())
    }
}

struct MockDashboard {
    calls: CallLog,
}

impl Dashboard for MockDashboard {
    fn serve(&mut self, config: &ComposedConfig, _running: &AtomicBool) -> Result<()> {
        push(&self.calls, &format!("serve:{}", config.profile()));
        Ok(())
    }
}

fn make_router(calls: &CallLog) -> Router {
    Router::new(
        profiles::builtin(),
        Box::new(MockEngine {
            calls: calls.clone(),
        }),
        Box::new(MockScripted {
            calls: calls.clone(),
        }),
        Box::new(MockGenerator {
            calls: calls.clone(),
        }),
        Box::new(MockDashboard {
            calls: calls.clone(),
        }),
    )
}

fn overrides(pairs: &[(&str, FieldValue)]) -> FnvHashMap<String, FieldValue> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

#[test]
fn unknown_verb_fails_before_composition() {
    let calls: CallLog = Default::default();
    let mut router = make_router(&calls);
    let result = router.dispatch("launch", "SmallWorlds", &FnvHashMap::default());
    match result {
        Err(Error::UnknownCommand(verb)) => assert_eq!(verb, "launch"),
        other => panic!("expected UnknownCommand, got: {:?}", other),
    }
    assert!(calls.lock().unwrap().is_empty());
    assert_eq!(router.state(), RouterState::Terminated);
}

#[test]
fn unknown_override_reaches_no_collaborator() {
    let calls: CallLog = Default::default();
    let mut router = make_router(&calls);
    let result = router.dispatch(
        "train",
        "SmallWorlds",
        &overrides(&[("NO_SUCH_FIELD", FieldValue::Int(1))]),
    );
    assert!(matches!(result, Err(Error::UnknownField(_))));
    assert!(calls.lock().unwrap().is_empty());
}

#[test]
fn train_without_resume_runs_the_engine() {
    let calls: CallLog = Default::default();
    let mut router = make_router(&calls);
    router
        .dispatch(
            "train",
            "SmallWorlds",
            &overrides(&[(field::LOAD, FieldValue::Bool(false))]),
        )
        .unwrap();
    assert_eq!(
        *calls.lock().unwrap(),
        vec!["ready", "run:SmallWorlds", "train"]
    );
    assert_eq!(router.state(), RouterState::Terminated);
}

#[test]
fn train_with_load_and_no_checkpoint_aborts() {
    let dir = tempdir().unwrap();
    let calls: CallLog = Default::default();
    let mut router = make_router(&calls);
    let result = router.dispatch(
        "train",
        "SmallWorlds",
        &overrides(&[(
            field::EXPERIMENT_DIR,
            FieldValue::Str(dir.path().to_string_lossy().to_string()),
        )]),
    );
    assert!(matches!(result, Err(Error::CheckpointNotFound(_))));
    // the trainer exists, but the training loop never starts
    let calls = calls.lock().unwrap();
    assert_eq!(*calls, vec!["ready", "run:SmallWorlds"]);
}

#[test]
fn train_resumes_from_the_latest_checkpoint() {
    let dir = tempdir().unwrap();
    let run_dir = dir.path().join("SmallWorlds");
    std::fs::create_dir_all(run_dir.join("checkpoint_000001")).unwrap();
    std::fs::create_dir_all(run_dir.join("checkpoint_000004")).unwrap();

    let calls: CallLog = Default::default();
    let mut router = make_router(&calls);
    router
        .dispatch(
            "train",
            "SmallWorlds",
            &overrides(&[(
                field::EXPERIMENT_DIR,
                FieldValue::Str(dir.path().to_string_lossy().to_string()),
            )]),
        )
        .unwrap();
    assert_eq!(
        *calls.lock().unwrap(),
        vec![
            "ready",
            "run:SmallWorlds",
            "restore:checkpoint_000004",
            "train"
        ]
    );
}

#[test]
fn scripted_mode_short_circuits_trainer_construction() {
    let calls: CallLog = Default::default();
    let mut router = make_router(&calls);
    router
        .dispatch(
            "train",
            "SmallWorlds",
            &overrides(&[(field::SCRIPTED, FieldValue::Str("forage".to_string()))]),
        )
        .unwrap();
    assert_eq!(*calls.lock().unwrap(), vec!["scripted:forage"]);

    calls.lock().unwrap().clear();
    let mut router = make_router(&calls);
    router
        .dispatch(
            "render",
            "SmallWorlds",
            &overrides(&[(field::SCRIPTED, FieldValue::Str("combat".to_string()))]),
        )
        .unwrap();
    assert_eq!(*calls.lock().unwrap(), vec!["scripted:combat"]);
}

#[test]
fn evaluate_is_bounded_and_reports() {
    let calls: CallLog = Default::default();
    let mut router = make_router(&calls);
    router
        .dispatch("evaluate", "Debug", &FnvHashMap::default())
        .unwrap();
    assert_eq!(*calls.lock().unwrap(), vec!["ready", "run:Debug", "evaluate"]);
}

#[test]
fn generate_touches_only_the_generator() {
    let calls: CallLog = Default::default();
    let mut router = make_router(&calls);
    router
        .dispatch("generate", "SmallWorlds", &FnvHashMap::default())
        .unwrap();
    assert_eq!(*calls.lock().unwrap(), vec!["generate:SmallWorlds"]);
}

#[test]
fn visualize_serves_the_dashboard() {
    let calls: CallLog = Default::default();
    let mut router = make_router(&calls);
    router
        .dispatch("visualize", "SmallWorlds", &FnvHashMap::default())
        .unwrap();
    assert_eq!(*calls.lock().unwrap(), vec!["serve:SmallWorlds"]);
}

#[test]
fn render_opens_a_streaming_session() {
    let calls: CallLog = Default::default();
    let mut router = make_router(&calls);
    // resume is never attempted for render, even with LOAD set
    router
        .dispatch("render", "SmallWorlds", &FnvHashMap::default())
        .unwrap();
    assert_eq!(
        *calls.lock().unwrap(),
        vec!["ready", "run:SmallWorlds", "render"]
    );
}
