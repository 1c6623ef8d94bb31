//! Verb dispatch over a single composed configuration.
//!
//! The router composes the selected profile exactly once, then hands the
//! result to one of the execution collaborators. Verb validation happens
//! before composition, the scripted-mode check happens immediately after
//! it, and checkpoint resume is attempted only for `train` and only once
//! the trainer exists.

use std::str::FromStr;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use fnv::FnvHashMap;

use crucible_core::checkpoint;
use crucible_core::config::{field, ComposedConfig, FieldValue, Registry};
use crucible_core::error::{Error, Result};
use crucible_core::exec::{
    ContentGenerator, Dashboard, EvalOptions, EvalReport, ScriptedRunner, TrainingEngine,
};
use crucible_core::job::{Horizon, JobSpec, JobSpecBuilder};
use crucible_core::policy::{self, PolicyParams, SpaceSpec};

/// The closed set of command verbs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verb {
    /// Start or resume a distributed training run.
    Train,
    /// Run a fixed-length evaluation pass and report aggregate metrics.
    Evaluate,
    /// Open a long-lived streaming session for visualization clients.
    Render,
    /// Produce environment content artifacts, no training involved.
    Generate,
    /// Launch a dashboard over prior run artifacts.
    Visualize,
}

impl FromStr for Verb {
    type Err = Error;

    fn from_str(s: &str) -> Result<Verb> {
        match s {
            "train" => Ok(Verb::Train),
            "evaluate" => Ok(Verb::Evaluate),
            "render" => Ok(Verb::Render),
            "generate" => Ok(Verb::Generate),
            "visualize" => Ok(Verb::Visualize),
            _ => Err(Error::UnknownCommand(s.to_string())),
        }
    }
}

impl Verb {
    pub fn as_str(&self) -> &'static str {
        match self {
            Verb::Train => "train",
            Verb::Evaluate => "evaluate",
            Verb::Render => "render",
            Verb::Generate => "generate",
            Verb::Visualize => "visualize",
        }
    }
}

/// Dispatch lifecycle state, for logging and inspection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouterState {
    Idle,
    Composed,
    Dispatched,
    Running,
    Terminated,
}

/// Routes a single CLI invocation to an execution collaborator.
pub struct Router {
    registry: Registry,
    engine: Box<dyn TrainingEngine>,
    scripted: Box<dyn ScriptedRunner>,
    generator: Box<dyn ContentGenerator>,
    dashboard: Box<dyn Dashboard>,
    running: Arc<AtomicBool>,
    state: RouterState,
}

impl Router {
    pub fn new(
        registry: Registry,
        engine: Box<dyn TrainingEngine>,
        scripted: Box<dyn ScriptedRunner>,
        generator: Box<dyn ContentGenerator>,
        dashboard: Box<dyn Dashboard>,
    ) -> Router {
        Router {
            registry,
            engine,
            scripted,
            generator,
            dashboard,
            running: Arc::new(AtomicBool::new(true)),
            state: RouterState::Idle,
        }
    }

    /// Cooperative stop flag for long-lived verbs. Cleared by the process
    /// signal handler to request a graceful stop.
    pub fn running_flag(&self) -> Arc<AtomicBool> {
        self.running.clone()
    }

    pub fn state(&self) -> RouterState {
        self.state
    }

    /// Composes the configuration once and dispatches the verb against it.
    /// Terminates in `RouterState::Terminated` on completion or fatal
    /// error.
    pub fn dispatch(
        &mut self,
        verb: &str,
        profile: &str,
        overrides: &FnvHashMap<String, FieldValue>,
    ) -> Result<()> {
        let result = self.dispatch_inner(verb, profile, overrides);
        self.state = RouterState::Terminated;
        result
    }

    fn dispatch_inner(
        &mut self,
        verb: &str,
        profile: &str,
        overrides: &FnvHashMap<String, FieldValue>,
    ) -> Result<()> {
        // verb validation precedes composition: an unrecognized verb must
        // fail before any configuration side effects
        let verb = Verb::from_str(verb)?;

        let config = self.registry.compose(profile, overrides)?;
        self.state = RouterState::Composed;
        info!("composed profile {} for verb {}", config.profile(), verb.as_str());

        // scripted mode has no trainable policy table; checked right
        // after composition, before any trainer construction is attempted
        if let Some(baseline) = config.scripted() {
            return self.dispatch_scripted(verb, &config, &baseline);
        }

        self.state = RouterState::Dispatched;
        match verb {
            Verb::Train => self.train(&config),
            Verb::Evaluate => self.evaluate(&config),
            Verb::Render => self.render(&config),
            Verb::Generate => self.generator.generate(&config),
            Verb::Visualize => {
                self.state = RouterState::Running;
                self.dashboard.serve(&config, &self.running)
            }
        }
    }

    fn dispatch_scripted(
        &mut self,
        verb: Verb,
        config: &ComposedConfig,
        baseline: &str,
    ) -> Result<()> {
        self.state = RouterState::Dispatched;
        match verb {
            Verb::Train | Verb::Evaluate | Verb::Render => {
                info!(
                    "scripted mode: evaluating baseline {} instead of {}",
                    baseline,
                    verb.as_str()
                );
                let opts = eval_options(config)?;
                let report = self.scripted.evaluate(config, baseline, &opts)?;
                print_report(&report);
                Ok(())
            }
            Verb::Generate => self.generator.generate(config),
            Verb::Visualize => {
                self.state = RouterState::Running;
                self.dashboard.serve(config, &self.running)
            }
        }
    }

    /// Builds the policy table and the job specification. The table is
    /// complete before the engine sees anything, so a failure here leaves
    /// no partially-registered policy entries behind.
    fn build_job(&mut self, config: &ComposedConfig) -> Result<JobSpec> {
        self.engine
            .ensure_ready(config.get_bool(field::LOCAL_MODE)?)?;

        let npolicies = config.get_int(field::NPOLICIES)?;
        if npolicies <= 0 {
            return Err(Error::InvalidResourceSpec {
                field: field::NPOLICIES.to_string(),
                value: npolicies,
            });
        }
        let npolicies = npolicies as u32;

        let observation = SpaceSpec::observation(config)?;
        let action = SpaceSpec::action(config)?;
        let cooperative = config.get_bool(field::COOPERATIVE)?;
        let team_spirit = config.get_float(field::TEAM_SPIRIT)?;
        let policies = policy::build_policy_table(npolicies, observation, action, |index| {
            let mut params = PolicyParams::new();
            params.insert("policy_index".to_string(), FieldValue::Int(index as i64));
            if cooperative {
                params.insert("team_spirit".to_string(), FieldValue::Float(team_spirit));
            }
            Ok(params)
        })?;

        JobSpecBuilder::build(config, policies)
    }

    fn train(&mut self, config: &ComposedConfig) -> Result<()> {
        let spec = self.build_job(config)?;
        let mut handle = self.engine.run(&spec)?;

        // resume is attempted only for train, and only once the trainer
        // exists; a missing checkpoint aborts dispatch rather than
        // silently starting from scratch
        if config.get_bool(field::LOAD)? {
            let ckpt = checkpoint::latest_checkpoint(&spec.run_dir)?;
            info!("resuming from checkpoint: {}", ckpt.display());
            self.engine.restore(&mut handle, &ckpt)?;
        }

        self.state = RouterState::Running;
        self.engine.train(&mut handle, &self.running)
    }

    fn evaluate(&mut self, config: &ComposedConfig) -> Result<()> {
        let spec = self.build_job(config)?;
        let mut handle = self.engine.run(&spec)?;
        let opts = eval_options(config)?;
        let report = self.engine.evaluate(&mut handle, &opts)?;
        print_report(&report);
        Ok(())
    }

    fn render(&mut self, config: &ComposedConfig) -> Result<()> {
        let spec = self.build_job(config)?;
        let mut handle = self.engine.run(&spec)?;
        self.state = RouterState::Running;
        self.engine.render(&mut handle, &self.running)
    }
}

fn eval_options(config: &ComposedConfig) -> Result<EvalOptions> {
    Ok(EvalOptions {
        horizon: Horizon::from_config(config, field::EVALUATION_HORIZON)?,
        generalize: config.get_bool(field::GENERALIZE)?,
    })
}

fn print_report(report: &EvalReport) {
    println!(
        "evaluation complete: episodes={} steps={} mean_return={:.3}",
        report.episodes, report.steps, report.mean_return
    );
}
