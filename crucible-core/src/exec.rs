//! Interfaces to the external execution collaborators.
//!
//! The distributed training engine, the scripted baselines, the content
//! generator and the visualization dashboard are all out of scope for
//! this crate and are consumed through the narrow traits defined here.
//! Long-lived operations take a cooperative `running` flag; clearing it
//! requests a graceful stop.

use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;

use crate::config::ComposedConfig;
use crate::error::Result;
use crate::job::{Horizon, JobSpec};

/// Handle to a constructed training job, returned by
/// [`TrainingEngine::run`] and threaded through every later engine call.
///
/// [`TrainingEngine::run`]: trait.TrainingEngine.html
#[derive(Debug, Clone)]
pub struct TrainingHandle {
    pub run_dir: PathBuf,
    pub iteration: u64,
}

/// Options for a bounded evaluation pass.
#[derive(Debug, Clone, Copy)]
pub struct EvalOptions {
    pub horizon: Horizon,
    /// Evaluate on held-out maps instead of the training set.
    pub generalize: bool,
}

/// Aggregate metrics reported by an evaluation pass.
#[derive(Debug, Clone, Copy, Default)]
pub struct EvalReport {
    pub episodes: u32,
    pub steps: u64,
    pub mean_return: f64,
}

/// The distributed training engine.
///
/// `run` consumes the job specification exactly once and must register
/// the environment, the model and the complete policy table atomically:
/// a failure leaves no partially-registered policy entries behind.
pub trait TrainingEngine {
    /// One-time idempotent process-wide engine setup. Must be called
    /// before any other engine operation; later calls are no-ops.
    fn ensure_ready(&mut self, local_mode: bool) -> Result<()>;
    /// Constructs the trainer from a complete job specification.
    fn run(&mut self, spec: &JobSpec) -> Result<TrainingHandle>;
    /// Restores trainer state from an exact existing checkpoint path.
    fn restore(&mut self, handle: &mut TrainingHandle, checkpoint: &Path) -> Result<()>;
    /// Runs the training loop until the stop criterion is reached or the
    /// `running` flag is cleared. Blocking.
    fn train(&mut self, handle: &mut TrainingHandle, running: &AtomicBool) -> Result<()>;
    /// Runs a fixed-length evaluation pass and reports aggregate metrics.
    fn evaluate(&mut self, handle: &mut TrainingHandle, opts: &EvalOptions) -> Result<EvalReport>;
    /// Opens a long-lived streaming session for external visualization
    /// clients. Blocking until the `running` flag is cleared.
    fn render(&mut self, handle: &mut TrainingHandle, running: &AtomicBool) -> Result<()>;
}

/// Direct evaluation of a fixed, non-trainable decision procedure. Used
/// when the composed configuration designates scripted execution mode,
/// which has no trainable policy table.
pub trait ScriptedRunner {
    fn evaluate(
        &mut self,
        config: &ComposedConfig,
        policy: &str,
        opts: &EvalOptions,
    ) -> Result<EvalReport>;
}

/// Environment content generator. Consumes the composed configuration's
/// terrain fields; artifacts land on persistent storage.
pub trait ContentGenerator {
    fn generate(&mut self, config: &ComposedConfig) -> Result<()>;
}

/// Web dashboard over prior run artifacts. Blocking until the `running`
/// flag is cleared.
pub trait Dashboard {
    fn serve(&mut self, config: &ComposedConfig, running: &AtomicBool) -> Result<()>;
}
