//! Training-job specification assembly.
//!
//! The builder is a straight transcription of the composed configuration
//! into a declarative record: it validates shapes (positive resource and
//! batch values, well-formed horizons) but performs no resizing and no
//! clamping beyond what the configuration itself encodes. Keeping batch
//! size and worker count consistent is the configuration authors'
//! responsibility; mismatched values are surfaced in the assembled spec
//! as-is.

use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::checkpoint;
use crate::config::{field, ComposedConfig, FieldValue};
use crate::error::{Error, Result};
use crate::policy::PolicySpec;
use crate::{PolicyId, ENV_NAME, MODEL_NAME};

/// Environments simulated concurrently by each rollout worker.
pub const NUM_ENVS_PER_WORKER: u32 = 1;
/// Training iterations between evaluation passes.
pub const EVALUATION_INTERVAL: u32 = 5;
/// Episodes per evaluation pass.
pub const EVALUATION_EPISODES: u32 = 1;
/// Number of most recent checkpoints kept on disk.
pub const KEEP_CHECKPOINTS: u32 = 5;
/// Training iterations between checkpoints.
pub const CHECKPOINT_FREQ: u32 = 1;

/// Episode horizon: a finite positive step count or explicitly unbounded.
/// Unbounded episodes only terminate on an external terminal signal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Horizon {
    Finite(u64),
    Unbounded,
}

impl Horizon {
    /// Parses a horizon field value: a positive integer or the explicit
    /// `"unbounded"` marker.
    pub fn from_config(config: &ComposedConfig, name: &str) -> Result<Horizon> {
        match config.get(name)? {
            FieldValue::Int(n) if n > 0 => Ok(Horizon::Finite(n as u64)),
            FieldValue::Str(ref s) if s == "unbounded" => Ok(Horizon::Unbounded),
            other => Err(Error::InvalidHorizon {
                field: name.to_string(),
                value: other.to_string(),
            }),
        }
    }
}

impl std::fmt::Display for Horizon {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Horizon::Finite(n) => write!(f, "{}", n),
            Horizon::Unbounded => write!(f, "unbounded"),
        }
    }
}

/// Environment registration descriptor.
#[derive(Debug, Clone, PartialEq)]
pub struct EnvDescriptor {
    /// Registration name the engine knows the environment under.
    pub name: String,
    /// Profile the per-instance environment config was composed from.
    pub profile: String,
    pub num_agents: u32,
}

/// Model registration descriptor.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelDescriptor {
    /// Registration name the engine knows the model under.
    pub name: String,
    pub hidden: i64,
    pub embed: i64,
    /// Maximum recurrent sequence length (truncated BPTT horizon).
    pub max_seq_len: i64,
}

/// Evaluation cadence settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EvalCadence {
    pub interval: u32,
    pub episodes: u32,
    pub parallel_to_training: bool,
}

/// Checkpoint cadence settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CheckpointCadence {
    pub keep: u32,
    pub every: u32,
}

/// Complete declarative description of a distributed training run,
/// independent of the engine that executes it. Built once per invocation,
/// never mutated after construction, consumed exactly once by dispatch.
#[derive(Debug, Clone, PartialEq)]
pub struct JobSpec {
    pub num_workers: u32,
    pub num_gpus: u32,
    pub num_gpus_per_worker: u32,
    pub num_envs_per_worker: u32,

    pub train_batch_size: u64,
    pub rollout_fragment_length: u64,
    pub sgd_minibatch_size: u64,
    pub num_sgd_iter: u32,
    pub train_epochs: u64,

    pub horizon: Horizon,
    pub soft_horizon: bool,
    pub no_done_at_end: bool,
    pub train_horizon: Horizon,
    pub evaluation_horizon: Horizon,

    pub env: EnvDescriptor,
    pub model: ModelDescriptor,
    pub policies: BTreeMap<PolicyId, PolicySpec>,

    pub evaluation: EvalCadence,
    pub checkpoints: CheckpointCadence,
    /// Directory the run writes its manifest and checkpoints into.
    pub run_dir: PathBuf,
}

/// Assembles the job specification from a composed configuration and a
/// complete policy table.
///
/// Fails fast with [`Error::MissingField`] when a referenced field is
/// absent from the composition and with [`Error::InvalidResourceSpec`]
/// when a resource or batch field is not a positive integer; no partial
/// spec is ever returned.
///
/// [`Error::MissingField`]: ../error/enum.Error.html
/// [`Error::InvalidResourceSpec`]: ../error/enum.Error.html
pub struct JobSpecBuilder;

impl JobSpecBuilder {
    pub fn build(
        config: &ComposedConfig,
        policies: BTreeMap<PolicyId, PolicySpec>,
    ) -> Result<JobSpec> {
        let num_workers = positive(config, field::NUM_WORKERS)? as u32;
        let num_gpus = positive(config, field::NUM_GPUS)? as u32;
        let num_gpus_per_worker = non_negative(config, field::NUM_GPUS_PER_WORKER)? as u32;

        let train_batch_size = positive(config, field::TRAIN_BATCH_SIZE)? as u64;
        let rollout_fragment_length = positive(config, field::ROLLOUT_FRAGMENT_LENGTH)? as u64;
        let sgd_minibatch_size = positive(config, field::SGD_MINIBATCH_SIZE)? as u64;
        let num_sgd_iter = positive(config, field::NUM_SGD_ITER)? as u32;
        let train_epochs = positive(config, field::TRAIN_EPOCHS)? as u64;

        let horizon = Horizon::from_config(config, field::HORIZON)?;
        let train_horizon = Horizon::from_config(config, field::TRAIN_HORIZON)?;
        let evaluation_horizon = Horizon::from_config(config, field::EVALUATION_HORIZON)?;

        let env = EnvDescriptor {
            name: ENV_NAME.to_string(),
            profile: config.profile().to_string(),
            num_agents: positive(config, field::NENT)? as u32,
        };
        let model = ModelDescriptor {
            name: MODEL_NAME.to_string(),
            hidden: positive(config, field::HIDDEN)?,
            embed: positive(config, field::EMBED)?,
            max_seq_len: positive(config, field::LSTM_BPTT_HORIZON)?,
        };
        let run_dir = checkpoint::run_dir(config)?;

        Ok(JobSpec {
            num_workers,
            num_gpus,
            num_gpus_per_worker,
            num_envs_per_worker: NUM_ENVS_PER_WORKER,
            train_batch_size,
            rollout_fragment_length,
            sgd_minibatch_size,
            num_sgd_iter,
            train_epochs,
            horizon,
            soft_horizon: false,
            no_done_at_end: false,
            train_horizon,
            evaluation_horizon,
            env,
            model,
            policies,
            evaluation: EvalCadence {
                interval: EVALUATION_INTERVAL,
                episodes: EVALUATION_EPISODES,
                parallel_to_training: false,
            },
            checkpoints: CheckpointCadence {
                keep: KEEP_CHECKPOINTS,
                every: CHECKPOINT_FREQ,
            },
            run_dir,
        })
    }
}

fn positive(config: &ComposedConfig, name: &str) -> Result<i64> {
    let value = config.get_int(name)?;
    if value <= 0 {
        return Err(Error::InvalidResourceSpec {
            field: name.to_string(),
            value,
        });
    }
    Ok(value)
}

fn non_negative(config: &ComposedConfig, name: &str) -> Result<i64> {
    let value = config.get_int(name)?;
    if value < 0 {
        return Err(Error::InvalidResourceSpec {
            field: name.to_string(),
            value,
        });
    }
    Ok(value)
}
