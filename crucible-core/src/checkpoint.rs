//! Run-directory and checkpoint layout.
//!
//! Every training run owns a directory named after the composed profile
//! under the configured experiment root. The run directory holds an
//! `experiment.toml` manifest plus `checkpoint_<index>` subdirectories
//! with monotonically increasing indices; restore always targets an
//! exact existing checkpoint path.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use crate::config::{field, ComposedConfig};
use crate::error::{Error, Result};
use crate::{CHECKPOINT_DIR_PREFIX, CHECKPOINT_META_FILE, EXPERIMENT_MANIFEST_FILE, VERSION};

/// Resolves the run directory for a composed configuration:
/// `<EXPERIMENT_DIR>/<MODEL>`.
pub fn run_dir(config: &ComposedConfig) -> Result<PathBuf> {
    let root = config.get_str(field::EXPERIMENT_DIR)?;
    let name = config.get_str(field::MODEL)?;
    Ok(PathBuf::from(root).join(name))
}

/// Path of the checkpoint directory with the given index.
pub fn checkpoint_dir(run_dir: &Path, index: u32) -> PathBuf {
    run_dir.join(format!("{}{:06}", CHECKPOINT_DIR_PREFIX, index))
}

/// Finds the checkpoint directory with the highest index, or fails with
/// [`Error::CheckpointNotFound`] when the run directory holds none.
///
/// [`Error::CheckpointNotFound`]: ../error/enum.Error.html
pub fn latest_checkpoint(run_dir: &Path) -> Result<PathBuf> {
    let mut latest: Option<(u32, PathBuf)> = None;
    if run_dir.is_dir() {
        for entry in fs::read_dir(run_dir)? {
            let path = entry?.path();
            if !path.is_dir() {
                continue;
            }
            let index = match path
                .file_name()
                .and_then(|n| n.to_str())
                .and_then(|n| n.strip_prefix(CHECKPOINT_DIR_PREFIX))
                .and_then(|n| n.parse::<u32>().ok())
            {
                Some(i) => i,
                None => continue,
            };
            match latest {
                Some((max, _)) if max >= index => (),
                _ => latest = Some((index, path)),
            }
        }
    }
    latest
        .map(|(_, path)| path)
        .ok_or_else(|| Error::CheckpointNotFound(run_dir.to_path_buf()))
}

/// Index for the next checkpoint to be written: one past the highest
/// existing index, starting at 1.
pub fn next_checkpoint_index(run_dir: &Path) -> u32 {
    match latest_checkpoint(run_dir) {
        Ok(path) => path
            .file_name()
            .and_then(|n| n.to_str())
            .and_then(|n| n.strip_prefix(CHECKPOINT_DIR_PREFIX))
            .and_then(|n| n.parse::<u32>().ok())
            .map(|i| i + 1)
            .unwrap_or(1),
        Err(_) => 1,
    }
}

/// Manifest written into the run directory when a training run starts,
/// read back by the visualization dashboard.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExperimentManifest {
    pub profile: String,
    pub engine_version: String,
    pub created: DateTime<Utc>,
    pub num_agents: u32,
    pub num_policies: u32,
    pub num_workers: u32,
}

impl ExperimentManifest {
    pub fn new(
        profile: &str,
        num_agents: u32,
        num_policies: u32,
        num_workers: u32,
    ) -> ExperimentManifest {
        ExperimentManifest {
            profile: profile.to_string(),
            engine_version: VERSION.to_string(),
            created: Utc::now(),
            num_agents,
            num_policies,
            num_workers,
        }
    }

    pub fn write(&self, run_dir: &Path) -> Result<()> {
        let serialized = toml::to_string(self)?;
        fs::write(run_dir.join(EXPERIMENT_MANIFEST_FILE), serialized)?;
        Ok(())
    }

    pub fn read(run_dir: &Path) -> Result<ExperimentManifest> {
        let raw = fs::read_to_string(run_dir.join(EXPERIMENT_MANIFEST_FILE))?;
        Ok(toml::from_str(&raw)?)
    }
}

/// Metadata written into each checkpoint directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckpointMeta {
    pub iteration: u64,
    pub created: DateTime<Utc>,
    pub engine_version: String,
}

impl CheckpointMeta {
    pub fn new(iteration: u64) -> CheckpointMeta {
        CheckpointMeta {
            iteration,
            created: Utc::now(),
            engine_version: VERSION.to_string(),
        }
    }

    pub fn write(&self, checkpoint_dir: &Path) -> Result<()> {
        let serialized = toml::to_string(self)?;
        fs::write(checkpoint_dir.join(CHECKPOINT_META_FILE), serialized)?;
        Ok(())
    }

    pub fn read(checkpoint_dir: &Path) -> Result<CheckpointMeta> {
        let raw = fs::read_to_string(checkpoint_dir.join(CHECKPOINT_META_FILE))?;
        Ok(toml::from_str(&raw)?)
    }
}
