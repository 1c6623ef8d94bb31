//! This library implements the experiment-configuration and job-assembly
//! core of the `crucible` multi-agent training pipeline.
//!
//! Programming interface is centered around the [`Registry`] of named
//! configuration profiles. A profile is an ordered composition of
//! [`ConfigNode`] field bundles, most specific first. Composing a profile
//! with a set of runtime overrides yields an immutable [`ComposedConfig`],
//! which in turn parametrizes the two assembly steps: the policy table
//! (agent-to-policy mapping plus per-policy specification bundles) and the
//! [`JobSpec`] handed to the external distributed training engine.
//!
//! # Execution
//!
//! By itself, this library does not run anything. The simulation engine,
//! the neural network model and the distributed executor are external
//! collaborators consumed through the narrow traits in [`exec`]. This
//! crate's responsibility ends at producing a correct, complete job
//! specification.
//!
//! ## Example
//!
//! ```ignore
//! use crucible_core::{profiles, FieldValue};
//! use fnv::FnvHashMap;
//!
//! let registry = profiles::builtin();
//! let mut overrides = FnvHashMap::default();
//! overrides.insert("NUM_WORKERS".to_string(), FieldValue::Int(4));
//! let config = registry.compose("SmallWorlds", &overrides).unwrap();
//! assert_eq!(config.get_int("NUM_WORKERS").unwrap(), 4);
//! ```
//!
//! [`Registry`]: config/struct.Registry.html
//! [`ConfigNode`]: config/struct.ConfigNode.html
//! [`ComposedConfig`]: config/struct.ComposedConfig.html
//! [`JobSpec`]: job/struct.JobSpec.html
//! [`exec`]: exec/index.html

#[macro_use]
extern crate serde;
#[macro_use]
extern crate log;

// reexports
pub use config::{ComposedConfig, ConfigNode, FieldValue, Registry};
pub use error::{Error, Result};
pub use job::{JobSpec, JobSpecBuilder};
pub use policy::PolicySpec;

pub mod checkpoint;
pub mod config;
pub mod error;
pub mod exec;
pub mod job;
pub mod policy;
pub mod profiles;

pub const VERSION: &'static str = env!("CARGO_PKG_VERSION");

/// Profile selected when no `--config` argument is given.
pub const DEFAULT_PROFILE: &str = "LargeWorlds";

/// Registration name under which the environment is made known to the
/// training engine.
pub const ENV_NAME: &str = "crucible";
/// Registration name for the custom recurrent model.
pub const MODEL_NAME: &str = "warden";

/// Name of the manifest file written into each run directory.
pub const EXPERIMENT_MANIFEST_FILE: &str = "experiment.toml";
/// Name of the metadata file written into each checkpoint directory.
pub const CHECKPOINT_META_FILE: &str = "checkpoint.toml";
/// Prefix for checkpoint subdirectories inside a run directory.
pub const CHECKPOINT_DIR_PREFIX: &str = "checkpoint_";
/// Name of the map artifacts directory within a run directory.
pub const MAPS_DIR_NAME: &str = "maps";

/// Agent unique integer identifier type.
pub type AgentId = u32;
/// Policy string identifier type.
pub type PolicyId = String;
