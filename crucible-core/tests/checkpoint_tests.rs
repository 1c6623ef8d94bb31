//! Run-directory layout, checkpoint discovery and manifest round-trips.

use std::fs;

use fnv::FnvHashMap;
use tempfile::tempdir;

use crucible_core::checkpoint::{self, CheckpointMeta, ExperimentManifest};
use crucible_core::config::{field, FieldValue};
use crucible_core::error::Error;
use crucible_core::profiles;

#[test]
fn run_dir_derives_from_experiment_dir_and_model() {
    let registry = profiles::builtin();
    let mut overrides = FnvHashMap::default();
    overrides.insert(
        field::EXPERIMENT_DIR.to_string(),
        FieldValue::Str("runs".to_string()),
    );
    let config = registry.compose("Debug", &overrides).unwrap();
    assert_eq!(
        checkpoint::run_dir(&config).unwrap(),
        std::path::PathBuf::from("runs/Debug")
    );
}

#[test]
fn checkpoint_dir_is_zero_padded() {
    let dir = tempdir().unwrap();
    let path = checkpoint::checkpoint_dir(dir.path(), 3);
    assert_eq!(path.file_name().unwrap(), "checkpoint_000003");
}

#[test]
fn latest_checkpoint_picks_the_highest_index() {
    let dir = tempdir().unwrap();
    for index in &[1u32, 2, 10] {
        fs::create_dir_all(checkpoint::checkpoint_dir(dir.path(), *index)).unwrap();
    }
    // unrelated entries are ignored
    fs::create_dir_all(dir.path().join("maps")).unwrap();
    fs::create_dir_all(dir.path().join("checkpoint_x")).unwrap();

    let latest = checkpoint::latest_checkpoint(dir.path()).unwrap();
    assert_eq!(latest.file_name().unwrap(), "checkpoint_000010");
    assert_eq!(checkpoint::next_checkpoint_index(dir.path()), 11);
}

#[test]
fn missing_checkpoint_is_an_error() {
    let dir = tempdir().unwrap();
    match checkpoint::latest_checkpoint(&dir.path().join("empty")) {
        Err(Error::CheckpointNotFound(_)) => (),
        other => panic!("expected CheckpointNotFound, got: {:?}", other.map(|_| ())),
    }
    assert_eq!(checkpoint::next_checkpoint_index(dir.path()), 1);
}

#[test]
fn experiment_manifest_round_trips() {
    let dir = tempdir().unwrap();
    let manifest = ExperimentManifest::new("SmallWorlds", 128, 16, 32);
    manifest.write(dir.path()).unwrap();
    let read = ExperimentManifest::read(dir.path()).unwrap();
    assert_eq!(read.profile, "SmallWorlds");
    assert_eq!(read.num_agents, 128);
    assert_eq!(read.num_policies, 16);
    assert_eq!(read.num_workers, 32);
}

#[test]
fn checkpoint_meta_round_trips() {
    let dir = tempdir().unwrap();
    CheckpointMeta::new(7).write(dir.path()).unwrap();
    let read = CheckpointMeta::read(dir.path()).unwrap();
    assert_eq!(read.iteration, 7);
}
