//! Built-in configuration nodes and profiles.
//!
//! Profiles are modeled as explicit ordered compositions of field bundles
//! rather than an inheritance hierarchy, which keeps precedence auditable:
//! the effective value of a field is always the one from the first node in
//! the flattened composition order that defines it.

use crate::config::{field, ConfigNode, FieldValue, Registry};

/// Builds the registry of built-in nodes and profiles. Called once at
/// process start; the result is read-only for the rest of the invocation.
pub fn builtin() -> Registry {
    let mut registry = Registry::new();

    // Base learner settings shared by every profile. Environment and
    // evaluation parameters live in the separate `world` node.
    registry.add_node(
        ConfigNode::new("learner")
            .set(field::EXPERIMENT_DIR, "experiments")
            .set(field::NUM_GPUS_PER_WORKER, 0)
            .set(field::NUM_GPUS, 1)
            .set(field::NUM_WORKERS, 1)
            .set(field::LOCAL_MODE, false)
            .set(field::LOAD, true)
            .set(field::TRAIN_EPOCHS, 10000)
            .set(field::LSTM_BPTT_HORIZON, 16)
            .set(field::NUM_SGD_ITER, 1)
            .set(field::SCRIPTED, "")
            .set(field::N_AGENT_OBS, 100)
            .set(field::NPOLICIES, 1)
            .set(field::HIDDEN, 64)
            .set(field::EMBED, 64)
            .set(field::TEAM_SPIRIT, 0.0)
            .set(field::ACHIEVEMENT_SCALE, 1.0 / 15.0)
            .set(field::HORIZON, "unbounded")
            .set(field::GENERALIZE, true)
            // model name follows the profile the config was composed from
            .computed(field::MODEL, |c| {
                Ok(FieldValue::Str(c.profile().to_string()))
            }),
    );

    // World scale and content parameters.
    registry.add_node(
        ConfigNode::new("world")
            .set(field::NENT, 256)
            .set(field::NMOB, 128)
            .set(field::NPOP, 8)
            .set(field::N_ACTIONS, 8)
            .set(field::COOPERATIVE, false)
            .set(field::TERRAIN_SIZE, 1024)
            .set(field::TERRAIN_TRAIN_MAPS, 256),
    );

    // Game system toggles consumed by the environment collaborator.
    registry.add_node(
        ConfigNode::new("systems")
            .set(field::RESOURCE_SYSTEM, true)
            .set(field::COMBAT_SYSTEM, true)
            .set(field::PROGRESSION_SYSTEM, true)
            .set(field::ACHIEVEMENT_SYSTEM, false),
    );

    // Large scale training setting: up to 1024 concurrent agents on
    // 1024-tile maps with long train/eval horizons. The default profile.
    registry.add_node(
        ConfigNode::new("large_worlds")
            .set(field::NUM_WORKERS, 16)
            .computed(field::TRAIN_BATCH_SIZE, |c| {
                Ok(FieldValue::Int(32 * c.get_int(field::NUM_WORKERS)?))
            })
            .set(field::ROLLOUT_FRAGMENT_LENGTH, 32)
            .set(field::SGD_MINIBATCH_SIZE, 256)
            .set(field::TRAIN_HORIZON, 8192)
            .set(field::EVALUATION_HORIZON, 8192)
            .set(field::NENT, 1024),
    );

    // Small scale training setting: 128 agents on 64-tile maps with
    // 1024-step horizons. Appropriate as a quick train task for new ideas
    // or as a transfer target for agents trained on large worlds.
    registry.add_node(
        ConfigNode::new("small_worlds")
            .set(field::NUM_WORKERS, 32)
            .computed(field::TRAIN_BATCH_SIZE, |c| {
                Ok(FieldValue::Int(256 * c.get_int(field::NUM_WORKERS)?))
            })
            .set(field::ROLLOUT_FRAGMENT_LENGTH, 32)
            .computed(field::SGD_MINIBATCH_SIZE, |c| {
                Ok(FieldValue::Int(std::cmp::min(
                    128,
                    c.get_int(field::TRAIN_BATCH_SIZE)?,
                )))
            })
            .set(field::TRAIN_HORIZON, 1024)
            .set(field::EVALUATION_HORIZON, 1024)
            .set(field::NENT, 128)
            .set(field::NMOB, 32)
            .set(field::TERRAIN_SIZE, 64)
            .set(field::ORE_RESPAWN, 0.01)
            .set(field::TREE_RESPAWN, 0.01)
            .curve(field::EQUIPMENT_DEFENSE, |level| level as f64 / 4.0)
            .curve(field::EQUIPMENT_OFFENSE, |level| level as f64 / 4.0)
            .curve(field::DAMAGE_MELEE, |level| {
                (10.0 + level as f64 * 70.0 / 99.0).round()
            })
            .curve(field::DAMAGE_RANGE, |level| {
                (3.0 + level as f64 * 32.0 / 99.0).round()
            })
            .curve(field::DAMAGE_MAGE, |level| {
                (1.0 + level as f64 * 24.0 / 99.0).round()
            })
            .curve(field::RESTORE, |level| level as f64),
    );

    // Debug overlay with greatly reduced batch parameters. Only intended
    // as a tool for identifying bugs in the model or environment.
    registry.add_node(
        ConfigNode::new("debug")
            .set(field::LOAD, false)
            .set(field::LOCAL_MODE, true)
            .set(field::NUM_WORKERS, 1)
            .set(field::SGD_MINIBATCH_SIZE, 100)
            .set(field::TRAIN_BATCH_SIZE, 400)
            .set(field::TRAIN_HORIZON, 200)
            .set(field::EVALUATION_HORIZON, 50)
            .set(field::HIDDEN, 2)
            .set(field::EMBED, 2),
    );

    // Tournament overlay enabling achievement-based scoring.
    registry.add_node(ConfigNode::new("tournament").set(field::ACHIEVEMENT_SYSTEM, true));

    registry.add_node(
        ConfigNode::new("round1")
            .set(field::NENT, 128)
            .set(field::NPOP, 1),
    );
    registry.add_node(
        ConfigNode::new("round2")
            .set(field::NENT, 128)
            .set(field::NPOP, 16)
            .set(field::NPOLICIES, 16)
            .set(field::COOPERATIVE, true),
    );
    registry.add_node(
        ConfigNode::new("round3")
            .set(field::NENT, 1024)
            .set(field::NPOP, 32)
            .set(field::NPOLICIES, 32)
            .set(field::COOPERATIVE, true),
    );

    // Cooperative reward shaping across fixed teams.
    registry.add_node(
        ConfigNode::new("team_based")
            .set(field::NENT, 128)
            .set(field::NPOP, 32)
            .set(field::COOPERATIVE, true)
            .set(field::TEAM_SPIRIT, 0.5),
    );

    registry.add_profile("LargeWorlds", vec!["large_worlds", "learner", "world", "systems"]);
    registry.add_profile("SmallWorlds", vec!["small_worlds", "learner", "world", "systems"]);
    registry.add_profile("Debug", vec!["debug", "SmallWorlds"]);
    registry.add_profile("TournamentRound1", vec!["round1", "tournament", "SmallWorlds"]);
    registry.add_profile("TournamentRound2", vec!["round2", "tournament", "SmallWorlds"]);
    registry.add_profile("TournamentRound3", vec!["round3", "tournament", "LargeWorlds"]);
    registry.add_profile("TeamBased", vec!["team_based", "SmallWorlds"]);

    registry
}
