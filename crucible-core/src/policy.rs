//! Agent-to-policy assignment and per-policy specification bundles.

use std::collections::BTreeMap;

use crate::config::{field, ComposedConfig, FieldValue};
use crate::error::{Error, Result};
use crate::{AgentId, PolicyId};

/// Prefix shared by all policy identifiers.
pub const POLICY_ID_PREFIX: &str = "policy_";

/// Per-policy parameter bundle passed through to the training engine.
pub type PolicyParams = BTreeMap<String, FieldValue>;

/// Observation or action space descriptor. The actual space contents are
/// defined by the environment collaborator; this is the registration-level
/// description the training engine needs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpaceSpec {
    pub id: String,
    pub dims: Vec<i64>,
}

impl SpaceSpec {
    /// Observation space descriptor derived from the composed config.
    pub fn observation(config: &ComposedConfig) -> Result<SpaceSpec> {
        Ok(SpaceSpec {
            id: "observation".to_string(),
            dims: vec![config.get_int(field::N_AGENT_OBS)?],
        })
    }

    /// Action space descriptor derived from the composed config.
    pub fn action(config: &ComposedConfig) -> Result<SpaceSpec> {
        Ok(SpaceSpec {
            id: "action".to_string(),
            dims: vec![config.get_int(field::N_ACTIONS)?],
        })
    }
}

/// Specification bundle for a single policy: spaces plus extra parameters.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PolicySpec {
    pub observation: SpaceSpec,
    pub action: SpaceSpec,
    pub params: PolicyParams,
}

/// Returns the policy identifier for an agent: round-robin over the
/// configured policy count.
pub fn policy_id(agent_id: AgentId, policy_count: u32) -> PolicyId {
    format!("{}{}", POLICY_ID_PREFIX, agent_id % policy_count)
}

/// Maps each agent identifier in `[0, agent_count)` to a policy
/// identifier. The mapping is pure and deterministic, and covers every
/// policy identifier whenever `agent_count >= policy_count`.
pub fn assign(agent_count: u32, policy_count: u32) -> Result<BTreeMap<AgentId, PolicyId>> {
    if policy_count == 0 {
        return Err(Error::InvalidResourceSpec {
            field: field::NPOLICIES.to_string(),
            value: 0,
        });
    }
    let mut mapping = BTreeMap::new();
    for agent_id in 0..agent_count {
        mapping.insert(agent_id, policy_id(agent_id, policy_count));
    }
    Ok(mapping)
}

/// Builds the full policy table: one entry per policy index in
/// `[0, policy_count)`, each carrying the shared spaces and the parameters
/// returned by `extra_params`.
///
/// A failure of `extra_params` is a misconfiguration and aborts the whole
/// table; partial tables are never returned.
pub fn build_policy_table<F>(
    policy_count: u32,
    observation: SpaceSpec,
    action: SpaceSpec,
    extra_params: F,
) -> Result<BTreeMap<PolicyId, PolicySpec>>
where
    F: Fn(u32) -> Result<PolicyParams>,
{
    if policy_count == 0 {
        return Err(Error::InvalidResourceSpec {
            field: field::NPOLICIES.to_string(),
            value: 0,
        });
    }
    let mut table = BTreeMap::new();
    for index in 0..policy_count {
        let params = extra_params(index)?;
        table.insert(
            policy_id(index, policy_count),
            PolicySpec {
                observation: observation.clone(),
                action: action.clone(),
                params,
            },
        );
    }
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mapping_is_round_robin() {
        let mapping = assign(8, 3).unwrap();
        for agent_id in 0..8 {
            assert_eq!(mapping[&agent_id], format!("policy_{}", agent_id % 3));
        }
    }

    #[test]
    fn zero_policies_is_a_misconfiguration() {
        assert!(assign(4, 0).is_err());
    }
}
