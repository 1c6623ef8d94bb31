//! Determinism and coverage of the agent-to-policy assignment and the
//! policy table builder.

use std::collections::BTreeMap;
use std::collections::HashSet;

use fnv::FnvHashMap;

use crucible_core::config::FieldValue;
use crucible_core::error::Error;
use crucible_core::policy::{self, PolicyParams, SpaceSpec};
use crucible_core::profiles;

fn spaces() -> (SpaceSpec, SpaceSpec) {
    let registry = profiles::builtin();
    let config = registry
        .compose("SmallWorlds", &FnvHashMap::default())
        .unwrap();
    (
        SpaceSpec::observation(&config).unwrap(),
        SpaceSpec::action(&config).unwrap(),
    )
}

#[test]
fn assignment_follows_the_modulo_rule() {
    let mapping = policy::assign(128, 16).unwrap();
    assert_eq!(mapping.len(), 128);
    for (agent_id, policy_id) in &mapping {
        assert_eq!(*policy_id, format!("policy_{}", agent_id % 16));
    }
    let distinct: HashSet<&String> = mapping.values().collect();
    assert_eq!(distinct.len(), 16);
}

#[test]
fn assignment_covers_every_policy_when_agents_suffice() {
    for &(agents, policies) in &[(1u32, 1u32), (5, 3), (16, 16), (128, 16), (1024, 32)] {
        let mapping = policy::assign(agents, policies).unwrap();
        let distinct: HashSet<&String> = mapping.values().collect();
        assert_eq!(
            distinct.len() as u32,
            policies,
            "coverage failed for N={} K={}",
            agents,
            policies
        );
    }
}

#[test]
fn fewer_agents_than_policies_still_maps_deterministically() {
    let mapping = policy::assign(2, 4).unwrap();
    assert_eq!(mapping[&0], "policy_0");
    assert_eq!(mapping[&1], "policy_1");
    assert_eq!(mapping.len(), 2);
}

#[test]
fn table_key_set_is_exactly_the_policy_range() {
    let (obs, act) = spaces();
    let table = policy::build_policy_table(16, obs, act, |index| {
        let mut params = PolicyParams::new();
        params.insert("policy_index".to_string(), FieldValue::Int(index as i64));
        Ok(params)
    })
    .unwrap();

    let expected: Vec<String> = (0..16).map(|i| format!("policy_{}", i)).collect();
    let mut keys: Vec<String> = table.keys().cloned().collect();
    keys.sort();
    let mut expected_sorted = expected.clone();
    expected_sorted.sort();
    assert_eq!(keys, expected_sorted);

    for (id, spec) in &table {
        let index = match spec.params.get("policy_index") {
            Some(FieldValue::Int(i)) => *i,
            other => panic!("missing policy_index: {:?}", other),
        };
        assert_eq!(*id, format!("policy_{}", index));
        assert_eq!(spec.observation.dims, vec![100]);
        assert_eq!(spec.action.dims, vec![8]);
    }
}

#[test]
fn params_failure_aborts_the_whole_table() {
    let (obs, act) = spaces();
    let result = policy::build_policy_table(8, obs, act, |index| {
        if index == 2 {
            return Err(Error::Other("weights unavailable".to_string()));
        }
        Ok(BTreeMap::new())
    });
    assert!(result.is_err());
}

#[test]
fn zero_policy_count_is_rejected() {
    let (obs, act) = spaces();
    assert!(policy::assign(4, 0).is_err());
    assert!(policy::build_policy_table(0, obs, act, |_| Ok(BTreeMap::new())).is_err());
}
