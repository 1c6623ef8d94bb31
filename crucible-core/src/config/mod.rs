//! Configuration nodes, named profiles and the composition logic that
//! turns them into a single effective configuration object.
//!
//! A [`ConfigNode`] is a reusable bundle of field definitions. A profile is
//! an ordered list of nodes (most specific first), registered under a name
//! in the [`Registry`]. Composing a profile flattens the list depth-first
//! left-to-right, binds every referenced field to the first definition
//! found, applies runtime overrides on top and returns an immutable
//! [`ComposedConfig`].
//!
//! [`ConfigNode`]: struct.ConfigNode.html
//! [`Registry`]: struct.Registry.html
//! [`ComposedConfig`]: struct.ComposedConfig.html

use std::collections::{BTreeMap, HashSet};
use std::fmt;

use fnv::FnvHashMap;

use crate::error::{Error, Result};

/// Names of the configuration fields used by the built-in profiles and the
/// assembly steps. Field names are globally significant: the same name
/// appearing in multiple nodes of one composition always resolves to
/// exactly one effective value.
pub mod field {
    // paths
    pub const EXPERIMENT_DIR: &str = "EXPERIMENT_DIR";

    // hardware scale
    pub const NUM_GPUS: &str = "NUM_GPUS";
    pub const NUM_GPUS_PER_WORKER: &str = "NUM_GPUS_PER_WORKER";
    pub const NUM_WORKERS: &str = "NUM_WORKERS";
    pub const LOCAL_MODE: &str = "LOCAL_MODE";
    pub const LOAD: &str = "LOAD";

    // memory/batch scale
    pub const TRAIN_EPOCHS: &str = "TRAIN_EPOCHS";
    pub const TRAIN_BATCH_SIZE: &str = "TRAIN_BATCH_SIZE";
    pub const ROLLOUT_FRAGMENT_LENGTH: &str = "ROLLOUT_FRAGMENT_LENGTH";
    pub const SGD_MINIBATCH_SIZE: &str = "SGD_MINIBATCH_SIZE";
    pub const NUM_SGD_ITER: &str = "NUM_SGD_ITER";
    pub const LSTM_BPTT_HORIZON: &str = "LSTM_BPTT_HORIZON";

    // horizons
    pub const HORIZON: &str = "HORIZON";
    pub const TRAIN_HORIZON: &str = "TRAIN_HORIZON";
    pub const EVALUATION_HORIZON: &str = "EVALUATION_HORIZON";
    pub const GENERALIZE: &str = "GENERALIZE";

    // model
    pub const MODEL: &str = "MODEL";
    pub const SCRIPTED: &str = "SCRIPTED";
    pub const N_AGENT_OBS: &str = "N_AGENT_OBS";
    pub const NPOLICIES: &str = "NPOLICIES";
    pub const HIDDEN: &str = "HIDDEN";
    pub const EMBED: &str = "EMBED";

    // reward
    pub const TEAM_SPIRIT: &str = "TEAM_SPIRIT";
    pub const ACHIEVEMENT_SCALE: &str = "ACHIEVEMENT_SCALE";
    pub const COOPERATIVE: &str = "COOPERATIVE";

    // world
    pub const NENT: &str = "NENT";
    pub const NMOB: &str = "NMOB";
    pub const NPOP: &str = "NPOP";
    pub const N_ACTIONS: &str = "N_ACTIONS";
    pub const TERRAIN_SIZE: &str = "TERRAIN_SIZE";
    pub const TERRAIN_TRAIN_MAPS: &str = "TERRAIN_TRAIN_MAPS";

    // game systems
    pub const RESOURCE_SYSTEM: &str = "RESOURCE_SYSTEM";
    pub const COMBAT_SYSTEM: &str = "COMBAT_SYSTEM";
    pub const PROGRESSION_SYSTEM: &str = "PROGRESSION_SYSTEM";
    pub const ACHIEVEMENT_SYSTEM: &str = "ACHIEVEMENT_SYSTEM";
    pub const ORE_RESPAWN: &str = "ORE_RESPAWN";
    pub const TREE_RESPAWN: &str = "TREE_RESPAWN";

    // per-level curves
    pub const EQUIPMENT_DEFENSE: &str = "EQUIPMENT_DEFENSE";
    pub const EQUIPMENT_OFFENSE: &str = "EQUIPMENT_OFFENSE";
    pub const DAMAGE_MELEE: &str = "DAMAGE_MELEE";
    pub const DAMAGE_RANGE: &str = "DAMAGE_RANGE";
    pub const DAMAGE_MAGE: &str = "DAMAGE_MAGE";
    pub const RESTORE: &str = "RESTORE";
}

/// Typed value of a single configuration field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Int(i64),
    Float(f64),
    Bool(bool),
    Str(String),
}

impl FieldValue {
    /// Returns string literal name of the value's type.
    pub fn type_str(&self) -> &'static str {
        match self {
            FieldValue::Int(_) => "int",
            FieldValue::Float(_) => "float",
            FieldValue::Bool(_) => "bool",
            FieldValue::Str(_) => "str",
        }
    }

    /// Parses a raw override string into the most specific value type.
    /// Bool and int win over float, anything else stays a string.
    pub fn from_literal(s: &str) -> FieldValue {
        if let Ok(b) = s.parse::<bool>() {
            return FieldValue::Bool(b);
        }
        if let Ok(i) = s.parse::<i64>() {
            return FieldValue::Int(i);
        }
        if let Ok(f) = s.parse::<f64>() {
            return FieldValue::Float(f);
        }
        FieldValue::Str(s.to_string())
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            FieldValue::Int(v) => write!(f, "{}", v),
            FieldValue::Float(v) => write!(f, "{}", v),
            FieldValue::Bool(v) => write!(f, "{}", v),
            FieldValue::Str(v) => write!(f, "{}", v),
        }
    }
}

impl From<i64> for FieldValue {
    fn from(v: i64) -> Self {
        FieldValue::Int(v)
    }
}

impl From<f64> for FieldValue {
    fn from(v: f64) -> Self {
        FieldValue::Float(v)
    }
}

impl From<bool> for FieldValue {
    fn from(v: bool) -> Self {
        FieldValue::Bool(v)
    }
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        FieldValue::Str(v.to_string())
    }
}

/// Signature of a computed property. Evaluated lazily against the final
/// composed, overridden state, never against an intermediate composition
/// step.
pub type ComputedFn = fn(&ComposedConfig) -> Result<FieldValue>;

/// Signature of a per-level curve. Curves are pure functions of a domain
/// parameter exposed through the composed object, not configuration state.
pub type CurveFn = fn(i64) -> f64;

/// A single field definition inside a node.
#[derive(Clone)]
pub enum FieldDef {
    /// Fixed scalar value.
    Const(FieldValue),
    /// Deferred expression over the fully composed state.
    Computed(ComputedFn),
    /// Pure function of a domain parameter, e.g. a damage-by-level curve.
    Curve(CurveFn),
}

impl fmt::Debug for FieldDef {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            FieldDef::Const(v) => write!(f, "Const({:?})", v),
            FieldDef::Computed(_) => write!(f, "Computed(..)"),
            FieldDef::Curve(_) => write!(f, "Curve(..)"),
        }
    }
}

/// A named, reusable bundle of field definitions.
///
/// Nodes carry no precedence information of their own. Precedence is
/// decided entirely by the position of the node within a profile's
/// composition order.
#[derive(Debug, Clone)]
pub struct ConfigNode {
    name: String,
    fields: FnvHashMap<String, FieldDef>,
}

impl ConfigNode {
    pub fn new(name: &str) -> Self {
        ConfigNode {
            name: name.to_string(),
            fields: FnvHashMap::default(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Defines a constant field on the node.
    pub fn set<V: Into<FieldValue>>(mut self, field: &str, value: V) -> Self {
        self.fields
            .insert(field.to_string(), FieldDef::Const(value.into()));
        self
    }

    /// Defines a computed property on the node.
    pub fn computed(mut self, field: &str, f: ComputedFn) -> Self {
        self.fields.insert(field.to_string(), FieldDef::Computed(f));
        self
    }

    /// Defines a per-level curve on the node.
    pub fn curve(mut self, field: &str, f: CurveFn) -> Self {
        self.fields.insert(field.to_string(), FieldDef::Curve(f));
        self
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(|k| k.as_str())
    }
}

/// Registry mapping names to nodes and profile compositions.
///
/// Populated once at process start and read-only thereafter; safe for
/// concurrent reads, not designed for concurrent registration.
#[derive(Debug, Default)]
pub struct Registry {
    nodes: FnvHashMap<String, ConfigNode>,
    profiles: FnvHashMap<String, Vec<String>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a node under its own name. A later registration under the
    /// same name replaces the earlier one.
    pub fn add_node(&mut self, node: ConfigNode) {
        self.nodes.insert(node.name().to_string(), node);
    }

    /// Registers a named profile as an ordered composition, most specific
    /// entry first. Entries may name nodes or other registered profiles;
    /// nested profiles are flattened depth-first at composition time.
    pub fn add_profile(&mut self, name: &str, composition: Vec<&str>) {
        self.profiles.insert(
            name.to_string(),
            composition.into_iter().map(|s| s.to_string()).collect(),
        );
    }

    pub fn has_profile(&self, name: &str) -> bool {
        self.profiles.contains_key(name)
    }

    /// All registered profile names, sorted.
    pub fn profile_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.profiles.keys().map(|k| k.as_str()).collect();
        names.sort();
        names
    }

    /// Resolves a profile name into its effective node order: depth-first,
    /// left-to-right flattening of nested compositions, each node appearing
    /// once at its first-reached position.
    fn flatten(&self, profile: &str) -> Result<Vec<&ConfigNode>> {
        let mut order = Vec::new();
        let mut seen_nodes = HashSet::new();
        let mut visiting = HashSet::new();
        self.flatten_into(profile, &mut order, &mut seen_nodes, &mut visiting)?;
        Ok(order)
    }

    fn flatten_into<'a>(
        &'a self,
        profile: &str,
        order: &mut Vec<&'a ConfigNode>,
        seen_nodes: &mut HashSet<&'a str>,
        visiting: &mut HashSet<String>,
    ) -> Result<()> {
        let composition = self
            .profiles
            .get(profile)
            .ok_or_else(|| Error::ConfigNotFound(profile.to_string()))?;
        // a profile reachable through two paths contributes its nodes only
        // at the first-reached position
        if !visiting.insert(profile.to_string()) {
            return Ok(());
        }
        for entry in composition {
            if self.profiles.contains_key(entry) {
                self.flatten_into(entry, order, seen_nodes, visiting)?;
            } else if let Some(node) = self.nodes.get(entry) {
                if seen_nodes.insert(node.name()) {
                    order.push(node);
                }
            } else {
                return Err(Error::ConfigNotFound(entry.to_string()));
            }
        }
        Ok(())
    }

    /// Composes the named profile and applies runtime overrides on top.
    ///
    /// Every field referenced anywhere in the flattened composition binds
    /// to the definition from the first node that defines it. Overrides
    /// take precedence over all composed nodes, but may only set fields
    /// already bound by the composition; an override targeting an unbound
    /// field fails with [`Error::UnknownField`].
    ///
    /// [`Error::UnknownField`]: ../error/enum.Error.html
    pub fn compose(
        &self,
        profile: &str,
        overrides: &FnvHashMap<String, FieldValue>,
    ) -> Result<ComposedConfig> {
        let order = self.flatten(profile)?;
        trace!(
            "composing profile {} from nodes: {:?}",
            profile,
            order.iter().map(|n| n.name()).collect::<Vec<_>>()
        );

        let mut fields: FnvHashMap<String, FieldDef> = FnvHashMap::default();
        for node in &order {
            for (name, def) in &node.fields {
                // first (most specific) definition wins
                fields
                    .entry(name.clone())
                    .or_insert_with(|| def.clone());
            }
        }

        for (name, value) in overrides {
            if !fields.contains_key(name) {
                return Err(Error::UnknownField(name.clone()));
            }
            debug!("override: {} = {}", name, value);
            fields.insert(name.clone(), FieldDef::Const(value.clone()));
        }

        Ok(ComposedConfig {
            profile: profile.to_string(),
            fields,
        })
    }
}

/// The result of composing a profile with runtime overrides.
///
/// Immutable for the remainder of the process invocation. Computed
/// properties stay deferred and are evaluated on access against this
/// final state.
#[derive(Debug, Clone)]
pub struct ComposedConfig {
    profile: String,
    fields: FnvHashMap<String, FieldDef>,
}

impl ComposedConfig {
    /// Name of the profile this configuration was composed from.
    pub fn profile(&self) -> &str {
        &self.profile
    }

    pub fn has(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    /// Resolves a field to a concrete value, evaluating computed
    /// properties against the final overridden state.
    pub fn get(&self, field: &str) -> Result<FieldValue> {
        match self.fields.get(field) {
            None => Err(Error::MissingField(field.to_string())),
            Some(FieldDef::Const(v)) => Ok(v.clone()),
            Some(FieldDef::Computed(f)) => f(self),
            Some(FieldDef::Curve(_)) => Err(Error::FieldType {
                field: field.to_string(),
                expected: "scalar",
                found: "curve",
            }),
        }
    }

    pub fn get_int(&self, field: &str) -> Result<i64> {
        match self.get(field)? {
            FieldValue::Int(v) => Ok(v),
            other => Err(Error::FieldType {
                field: field.to_string(),
                expected: "int",
                found: other.type_str(),
            }),
        }
    }

    /// Integer fields coerce to float; everything else is a type error.
    pub fn get_float(&self, field: &str) -> Result<f64> {
        match self.get(field)? {
            FieldValue::Float(v) => Ok(v),
            FieldValue::Int(v) => Ok(v as f64),
            other => Err(Error::FieldType {
                field: field.to_string(),
                expected: "float",
                found: other.type_str(),
            }),
        }
    }

    pub fn get_bool(&self, field: &str) -> Result<bool> {
        match self.get(field)? {
            FieldValue::Bool(v) => Ok(v),
            other => Err(Error::FieldType {
                field: field.to_string(),
                expected: "bool",
                found: other.type_str(),
            }),
        }
    }

    pub fn get_str(&self, field: &str) -> Result<String> {
        match self.get(field)? {
            FieldValue::Str(v) => Ok(v),
            other => Err(Error::FieldType {
                field: field.to_string(),
                expected: "str",
                found: other.type_str(),
            }),
        }
    }

    /// Per-level curve access.
    pub fn curve(&self, field: &str) -> Result<CurveFn> {
        match self.fields.get(field) {
            None => Err(Error::MissingField(field.to_string())),
            Some(FieldDef::Curve(f)) => Ok(*f),
            Some(def) => Err(Error::FieldType {
                field: field.to_string(),
                expected: "curve",
                found: match def {
                    FieldDef::Const(v) => v.type_str(),
                    _ => "computed",
                },
            }),
        }
    }

    /// Scripted execution mode marker: the baseline policy name when the
    /// configuration designates a non-learned mode.
    pub fn scripted(&self) -> Option<String> {
        match self.get(field::SCRIPTED) {
            Ok(FieldValue::Str(s)) if !s.is_empty() => Some(s),
            _ => None,
        }
    }

    /// Resolves every scalar field into a sorted map. Curves are skipped,
    /// computed properties are evaluated against the final state.
    pub fn resolved(&self) -> Result<BTreeMap<String, FieldValue>> {
        let mut out = BTreeMap::new();
        for (name, def) in &self.fields {
            if let FieldDef::Curve(_) = def {
                continue;
            }
            out.insert(name.clone(), self.get(name)?);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literal_parsing_prefers_specific_types() {
        assert_eq!(FieldValue::from_literal("true"), FieldValue::Bool(true));
        assert_eq!(FieldValue::from_literal("42"), FieldValue::Int(42));
        assert_eq!(FieldValue::from_literal("0.5"), FieldValue::Float(0.5));
        assert_eq!(
            FieldValue::from_literal("forage"),
            FieldValue::Str("forage".to_string())
        );
    }

    #[test]
    fn first_definition_wins() {
        let mut registry = Registry::new();
        registry.add_node(ConfigNode::new("specific").set("A", 1));
        registry.add_node(ConfigNode::new("base").set("A", 2).set("B", 3));
        registry.add_profile("P", vec!["specific", "base"]);

        let config = registry.compose("P", &FnvHashMap::default()).unwrap();
        assert_eq!(config.get_int("A").unwrap(), 1);
        assert_eq!(config.get_int("B").unwrap(), 3);
    }

    #[test]
    fn override_must_target_bound_field() {
        let mut registry = Registry::new();
        registry.add_node(ConfigNode::new("base").set("A", 1));
        registry.add_profile("P", vec!["base"]);

        let mut overrides = FnvHashMap::default();
        overrides.insert("NO_SUCH_FIELD".to_string(), FieldValue::Int(9));
        match registry.compose("P", &overrides) {
            Err(Error::UnknownField(name)) => assert_eq!(name, "NO_SUCH_FIELD"),
            other => panic!("expected UnknownField, got: {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn registry_and_config_expose_their_contents() {
        let mut registry = Registry::new();
        let node = ConfigNode::new("base").set("A", 1).set("B", true);
        let mut names: Vec<&str> = node.field_names().collect();
        names.sort();
        assert_eq!(names, vec!["A", "B"]);

        registry.add_node(node);
        registry.add_profile("P", vec!["base"]);
        assert!(registry.has_profile("P"));
        assert!(!registry.has_profile("Q"));

        let config = registry.compose("P", &FnvHashMap::default()).unwrap();
        assert!(config.has("A"));
        assert!(!config.has("C"));
    }

    #[test]
    fn computed_sees_final_state() {
        let mut registry = Registry::new();
        registry.add_node(
            ConfigNode::new("base")
                .set("N", 8)
                .computed("DOUBLED", |c| Ok(FieldValue::Int(2 * c.get_int("N")?))),
        );
        registry.add_profile("P", vec!["base"]);

        let mut overrides = FnvHashMap::default();
        overrides.insert("N".to_string(), FieldValue::Int(3));
        let config = registry.compose("P", &overrides).unwrap();
        assert_eq!(config.get_int("DOUBLED").unwrap(), 6);
    }
}
