//! Full per-match snapshots.
//!
//! A snapshot is columnar: `entityIds` lists the match's entities in
//! ascending order, and every component carries one value per entity in
//! that same order. Values are `null` where the entity lacks the component.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use sim_component::{EntityId, MatchId, qualified_name};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub match_id: MatchId,
    pub tick: u64,
    pub entity_ids: Vec<EntityId>,
    pub modules: Vec<ModuleData>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleData {
    pub name: String,
    /// `"major.minor"`.
    pub version: String,
    pub components: Vec<ComponentData>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentData {
    pub name: String,
    #[serde(with = "crate::nan::vec")]
    pub values: Vec<f32>,
}

impl Snapshot {
    #[must_use]
    pub fn entity_count(&self) -> usize {
        self.entity_ids.len()
    }

    #[must_use]
    pub fn module(&self, name: &str) -> Option<&ModuleData> {
        self.modules.iter().find(|m| m.name == name)
    }

    fn position(&self, entity: EntityId) -> Option<usize> {
        self.entity_ids.binary_search(&entity).ok()
    }

    /// Value of one component of one entity. `None` if either is not in the
    /// snapshot; NaN if the entity lacks the component.
    #[must_use]
    pub fn value(&self, entity: EntityId, module: &str, component: &str) -> Option<f32> {
        let index = self.position(entity)?;
        self.module(module)?
            .component(component)?
            .values
            .get(index)
            .copied()
    }

    /// Present components of one entity keyed by qualified name.
    #[must_use]
    pub fn entity(&self, entity: EntityId) -> Option<BTreeMap<String, f32>> {
        let index = self.position(entity)?;
        let mut out = BTreeMap::new();
        for module in &self.modules {
            for component in &module.components {
                if let Some(value) = component.values.get(index).filter(|v| !v.is_nan()) {
                    out.insert(qualified_name(&module.name, &component.name), *value);
                }
            }
        }
        Some(out)
    }

    /// Compares everything except the tick. Floats are compared bitwise with
    /// every NaN equal to every other NaN.
    #[must_use]
    pub fn state_eq(&self, other: &Snapshot) -> bool {
        self.match_id == other.match_id
            && self.entity_ids == other.entity_ids
            && self.modules.len() == other.modules.len()
            && self.modules.iter().zip(&other.modules).all(|(a, b)| {
                a.name == b.name
                    && a.components.len() == b.components.len()
                    && a.components.iter().zip(&b.components).all(|(x, y)| {
                        x.name == y.name
                            && x.values.len() == y.values.len()
                            && x.values.iter().zip(&y.values).all(|(p, q)| same_value(*p, *q))
                    })
            })
    }
}

impl ModuleData {
    #[must_use]
    pub fn component(&self, name: &str) -> Option<&ComponentData> {
        self.components.iter().find(|c| c.name == name)
    }
}

/// Bitwise float equality where all NaNs are equal.
#[must_use]
pub fn same_value(a: f32, b: f32) -> bool {
    a.to_bits() == b.to_bits() || (a.is_nan() && b.is_nan())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Snapshot {
        Snapshot {
            match_id: 1,
            tick: 4,
            entity_ids: vec![EntityId(3), EntityId(8)],
            modules: vec![ModuleData {
                name: "HealthModule".into(),
                version: "1.0".into(),
                components: vec![ComponentData {
                    name: "CURRENT_HP".into(),
                    values: vec![70.0, f32::NAN],
                }],
            }],
        }
    }

    #[test]
    fn test_value_lookup() {
        let snap = sample();
        assert_eq!(snap.value(EntityId(3), "HealthModule", "CURRENT_HP"), Some(70.0));
        assert!(snap.value(EntityId(8), "HealthModule", "CURRENT_HP").unwrap().is_nan());
        assert_eq!(snap.value(EntityId(9), "HealthModule", "CURRENT_HP"), None);
    }

    #[test]
    fn test_entity_view_skips_absent() {
        let snap = sample();
        assert_eq!(snap.entity(EntityId(3)).unwrap().get("HealthModule.CURRENT_HP"), Some(&70.0));
        assert!(snap.entity(EntityId(8)).unwrap().is_empty());
    }

    #[test]
    fn test_json_shape_uses_null_for_absent() {
        let json = serde_json::to_value(sample()).unwrap();
        assert_eq!(json["matchId"], 1);
        assert_eq!(json["entityIds"], serde_json::json!([3, 8]));
        assert_eq!(
            json["modules"][0]["components"][0]["values"],
            serde_json::json!([70.0, null])
        );
        let back: Snapshot = serde_json::from_value(json).unwrap();
        assert!(back.state_eq(&sample()));
    }

    #[test]
    fn test_state_eq_ignores_tick_but_not_values() {
        let a = sample();
        let mut b = sample();
        b.tick = 99;
        assert!(a.state_eq(&b));
        b.modules[0].components[0].values[0] = 71.0;
        assert!(!a.state_eq(&b));
    }
}
