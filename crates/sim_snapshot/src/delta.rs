//! Delta compression.
//!
//! [`DeltaCompressor`] remembers, per match, the component values last sent
//! (the baseline). Given the store's dirty set it emits a [`DeltaSnapshot`]:
//! new entities in full, removed entities by id, and for modified entities
//! only the components whose value changed against the baseline. The
//! baseline then moves forward to the current state.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;

use serde::de::{self, MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sim_component::{ComponentId, EntityId, MatchId};
use sim_store::{ComponentStore, DirtySet};
use tracing::debug;

use crate::error::SnapshotError;
use crate::layout::ColumnLayout;
use crate::nan;
use crate::provider;
use crate::snapshot::{Snapshot, same_value};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeltaSnapshot {
    pub match_id: MatchId,
    pub base_tick: u64,
    pub current_tick: u64,
    pub added: Vec<AddedEntity>,
    pub removed: Vec<EntityId>,
    pub modified: Vec<ModifiedEntity>,
}

impl DeltaSnapshot {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.modified.is_empty()
    }

    /// Number of changed values carried by this delta.
    #[must_use]
    pub fn change_count(&self) -> usize {
        self.added.iter().map(|a| a.components.len()).sum::<usize>()
            + self.removed.len()
            + self.modified.iter().map(|m| m.changes.len()).sum::<usize>()
    }
}

/// An entity new since the baseline, with all its present components.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddedEntity {
    pub id: EntityId,
    #[serde(with = "crate::nan::map")]
    pub components: BTreeMap<String, f32>,
}

/// Changed components of an existing entity, keyed by qualified name.
/// A NaN value (`null` on the wire) means the component was removed.
///
/// Serialised flat: `{"id": 5, "HealthModule.CURRENT_HP": 70.0}`.
#[derive(Debug, Clone)]
pub struct ModifiedEntity {
    pub id: EntityId,
    pub changes: BTreeMap<String, f32>,
}

impl Serialize for ModifiedEntity {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.changes.len() + 1))?;
        map.serialize_entry("id", &self.id)?;
        for (key, value) in &self.changes {
            map.serialize_entry(key, &nan::to_option(*value))?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for ModifiedEntity {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(ModifiedEntityVisitor)
    }
}

struct ModifiedEntityVisitor;

impl<'de> Visitor<'de> for ModifiedEntityVisitor {
    type Value = ModifiedEntity;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a map with an `id` and changed component values")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
        let mut id = None;
        let mut changes = BTreeMap::new();
        while let Some(key) = access.next_key::<String>()? {
            if key == "id" {
                id = Some(access.next_value::<EntityId>()?);
            } else {
                let value: Option<f32> = access.next_value()?;
                changes.insert(key, value.unwrap_or(f32::NAN));
            }
        }
        let id = id.ok_or_else(|| de::Error::missing_field("id"))?;
        Ok(ModifiedEntity { id, changes })
    }
}

#[derive(Debug, Default)]
struct Baseline {
    tick: u64,
    /// Present values only.
    rows: HashMap<EntityId, HashMap<ComponentId, f32>>,
}

fn capture(store: &dyn ComponentStore, layout: &ColumnLayout, entity: EntityId) -> HashMap<ComponentId, f32> {
    layout
        .columns()
        .filter_map(|c| {
            let value = store.get(entity, c.id);
            (!value.is_nan()).then_some((c.id, value))
        })
        .collect()
}

fn added_entity(layout: &ColumnLayout, entity: EntityId, row: &HashMap<ComponentId, f32>) -> AddedEntity {
    let components = layout
        .columns()
        .filter_map(|c| row.get(&c.id).map(|v| (c.qualified.clone(), *v)))
        .collect();
    AddedEntity { id: entity, components }
}

/// Per-match baselines and delta computation.
#[derive(Debug, Default)]
pub struct DeltaCompressor {
    baselines: HashMap<MatchId, Baseline>,
}

impl DeltaCompressor {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Tick of the baseline for `match_id`, if one exists.
    #[must_use]
    pub fn baseline_tick(&self, match_id: MatchId) -> Option<u64> {
        self.baselines.get(&match_id).map(|b| b.tick)
    }

    /// Forgets the baseline; the next delta for the match is a full one.
    pub fn reset_baseline(&mut self, match_id: MatchId) {
        self.baselines.remove(&match_id);
    }

    /// Takes a full snapshot and makes it the new baseline.
    ///
    /// The caller should discard the store's pending dirty set for the match
    /// at the same time.
    pub fn full_snapshot(&mut self, store: &dyn ComponentStore, match_id: MatchId, tick: u64) -> Snapshot {
        let snapshot = provider::snapshot(store, match_id, tick);
        let layout = ColumnLayout::from_registry(store.registry());
        let rows = snapshot
            .entity_ids
            .iter()
            .map(|e| (*e, capture(store, &layout, *e)))
            .collect();
        self.baselines.insert(match_id, Baseline { tick, rows });
        snapshot
    }

    /// Computes the delta for `match_id` from the dirty set consumed from the
    /// store, and advances the baseline to `tick`.
    ///
    /// Without a baseline (first call, or after
    /// [`DeltaCompressor::reset_baseline`]) every entity of the match is
    /// reported as added and `base_tick` is 0.
    pub fn compute(&mut self, store: &dyn ComponentStore, match_id: MatchId, dirty: &DirtySet, tick: u64) -> DeltaSnapshot {
        let layout = ColumnLayout::from_registry(store.registry());
        let mut delta = DeltaSnapshot {
            match_id,
            base_tick: 0,
            current_tick: tick,
            added: Vec::new(),
            removed: Vec::new(),
            modified: Vec::new(),
        };

        let Some(baseline) = self.baselines.get_mut(&match_id) else {
            let mut rows = HashMap::new();
            for entity in store.match_members(match_id) {
                let row = capture(store, &layout, entity);
                delta.added.push(added_entity(&layout, entity, &row));
                rows.insert(entity, row);
            }
            debug!(match_id, tick, added = delta.added.len(), "full delta");
            self.baselines.insert(match_id, Baseline { tick, rows });
            return delta;
        };
        delta.base_tick = baseline.tick;

        let transient: BTreeSet<_> = dirty.added.intersection(&dirty.removed).copied().collect();

        for entity in dirty.added.difference(&transient) {
            if !store.contains(*entity) {
                continue;
            }
            let row = capture(store, &layout, *entity);
            delta.added.push(added_entity(&layout, *entity, &row));
            baseline.rows.insert(*entity, row);
        }

        for entity in dirty.removed.difference(&transient) {
            baseline.rows.remove(entity);
            delta.removed.push(*entity);
        }

        for entity in &dirty.modified {
            if dirty.added.contains(entity) || dirty.removed.contains(entity) || !store.contains(*entity) {
                continue;
            }
            let Some(before) = baseline.rows.get_mut(entity) else {
                let row = capture(store, &layout, *entity);
                delta.added.push(added_entity(&layout, *entity, &row));
                baseline.rows.insert(*entity, row);
                continue;
            };
            let mut changes = BTreeMap::new();
            for column in layout.columns() {
                let now = store.get(*entity, column.id);
                let was = before.get(&column.id).copied().unwrap_or(f32::NAN);
                if same_value(was, now) {
                    continue;
                }
                changes.insert(column.qualified.clone(), now);
                if now.is_nan() {
                    before.remove(&column.id);
                } else {
                    before.insert(column.id, now);
                }
            }
            if !changes.is_empty() {
                delta.modified.push(ModifiedEntity { id: *entity, changes });
            }
        }

        baseline.tick = tick;
        debug!(
            match_id,
            base_tick = delta.base_tick,
            tick,
            added = delta.added.len(),
            removed = delta.removed.len(),
            modified = delta.modified.len(),
            "delta computed"
        );
        delta
    }
}

/// Replays `delta` onto `base`, producing the snapshot at `delta.current_tick`.
///
/// Components in the delta that the base layout does not know are ignored.
///
/// # Errors
///
/// [`SnapshotError::MatchMismatch`] if the two belong to different matches,
/// [`SnapshotError::Malformed`] if a column length disagrees with
/// `entity_ids`.
pub fn apply_delta(base: &Snapshot, delta: &DeltaSnapshot) -> Result<Snapshot, SnapshotError> {
    if base.match_id != delta.match_id {
        return Err(SnapshotError::MatchMismatch {
            base: base.match_id,
            delta: delta.match_id,
        });
    }

    let mut columns = HashMap::new();
    for (m, module) in base.modules.iter().enumerate() {
        for (c, component) in module.components.iter().enumerate() {
            if component.values.len() != base.entity_ids.len() {
                return Err(SnapshotError::Malformed(format!(
                    "{}.{} has {} values for {} entities",
                    module.name,
                    component.name,
                    component.values.len(),
                    base.entity_ids.len()
                )));
            }
            columns.insert(sim_component::qualified_name(&module.name, &component.name), (m, c));
        }
    }
    let width = columns.len();
    let slot = |m: usize, c: usize| -> usize {
        base.modules[..m].iter().map(|x| x.components.len()).sum::<usize>() + c
    };

    let mut rows: BTreeMap<EntityId, Vec<f32>> = BTreeMap::new();
    for (i, entity) in base.entity_ids.iter().enumerate() {
        let mut row = vec![f32::NAN; width];
        for (m, module) in base.modules.iter().enumerate() {
            for (c, component) in module.components.iter().enumerate() {
                row[slot(m, c)] = component.values[i];
            }
        }
        rows.insert(*entity, row);
    }

    for entity in &delta.removed {
        rows.remove(entity);
    }
    for added in &delta.added {
        let mut row = vec![f32::NAN; width];
        for (key, value) in &added.components {
            if let Some(&(m, c)) = columns.get(key) {
                row[slot(m, c)] = *value;
            }
        }
        rows.insert(added.id, row);
    }
    for modified in &delta.modified {
        if let Some(row) = rows.get_mut(&modified.id) {
            for (key, value) in &modified.changes {
                if let Some(&(m, c)) = columns.get(key) {
                    row[slot(m, c)] = *value;
                }
            }
        }
    }

    let entity_ids: Vec<_> = rows.keys().copied().collect();
    let mut modules = base.modules.clone();
    for (m, module) in modules.iter_mut().enumerate() {
        for (c, component) in module.components.iter_mut().enumerate() {
            let at = slot(m, c);
            component.values = rows.values().map(|row| row[at]).collect();
        }
    }
    Ok(Snapshot {
        match_id: base.match_id,
        tick: delta.current_tick,
        entity_ids,
        modules,
    })
}
