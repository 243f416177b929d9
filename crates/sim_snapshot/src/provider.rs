//! Builds [`Snapshot`]s from a store.

use sim_component::core::OWNER_ID;
use sim_component::{EntityId, MatchId};
use sim_store::ComponentStore;

use crate::layout::ColumnLayout;
use crate::snapshot::{ComponentData, ModuleData, Snapshot};

/// Snapshot of every entity bound to `match_id`.
#[must_use]
pub fn snapshot(store: &dyn ComponentStore, match_id: MatchId, tick: u64) -> Snapshot {
    let entities = store.match_members(match_id);
    build(store, match_id, tick, entities)
}

/// Snapshot restricted to entities whose `OWNER_ID` is `player_id`.
#[must_use]
pub fn snapshot_for_player(store: &dyn ComponentStore, match_id: MatchId, player_id: u64, tick: u64) -> Snapshot {
    let owner = player_id as f32;
    let entities = store
        .match_members(match_id)
        .into_iter()
        .filter(|e| store.get(*e, OWNER_ID) == owner)
        .collect();
    build(store, match_id, tick, entities)
}

fn build(store: &dyn ComponentStore, match_id: MatchId, tick: u64, entities: Vec<EntityId>) -> Snapshot {
    let layout = ColumnLayout::from_registry(store.registry());
    let modules = layout
        .modules
        .into_iter()
        .map(|module| ModuleData {
            name: module.name,
            version: module.version.to_string(),
            components: module
                .components
                .into_iter()
                .map(|column| ComponentData {
                    values: entities.iter().map(|e| store.get(*e, column.id)).collect(),
                    name: column.name,
                })
                .collect(),
        })
        .collect();
    Snapshot {
        match_id,
        tick,
        entity_ids: entities,
        modules,
    }
}
