//! Reserved components owned by the `core` module.
//!
//! All are [`PermissionLevel::Private`]: readable everywhere, mutable only by
//! elevated callers. `MATCH_ID` and `ENTITY_ID` are attached by the entity
//! factory to every entity it creates.

use crate::component::{ComponentDef, ComponentId};
use crate::entity::MatchId;
use crate::permission::PermissionLevel;

pub const CORE_MODULE: &str = "core";

pub const MATCH_ID: ComponentId = ComponentId::qualified(CORE_MODULE, "MATCH_ID");
pub const ENTITY_ID: ComponentId = ComponentId::qualified(CORE_MODULE, "ENTITY_ID");
pub const ENTITY_TYPE: ComponentId = ComponentId::qualified(CORE_MODULE, "ENTITY_TYPE");
pub const OWNER_ID: ComponentId = ComponentId::qualified(CORE_MODULE, "OWNER_ID");
pub const PLAYER_ID: ComponentId = ComponentId::qualified(CORE_MODULE, "PLAYER_ID");

const NAMES: [&str; 5] = ["MATCH_ID", "ENTITY_ID", "ENTITY_TYPE", "OWNER_ID", "PLAYER_ID"];

/// Definitions of every core component, in column order.
#[must_use]
pub fn core_components() -> Vec<ComponentDef> {
    NAMES
        .iter()
        .map(|name| ComponentDef::new(CORE_MODULE, *name, PermissionLevel::Private))
        .collect()
}

/// Encodes a match id as a component value.
#[must_use]
pub fn match_value(match_id: MatchId) -> f32 {
    match_id as f32
}

/// Decodes a `MATCH_ID` value; `None` when absent.
#[must_use]
pub fn match_from_value(value: f32) -> Option<MatchId> {
    (!value.is_nan() && value >= 0.0).then_some(value as MatchId)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_core_ids_match_definitions() {
        let defs = core_components();
        let ids: Vec<_> = defs.iter().map(|d| d.id).collect();
        assert_eq!(ids, vec![MATCH_ID, ENTITY_ID, ENTITY_TYPE, OWNER_ID, PLAYER_ID]);
        assert!(defs.iter().all(|d| d.permission == PermissionLevel::Private));
    }

    #[test]
    fn test_match_value_roundtrip() {
        assert_eq!(match_from_value(match_value(17)), Some(17));
        assert_eq!(match_from_value(f32::NAN), None);
    }
}
