//! MessagePack and JSON codec helpers.
//!
//! MessagePack output uses named fields so the binary form has the same
//! shape as the JSON form.

use serde::{Deserialize, Serialize};

use crate::error::SnapshotError;

/// Encode a value to MessagePack bytes.
///
/// # Errors
///
/// Returns [`SnapshotError::Encode`] if serialisation fails.
pub fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, SnapshotError> {
    rmp_serde::to_vec_named(value).map_err(SnapshotError::Encode)
}

/// Decode a value from MessagePack bytes.
///
/// # Errors
///
/// Returns [`SnapshotError::Decode`] if deserialisation fails.
pub fn decode<'a, T: Deserialize<'a>>(bytes: &'a [u8]) -> Result<T, SnapshotError> {
    rmp_serde::from_slice(bytes).map_err(SnapshotError::Decode)
}

/// Encode a value as a JSON string.
///
/// # Errors
///
/// Returns [`SnapshotError::Json`] if serialisation fails.
pub fn to_json<T: Serialize>(value: &T) -> Result<String, SnapshotError> {
    Ok(serde_json::to_string(value)?)
}

/// Decode a value from a JSON string.
///
/// # Errors
///
/// Returns [`SnapshotError::Json`] if deserialisation fails.
pub fn from_json<'a, T: Deserialize<'a>>(json: &'a str) -> Result<T, SnapshotError> {
    Ok(serde_json::from_str(json)?)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::delta::{AddedEntity, DeltaSnapshot, ModifiedEntity};
    use sim_component::EntityId;

    fn delta() -> DeltaSnapshot {
        DeltaSnapshot {
            match_id: 1,
            base_tick: 3,
            current_tick: 4,
            added: vec![AddedEntity {
                id: EntityId(10),
                components: BTreeMap::from([("core.ENTITY_TYPE".to_string(), 100.0)]),
            }],
            removed: vec![EntityId(2)],
            modified: vec![ModifiedEntity {
                id: EntityId(5),
                changes: BTreeMap::from([
                    ("HealthModule.CURRENT_HP".to_string(), 70.0),
                    ("HealthModule.ARMOR".to_string(), f32::NAN),
                ]),
            }],
        }
    }

    #[test]
    fn test_delta_survives_messagepack() {
        let bytes = encode(&delta()).unwrap();
        let restored: DeltaSnapshot = decode(&bytes).unwrap();
        assert_eq!(restored.base_tick, 3);
        assert_eq!(restored.removed, vec![EntityId(2)]);
        let changes = &restored.modified[0].changes;
        assert_eq!(changes["HealthModule.CURRENT_HP"], 70.0);
        assert!(changes["HealthModule.ARMOR"].is_nan());
    }

    #[test]
    fn test_delta_json_shape() {
        let json = to_json(&delta()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["matchId"], 1);
        assert_eq!(value["baseTick"], 3);
        assert_eq!(value["added"][0]["components"]["core.ENTITY_TYPE"], 100.0);
        assert_eq!(value["modified"][0]["id"], 5);
        let restored: DeltaSnapshot = from_json(&json).unwrap();
        assert_eq!(restored.modified[0].id, EntityId(5));
    }

    #[test]
    fn test_decode_invalid_bytes() {
        let result: Result<DeltaSnapshot, _> = decode(&[0xFF, 0xFF]);
        assert!(result.is_err());
    }
}
