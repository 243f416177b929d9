//! Match-bound entity creation.
//!
//! Every entity created through an [`EntityFactory`] carries `MATCH_ID` and
//! `ENTITY_ID` from the start. Creation is all or nothing: initial
//! components are authorised before the entity exists, and the entity is
//! deleted again if any attach fails.

use sim_component::core::{ENTITY_ID, MATCH_ID, match_value};
use sim_component::{Access, CallerContext, ComponentId, EntityId, MatchId};
use tracing::trace;

use crate::error::StoreError;
use crate::store::ComponentStore;

pub struct EntityFactory<'a> {
    store: &'a mut dyn ComponentStore,
    caller: &'a CallerContext,
    match_id: MatchId,
}

impl<'a> EntityFactory<'a> {
    pub fn new(store: &'a mut dyn ComponentStore, caller: &'a CallerContext, match_id: MatchId) -> Self {
        Self {
            store,
            caller,
            match_id,
        }
    }

    #[must_use]
    pub fn match_id(&self) -> MatchId {
        self.match_id
    }

    /// Creates an entity with only the core identity components.
    ///
    /// # Errors
    ///
    /// See [`EntityFactory::create_with`].
    pub fn create(&mut self) -> Result<EntityId, StoreError> {
        self.create_with(&[])
    }

    /// Creates an entity with the given initial components.
    ///
    /// # Errors
    ///
    /// - [`StoreError::Reserved`] if `components` names `MATCH_ID` or `ENTITY_ID`.
    /// - [`StoreError::AccessDenied`] if the caller may not attach one of them.
    /// - [`StoreError::NanValue`] or [`StoreError::UnknownComponent`].
    pub fn create_with(&mut self, components: &[(ComponentId, f32)]) -> Result<EntityId, StoreError> {
        for &(component, value) in components {
            if component == MATCH_ID || component == ENTITY_ID {
                return Err(StoreError::Reserved(component));
            }
            if value.is_nan() {
                return Err(StoreError::NanValue(component));
            }
            self.store
                .registry()
                .authorize(component, self.caller, Access::Attach)?;
        }

        let entity = self.store.create_entity();
        let mut initial = Vec::with_capacity(components.len() + 2);
        initial.push((MATCH_ID, match_value(self.match_id)));
        initial.push((ENTITY_ID, entity.as_value()));
        initial.extend_from_slice(components);
        if let Err(err) = self.store.attach_many(entity, &initial) {
            self.store.delete_entity(entity);
            return Err(err);
        }
        trace!(%entity, match_id = self.match_id, module = self.caller.name(), "entity created");
        Ok(entity)
    }

    /// Deletes an entity of this match. Returns `false` if it does not exist.
    ///
    /// # Errors
    ///
    /// [`StoreError::MatchMismatch`] if the entity belongs to another match.
    pub fn delete(&mut self, entity: EntityId) -> Result<bool, StoreError> {
        if !self.store.contains(entity) {
            return Ok(false);
        }
        match self.store.match_of(entity) {
            Some(m) if m == self.match_id => Ok(self.store.delete_entity(entity)),
            actual => Err(StoreError::MatchMismatch {
                entity,
                expected: self.match_id,
                actual,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::array::ArrayStore;
    use crate::config::StoreConfig;
    use crate::dirty::DirtyTracker;
    use sim_component::core::{ENTITY_TYPE, PLAYER_ID};

    fn store() -> DirtyTracker<ArrayStore> {
        DirtyTracker::new(ArrayStore::with_config(&StoreConfig::default().with_initial_rows(4)))
    }

    #[test]
    fn test_create_binds_match_and_id() {
        let mut store = store();
        let admin = CallerContext::elevated("EntityModule");
        let entity = EntityFactory::new(&mut store, &admin, 1)
            .create_with(&[(ENTITY_TYPE, 100.0), (PLAYER_ID, 1.0)])
            .unwrap();
        assert_eq!(store.match_of(entity), Some(1));
        assert_eq!(EntityId::from_value(store.get(entity, ENTITY_ID)), Some(entity));
        assert_eq!(store.get(entity, ENTITY_TYPE), 100.0);
        assert!(store.consume_dirty(1).added.contains(&entity));
    }

    #[test]
    fn test_unauthorised_create_leaves_no_entity() {
        let mut store = store();
        let plain = CallerContext::module("Spawner");
        let result = EntityFactory::new(&mut store, &plain, 1).create_with(&[(ENTITY_TYPE, 1.0)]);
        assert!(matches!(result, Err(StoreError::AccessDenied(_))));
        assert_eq!(store.entity_count(), 0);
    }

    #[test]
    fn test_plain_module_may_create_bare_entity() {
        let mut store = store();
        let plain = CallerContext::module("Spawner");
        let entity = EntityFactory::new(&mut store, &plain, 2).create().unwrap();
        assert_eq!(store.match_of(entity), Some(2));
    }

    #[test]
    fn test_reserved_components_rejected() {
        let mut store = store();
        let admin = CallerContext::elevated("EntityModule");
        let result = EntityFactory::new(&mut store, &admin, 1).create_with(&[(MATCH_ID, 9.0)]);
        assert!(matches!(result, Err(StoreError::Reserved(_))));
    }

    #[test]
    fn test_delete_checks_match() {
        let mut store = store();
        let admin = CallerContext::elevated("EntityModule");
        let entity = EntityFactory::new(&mut store, &admin, 1).create().unwrap();
        let wrong = EntityFactory::new(&mut store, &admin, 2).delete(entity);
        assert!(matches!(wrong, Err(StoreError::MatchMismatch { .. })));
        assert!(EntityFactory::new(&mut store, &admin, 1).delete(entity).unwrap());
        assert!(!EntityFactory::new(&mut store, &admin, 1).delete(entity).unwrap());
    }
}
