//! Permission-checked view of a store.
//!
//! A [`ScopedStore`] binds a store to the [`CallerContext`] of the module
//! currently executing. Every mutation is authorised against the target
//! component's [`sim_component::PermissionLevel`] before the store is
//! touched, so a denied call leaves the store unchanged.

use std::collections::BTreeSet;

use sim_component::core::{ENTITY_ID, MATCH_ID};
use sim_component::{Access, CallerContext, ComponentId, ComponentRegistry, EntityId, MatchId};

use crate::error::StoreError;
use crate::factory::EntityFactory;
use crate::store::ComponentStore;

pub struct ScopedStore<'a> {
    store: &'a mut dyn ComponentStore,
    caller: &'a CallerContext,
}

impl<'a> ScopedStore<'a> {
    pub fn new(store: &'a mut dyn ComponentStore, caller: &'a CallerContext) -> Self {
        Self { store, caller }
    }

    #[must_use]
    pub fn caller(&self) -> &CallerContext {
        self.caller
    }

    #[must_use]
    pub fn registry(&self) -> &ComponentRegistry {
        self.store.registry()
    }

    /// Identity components are owned by the entity factory and never change
    /// after creation, whatever the caller's elevation.
    fn reject_reserved(component: ComponentId) -> Result<(), StoreError> {
        if component == MATCH_ID || component == ENTITY_ID {
            return Err(StoreError::Reserved(component));
        }
        Ok(())
    }

    fn access_for(&self, entity: EntityId, component: ComponentId) -> Access {
        if self.store.has_component(entity, component) {
            Access::Write
        } else {
            Access::Attach
        }
    }

    /// Sets a value. Overwriting an existing value needs write access,
    /// attaching a new component needs attach access.
    ///
    /// # Errors
    ///
    /// - [`StoreError::Reserved`] for `MATCH_ID` or `ENTITY_ID`.
    /// - [`StoreError::AccessDenied`] if the caller lacks permission.
    /// - Any error of [`ComponentStore::attach`].
    pub fn attach(&mut self, entity: EntityId, component: ComponentId, value: f32) -> Result<(), StoreError> {
        Self::reject_reserved(component)?;
        let access = self.access_for(entity, component);
        self.store.registry().authorize(component, self.caller, access)?;
        self.store.attach(entity, component, value)
    }

    /// Authorises every value first; nothing is written on denial.
    ///
    /// # Errors
    ///
    /// As [`ScopedStore::attach`].
    pub fn attach_many(&mut self, entity: EntityId, values: &[(ComponentId, f32)]) -> Result<(), StoreError> {
        for &(component, _) in values {
            Self::reject_reserved(component)?;
            let access = self.access_for(entity, component);
            self.store.registry().authorize(component, self.caller, access)?;
        }
        self.store.attach_many(entity, values)
    }

    /// # Errors
    ///
    /// [`StoreError::Reserved`] for `MATCH_ID` or `ENTITY_ID`, and
    /// [`StoreError::AccessDenied`] if the caller may not remove the component.
    pub fn remove(&mut self, entity: EntityId, component: ComponentId) -> Result<(), StoreError> {
        Self::reject_reserved(component)?;
        self.store
            .registry()
            .authorize(component, self.caller, Access::Remove)?;
        self.store.remove(entity, component)
    }

    #[must_use]
    pub fn get(&self, entity: EntityId, component: ComponentId) -> f32 {
        self.store.get(entity, component)
    }

    #[must_use]
    pub fn get_many(&self, entity: EntityId, components: &[ComponentId]) -> Vec<f32> {
        self.store.get_many(entity, components)
    }

    #[must_use]
    pub fn has_component(&self, entity: EntityId, component: ComponentId) -> bool {
        self.store.has_component(entity, component)
    }

    #[must_use]
    pub fn entities_with(&self, components: &[ComponentId]) -> BTreeSet<EntityId> {
        self.store.entities_with(components)
    }

    #[must_use]
    pub fn contains(&self, entity: EntityId) -> bool {
        self.store.contains(entity)
    }

    #[must_use]
    pub fn match_of(&self, entity: EntityId) -> Option<MatchId> {
        self.store.match_of(entity)
    }

    #[must_use]
    pub fn match_members(&self, match_id: MatchId) -> Vec<EntityId> {
        self.store.match_members(match_id)
    }

    #[must_use]
    pub fn entity_count(&self) -> usize {
        self.store.entity_count()
    }

    /// Factory creating and deleting entities of `match_id` on behalf of
    /// this caller.
    pub fn entity_factory(&mut self, match_id: MatchId) -> EntityFactory<'_> {
        EntityFactory::new(&mut *self.store, self.caller, match_id)
    }
}
