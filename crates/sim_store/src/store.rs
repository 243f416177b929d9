//! The [`ComponentStore`] contract.

use std::collections::BTreeSet;

use sim_component::core::{MATCH_ID, match_from_value};
use sim_component::{ComponentId, ComponentRegistry, EntityId, MatchId};

use crate::error::StoreError;

/// Storage of `f32` component values keyed by entity and component.
///
/// A value of NaN is the absence of a component: [`ComponentStore::get`]
/// returns NaN for missing data and [`ComponentStore::attach`] refuses to
/// store it. The trait is object safe so decorators and scoped views can
/// wrap any implementation.
pub trait ComponentStore: Send {
    /// Registry describing the columns of this store.
    fn registry(&self) -> &ComponentRegistry;

    /// Creates an entity with no components.
    fn create_entity(&mut self) -> EntityId;

    /// Deletes an entity and all its components. Returns `false` if it did
    /// not exist.
    fn delete_entity(&mut self, entity: EntityId) -> bool;

    /// Returns `true` if `entity` is alive.
    fn contains(&self, entity: EntityId) -> bool;

    /// Sets a component value, attaching the component if absent.
    ///
    /// # Errors
    ///
    /// [`StoreError::NanValue`], [`StoreError::UnknownComponent`] or
    /// [`StoreError::EntityNotFound`].
    fn attach(&mut self, entity: EntityId, component: ComponentId, value: f32) -> Result<(), StoreError>;

    /// Removes a component. Removing an absent component is a no-op.
    ///
    /// # Errors
    ///
    /// [`StoreError::UnknownComponent`] for unregistered ids.
    fn remove(&mut self, entity: EntityId, component: ComponentId) -> Result<(), StoreError>;

    /// Value of a component, or NaN when absent.
    fn get(&self, entity: EntityId, component: ComponentId) -> f32;

    /// Entities carrying every listed component. An empty list selects all
    /// entities.
    fn entities_with(&self, components: &[ComponentId]) -> BTreeSet<EntityId>;

    /// Returns the number of live entities.
    fn entity_count(&self) -> usize;

    /// Drops every entity and returns the store to its initial size.
    fn reset(&mut self);

    /// Checks internal bookkeeping.
    ///
    /// # Errors
    ///
    /// [`StoreError::Corrupted`] describing the first broken invariant.
    fn verify_integrity(&self) -> Result<(), StoreError> {
        Ok(())
    }

    fn has_component(&self, entity: EntityId, component: ComponentId) -> bool {
        !self.get(entity, component).is_nan()
    }

    /// Attaches several components at once. Nothing is written unless every
    /// value is valid.
    ///
    /// # Errors
    ///
    /// Same as [`ComponentStore::attach`].
    fn attach_many(&mut self, entity: EntityId, values: &[(ComponentId, f32)]) -> Result<(), StoreError> {
        if !self.contains(entity) {
            return Err(StoreError::EntityNotFound(entity));
        }
        for &(component, value) in values {
            if value.is_nan() {
                return Err(StoreError::NanValue(component));
            }
            if self.registry().column(component).is_none() {
                return Err(StoreError::UnknownComponent(component));
            }
        }
        for &(component, value) in values {
            self.attach(entity, component, value)?;
        }
        Ok(())
    }

    /// Values of several components, NaN for each absent one.
    fn get_many(&self, entity: EntityId, components: &[ComponentId]) -> Vec<f32> {
        components.iter().map(|c| self.get(entity, *c)).collect()
    }

    /// The match the entity is bound to.
    fn match_of(&self, entity: EntityId) -> Option<MatchId> {
        match_from_value(self.get(entity, MATCH_ID))
    }

    /// Entities bound to `match_id`, ascending.
    fn match_members(&self, match_id: MatchId) -> Vec<EntityId> {
        self.entities_with(&[MATCH_ID])
            .into_iter()
            .filter(|e| self.match_of(*e) == Some(match_id))
            .collect()
    }
}
