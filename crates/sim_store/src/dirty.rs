//! Per-match change tracking.
//!
//! [`DirtyTracker`] wraps any [`ComponentStore`] and records, per match,
//! which entities were added, removed or modified since the last
//! [`DirtyTracker::consume_dirty`]. An entity joins its match's `added` set
//! the moment its `MATCH_ID` is attached; until then it is unbound and its
//! changes are not attributed anywhere.

use std::collections::{BTreeSet, HashMap, HashSet};

use sim_component::core::{MATCH_ID, match_from_value};
use sim_component::{ComponentId, ComponentRegistry, EntityId, MatchId};

use crate::error::StoreError;
use crate::store::ComponentStore;

/// Entities changed in one match during one tracking window.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirtySet {
    pub added: BTreeSet<EntityId>,
    pub removed: BTreeSet<EntityId>,
    pub modified: BTreeSet<EntityId>,
}

impl DirtySet {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.modified.is_empty()
    }

    /// Total number of recorded entities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.added.len() + self.removed.len() + self.modified.len()
    }

    /// Drops overlaps so each entity appears in at most one set: added wins
    /// over modified, and an entity both added and removed vanishes.
    fn normalise(&mut self) {
        let transient: Vec<_> = self.added.intersection(&self.removed).copied().collect();
        for entity in transient {
            self.added.remove(&entity);
            self.removed.remove(&entity);
            self.modified.remove(&entity);
        }
        self.modified.retain(|e| !self.added.contains(e) && !self.removed.contains(e));
    }
}

/// Decorator adding change tracking to a [`ComponentStore`].
#[derive(Debug)]
pub struct DirtyTracker<S> {
    inner: S,
    sets: HashMap<MatchId, DirtySet>,
    unbound: HashSet<EntityId>,
}

impl<S: ComponentStore> DirtyTracker<S> {
    /// Returns a tracker over `inner` with no changes recorded.
    #[must_use]
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            sets: HashMap::new(),
            unbound: HashSet::new(),
        }
    }

    /// Read-only access to the wrapped store.
    #[must_use]
    pub fn inner(&self) -> &S {
        &self.inner
    }

    #[must_use]
    pub fn into_inner(self) -> S {
        self.inner
    }

    /// Returns and clears the changes recorded for `match_id`.
    pub fn consume_dirty(&mut self, match_id: MatchId) -> DirtySet {
        let mut set = self.sets.remove(&match_id).unwrap_or_default();
        set.normalise();
        set
    }

    /// Returns the changes recorded for `match_id` without clearing them.
    #[must_use]
    pub fn peek_dirty(&self, match_id: MatchId) -> DirtySet {
        let mut set = self.sets.get(&match_id).cloned().unwrap_or_default();
        set.normalise();
        set
    }

    /// Discards the changes recorded for `match_id`.
    pub fn clear_dirty(&mut self, match_id: MatchId) {
        self.sets.remove(&match_id);
    }

    /// Discards the changes recorded for every match.
    pub fn clear_all_dirty(&mut self) {
        self.sets.clear();
    }

    /// Matches with pending changes, ascending.
    #[must_use]
    pub fn dirty_matches(&self) -> Vec<MatchId> {
        let mut matches: Vec<_> = self
            .sets
            .iter()
            .filter(|(_, s)| !s.is_empty())
            .map(|(m, _)| *m)
            .collect();
        matches.sort_unstable();
        matches
    }

    fn mark_modified(&mut self, entity: EntityId, match_id: Option<MatchId>) {
        if let Some(match_id) = match_id {
            self.sets.entry(match_id).or_default().modified.insert(entity);
        }
    }

    /// Records a write of `component`. `before` is the entity's match prior
    /// to the write.
    fn record_write(&mut self, entity: EntityId, component: ComponentId, value: f32, before: Option<MatchId>) {
        if component == MATCH_ID && self.unbound.remove(&entity) {
            if let Some(match_id) = match_from_value(value) {
                self.sets.entry(match_id).or_default().added.insert(entity);
            }
        } else {
            self.mark_modified(entity, before.or_else(|| match_from_value(value)));
        }
    }
}

impl<S: ComponentStore> ComponentStore for DirtyTracker<S> {
    fn registry(&self) -> &ComponentRegistry {
        self.inner.registry()
    }

    fn create_entity(&mut self) -> EntityId {
        let entity = self.inner.create_entity();
        self.unbound.insert(entity);
        entity
    }

    fn delete_entity(&mut self, entity: EntityId) -> bool {
        let match_id = self.inner.match_of(entity);
        if !self.inner.delete_entity(entity) {
            return false;
        }
        self.unbound.remove(&entity);
        if let Some(match_id) = match_id {
            let set = self.sets.entry(match_id).or_default();
            set.modified.remove(&entity);
            // Created and deleted inside one window: nothing to report.
            if !set.added.remove(&entity) {
                set.removed.insert(entity);
            }
        }
        true
    }

    fn contains(&self, entity: EntityId) -> bool {
        self.inner.contains(entity)
    }

    fn attach(&mut self, entity: EntityId, component: ComponentId, value: f32) -> Result<(), StoreError> {
        let before = self.inner.match_of(entity);
        self.inner.attach(entity, component, value)?;
        self.record_write(entity, component, value, before);
        Ok(())
    }

    fn attach_many(&mut self, entity: EntityId, values: &[(ComponentId, f32)]) -> Result<(), StoreError> {
        let before = self.inner.match_of(entity);
        self.inner.attach_many(entity, values)?;
        match values.iter().find(|(c, _)| *c == MATCH_ID) {
            Some(&(component, value)) => self.record_write(entity, component, value, before),
            None => self.mark_modified(entity, before),
        }
        Ok(())
    }

    fn remove(&mut self, entity: EntityId, component: ComponentId) -> Result<(), StoreError> {
        let before = self.inner.match_of(entity);
        let had = self.inner.has_component(entity, component);
        self.inner.remove(entity, component)?;
        if had {
            self.mark_modified(entity, before);
        }
        Ok(())
    }

    fn get(&self, entity: EntityId, component: ComponentId) -> f32 {
        self.inner.get(entity, component)
    }

    fn entities_with(&self, components: &[ComponentId]) -> BTreeSet<EntityId> {
        self.inner.entities_with(components)
    }

    fn entity_count(&self) -> usize {
        self.inner.entity_count()
    }

    fn reset(&mut self) {
        self.inner.reset();
        self.clear_all_dirty();
        self.unbound.clear();
    }

    fn verify_integrity(&self) -> Result<(), StoreError> {
        self.inner.verify_integrity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::array::ArrayStore;
    use crate::config::StoreConfig;
    use sim_component::core::match_value;
    use sim_component::{ComponentDef, PermissionLevel};

    fn tracker() -> (DirtyTracker<ArrayStore>, ComponentId) {
        let store = ArrayStore::with_config(&StoreConfig::default().with_initial_rows(4));
        let hp = store
            .registry()
            .register(ComponentDef::new("Health", "HP", PermissionLevel::Write))
            .unwrap()
            .def
            .id;
        (DirtyTracker::new(store), hp)
    }

    fn spawn(t: &mut DirtyTracker<ArrayStore>, match_id: MatchId) -> EntityId {
        let e = t.create_entity();
        t.attach(e, MATCH_ID, match_value(match_id)).unwrap();
        e
    }

    #[test]
    fn test_binding_marks_added() {
        let (mut t, hp) = tracker();
        let e = spawn(&mut t, 1);
        t.attach(e, hp, 10.0).unwrap();
        let dirty = t.consume_dirty(1);
        assert_eq!(dirty.added, BTreeSet::from([e]));
        assert!(dirty.modified.is_empty());
        assert!(t.consume_dirty(1).is_empty());
    }

    #[test]
    fn test_unbound_entity_untracked() {
        let (mut t, hp) = tracker();
        let e = t.create_entity();
        t.attach(e, hp, 10.0).unwrap();
        assert!(t.dirty_matches().is_empty());
    }

    #[test]
    fn test_modify_and_remove_attributed_to_match() {
        let (mut t, hp) = tracker();
        let a = spawn(&mut t, 1);
        let b = spawn(&mut t, 2);
        t.consume_dirty(1);
        t.consume_dirty(2);

        t.attach(a, hp, 5.0).unwrap();
        t.delete_entity(b);
        assert_eq!(t.peek_dirty(1).modified, BTreeSet::from([a]));
        assert_eq!(t.peek_dirty(2).removed, BTreeSet::from([b]));
        assert_eq!(t.dirty_matches(), vec![1, 2]);
    }

    #[test]
    fn test_transient_entity_is_net_zero() {
        let (mut t, hp) = tracker();
        let e = spawn(&mut t, 1);
        t.attach(e, hp, 1.0).unwrap();
        t.delete_entity(e);
        let dirty = t.consume_dirty(1);
        assert!(dirty.is_empty(), "{dirty:?}");
    }

    #[test]
    fn test_removing_absent_component_is_not_a_change() {
        let (mut t, hp) = tracker();
        let e = spawn(&mut t, 1);
        t.consume_dirty(1);
        t.remove(e, hp).unwrap();
        assert!(t.peek_dirty(1).is_empty());
    }

    #[test]
    fn test_clear_dirty() {
        let (mut t, _) = tracker();
        spawn(&mut t, 3);
        t.clear_dirty(3);
        assert!(t.peek_dirty(3).is_empty());
    }

    #[test]
    fn test_clear_all_dirty() {
        let (mut t, hp) = tracker();
        spawn(&mut t, 1);
        let e = spawn(&mut t, 2);
        t.clear_all_dirty();
        assert!(t.dirty_matches().is_empty());
        t.attach(e, hp, 7.0).unwrap();
        assert_eq!(t.dirty_matches(), vec![2]);
        assert!(t.peek_dirty(2).modified.contains(&e));
    }

    #[test]
    fn test_attach_many_binds_once() {
        let (mut t, hp) = tracker();
        let e = t.create_entity();
        t.attach_many(e, &[(MATCH_ID, match_value(4)), (hp, 50.0)]).unwrap();
        let dirty = t.consume_dirty(4);
        assert_eq!(dirty.added, BTreeSet::from([e]));
        assert!(dirty.modified.is_empty());
    }
}
