//! Row-major float table.
//!
//! Each entity owns one row of `max_components` floats; each registered
//! component owns one column. Rows of deleted entities are queued and
//! reused first-in first-out before the table grows. A per-column index of
//! entities answers [`ComponentStore::entities_with`] without a table scan.

use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};
use std::sync::Arc;

use sim_component::{ComponentId, ComponentRegistry, EntityAllocator, EntityId};
use tracing::debug;

use crate::config::StoreConfig;
use crate::error::StoreError;
use crate::store::ComponentStore;

#[derive(Debug)]
pub struct ArrayStore {
    registry: Arc<ComponentRegistry>,
    allocator: EntityAllocator,
    stride: usize,
    initial_rows: usize,
    values: Vec<f32>,
    row_owner: Vec<Option<EntityId>>,
    /// First never-used row.
    next_row: usize,
    entity_rows: HashMap<EntityId, usize>,
    reclaimed: VecDeque<usize>,
    index: Vec<HashSet<EntityId>>,
}

impl ArrayStore {
    /// Creates a store over a shared registry.
    #[must_use]
    pub fn new(registry: Arc<ComponentRegistry>, config: &StoreConfig) -> Self {
        Self::with_allocator(registry, config, EntityAllocator::new())
    }

    /// Creates a store with its own registry sized from `config`.
    #[must_use]
    pub fn with_config(config: &StoreConfig) -> Self {
        Self::new(
            Arc::new(ComponentRegistry::with_capacity(config.max_components)),
            config,
        )
    }

    #[must_use]
    pub fn with_allocator(
        registry: Arc<ComponentRegistry>,
        config: &StoreConfig,
        allocator: EntityAllocator,
    ) -> Self {
        let stride = registry.max_components();
        let rows = config.initial_rows.max(1);
        Self {
            registry,
            allocator,
            stride,
            initial_rows: rows,
            values: vec![f32::NAN; rows * stride],
            row_owner: vec![None; rows],
            next_row: 0,
            entity_rows: HashMap::new(),
            reclaimed: VecDeque::new(),
            index: vec![HashSet::new(); stride],
        }
    }

    /// The registry, shareable with other layers.
    #[must_use]
    pub fn shared_registry(&self) -> Arc<ComponentRegistry> {
        Arc::clone(&self.registry)
    }

    /// Allocated rows.
    #[must_use]
    pub fn row_capacity(&self) -> usize {
        self.row_owner.len()
    }

    /// Rows ever handed out; never decreases until [`ComponentStore::reset`].
    #[must_use]
    pub fn high_water_mark(&self) -> usize {
        self.next_row
    }

    /// Rows waiting to be reused.
    #[must_use]
    pub fn reclaimed_rows(&self) -> usize {
        self.reclaimed.len()
    }

    /// Registered components, core included.
    #[must_use]
    pub fn component_count(&self) -> usize {
        self.registry.len()
    }

    fn take_row(&mut self) -> usize {
        if let Some(row) = self.reclaimed.pop_front() {
            return row;
        }
        if self.next_row == self.row_owner.len() {
            let rows = self.row_owner.len() * 2;
            self.values.resize(rows * self.stride, f32::NAN);
            self.row_owner.resize(rows, None);
            debug!(rows, "component table grown");
        }
        let row = self.next_row;
        self.next_row += 1;
        row
    }

    fn slot(&self, entity: EntityId, component: ComponentId) -> Option<(usize, usize)> {
        let row = *self.entity_rows.get(&entity)?;
        let column = self.registry.column(component)?;
        Some((row * self.stride + column, column))
    }
}

impl ComponentStore for ArrayStore {
    fn registry(&self) -> &ComponentRegistry {
        &self.registry
    }

    fn create_entity(&mut self) -> EntityId {
        let entity = self.allocator.allocate();
        let row = self.take_row();
        self.row_owner[row] = Some(entity);
        self.entity_rows.insert(entity, row);
        entity
    }

    fn delete_entity(&mut self, entity: EntityId) -> bool {
        let Some(row) = self.entity_rows.remove(&entity) else {
            return false;
        };
        let start = row * self.stride;
        for (column, value) in self.values[start..start + self.stride].iter_mut().enumerate() {
            if !value.is_nan() {
                self.index[column].remove(&entity);
                *value = f32::NAN;
            }
        }
        self.row_owner[row] = None;
        self.reclaimed.push_back(row);
        true
    }

    fn contains(&self, entity: EntityId) -> bool {
        self.entity_rows.contains_key(&entity)
    }

    fn attach(&mut self, entity: EntityId, component: ComponentId, value: f32) -> Result<(), StoreError> {
        if value.is_nan() {
            return Err(StoreError::NanValue(component));
        }
        let column = self
            .registry
            .column(component)
            .ok_or(StoreError::UnknownComponent(component))?;
        let row = *self
            .entity_rows
            .get(&entity)
            .ok_or(StoreError::EntityNotFound(entity))?;
        self.values[row * self.stride + column] = value;
        self.index[column].insert(entity);
        Ok(())
    }

    fn remove(&mut self, entity: EntityId, component: ComponentId) -> Result<(), StoreError> {
        if self.registry.column(component).is_none() {
            return Err(StoreError::UnknownComponent(component));
        }
        if let Some((slot, column)) = self.slot(entity, component) {
            self.values[slot] = f32::NAN;
            self.index[column].remove(&entity);
        }
        Ok(())
    }

    fn get(&self, entity: EntityId, component: ComponentId) -> f32 {
        self.slot(entity, component)
            .map_or(f32::NAN, |(slot, _)| self.values[slot])
    }

    fn entities_with(&self, components: &[ComponentId]) -> BTreeSet<EntityId> {
        if components.is_empty() {
            return self.entity_rows.keys().copied().collect();
        }
        let mut columns = Vec::with_capacity(components.len());
        for component in components {
            match self.registry.column(*component) {
                Some(column) => columns.push(column),
                None => return BTreeSet::new(),
            }
        }
        columns.sort_by_key(|c| self.index[*c].len());
        let (smallest, rest) = columns.split_at(1);
        self.index[smallest[0]]
            .iter()
            .filter(|e| rest.iter().all(|c| self.index[*c].contains(*e)))
            .copied()
            .collect()
    }

    fn entity_count(&self) -> usize {
        self.entity_rows.len()
    }

    fn reset(&mut self) {
        let rows = self.initial_rows;
        self.values = vec![f32::NAN; rows * self.stride];
        self.row_owner = vec![None; rows];
        self.next_row = 0;
        self.entity_rows.clear();
        self.reclaimed.clear();
        self.index.iter_mut().for_each(HashSet::clear);
    }

    fn verify_integrity(&self) -> Result<(), StoreError> {
        for (entity, row) in &self.entity_rows {
            if self.row_owner.get(*row) != Some(&Some(*entity)) {
                return Err(StoreError::Corrupted(format!(
                    "row {row} of {entity} is not owned by it"
                )));
            }
        }
        for row in &self.reclaimed {
            if self.row_owner.get(*row) != Some(&None) {
                return Err(StoreError::Corrupted(format!(
                    "reclaimed row {row} is still in use"
                )));
            }
        }
        if self.entity_rows.len() + self.reclaimed.len() != self.next_row {
            return Err(StoreError::Corrupted(format!(
                "{} live and {} reclaimed rows do not add up to {} used",
                self.entity_rows.len(),
                self.reclaimed.len(),
                self.next_row
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sim_component::{ComponentDef, PermissionLevel};

    fn store() -> (ArrayStore, ComponentId, ComponentId) {
        let registry = Arc::new(ComponentRegistry::with_capacity(16));
        let hp = registry
            .register(ComponentDef::new("Health", "HP", PermissionLevel::Write))
            .unwrap()
            .def
            .id;
        let armor = registry
            .register(ComponentDef::new("Health", "ARMOR", PermissionLevel::Read))
            .unwrap()
            .def
            .id;
        let config = StoreConfig::default().with_initial_rows(2);
        let store = ArrayStore::with_allocator(registry, &config, EntityAllocator::starting_at(1));
        (store, hp, armor)
    }

    #[test]
    fn test_absent_reads_nan() {
        let (mut store, hp, _) = store();
        let e = store.create_entity();
        assert!(store.get(e, hp).is_nan());
        assert!(!store.has_component(e, hp));
        assert!(store.get(EntityId::from_raw(999), hp).is_nan());
    }

    #[test]
    fn test_attach_get_remove() {
        let (mut store, hp, _) = store();
        let e = store.create_entity();
        store.attach(e, hp, 100.0).unwrap();
        assert_eq!(store.get(e, hp), 100.0);
        store.remove(e, hp).unwrap();
        assert!(store.get(e, hp).is_nan());
        assert!(store.entities_with(&[hp]).is_empty());
    }

    #[test]
    fn test_attach_rejects_nan_and_unknown() {
        let (mut store, hp, _) = store();
        let e = store.create_entity();
        assert!(matches!(store.attach(e, hp, f32::NAN), Err(StoreError::NanValue(_))));
        assert!(matches!(
            store.attach(e, ComponentId(42), 1.0),
            Err(StoreError::UnknownComponent(_))
        ));
        assert!(matches!(
            store.attach(EntityId::from_raw(999), hp, 1.0),
            Err(StoreError::EntityNotFound(_))
        ));
    }

    #[test]
    fn test_delete_clears_row() {
        let (mut store, hp, _) = store();
        let e = store.create_entity();
        store.attach(e, hp, 5.0).unwrap();
        assert!(store.delete_entity(e));
        assert!(!store.contains(e));
        assert!(store.get(e, hp).is_nan());
        assert!(!store.delete_entity(e));
        assert_eq!(store.entity_count(), 0);
    }

    #[test]
    fn test_deleted_ids_are_never_reused() {
        let (mut store, hp, _) = store();
        let old = store.create_entity();
        store.attach(old, hp, 1.0).unwrap();
        store.delete_entity(old);
        let new = store.create_entity();
        assert_ne!(old, new);
        assert!(store.get(new, hp).is_nan());
    }

    #[test]
    fn test_rows_reused_fifo_without_growth() {
        let (mut store, _, _) = store();
        let first: Vec<_> = (0..8).map(|_| store.create_entity()).collect();
        let high_water = store.high_water_mark();
        let capacity = store.row_capacity();
        for e in &first {
            store.delete_entity(*e);
        }
        assert_eq!(store.reclaimed_rows(), 8);
        for _ in 0..8 {
            store.create_entity();
        }
        assert_eq!(store.high_water_mark(), high_water);
        assert_eq!(store.row_capacity(), capacity);
        assert_eq!(store.reclaimed_rows(), 0);
        assert_eq!(store.component_count(), 7);
        store.verify_integrity().unwrap();
    }

    #[test]
    fn test_table_doubles_when_full() {
        let (mut store, hp, _) = store();
        assert_eq!(store.row_capacity(), 2);
        let entities: Vec<_> = (0..5).map(|_| store.create_entity()).collect();
        assert_eq!(store.row_capacity(), 8);
        for (i, e) in entities.iter().enumerate() {
            store.attach(*e, hp, i as f32).unwrap();
        }
        for (i, e) in entities.iter().enumerate() {
            assert_eq!(store.get(*e, hp), i as f32);
        }
    }

    #[test]
    fn test_entities_with_intersects() {
        let (mut store, hp, armor) = store();
        let a = store.create_entity();
        let b = store.create_entity();
        let c = store.create_entity();
        store.attach(a, hp, 1.0).unwrap();
        store.attach(b, hp, 1.0).unwrap();
        store.attach(b, armor, 3.0).unwrap();
        store.attach(c, armor, 3.0).unwrap();
        assert_eq!(store.entities_with(&[hp]), BTreeSet::from([a, b]));
        assert_eq!(store.entities_with(&[hp, armor]), BTreeSet::from([b]));
        assert_eq!(store.entities_with(&[]), BTreeSet::from([a, b, c]));
        assert!(store.entities_with(&[ComponentId(7)]).is_empty());
    }

    #[test]
    fn test_attach_many_is_all_or_nothing() {
        let (mut store, hp, armor) = store();
        let e = store.create_entity();
        let err = store.attach_many(e, &[(hp, 10.0), (armor, f32::NAN)]);
        assert!(err.is_err());
        assert!(store.get(e, hp).is_nan());
        store.attach_many(e, &[(hp, 10.0), (armor, 2.0)]).unwrap();
        assert_eq!(store.get_many(e, &[hp, armor]), vec![10.0, 2.0]);
    }

    #[test]
    fn test_reset() {
        let (mut store, hp, _) = store();
        for _ in 0..5 {
            let e = store.create_entity();
            store.attach(e, hp, 1.0).unwrap();
        }
        store.reset();
        assert_eq!(store.entity_count(), 0);
        assert_eq!(store.row_capacity(), 2);
        assert_eq!(store.high_water_mark(), 0);
        assert!(store.entities_with(&[hp]).is_empty());
    }
}
