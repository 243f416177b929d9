//! The component registry.
//!
//! Every component must be registered before it can be stored. Registration
//! assigns the next free column of the store's row layout; the number of
//! columns is fixed when the registry is created. The registry is shared
//! (`Arc`) between the store, the snapshot layer and module loading, so all
//! methods take `&self`.

use std::sync::atomic::{AtomicUsize, Ordering};

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::component::{ComponentDef, ComponentId};
use crate::core::{CORE_MODULE, core_components};
use crate::error::{AccessDenied, AuthorizeError, RegistryError};
use crate::permission::{Access, CallerContext, PermissionLevel};

/// Version of a module, reported in snapshots as `"major.minor"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ModuleVersion {
    pub major: u32,
    pub minor: u32,
}

impl ModuleVersion {
    #[must_use]
    pub const fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }
}

impl Default for ModuleVersion {
    fn default() -> Self {
        Self::new(1, 0)
    }
}

impl std::fmt::Display for ModuleVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// A component definition together with its assigned column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisteredComponent {
    pub def: ComponentDef,
    pub column: usize,
}

/// Maps component ids to column slots and permission metadata.
#[derive(Debug)]
pub struct ComponentRegistry {
    max_components: usize,
    next_column: AtomicUsize,
    by_id: DashMap<ComponentId, RegisteredComponent>,
    by_name: DashMap<String, ComponentId>,
    modules: DashMap<String, ModuleVersion>,
}

impl ComponentRegistry {
    pub const DEFAULT_MAX_COMPONENTS: usize = 256;

    /// Creates a registry with [`Self::DEFAULT_MAX_COMPONENTS`] columns.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(Self::DEFAULT_MAX_COMPONENTS)
    }

    /// Creates a registry with room for `max_components` columns.
    ///
    /// The core components are registered up front and always fit: the
    /// capacity is raised to hold them if necessary.
    #[must_use]
    pub fn with_capacity(max_components: usize) -> Self {
        let core = core_components();
        let registry = Self {
            max_components: max_components.max(core.len()),
            next_column: AtomicUsize::new(0),
            by_id: DashMap::new(),
            by_name: DashMap::new(),
            modules: DashMap::new(),
        };
        registry.declare_module(CORE_MODULE, ModuleVersion::default());
        for def in core {
            let column = registry.next_column.fetch_add(1, Ordering::Relaxed);
            registry.insert(def, column);
        }
        registry
    }

    fn insert(&self, def: ComponentDef, column: usize) -> RegisteredComponent {
        let registered = RegisteredComponent { def, column };
        self.by_name
            .insert(registered.def.qualified_name(), registered.def.id);
        self.by_id.insert(registered.def.id, registered.clone());
        registered
    }

    /// Registers a component and returns its column.
    ///
    /// Registering an identical definition twice is a no-op that returns the
    /// existing column.
    ///
    /// # Errors
    ///
    /// - [`RegistryError::PermissionMismatch`] if the name is already
    ///   registered with a different permission.
    /// - [`RegistryError::IdCollision`] if a different name hashes to the
    ///   same id.
    /// - [`RegistryError::Full`] when every column is taken.
    pub fn register(&self, def: ComponentDef) -> Result<RegisteredComponent, RegistryError> {
        match self.by_id.entry(def.id) {
            Entry::Occupied(existing) => {
                let existing = existing.get();
                if existing.def == def {
                    Ok(existing.clone())
                } else if existing.def.module == def.module && existing.def.name == def.name {
                    Err(RegistryError::PermissionMismatch {
                        name: def.qualified_name(),
                        existing: existing.def.permission,
                    })
                } else {
                    Err(RegistryError::IdCollision {
                        id: def.id,
                        name: def.qualified_name(),
                        existing: existing.def.qualified_name(),
                    })
                }
            }
            Entry::Vacant(slot) => {
                let column = self.next_column.fetch_add(1, Ordering::Relaxed);
                if column >= self.max_components {
                    self.next_column.fetch_sub(1, Ordering::Relaxed);
                    return Err(RegistryError::Full {
                        max: self.max_components,
                    });
                }
                let registered = RegisteredComponent { def, column };
                self.by_name
                    .insert(registered.def.qualified_name(), registered.def.id);
                debug!(
                    component = %registered.def.qualified_name(),
                    column,
                    permission = ?registered.def.permission,
                    "component registered"
                );
                slot.insert(registered.clone());
                Ok(registered)
            }
        }
    }

    /// Records a module's version so snapshots can report it.
    pub fn declare_module(&self, name: &str, version: ModuleVersion) {
        self.modules.insert(name.to_owned(), version);
    }

    #[must_use]
    pub fn module_version(&self, name: &str) -> Option<ModuleVersion> {
        self.modules.get(name).map(|v| *v)
    }

    #[must_use]
    pub fn get(&self, id: ComponentId) -> Option<RegisteredComponent> {
        self.by_id.get(&id).map(|r| r.clone())
    }

    /// Column slot of `id`, if registered.
    #[must_use]
    pub fn column(&self, id: ComponentId) -> Option<usize> {
        self.by_id.get(&id).map(|r| r.column)
    }

    #[must_use]
    pub fn permission(&self, id: ComponentId) -> Option<PermissionLevel> {
        self.by_id.get(&id).map(|r| r.def.permission)
    }

    /// Looks a component up by module and component name.
    #[must_use]
    pub fn lookup(&self, module: &str, name: &str) -> Option<ComponentId> {
        self.by_name
            .get(&crate::component::qualified_name(module, name))
            .map(|id| *id)
    }

    /// Checks whether `caller` may perform `access` on `id`.
    ///
    /// # Errors
    ///
    /// [`AuthorizeError::Unknown`] for unregistered ids, otherwise
    /// [`AuthorizeError::Denied`] when the permission level forbids it.
    pub fn authorize(
        &self,
        id: ComponentId,
        caller: &CallerContext,
        access: Access,
    ) -> Result<(), AuthorizeError> {
        let entry = self.by_id.get(&id).ok_or(AuthorizeError::Unknown(id))?;
        let def = &entry.def;
        if caller.may(def.permission, &def.module, access) {
            Ok(())
        } else {
            Err(AccessDenied {
                module: caller.name().to_owned(),
                component: def.qualified_name(),
                access,
            }
            .into())
        }
    }

    /// All registered components, ordered by column.
    #[must_use]
    pub fn components(&self) -> Vec<RegisteredComponent> {
        let mut all: Vec<_> = self.by_id.iter().map(|r| r.clone()).collect();
        all.sort_by_key(|r| r.column);
        all
    }

    /// Components declared by `module`, ordered by column.
    #[must_use]
    pub fn components_of(&self, module: &str) -> Vec<RegisteredComponent> {
        let mut owned: Vec<_> = self
            .by_id
            .iter()
            .filter(|r| r.def.module == module)
            .map(|r| r.clone())
            .collect();
        owned.sort_by_key(|r| r.column);
        owned
    }

    /// Declared modules in registration order of their first component.
    /// Modules without components come last, by name.
    #[must_use]
    pub fn modules(&self) -> Vec<(String, ModuleVersion)> {
        let mut modules: Vec<_> = self
            .modules
            .iter()
            .map(|m| {
                let first = self
                    .by_id
                    .iter()
                    .filter(|r| r.def.module == *m.key())
                    .map(|r| r.column)
                    .min()
                    .unwrap_or(usize::MAX);
                (first, m.key().clone(), *m.value())
            })
            .collect();
        modules.sort();
        modules.into_iter().map(|(_, name, v)| (name, v)).collect()
    }

    /// Number of registered components (core included).
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    /// Row width of stores built on this registry.
    #[must_use]
    pub fn max_components(&self) -> usize {
        self.max_components
    }
}

impl Default for ComponentRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ENTITY_ID, MATCH_ID};

    fn hp() -> ComponentDef {
        ComponentDef::new("HealthModule", "CURRENT_HP", PermissionLevel::Write)
    }

    #[test]
    fn test_core_components_preregistered() {
        let registry = ComponentRegistry::new();
        assert_eq!(registry.column(MATCH_ID), Some(0));
        assert_eq!(registry.column(ENTITY_ID), Some(1));
        assert_eq!(registry.len(), 5);
    }

    #[test]
    fn test_register_assigns_dense_columns() {
        let registry = ComponentRegistry::new();
        let a = registry.register(hp()).unwrap();
        let b = registry
            .register(ComponentDef::new("HealthModule", "MAX_HP", PermissionLevel::Read))
            .unwrap();
        assert_eq!(a.column, 5);
        assert_eq!(b.column, 6);
        assert_eq!(registry.lookup("HealthModule", "MAX_HP"), Some(b.def.id));
    }

    #[test]
    fn test_register_is_idempotent() {
        let registry = ComponentRegistry::new();
        let first = registry.register(hp()).unwrap();
        let again = registry.register(hp()).unwrap();
        assert_eq!(first, again);
        assert_eq!(registry.len(), 6);
    }

    #[test]
    fn test_permission_mismatch_rejected() {
        let registry = ComponentRegistry::new();
        registry.register(hp()).unwrap();
        let err = registry
            .register(ComponentDef::new("HealthModule", "CURRENT_HP", PermissionLevel::Read))
            .unwrap_err();
        assert!(matches!(err, RegistryError::PermissionMismatch { .. }));
    }

    #[test]
    fn test_full_registry_rejected() {
        let registry = ComponentRegistry::with_capacity(6);
        registry.register(hp()).unwrap();
        let err = registry
            .register(ComponentDef::new("HealthModule", "MAX_HP", PermissionLevel::Read))
            .unwrap_err();
        assert_eq!(err, RegistryError::Full { max: 6 });
    }

    #[test]
    fn test_authorize() {
        let registry = ComponentRegistry::new();
        registry.register(hp()).unwrap();
        let id = hp().id;
        let combat = CallerContext::module("CombatModule");
        assert!(registry.authorize(id, &combat, Access::Write).is_ok());
        assert!(matches!(
            registry.authorize(id, &combat, Access::Attach),
            Err(AuthorizeError::Denied(_))
        ));
        assert!(matches!(
            registry.authorize(ComponentId(1), &combat, Access::Read),
            Err(AuthorizeError::Unknown(_))
        ));
    }

    #[test]
    fn test_modules_in_registration_order() {
        let registry = ComponentRegistry::new();
        registry.declare_module("HealthModule", ModuleVersion::new(2, 1));
        registry.declare_module("EmptyModule", ModuleVersion::default());
        registry.register(hp()).unwrap();
        let names: Vec<_> = registry.modules().into_iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["core", "HealthModule", "EmptyModule"]);
        assert_eq!(registry.module_version("HealthModule").unwrap().to_string(), "2.1");
    }
}
