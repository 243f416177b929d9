//! Column layout shared by snapshots and deltas.
//!
//! Modules appear in the order their first component was registered and
//! components in column order, so two snapshots taken against the same
//! registry line up column for column.

use sim_component::{ComponentId, ComponentRegistry, ModuleVersion};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSpec {
    pub id: ComponentId,
    pub name: String,
    /// `"module.component"`.
    pub qualified: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleColumns {
    pub name: String,
    pub version: ModuleVersion,
    pub components: Vec<ColumnSpec>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnLayout {
    pub modules: Vec<ModuleColumns>,
}

impl ColumnLayout {
    /// Layout of every module that declares at least one component.
    #[must_use]
    pub fn from_registry(registry: &ComponentRegistry) -> Self {
        let modules = registry
            .modules()
            .into_iter()
            .filter_map(|(name, version)| {
                let components: Vec<_> = registry
                    .components_of(&name)
                    .into_iter()
                    .map(|r| ColumnSpec {
                        id: r.def.id,
                        qualified: r.def.qualified_name(),
                        name: r.def.name,
                    })
                    .collect();
                (!components.is_empty()).then_some(ModuleColumns {
                    name,
                    version,
                    components,
                })
            })
            .collect();
        Self { modules }
    }

    /// Every column, flattened in layout order.
    pub fn columns(&self) -> impl Iterator<Item = &ColumnSpec> {
        self.modules.iter().flat_map(|m| m.components.iter())
    }
}
