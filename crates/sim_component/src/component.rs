//! Component identity.
//!
//! A component is a single `f32` column owned by one module. Its
//! [`ComponentId`] is derived from the module-qualified name
//! (`"HealthModule.CURRENT_HP"`) with FNV-1a 64-bit, so ids are stable
//! across processes and can be computed in `const` context.

use serde::{Deserialize, Serialize};

use crate::permission::PermissionLevel;

/// A unique identifier for a component, derived from its qualified name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
pub struct ComponentId(pub u64);

impl ComponentId {
    /// FNV-1a 64-bit offset basis.
    const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;

    /// FNV-1a 64-bit prime.
    const FNV_PRIME: u64 = 0x0100_0000_01b3;

    const fn fold(mut hash: u64, bytes: &[u8]) -> u64 {
        let mut i = 0;
        while i < bytes.len() {
            hash ^= bytes[i] as u64;
            hash = hash.wrapping_mul(Self::FNV_PRIME);
            i += 1;
        }
        hash
    }

    /// Hash an already qualified name.
    ///
    /// # Algorithm (FNV-1a 64-bit)
    ///
    /// ```text
    /// hash = 0xcbf29ce484222325          (offset basis)
    /// for each byte in name.as_bytes():
    ///     hash = hash XOR byte
    ///     hash = hash * 0x00000100000001b3  (prime)
    /// return hash
    /// ```
    #[must_use]
    pub const fn from_name(name: &str) -> Self {
        Self(Self::fold(Self::FNV_OFFSET_BASIS, name.as_bytes()))
    }

    /// Id of `component` declared by `module`; equal to
    /// `from_name("module.component")`.
    #[must_use]
    pub const fn qualified(module: &str, component: &str) -> Self {
        let hash = Self::fold(Self::FNV_OFFSET_BASIS, module.as_bytes());
        let hash = Self::fold(hash, b".");
        Self(Self::fold(hash, component.as_bytes()))
    }
}

impl std::fmt::Display for ComponentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:#018x}", self.0)
    }
}

/// Joins a module and component name into the wire key `"module.component"`.
#[must_use]
pub fn qualified_name(module: &str, component: &str) -> String {
    format!("{module}.{component}")
}

/// Declaration of one component column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentDef {
    /// Id derived from the qualified name.
    pub id: ComponentId,
    /// Declaring (owning) module.
    pub module: String,
    /// Name within the declaring module.
    pub name: String,
    pub permission: PermissionLevel,
}

impl ComponentDef {
    /// Returns a declaration whose id is derived from `module` and `name`.
    #[must_use]
    pub fn new(module: impl Into<String>, name: impl Into<String>, permission: PermissionLevel) -> Self {
        let module = module.into();
        let name = name.into();
        Self {
            id: ComponentId::qualified(&module, &name),
            module,
            name,
            permission,
        }
    }

    /// The `"module.component"` key used in snapshots and deltas.
    #[must_use]
    pub fn qualified_name(&self) -> String {
        qualified_name(&self.module, &self.name)
    }
}
