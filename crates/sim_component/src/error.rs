//! Error types for component registration and authorisation.

use crate::component::ComponentId;
use crate::permission::{Access, PermissionLevel};

/// A caller tried an operation its permission level does not allow.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("module '{module}' may not {access} component '{component}'")]
pub struct AccessDenied {
    pub module: String,
    /// Qualified name of the component.
    pub component: String,
    pub access: Access,
}

/// Failure of [`crate::ComponentRegistry::authorize`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthorizeError {
    #[error("component {0} is not registered")]
    Unknown(ComponentId),

    #[error(transparent)]
    Denied(#[from] AccessDenied),
}

/// Errors raised while registering components.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("component '{name}' is already registered with permission {existing:?}")]
    PermissionMismatch {
        name: String,
        existing: PermissionLevel,
    },

    #[error("component '{name}' hashes to {id}, already used by '{existing}'")]
    IdCollision {
        id: ComponentId,
        name: String,
        existing: String,
    },

    #[error("component table is full ({max} components)")]
    Full { max: usize },
}
