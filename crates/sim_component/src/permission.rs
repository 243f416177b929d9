//! Component permissions and the caller context they are checked against.
//!
//! | level     | read | write existing | attach / remove |
//! |-----------|------|----------------|-----------------|
//! | `Read`    | all  | owner          | owner           |
//! | `Write`   | all  | all            | owner           |
//! | `Private` | all  | elevated       | elevated        |
//!
//! An elevated caller bypasses every check.

use serde::{Deserialize, Serialize};

/// Access level attached to a component at registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PermissionLevel {
    /// Readable by all modules, mutable only by the owner.
    Read,
    /// Readable and writable by all modules.
    Write,
    /// Mutable only by elevated modules.
    Private,
}

/// The kind of operation being authorised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Access {
    Read,
    /// Overwrite a value the entity already has.
    Write,
    /// Give the entity a component it does not have yet.
    Attach,
    Remove,
}

impl std::fmt::Display for Access {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Read => "read",
            Self::Write => "write",
            Self::Attach => "attach",
            Self::Remove => "remove",
        })
    }
}

impl PermissionLevel {
    /// Whether `access` is permitted for a caller that does (`owner`) or
    /// does not own the component.
    #[must_use]
    pub fn permits(self, access: Access, owner: bool, elevated: bool) -> bool {
        if elevated {
            return true;
        }
        match (self, access) {
            (_, Access::Read) => true,
            (Self::Private, _) => false,
            (Self::Write, Access::Write) => true,
            _ => owner,
        }
    }
}

/// Identity of the module on whose behalf a store operation runs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CallerContext {
    module: String,
    elevated: bool,
}

impl CallerContext {
    /// An ordinary (non-elevated) module.
    #[must_use]
    pub fn module(name: impl Into<String>) -> Self {
        Self {
            module: name.into(),
            elevated: false,
        }
    }

    /// A superuser module that bypasses permission checks.
    #[must_use]
    pub fn elevated(name: impl Into<String>) -> Self {
        Self {
            module: name.into(),
            elevated: true,
        }
    }

    /// Returns the name of the calling module.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.module
    }

    /// Returns `true` if the caller bypasses permission checks.
    #[must_use]
    pub fn is_elevated(&self) -> bool {
        self.elevated
    }

    /// Whether this caller may perform `access` on a component declared by
    /// `owner` with `level`.
    #[must_use]
    pub fn may(&self, level: PermissionLevel, owner: &str, access: Access) -> bool {
        level.permits(access, self.module == owner, self.elevated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reads_always_permitted() {
        for level in [PermissionLevel::Read, PermissionLevel::Write, PermissionLevel::Private] {
            assert!(level.permits(Access::Read, false, false));
        }
    }

    #[test]
    fn test_read_level_owner_only_mutation() {
        let owner = CallerContext::module("Health");
        let other = CallerContext::module("Combat");
        for access in [Access::Write, Access::Attach, Access::Remove] {
            assert!(owner.may(PermissionLevel::Read, "Health", access));
            assert!(!other.may(PermissionLevel::Read, "Health", access));
        }
    }

    #[test]
    fn test_write_level_allows_foreign_writes_only() {
        let other = CallerContext::module("Combat");
        assert!(other.may(PermissionLevel::Write, "Health", Access::Write));
        assert!(!other.may(PermissionLevel::Write, "Health", Access::Attach));
        assert!(!other.may(PermissionLevel::Write, "Health", Access::Remove));
    }

    #[test]
    fn test_private_requires_elevation() {
        let owner = CallerContext::module("core");
        let admin = CallerContext::elevated("EntityModule");
        assert!(!owner.may(PermissionLevel::Private, "core", Access::Write));
        assert!(admin.may(PermissionLevel::Private, "core", Access::Attach));
        assert!(admin.may(PermissionLevel::Private, "core", Access::Remove));
    }

    #[test]
    fn test_permission_serializes_uppercase() {
        let json = serde_json::to_string(&PermissionLevel::Private).unwrap();
        assert_eq!(json, "\"PRIVATE\"");
    }
}
