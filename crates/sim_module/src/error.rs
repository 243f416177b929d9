//! Error types for commands and module loading.

use sim_component::{AccessDenied, RegistryError};
use sim_store::StoreError;

use crate::schema::FieldType;

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// A payload or precondition check failed. Nothing was executed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("missing required field '{0}'")]
    MissingField(String),

    #[error("field '{field}' must be {expected}, got {actual}")]
    WrongType {
        field: String,
        expected: FieldType,
        actual: String,
    },

    #[error("payload must be an object")]
    NotAnObject,

    #[error("unknown command '{0}'")]
    UnknownCommand(String),

    /// A handler-level precondition, e.g. a negative damage amount.
    #[error("{0}")]
    Precondition(String),
}

impl ValidationError {
    pub fn precondition(message: impl Into<String>) -> Self {
        Self::Precondition(message.into())
    }
}

/// Failure of one command or system during a tick.
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("command '{command}' rejected: {source}")]
    Validation {
        command: String,
        #[source]
        source: ValidationError,
    },

    #[error("command '{command}' denied: {source}")]
    AccessDenied {
        command: String,
        #[source]
        source: AccessDenied,
    },

    #[error("command '{command}' failed: {source}")]
    Execution {
        command: String,
        #[source]
        source: BoxError,
    },

    #[error("system '{system}' failed: {source}")]
    System {
        system: String,
        #[source]
        source: BoxError,
    },
}

impl CommandError {
    /// Classifies an error returned by a command handler.
    #[must_use]
    pub fn from_handler(command: &str, err: anyhow::Error) -> Self {
        let command = command.to_owned();
        let err = match err.downcast::<ValidationError>() {
            Ok(source) => return Self::Validation { command, source },
            Err(err) => err,
        };
        match err.downcast::<StoreError>() {
            Ok(StoreError::AccessDenied(source)) => Self::AccessDenied { command, source },
            Ok(other) => Self::Execution {
                command,
                source: Box::new(other),
            },
            Err(err) => Self::Execution {
                command,
                source: err.into(),
            },
        }
    }

    /// Wraps an error returned by a system.
    #[must_use]
    pub fn from_system(system: &str, err: anyhow::Error) -> Self {
        let source = match err.downcast::<StoreError>() {
            Ok(store) => Box::new(store) as BoxError,
            Err(err) => err.into(),
        };
        Self::System {
            system: system.to_owned(),
            source,
        }
    }

    /// Name of the failed command or system.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Validation { command, .. }
            | Self::AccessDenied { command, .. }
            | Self::Execution { command, .. } => command,
            Self::System { system, .. } => system,
        }
    }

    /// Whether the failure left the store corrupted.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::Execution { source, .. } | Self::System { source, .. } => source
                .downcast_ref::<StoreError>()
                .is_some_and(StoreError::is_fatal),
            _ => false,
        }
    }
}

/// Errors raised while loading modules into a container.
#[derive(Debug, thiserror::Error)]
pub enum ModuleError {
    #[error("module '{module}' depends on unknown module '{dependency}'")]
    MissingDependency { module: String, dependency: String },

    #[error("circular module dependency: {}", .0.join(" -> "))]
    Cycle(Vec<String>),

    #[error("module '{0}' is loaded twice")]
    DuplicateModule(String),

    #[error("command '{command}' is declared by both '{first}' and '{second}'")]
    DuplicateCommand {
        command: String,
        first: String,
        second: String,
    },

    #[error("capability '{capability}' is exported by both '{first}' and '{second}'")]
    DuplicateExport {
        capability: String,
        first: String,
        second: String,
    },

    #[error("module '{module}' declares component '{component}' of module '{owner}'")]
    ForeignComponent {
        module: String,
        component: String,
        owner: String,
    },

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use sim_component::{Access, EntityId};

    #[test]
    fn test_handler_validation_error_classified() {
        let err = anyhow::Error::from(ValidationError::precondition("amount must not be negative"));
        let classified = CommandError::from_handler("damage", err);
        assert!(matches!(classified, CommandError::Validation { .. }));
        assert_eq!(classified.name(), "damage");
    }

    #[test]
    fn test_handler_access_denied_classified() {
        let denied = AccessDenied {
            module: "Combat".into(),
            component: "core.ENTITY_TYPE".into(),
            access: Access::Write,
        };
        let err = anyhow::Error::from(StoreError::AccessDenied(denied));
        assert!(matches!(
            CommandError::from_handler("retype", err),
            CommandError::AccessDenied { .. }
        ));
    }

    #[test]
    fn test_other_errors_are_execution_failures() {
        let err = anyhow::Error::from(StoreError::EntityNotFound(EntityId(3)));
        let classified = CommandError::from_handler("damage", err);
        assert!(matches!(classified, CommandError::Execution { .. }));
        assert!(!classified.is_fatal());

        let classified = CommandError::from_handler("boom", anyhow::anyhow!("boom"));
        assert!(classified.to_string().contains("boom"));
    }

    #[test]
    fn test_corruption_is_fatal() {
        let err = anyhow::Error::from(StoreError::Corrupted("row mismatch".into()));
        assert!(CommandError::from_system("physics", err).is_fatal());
    }
}
