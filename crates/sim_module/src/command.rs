//! Commands, systems and the command registry.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use sim_component::CallerContext;

use crate::context::ModuleContext;
use crate::error::{CommandError, ModuleError};
use crate::payload::Payload;
use crate::schema::CommandSchema;

pub type CommandHandler = Arc<dyn Fn(&mut ModuleContext<'_>, &Payload) -> anyhow::Result<()> + Send + Sync>;

/// A named, schema-validated operation exposed by a module.
#[derive(Clone)]
pub struct Command {
    name: String,
    schema: CommandSchema,
    handler: CommandHandler,
}

impl Command {
    pub fn new<F>(name: impl Into<String>, schema: CommandSchema, handler: F) -> Self
    where
        F: Fn(&mut ModuleContext<'_>, &Payload) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            schema,
            handler: Arc::new(handler),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn schema(&self) -> &CommandSchema {
        &self.schema
    }

    /// Validates `payload` and runs the handler.
    ///
    /// # Errors
    ///
    /// [`CommandError::Validation`] without running the handler if the
    /// payload does not match the schema, otherwise the classified handler
    /// error.
    pub fn execute(&self, ctx: &mut ModuleContext<'_>, payload: &Payload) -> Result<(), CommandError> {
        self.schema
            .validate(payload)
            .map_err(|source| CommandError::Validation {
                command: self.name.clone(),
                source,
            })?;
        (self.handler)(ctx, payload).map_err(|err| CommandError::from_handler(&self.name, err))
    }
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Command")
            .field("name", &self.name)
            .field("schema", &self.schema)
            .finish_non_exhaustive()
    }
}

/// Per-tick logic run after the command drain.
pub struct System {
    name: String,
    run: Box<dyn FnMut(&mut ModuleContext<'_>) -> anyhow::Result<()> + Send>,
}

impl System {
    pub fn new<F>(name: impl Into<String>, run: F) -> Self
    where
        F: FnMut(&mut ModuleContext<'_>) -> anyhow::Result<()> + Send + 'static,
    {
        Self {
            name: name.into(),
            run: Box::new(run),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// # Errors
    ///
    /// [`CommandError::System`] wrapping whatever the system returned.
    pub fn run(&mut self, ctx: &mut ModuleContext<'_>) -> Result<(), CommandError> {
        (self.run)(ctx).map_err(|err| CommandError::from_system(&self.name, err))
    }
}

impl fmt::Debug for System {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("System")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// A command together with the caller it executes as.
#[derive(Debug, Clone)]
pub struct RegisteredCommand {
    pub command: Command,
    pub caller: CallerContext,
}

/// Commands of every loaded module, keyed by name.
#[derive(Debug, Default)]
pub struct CommandRegistry {
    commands: HashMap<String, RegisteredCommand>,
}

impl CommandRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// # Errors
    ///
    /// [`ModuleError::DuplicateCommand`] if the name is already taken.
    pub fn register(&mut self, caller: CallerContext, command: Command) -> Result<(), ModuleError> {
        if let Some(existing) = self.commands.get(command.name()) {
            return Err(ModuleError::DuplicateCommand {
                command: command.name().to_owned(),
                first: existing.caller.name().to_owned(),
                second: caller.name().to_owned(),
            });
        }
        self.commands
            .insert(command.name().to_owned(), RegisteredCommand { command, caller });
        Ok(())
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&RegisteredCommand> {
        self.commands.get(name)
    }

    /// Command names, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<_> = self.commands.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ValidationError;
    use crate::queue::CommandQueue;
    use crate::resolver::ModuleResolver;
    use crate::schema::FieldType;
    use sim_store::{ArrayStore, StoreConfig};

    fn noop(name: &str) -> Command {
        Command::new(name, CommandSchema::new(), |_, _| Ok(()))
    }

    #[test]
    fn test_duplicate_command_rejected() {
        let mut registry = CommandRegistry::new();
        registry.register(CallerContext::module("A"), noop("spawn")).unwrap();
        let err = registry
            .register(CallerContext::module("B"), noop("spawn"))
            .unwrap_err();
        assert!(matches!(err, ModuleError::DuplicateCommand { ref first, .. } if first == "A"));
        assert_eq!(registry.names(), vec!["spawn"]);
    }

    #[test]
    fn test_schema_checked_before_handler() {
        let command = Command::new(
            "damage",
            CommandSchema::new().required("amount", FieldType::Float),
            |_, _| anyhow::bail!("handler must not run"),
        );
        let mut store = ArrayStore::with_config(&StoreConfig::default().with_initial_rows(1));
        let caller = CallerContext::module("Health");
        let queue = CommandQueue::new();
        let sender = queue.sender();
        let resolver = ModuleResolver::new();
        let mut ctx = ModuleContext::new(&mut store, &caller, &sender, &resolver, 0);
        let err = command.execute(&mut ctx, &Payload::new()).unwrap_err();
        assert!(matches!(
            err,
            CommandError::Validation {
                source: ValidationError::MissingField(_),
                ..
            }
        ));
    }

    #[test]
    fn test_system_error_wrapped() {
        let mut system = System::new("regen", |_| anyhow::bail!("no mana"));
        let mut store = ArrayStore::with_config(&StoreConfig::default().with_initial_rows(1));
        let caller = CallerContext::module("Health");
        let queue = CommandQueue::new();
        let sender = queue.sender();
        let resolver = ModuleResolver::new();
        let mut ctx = ModuleContext::new(&mut store, &caller, &sender, &resolver, 0);
        let err = system.run(&mut ctx).unwrap_err();
        assert_eq!(err.name(), "regen");
        assert!(err.to_string().contains("no mana"));
    }
}
