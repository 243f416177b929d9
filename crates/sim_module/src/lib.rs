//! # sim_module
//!
//! How game logic plugs into a container.
//!
//! - [`Module`] — a named bundle of components, commands, systems and
//!   exported capabilities.
//! - [`Command`] and [`CommandSchema`] — named, schema-validated entry
//!   points carrying a [`Payload`].
//! - [`CommandQueue`] / [`CommandSender`] — thread-safe FIFO drained once
//!   per tick.
//! - [`ModuleContext`] — what a handler or system sees while it runs.
//! - [`ModuleResolver`] — typed lookup of capabilities exported by other
//!   modules.
//! - [`DependencyGraph`] — load order and cycle detection.

pub mod command;
pub mod context;
pub mod error;
pub mod graph;
pub mod module;
pub mod payload;
pub mod queue;
pub mod resolver;
pub mod schema;

pub use command::{Command, CommandHandler, CommandRegistry, RegisteredCommand, System};
pub use context::ModuleContext;
pub use error::{CommandError, ModuleError, ValidationError};
pub use graph::DependencyGraph;
pub use module::Module;
pub use payload::Payload;
pub use queue::{CommandQueue, CommandRequest, CommandSender};
pub use resolver::ModuleResolver;
pub use schema::{CommandSchema, FieldSpec, FieldType};
