//! # sim_component
//!
//! Identity and access rules for the simulation store.
//!
//! This crate provides:
//!
//! - [`EntityId`] — lightweight `u64` entity identifiers.
//! - [`EntityAllocator`] — monotonically increasing, never-reused id source.
//! - [`ComponentId`] — FNV-1a hash of a module-qualified component name.
//! - [`PermissionLevel`] and [`CallerContext`] — who may touch which column.
//! - [`ComponentRegistry`] — assigns every registered component a dense column.
//! - [`core`] — the reserved components every entity can carry.

pub mod component;
pub mod core;
pub mod entity;
pub mod error;
pub mod permission;
pub mod registry;

pub use component::{ComponentDef, ComponentId, qualified_name};
pub use entity::{EntityAllocator, EntityId, MatchId};
pub use error::{AccessDenied, AuthorizeError, RegistryError};
pub use permission::{Access, CallerContext, PermissionLevel};
pub use registry::{ComponentRegistry, ModuleVersion, RegisteredComponent};
