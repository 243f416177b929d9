//! The [`Module`] contract.

use std::any::Any;
use std::sync::Arc;

use sim_component::{CallerContext, ComponentDef, ModuleVersion};

use crate::command::{Command, System};

/// A unit of game logic loaded into a container.
///
/// Everything a module declares is collected once, at load time. Component
/// definitions must name this module as their owner. Systems run every tick
/// in module load order, then in the order they are returned here.
pub trait Module: Send {
    fn name(&self) -> &str;

    fn version(&self) -> ModuleVersion {
        ModuleVersion::default()
    }

    /// Modules that must be loaded before this one.
    fn dependencies(&self) -> Vec<String> {
        Vec::new()
    }

    /// Elevated modules bypass component permission checks.
    fn elevated(&self) -> bool {
        false
    }

    fn components(&self) -> Vec<ComponentDef>;

    /// Marker component telling which entities this module manages.
    fn flag(&self) -> ComponentDef;

    fn commands(&self) -> Vec<Command> {
        Vec::new()
    }

    fn systems(&self) -> Vec<System> {
        Vec::new()
    }

    /// Capabilities published to other modules through the resolver.
    fn exports(&self) -> Vec<(String, Arc<dyn Any + Send + Sync>)> {
        Vec::new()
    }

    /// Caller identity this module's commands and systems run as.
    fn caller(&self) -> CallerContext {
        if self.elevated() {
            CallerContext::elevated(self.name())
        } else {
            CallerContext::module(self.name())
        }
    }
}
