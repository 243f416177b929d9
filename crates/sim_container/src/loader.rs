//! Module loading.
//!
//! Modules are loaded in dependency order. Each one declares its version,
//! registers its components and flag, contributes commands and systems, and
//! publishes its exports. Any failure aborts the whole load.

use std::collections::HashMap;

use sim_component::{CallerContext, ComponentDef, ComponentRegistry, ModuleVersion};
use sim_module::{CommandRegistry, DependencyGraph, Module, ModuleError, ModuleResolver, System};
use tracing::{debug, info};

/// A system together with the module it belongs to.
#[derive(Debug)]
pub struct ScheduledSystem {
    pub module: String,
    pub caller: CallerContext,
    pub system: System,
}

/// Everything the tick lane needs from the loaded modules.
#[derive(Debug, Default)]
pub struct LoadedModules {
    /// Module names and versions in load order.
    pub order: Vec<(String, ModuleVersion)>,
    pub commands: CommandRegistry,
    /// Systems in execution order.
    pub systems: Vec<ScheduledSystem>,
    pub resolver: ModuleResolver,
}

/// Loads `modules` against `registry`.
///
/// # Errors
///
/// [`ModuleError`] for duplicate modules, missing or circular dependencies,
/// foreign or conflicting components, and duplicate commands or exports.
pub fn load(registry: &ComponentRegistry, modules: Vec<Box<dyn Module>>) -> Result<LoadedModules, ModuleError> {
    let mut graph = DependencyGraph::new();
    let mut by_name: HashMap<String, Box<dyn Module>> = HashMap::with_capacity(modules.len());
    for module in modules {
        let name = module.name().to_owned();
        if by_name.contains_key(&name) {
            return Err(ModuleError::DuplicateModule(name));
        }
        graph.add_module(name.clone(), module.dependencies());
        by_name.insert(name, module);
    }

    let mut loaded = LoadedModules::default();
    for name in graph.topological_order()? {
        let Some(module) = by_name.remove(&name) else {
            continue;
        };
        load_one(registry, module.as_ref(), &mut loaded)?;
    }
    Ok(loaded)
}

fn load_one(registry: &ComponentRegistry, module: &dyn Module, loaded: &mut LoadedModules) -> Result<(), ModuleError> {
    let name = module.name();
    let version = module.version();
    registry.declare_module(name, version);

    let mut defs = module.components();
    defs.push(module.flag());
    for def in defs {
        check_owner(name, &def)?;
        registry.register(def)?;
    }

    let caller = module.caller();
    let commands = module.commands();
    let command_count = commands.len();
    for command in commands {
        loaded.commands.register(caller.clone(), command)?;
    }

    let systems = module.systems();
    let system_count = systems.len();
    for system in systems {
        debug!(module = name, system = system.name(), "system scheduled");
        loaded.systems.push(ScheduledSystem {
            module: name.to_owned(),
            caller: caller.clone(),
            system,
        });
    }

    for (capability, value) in module.exports() {
        loaded.resolver.export(name, capability, value)?;
    }

    info!(
        module = name,
        %version,
        elevated = caller.is_elevated(),
        commands = command_count,
        systems = system_count,
        "module loaded"
    );
    loaded.order.push((name.to_owned(), version));
    Ok(())
}

fn check_owner(module: &str, def: &ComponentDef) -> Result<(), ModuleError> {
    if def.module == module {
        Ok(())
    } else {
        Err(ModuleError::ForeignComponent {
            module: module.to_owned(),
            component: def.qualified_name(),
            owner: def.module.clone(),
        })
    }
}
