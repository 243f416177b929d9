//! Execution context handed to command handlers and systems.

use std::any::Any;
use std::sync::Arc;

use sim_component::{CallerContext, MatchId};
use sim_store::{ComponentStore, EntityFactory, ScopedStore};

use crate::payload::Payload;
use crate::queue::CommandSender;
use crate::resolver::ModuleResolver;

/// Everything a module may touch while one of its commands or systems runs.
///
/// Store access is scoped to the running module's permissions; commands
/// enqueued from here execute on the next tick.
pub struct ModuleContext<'a> {
    store: ScopedStore<'a>,
    commands: &'a CommandSender,
    resolver: &'a ModuleResolver,
    tick: u64,
}

impl<'a> ModuleContext<'a> {
    pub fn new(
        store: &'a mut dyn ComponentStore,
        caller: &'a CallerContext,
        commands: &'a CommandSender,
        resolver: &'a ModuleResolver,
        tick: u64,
    ) -> Self {
        Self {
            store: ScopedStore::new(store, caller),
            commands,
            resolver,
            tick,
        }
    }

    /// Permission-checked store access.
    pub fn store(&mut self) -> &mut ScopedStore<'a> {
        &mut self.store
    }

    /// Read-only store access.
    #[must_use]
    pub fn view(&self) -> &ScopedStore<'a> {
        &self.store
    }

    pub fn entity_factory(&mut self, match_id: MatchId) -> EntityFactory<'_> {
        self.store.entity_factory(match_id)
    }

    #[must_use]
    pub fn caller(&self) -> &CallerContext {
        self.store.caller()
    }

    /// Tick being executed.
    #[must_use]
    pub fn tick(&self) -> u64 {
        self.tick
    }

    /// Enqueues a follow-up command for the next tick.
    pub fn enqueue(&self, command_name: impl Into<String>, payload: Payload) -> bool {
        self.commands.enqueue(command_name, payload)
    }

    /// Capability exported by another module.
    #[must_use]
    pub fn resolve<T: Any + Send + Sync>(&self, capability: &str) -> Option<Arc<T>> {
        self.resolver.resolve(capability)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::CommandQueue;
    use sim_store::{ArrayStore, StoreConfig};

    #[test]
    fn test_context_exposes_factory_queue_and_resolver() {
        let mut store = ArrayStore::with_config(&StoreConfig::default().with_initial_rows(2));
        let caller = CallerContext::module("Spawner");
        let queue = CommandQueue::new();
        let sender = queue.sender();
        let mut resolver = ModuleResolver::new();
        resolver.export("Rules", "rules", Arc::new(7u32)).unwrap();

        let mut ctx = ModuleContext::new(&mut store, &caller, &sender, &resolver, 12);
        let entity = ctx.entity_factory(3).create().unwrap();
        assert_eq!(ctx.view().match_of(entity), Some(3));
        assert!(ctx.enqueue("followUp", Payload::new()));
        assert_eq!(ctx.resolve::<u32>("rules").as_deref(), Some(&7));
        assert_eq!(ctx.tick(), 12);
        assert_eq!(ctx.caller().name(), "Spawner");
        assert_eq!(queue.len(), 1);
    }
}
