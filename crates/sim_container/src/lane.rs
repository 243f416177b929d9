//! The tick lane: the single place where a container's store is mutated.
//!
//! One tick drains the command queue in FIFO order, executes each command
//! as the module that declared it, runs every system in load order and then
//! advances the tick counter. Failures are collected, never propagated,
//! unless they leave the store corrupted.

use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use sim_component::{ComponentRegistry, MatchId};
use sim_module::{CommandError, CommandQueue, CommandSender, ModuleContext, ValidationError};
use sim_snapshot::{DeltaCompressor, DeltaSnapshot, Snapshot, provider};
use sim_store::{ArrayStore, ComponentStore, DirtyTracker};
use tracing::{debug, error, warn};

use crate::config::ContainerConfig;
use crate::error::ContainerError;
use crate::loader::LoadedModules;

/// Outcome of one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickReport {
    /// Tick counter after the tick.
    pub tick: u64,
    pub commands: usize,
    pub failures: usize,
    pub elapsed: Duration,
}

/// Read-once buffer of failures collected across ticks.
#[derive(Debug, Default)]
pub(crate) struct ErrorQueue(Mutex<Vec<CommandError>>);

impl ErrorQueue {
    pub(crate) fn extend(&self, errors: Vec<CommandError>) {
        if !errors.is_empty() {
            self.0.lock().unwrap_or_else(PoisonError::into_inner).extend(errors);
        }
    }

    pub(crate) fn drain(&self) -> Vec<CommandError> {
        std::mem::take(&mut *self.0.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

pub(crate) struct TickLane {
    name: String,
    tick: u64,
    store: DirtyTracker<ArrayStore>,
    queue: CommandQueue,
    modules: LoadedModules,
    deltas: DeltaCompressor,
    max_commands_per_tick: usize,
    tick_budget: Duration,
    verify_integrity: bool,
    failed: Option<String>,
}

impl TickLane {
    pub(crate) fn new(config: &ContainerConfig, store: ArrayStore, queue: CommandQueue, modules: LoadedModules) -> Self {
        Self {
            name: config.name.clone(),
            tick: 0,
            store: DirtyTracker::new(store),
            queue,
            modules,
            deltas: DeltaCompressor::new(),
            max_commands_per_tick: config.max_commands_per_tick.max(1),
            tick_budget: config.tick_budget,
            verify_integrity: config.verify_integrity,
            failed: None,
        }
    }

    pub(crate) fn tick(&self) -> u64 {
        self.tick
    }

    pub(crate) fn store(&self) -> &DirtyTracker<ArrayStore> {
        &self.store
    }

    pub(crate) fn registry(&self) -> &ComponentRegistry {
        self.store.registry()
    }

    pub(crate) fn failure(&self) -> Option<&str> {
        self.failed.as_deref()
    }

    pub(crate) fn queue_len(&self) -> usize {
        self.queue.len()
    }

    /// Runs one tick, pushing collected failures onto `errors`.
    pub(crate) fn advance(&mut self, errors: &ErrorQueue) -> Result<TickReport, ContainerError> {
        if let Some(reason) = &self.failed {
            return Err(ContainerError::Failed {
                name: self.name.clone(),
                reason: reason.clone(),
            });
        }
        let started = Instant::now();
        let tick = self.tick;
        let sender = self.queue.sender();
        let requests = self.queue.drain(self.max_commands_per_tick);
        let mut failures = Vec::new();

        for request in &requests {
            let Some(entry) = self.modules.commands.get(&request.command_name) else {
                warn!(tick, command = %request.command_name, "unknown command");
                failures.push(CommandError::Validation {
                    command: request.command_name.clone(),
                    source: ValidationError::UnknownCommand(request.command_name.clone()),
                });
                continue;
            };
            let mut ctx = ModuleContext::new(&mut self.store, &entry.caller, &sender, &self.modules.resolver, tick);
            if let Err(err) = entry.command.execute(&mut ctx, &request.payload) {
                warn!(tick, command = %request.command_name, error = %err, "command failed");
                failures.push(err);
            }
        }

        for scheduled in &mut self.modules.systems {
            let mut ctx = ModuleContext::new(&mut self.store, &scheduled.caller, &sender, &self.modules.resolver, tick);
            if let Err(err) = scheduled.system.run(&mut ctx) {
                warn!(tick, module = %scheduled.module, error = %err, "system failed");
                failures.push(err);
            }
        }

        let fatal = failures
            .iter()
            .find(|f| f.is_fatal())
            .map(ToString::to_string)
            .or_else(|| self.check_integrity());
        let failure_count = failures.len();
        errors.extend(failures);
        if let Some(reason) = fatal {
            error!(container = %self.name, tick, %reason, "container failed");
            self.failed = Some(reason.clone());
            return Err(ContainerError::Failed {
                name: self.name.clone(),
                reason,
            });
        }

        self.tick += 1;
        let elapsed = started.elapsed();
        if elapsed > self.tick_budget {
            warn!(
                tick,
                elapsed_ms = elapsed.as_millis() as u64,
                budget_ms = self.tick_budget.as_millis() as u64,
                "tick exceeded time budget"
            );
        }
        debug!(tick, commands = requests.len(), failures = failure_count, "tick complete");
        Ok(TickReport {
            tick: self.tick,
            commands: requests.len(),
            failures: failure_count,
            elapsed,
        })
    }

    fn check_integrity(&self) -> Option<String> {
        if !self.verify_integrity {
            return None;
        }
        self.store.verify_integrity().err().map(|e| e.to_string())
    }

    pub(crate) fn snapshot(&self, match_id: MatchId) -> Snapshot {
        provider::snapshot(&self.store, match_id, self.tick)
    }

    pub(crate) fn snapshot_for_player(&self, match_id: MatchId, player_id: u64) -> Snapshot {
        provider::snapshot_for_player(&self.store, match_id, player_id, self.tick)
    }

    /// Changes since the previous delta or full snapshot of `match_id`.
    pub(crate) fn delta(&mut self, match_id: MatchId) -> DeltaSnapshot {
        let dirty = self.store.consume_dirty(match_id);
        let delta = self.deltas.compute(&self.store, match_id, &dirty, self.tick);
        debug!(
            match_id,
            base_tick = delta.base_tick,
            tick = delta.current_tick,
            changes = delta.change_count(),
            "delta computed"
        );
        delta
    }

    /// Full snapshot that also becomes the new delta baseline.
    pub(crate) fn full_snapshot(&mut self, match_id: MatchId) -> Snapshot {
        self.store.clear_dirty(match_id);
        self.deltas.full_snapshot(&self.store, match_id, self.tick)
    }

    pub(crate) fn reset_baseline(&mut self, match_id: MatchId) {
        self.deltas.reset_baseline(match_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader;
    use sim_component::ComponentDef;
    use sim_component::PermissionLevel;
    use sim_module::{Command, CommandSchema, Module, System};
    use sim_store::{StoreConfig, StoreError};
    use std::sync::Arc;

    struct Counter;

    impl Module for Counter {
        fn name(&self) -> &str {
            "Counter"
        }

        fn elevated(&self) -> bool {
            true
        }

        fn components(&self) -> Vec<ComponentDef> {
            Vec::new()
        }

        fn flag(&self) -> ComponentDef {
            ComponentDef::new("Counter", "flag", PermissionLevel::Read)
        }

        fn commands(&self) -> Vec<Command> {
            vec![
                Command::new("create", CommandSchema::new(), |ctx, _| {
                    ctx.entity_factory(1).create()?;
                    Ok(())
                }),
                Command::new("explode", CommandSchema::new(), |_, _| anyhow::bail!("boom")),
                Command::new("corrupt", CommandSchema::new(), |_, _| {
                    Err(StoreError::Corrupted("row table out of sync".into()).into())
                }),
            ]
        }

        fn systems(&self) -> Vec<System> {
            vec![System::new("noop", |_| Ok(()))]
        }
    }

    fn lane(max_commands: usize) -> TickLane {
        lane_with(&ContainerConfig::named("lane").with_max_commands_per_tick(max_commands))
    }

    fn lane_with(config: &ContainerConfig) -> TickLane {
        let store = ArrayStore::new(Arc::new(ComponentRegistry::new()), &StoreConfig::default().with_initial_rows(4));
        let modules = loader::load(store.registry(), vec![Box::new(Counter)]).unwrap();
        TickLane::new(config, store, CommandQueue::new(), modules)
    }

    fn enqueue(lane: &TickLane, name: &str) {
        lane.queue.sender().enqueue(name, sim_module::Payload::new());
    }

    #[test]
    fn test_tick_counter_advances() {
        let mut lane = lane(10);
        let errors = ErrorQueue::default();
        assert_eq!(lane.tick(), 0);
        let report = lane.advance(&errors).unwrap();
        assert_eq!(report.tick, 1);
        assert_eq!(lane.tick(), 1);
    }

    #[test]
    fn test_failures_do_not_abort_tick() {
        let mut lane = lane(10);
        let errors = ErrorQueue::default();
        enqueue(&lane, "explode");
        enqueue(&lane, "missing");
        enqueue(&lane, "create");
        let report = lane.advance(&errors).unwrap();
        assert_eq!(report.commands, 3);
        assert_eq!(report.failures, 2);
        assert_eq!(lane.store().entity_count(), 1);
        let collected = errors.drain();
        assert_eq!(collected.len(), 2);
        assert!(matches!(
            collected[1],
            CommandError::Validation {
                source: ValidationError::UnknownCommand(_),
                ..
            }
        ));
        assert!(errors.drain().is_empty());
    }

    #[test]
    fn test_command_limit_defers_rest() {
        let mut lane = lane(2);
        let errors = ErrorQueue::default();
        for _ in 0..5 {
            enqueue(&lane, "create");
        }
        assert_eq!(lane.advance(&errors).unwrap().commands, 2);
        assert_eq!(lane.queue_len(), 3);
        lane.advance(&errors).unwrap();
        lane.advance(&errors).unwrap();
        assert_eq!(lane.store().entity_count(), 5);
    }

    #[test]
    fn test_zero_command_limit_still_drains() {
        let config = ContainerConfig {
            max_commands_per_tick: 0,
            ..ContainerConfig::named("lane")
        };
        let mut lane = lane_with(&config);
        let errors = ErrorQueue::default();
        enqueue(&lane, "create");
        enqueue(&lane, "create");
        assert_eq!(lane.advance(&errors).unwrap().commands, 1);
        assert_eq!(lane.advance(&errors).unwrap().commands, 1);
        assert_eq!(lane.queue_len(), 0);
        assert_eq!(lane.store().entity_count(), 2);
    }

    #[test]
    fn test_corruption_is_fatal() {
        let mut lane = lane(10);
        let errors = ErrorQueue::default();
        enqueue(&lane, "corrupt");
        let err = lane.advance(&errors).unwrap_err();
        assert!(err.is_failed());
        assert_eq!(lane.tick(), 0);
        assert!(lane.failure().is_some());
        assert!(lane.advance(&errors).unwrap_err().is_failed());
        assert_eq!(errors.drain().len(), 1);
    }

    #[test]
    fn test_delta_after_full_snapshot_is_incremental() {
        let mut lane = lane(10);
        let errors = ErrorQueue::default();
        enqueue(&lane, "create");
        lane.advance(&errors).unwrap();
        let full = lane.full_snapshot(1);
        assert_eq!(full.entity_count(), 1);
        assert!(lane.delta(1).is_empty());

        enqueue(&lane, "create");
        lane.advance(&errors).unwrap();
        let delta = lane.delta(1);
        assert_eq!(delta.base_tick, 1);
        assert_eq!(delta.added.len(), 1);

        lane.reset_baseline(1);
        assert_eq!(lane.delta(1).base_tick, 0);
    }
}
