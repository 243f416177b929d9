//! Execution containers.
//!
//! A [`Container`] owns one store, one command queue and one tick lane.
//! Commands may be enqueued from any thread; everything that touches the
//! store (ticks, snapshots, deltas) goes through the lane lock, so manual
//! ticks, auto-advance ticks and snapshot reads never interleave.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use sim_component::{ComponentRegistry, MatchId, ModuleVersion};
use sim_module::{CommandError, CommandRequest, CommandSender, Module, Payload};
use sim_snapshot::{DeltaSnapshot, Snapshot};
use sim_store::{ArrayStore, ComponentStore};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{error, info};
use uuid::Uuid;

use crate::config::ContainerConfig;
use crate::error::ContainerError;
use crate::lane::{ErrorQueue, TickLane, TickReport};
use crate::loader;

struct Shared {
    name: String,
    lane: Mutex<TickLane>,
    errors: ErrorQueue,
    tick: AtomicU64,
}

impl Shared {
    fn lane(&self) -> Result<MutexGuard<'_, TickLane>, ContainerError> {
        self.lane.lock().map_err(|_| ContainerError::Poisoned)
    }

    fn advance(&self) -> Result<TickReport, ContainerError> {
        let mut lane = self.lane()?;
        let report = lane.advance(&self.errors)?;
        self.tick.store(report.tick, Ordering::Release);
        Ok(report)
    }
}

struct AutoAdvance {
    interval: Duration,
    handle: JoinHandle<()>,
}

/// One isolated simulation: store, command queue and tick scheduler.
pub struct Container {
    id: Uuid,
    shared: Arc<Shared>,
    sender: CommandSender,
    registry: Arc<ComponentRegistry>,
    modules: Vec<(String, ModuleVersion)>,
    auto: Mutex<Option<AutoAdvance>>,
}

/// Collects modules before building a [`Container`].
pub struct ContainerBuilder {
    config: ContainerConfig,
    modules: Vec<Box<dyn Module>>,
}

impl ContainerBuilder {
    #[must_use]
    pub fn module(mut self, module: impl Module + 'static) -> Self {
        self.modules.push(Box::new(module));
        self
    }

    #[must_use]
    pub fn boxed_module(mut self, module: Box<dyn Module>) -> Self {
        self.modules.push(module);
        self
    }

    /// Loads the modules and creates the container.
    ///
    /// # Errors
    ///
    /// [`ContainerError::Module`] if the modules cannot be loaded together.
    pub fn build(self) -> Result<Container, ContainerError> {
        let registry = Arc::new(ComponentRegistry::with_capacity(self.config.store.max_components));
        let store = ArrayStore::new(Arc::clone(&registry), &self.config.store);
        let loaded = loader::load(&registry, self.modules)?;
        let modules = loaded.order.clone();
        let queue = sim_module::CommandQueue::new();
        let sender = queue.sender();
        let lane = TickLane::new(&self.config, store, queue, loaded);

        let id = Uuid::new_v4();
        info!(
            container = %self.config.name,
            %id,
            modules = modules.len(),
            components = registry.len(),
            "container created"
        );
        Ok(Container {
            id,
            shared: Arc::new(Shared {
                name: self.config.name,
                lane: Mutex::new(lane),
                errors: ErrorQueue::default(),
                tick: AtomicU64::new(0),
            }),
            sender,
            registry,
            modules,
            auto: Mutex::new(None),
        })
    }
}

impl Container {
    #[must_use]
    pub fn builder(config: ContainerConfig) -> ContainerBuilder {
        ContainerBuilder {
            config,
            modules: Vec::new(),
        }
    }

    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.shared.name
    }

    /// Modules in load order.
    #[must_use]
    pub fn modules(&self) -> &[(String, ModuleVersion)] {
        &self.modules
    }

    #[must_use]
    pub fn registry(&self) -> &ComponentRegistry {
        &self.registry
    }

    // ---- Commands ----

    /// Queues a command for the next tick. Safe from any thread.
    pub fn enqueue(&self, command_name: impl Into<String>, payload: Payload) -> bool {
        self.sender.enqueue(command_name, payload)
    }

    pub fn submit(&self, request: CommandRequest) -> bool {
        self.sender.submit(request)
    }

    /// A cloneable handle for request threads.
    #[must_use]
    pub fn command_sender(&self) -> CommandSender {
        self.sender.clone()
    }

    #[must_use]
    pub fn queue_len(&self) -> usize {
        self.sender.pending()
    }

    /// Failures collected since the last call. Each failure is returned once.
    #[must_use]
    pub fn get_errors(&self) -> Vec<CommandError> {
        self.shared.errors.drain()
    }

    // ---- Ticks ----

    /// Runs one tick on the calling thread.
    ///
    /// # Errors
    ///
    /// [`ContainerError::Failed`] if the container has failed, now or
    /// earlier.
    pub fn advance_tick(&self) -> Result<TickReport, ContainerError> {
        self.shared.advance()
    }

    /// Runs `count` ticks back to back.
    ///
    /// # Errors
    ///
    /// [`ContainerError::InvalidTickCount`] for a zero count, otherwise as
    /// [`Container::advance_tick`].
    pub fn advance_by(&self, count: u64) -> Result<TickReport, ContainerError> {
        if count == 0 {
            return Err(ContainerError::InvalidTickCount(count));
        }
        let mut report = self.advance_tick()?;
        for _ in 1..count {
            report = self.advance_tick()?;
        }
        Ok(report)
    }

    #[must_use]
    pub fn current_tick(&self) -> u64 {
        self.shared.tick.load(Ordering::Acquire)
    }

    /// Whether a fatal error stopped the container.
    #[must_use]
    pub fn is_failed(&self) -> bool {
        self.shared.lane().map_or(true, |lane| lane.failure().is_some())
    }

    /// Starts advancing every `interval` on the current tokio runtime.
    /// Calling it while already running restarts with the new interval.
    ///
    /// # Errors
    ///
    /// [`ContainerError::InvalidInterval`] for a zero interval and
    /// [`ContainerError::NoRuntime`] outside a tokio runtime.
    pub fn start_auto_advance(&self, interval: Duration) -> Result<(), ContainerError> {
        if interval.is_zero() {
            return Err(ContainerError::InvalidInterval);
        }
        let runtime = Handle::try_current().map_err(|_| ContainerError::NoRuntime)?;
        let mut auto = self.auto_state();
        if let Some(previous) = auto.take() {
            previous.handle.abort();
        }

        let shared = Arc::clone(&self.shared);
        let handle = runtime.spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                if let Err(err) = shared.advance() {
                    error!(container = %shared.name, error = %err, "auto-advance stopped");
                    break;
                }
            }
        });
        info!(
            container = %self.shared.name,
            interval_ms = interval.as_millis() as u64,
            "auto-advance started"
        );
        *auto = Some(AutoAdvance { interval, handle });
        Ok(())
    }

    /// Stops scheduling ticks. A tick already running completes.
    pub fn stop_auto_advance(&self) {
        if let Some(previous) = self.auto_state().take() {
            previous.handle.abort();
            info!(container = %self.shared.name, "auto-advance stopped");
        }
    }

    #[must_use]
    pub fn is_auto_advancing(&self) -> bool {
        self.auto_state().as_ref().is_some_and(|a| !a.handle.is_finished())
    }

    /// Interval of the running auto-advance, if any.
    #[must_use]
    pub fn auto_advance_interval(&self) -> Option<Duration> {
        self.auto_state()
            .as_ref()
            .filter(|a| !a.handle.is_finished())
            .map(|a| a.interval)
    }

    fn auto_state(&self) -> MutexGuard<'_, Option<AutoAdvance>> {
        self.auto.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // ---- Snapshots ----

    /// # Errors
    ///
    /// [`ContainerError::Poisoned`] if a tick panicked.
    pub fn snapshot(&self, match_id: MatchId) -> Result<Snapshot, ContainerError> {
        Ok(self.shared.lane()?.snapshot(match_id))
    }

    /// Snapshot restricted to entities owned by `player_id`.
    ///
    /// # Errors
    ///
    /// [`ContainerError::Poisoned`] if a tick panicked.
    pub fn snapshot_for_player(&self, match_id: MatchId, player_id: u64) -> Result<Snapshot, ContainerError> {
        Ok(self.shared.lane()?.snapshot_for_player(match_id, player_id))
    }

    /// Changes since the previous delta or full snapshot of the match. The
    /// first delta of a match reports every entity as added.
    ///
    /// # Errors
    ///
    /// [`ContainerError::Poisoned`] if a tick panicked.
    pub fn delta(&self, match_id: MatchId) -> Result<DeltaSnapshot, ContainerError> {
        Ok(self.shared.lane()?.delta(match_id))
    }

    /// Full snapshot that also becomes the new delta baseline.
    ///
    /// # Errors
    ///
    /// [`ContainerError::Poisoned`] if a tick panicked.
    pub fn full_snapshot(&self, match_id: MatchId) -> Result<Snapshot, ContainerError> {
        Ok(self.shared.lane()?.full_snapshot(match_id))
    }

    /// Makes the next delta of the match a full one.
    ///
    /// # Errors
    ///
    /// [`ContainerError::Poisoned`] if a tick panicked.
    pub fn reset_baseline(&self, match_id: MatchId) -> Result<(), ContainerError> {
        self.shared.lane()?.reset_baseline(match_id);
        Ok(())
    }

    /// Runs `f` against the store between ticks.
    ///
    /// # Errors
    ///
    /// [`ContainerError::Poisoned`] if a tick panicked.
    pub fn read<R>(&self, f: impl FnOnce(&dyn ComponentStore) -> R) -> Result<R, ContainerError> {
        let lane = self.shared.lane()?;
        Ok(f(lane.store()))
    }

    /// # Errors
    ///
    /// [`ContainerError::Poisoned`] if a tick panicked.
    pub fn entity_count(&self) -> Result<usize, ContainerError> {
        self.read(|store| store.entity_count())
    }

    /// Registered component count, including the core components.
    #[must_use]
    pub fn component_count(&self) -> usize {
        self.registry.len()
    }
}

impl Drop for Container {
    fn drop(&mut self) {
        self.stop_auto_advance();
    }
}

impl std::fmt::Debug for Container {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Container")
            .field("id", &self.id)
            .field("name", &self.shared.name)
            .field("tick", &self.current_tick())
            .field("modules", &self.modules)
            .finish_non_exhaustive()
    }
}
