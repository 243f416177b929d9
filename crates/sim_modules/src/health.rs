//! Hit points, damage and death.
//!
//! Damage is two-phase: the `damage` command adds to `DAMAGE_TAKEN`, and the
//! `applyDamage` system applies the accumulated amount to `CURRENT_HP` later in the
//! same tick. Other modules can queue damage through the exported
//! [`HealthApi`].

use std::any::Any;
use std::sync::Arc;

use sim_component::{ComponentDef, ComponentId, EntityId, PermissionLevel};
use sim_module::{Command, CommandSchema, FieldType, Module, ModuleContext, Payload, System, ValidationError};
use sim_store::{ScopedStore, StoreError};
use tracing::{debug, info};

pub const MODULE: &str = "HealthModule";

pub const MAX_HP: ComponentId = ComponentId::qualified(MODULE, "MAX_HP");
pub const CURRENT_HP: ComponentId = ComponentId::qualified(MODULE, "CURRENT_HP");
pub const DAMAGE_TAKEN: ComponentId = ComponentId::qualified(MODULE, "DAMAGE_TAKEN");
pub const IS_DEAD: ComponentId = ComponentId::qualified(MODULE, "IS_DEAD");
pub const INVULNERABLE: ComponentId = ComponentId::qualified(MODULE, "INVULNERABLE");
pub const HEALTH_FLAG: ComponentId = ComponentId::qualified(MODULE, "health");

/// Capability name under which [`HealthApi`] is exported.
pub const CAPABILITY: &str = "health";

pub const DEFAULT_MAX_HP: f32 = 100.0;

const COLUMNS: [ComponentId; 5] = [MAX_HP, CURRENT_HP, DAMAGE_TAKEN, IS_DEAD, INVULNERABLE];

fn flag(value: f32) -> bool {
    !value.is_nan() && value != 0.0
}

fn as_value(flag: bool) -> f32 {
    if flag { 1.0 } else { 0.0 }
}

/// Typed view over the health columns of one entity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Health {
    pub max_hp: f32,
    pub current_hp: f32,
    pub damage_taken: f32,
    pub dead: bool,
    pub invulnerable: bool,
}

impl Health {
    /// # Errors
    ///
    /// [`ValidationError::Precondition`] unless `max_hp` is positive and
    /// `current_hp` is not negative.
    pub fn new(max_hp: f32, current_hp: f32) -> Result<Self, ValidationError> {
        if max_hp.is_nan() || max_hp <= 0.0 {
            return Err(ValidationError::precondition("Max HP must be positive"));
        }
        if current_hp < 0.0 {
            return Err(ValidationError::precondition("Current HP cannot be negative"));
        }
        let current_hp = current_hp.min(max_hp);
        Ok(Self {
            max_hp,
            current_hp,
            damage_taken: 0.0,
            dead: current_hp == 0.0,
            invulnerable: false,
        })
    }

    /// Reads the entity's health; `None` if it has no health flag.
    #[must_use]
    pub fn load(store: &ScopedStore<'_>, entity: EntityId) -> Option<Self> {
        if !store.has_component(entity, HEALTH_FLAG) {
            return None;
        }
        let v = store.get_many(entity, &COLUMNS);
        let or_zero = |x: f32| if x.is_nan() { 0.0 } else { x };
        Some(Self {
            max_hp: or_zero(v[0]),
            current_hp: or_zero(v[1]),
            damage_taken: or_zero(v[2]),
            dead: flag(v[3]),
            invulnerable: flag(v[4]),
        })
    }

    /// Re-reads from the store. Returns `false` if health is gone.
    pub fn refresh(&mut self, store: &ScopedStore<'_>, entity: EntityId) -> bool {
        match Self::load(store, entity) {
            Some(fresh) => {
                *self = fresh;
                true
            }
            None => false,
        }
    }

    /// Writes every health column and the flag.
    ///
    /// # Errors
    ///
    /// Any [`StoreError`] of [`ScopedStore::attach_many`].
    pub fn store(&self, store: &mut ScopedStore<'_>, entity: EntityId) -> Result<(), StoreError> {
        store.attach_many(
            entity,
            &[
                (MAX_HP, self.max_hp),
                (CURRENT_HP, self.current_hp),
                (DAMAGE_TAKEN, self.damage_taken),
                (IS_DEAD, as_value(self.dead)),
                (INVULNERABLE, as_value(self.invulnerable)),
                (HEALTH_FLAG, 1.0),
            ],
        )
    }

    /// Lowers current HP, clamping at zero. No effect when dead or
    /// invulnerable.
    pub fn apply_damage(&mut self, amount: f32) {
        if self.dead || self.invulnerable {
            return;
        }
        self.current_hp = (self.current_hp - amount).max(0.0);
        if self.current_hp == 0.0 {
            self.dead = true;
        }
    }

    /// Raises current HP up to max. The dead cannot be healed.
    pub fn heal(&mut self, amount: f32) {
        if !self.dead {
            self.current_hp = (self.current_hp + amount).min(self.max_hp);
        }
    }
}

/// Damage entry point for other modules.
#[derive(Debug, Default)]
pub struct HealthApi;

impl HealthApi {
    /// Queues `amount` of damage for the next damage pass.
    ///
    /// # Errors
    ///
    /// [`ValidationError::Precondition`] for negative amounts or entities
    /// without health, and any store error.
    pub fn damage(&self, store: &mut ScopedStore<'_>, entity: EntityId, amount: f32) -> anyhow::Result<()> {
        if amount < 0.0 {
            return Err(ValidationError::precondition("damage amount must not be negative").into());
        }
        let health = Health::load(store, entity)
            .ok_or_else(|| ValidationError::precondition(format!("{entity} has no health")))?;
        if health.dead || health.invulnerable {
            debug!(%entity, "damage ignored");
            return Ok(());
        }
        store.attach(entity, DAMAGE_TAKEN, health.damage_taken + amount)?;
        Ok(())
    }

    #[must_use]
    pub fn current_hp(&self, store: &ScopedStore<'_>, entity: EntityId) -> Option<f32> {
        Health::load(store, entity).map(|h| h.current_hp)
    }
}

#[derive(Debug, Default)]
pub struct HealthModule;

impl Module for HealthModule {
    fn name(&self) -> &str {
        MODULE
    }

    fn dependencies(&self) -> Vec<String> {
        vec![crate::entity::MODULE.to_owned()]
    }

    fn components(&self) -> Vec<ComponentDef> {
        vec![
            ComponentDef::new(MODULE, "MAX_HP", PermissionLevel::Read),
            ComponentDef::new(MODULE, "CURRENT_HP", PermissionLevel::Write),
            ComponentDef::new(MODULE, "DAMAGE_TAKEN", PermissionLevel::Write),
            ComponentDef::new(MODULE, "IS_DEAD", PermissionLevel::Read),
            ComponentDef::new(MODULE, "INVULNERABLE", PermissionLevel::Read),
        ]
    }

    fn flag(&self) -> ComponentDef {
        ComponentDef::new(MODULE, "health", PermissionLevel::Read)
    }

    fn commands(&self) -> Vec<Command> {
        vec![
            Command::new(
                "attachHealth",
                CommandSchema::new()
                    .required("entityId", FieldType::Long)
                    .optional("maxHP", FieldType::Float)
                    .optional("currentHP", FieldType::Float),
                attach_health,
            ),
            Command::new(
                "damage",
                CommandSchema::new()
                    .required("entityId", FieldType::Long)
                    .required("amount", FieldType::Float),
                |ctx, payload| {
                    let entity = payload.require_entity("entityId")?;
                    let amount = payload.require_float("amount")?;
                    HealthApi.damage(ctx.store(), entity, amount)
                },
            ),
            Command::new(
                "heal",
                CommandSchema::new()
                    .required("entityId", FieldType::Long)
                    .required("amount", FieldType::Float),
                heal,
            ),
            Command::new(
                "setInvulnerable",
                CommandSchema::new()
                    .required("entityId", FieldType::Long)
                    .required("enabled", FieldType::Bool),
                set_invulnerable,
            ),
        ]
    }

    fn systems(&self) -> Vec<System> {
        vec![System::new("applyDamage", process_damage)]
    }

    fn exports(&self) -> Vec<(String, Arc<dyn Any + Send + Sync>)> {
        let api: Arc<dyn Any + Send + Sync> = Arc::new(HealthApi);
        vec![(CAPABILITY.to_owned(), api)]
    }
}

fn require_health(ctx: &ModuleContext<'_>, entity: EntityId) -> Result<Health, ValidationError> {
    Health::load(ctx.view(), entity)
        .ok_or_else(|| ValidationError::precondition(format!("{entity} has no health")))
}

fn attach_health(ctx: &mut ModuleContext<'_>, payload: &Payload) -> anyhow::Result<()> {
    let entity = payload.require_entity("entityId")?;
    if !ctx.view().contains(entity) {
        return Err(ValidationError::precondition(format!("{entity} does not exist")).into());
    }
    let max_hp = payload.float_or("maxHP", DEFAULT_MAX_HP);
    let current_hp = payload.float_or("currentHP", max_hp);
    let health = Health::new(max_hp, current_hp)?;
    health.store(ctx.store(), entity)?;
    info!(%entity, max_hp, current_hp = health.current_hp, "health attached");
    Ok(())
}

fn heal(ctx: &mut ModuleContext<'_>, payload: &Payload) -> anyhow::Result<()> {
    let entity = payload.require_entity("entityId")?;
    let amount = payload.require_float("amount")?;
    if amount < 0.0 {
        return Err(ValidationError::precondition("heal amount must not be negative").into());
    }
    let mut health = require_health(ctx, entity)?;
    health.heal(amount);
    ctx.store().attach(entity, CURRENT_HP, health.current_hp)?;
    Ok(())
}

fn set_invulnerable(ctx: &mut ModuleContext<'_>, payload: &Payload) -> anyhow::Result<()> {
    let entity = payload.require_entity("entityId")?;
    let enabled = payload.bool("enabled").unwrap_or(false);
    require_health(ctx, entity)?;
    ctx.store().attach(entity, INVULNERABLE, as_value(enabled))?;
    Ok(())
}

/// Applies accumulated damage and resets the accumulator.
fn process_damage(ctx: &mut ModuleContext<'_>) -> anyhow::Result<()> {
    let entities = ctx.view().entities_with(&[HEALTH_FLAG, DAMAGE_TAKEN]);
    for entity in entities {
        let Some(mut health) = Health::load(ctx.view(), entity) else {
            continue;
        };
        if health.damage_taken <= 0.0 {
            continue;
        }
        health.apply_damage(health.damage_taken);
        health.damage_taken = 0.0;
        health.store(ctx.store(), entity)?;
        if health.dead {
            info!(%entity, tick = ctx.tick(), "entity died");
        }
    }
    Ok(())
}
