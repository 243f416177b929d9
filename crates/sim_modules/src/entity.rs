//! Entity lifecycle commands.
//!
//! `spawn {matchId, entityType, playerId?}` creates an entity bound to the
//! match with `ENTITY_TYPE` set and, when a player is given, `PLAYER_ID` and
//! `OWNER_ID`. `despawn {entityId}` deletes it. The core components are
//! private, so this module runs elevated.

use sim_component::core::{ENTITY_TYPE, OWNER_ID, PLAYER_ID};
use sim_component::{ComponentDef, ComponentId, PermissionLevel};
use sim_module::{Command, CommandSchema, FieldType, Module, ModuleContext, Payload, ValidationError};
use tracing::info;

pub const MODULE: &str = "EntityModule";

pub const ENTITY_FLAG: ComponentId = ComponentId::qualified(MODULE, "entity");

#[derive(Debug, Default)]
pub struct EntityModule;

impl Module for EntityModule {
    fn name(&self) -> &str {
        MODULE
    }

    fn elevated(&self) -> bool {
        true
    }

    fn components(&self) -> Vec<ComponentDef> {
        Vec::new()
    }

    fn flag(&self) -> ComponentDef {
        ComponentDef::new(MODULE, "entity", PermissionLevel::Read)
    }

    fn commands(&self) -> Vec<Command> {
        vec![
            Command::new(
                "spawn",
                CommandSchema::new()
                    .required("matchId", FieldType::Long)
                    .required("entityType", FieldType::Long)
                    .optional("playerId", FieldType::Long),
                spawn,
            ),
            Command::new(
                "despawn",
                CommandSchema::new().required("entityId", FieldType::Long),
                despawn,
            ),
        ]
    }
}

fn spawn(ctx: &mut ModuleContext<'_>, payload: &Payload) -> anyhow::Result<()> {
    let match_id = u64::try_from(payload.require_long("matchId")?)
        .map_err(|_| ValidationError::precondition("matchId must not be negative"))?;
    let entity_type = payload.require_long("entityType")?;

    let mut initial = vec![(ENTITY_TYPE, entity_type as f32), (ENTITY_FLAG, 1.0)];
    if let Some(player) = payload.long("playerId") {
        initial.push((PLAYER_ID, player as f32));
        initial.push((OWNER_ID, player as f32));
    }
    let entity = ctx.entity_factory(match_id).create_with(&initial)?;
    info!(%entity, match_id, entity_type, "entity spawned");
    Ok(())
}

fn despawn(ctx: &mut ModuleContext<'_>, payload: &Payload) -> anyhow::Result<()> {
    let entity = payload.require_entity("entityId")?;
    let match_id = ctx
        .view()
        .match_of(entity)
        .ok_or_else(|| ValidationError::precondition(format!("{entity} does not exist")))?;
    ctx.entity_factory(match_id).delete(entity)?;
    info!(%entity, match_id, "entity despawned");
    Ok(())
}
