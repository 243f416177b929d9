//! # sim_container — demo runner
//!
//! Builds a container with the built-in modules, populates a few matches
//! and runs them, either back to back or on a fixed interval. Each tick a
//! unit in every match takes damage; at the end the delta of each match is
//! logged and optionally printed as JSON.
//!
//! Settings come from the command line plus the `SIM_*` environment
//! variables read by [`ContainerConfig::from_env`].

use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use sim_component::{EntityId, MatchId};
use sim_container::{Container, ContainerConfig};
use sim_module::Payload;
use sim_modules::{EntityModule, HealthModule};
use sim_snapshot::codec;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const PLAYERS_PER_MATCH: u64 = 2;
const UNIT_TYPE: u64 = 100;
const DAMAGE_PER_TICK: f64 = 5.0;

#[derive(Parser)]
#[command(name = "sim_container", about = "Runs a demo simulation container")]
struct Args {
    /// Number of ticks to run
    #[arg(short, long, default_value_t = 100)]
    ticks: u64,

    /// Auto-advance interval in milliseconds; ticks run back to back when omitted
    #[arg(short, long)]
    interval_ms: Option<u64>,

    /// Number of matches to populate
    #[arg(short, long, default_value_t = 2)]
    matches: u64,

    /// Print the final delta of every match as JSON
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("sim_container=info".parse()?))
        .init();

    let args = Args::parse();
    let config = ContainerConfig::from_env()?;
    let container = Container::builder(config)
        .module(EntityModule)
        .module(HealthModule)
        .build()?;
    info!(container = container.name(), id = %container.id(), "container ready");

    let matches: Vec<MatchId> = (1..=args.matches).collect();
    let units = populate(&container, &matches)?;
    for match_id in &matches {
        container.full_snapshot(*match_id)?;
    }

    let target = container.current_tick() + args.ticks;
    match args.interval_ms {
        Some(ms) => {
            let interval = Duration::from_millis(ms);
            container.start_auto_advance(interval)?;
            while container.current_tick() < target && !container.is_failed() {
                enqueue_damage(&container, &units);
                tokio::time::sleep(interval).await;
            }
            container.stop_auto_advance();
        }
        None => {
            for _ in 0..args.ticks {
                enqueue_damage(&container, &units);
                container.advance_tick()?;
            }
        }
    }

    for error in container.get_errors() {
        warn!(command = error.name(), %error, "command failed");
    }
    for match_id in matches {
        let delta = container.delta(match_id)?;
        let bytes = codec::encode(&delta)?;
        info!(
            match_id,
            base_tick = delta.base_tick,
            tick = delta.current_tick,
            changes = delta.change_count(),
            bytes = bytes.len(),
            "match delta"
        );
        if args.json {
            println!("{}", codec::to_json(&delta)?);
        }
    }

    info!(tick = container.current_tick(), "demo finished");
    Ok(())
}

/// Spawns one unit per player in every match and gives it health.
fn populate(container: &Container, matches: &[MatchId]) -> Result<Vec<EntityId>> {
    for match_id in matches {
        for player in 1..=PLAYERS_PER_MATCH {
            container.enqueue(
                "spawn",
                Payload::new()
                    .with("matchId", *match_id)
                    .with("entityType", UNIT_TYPE)
                    .with("playerId", player),
            );
        }
    }
    container.advance_tick()?;

    let mut units = Vec::new();
    for match_id in matches {
        units.extend(container.read(|store| store.match_members(*match_id))?);
    }
    for unit in &units {
        container.enqueue("attachHealth", Payload::new().with("entityId", unit.id()));
    }
    container.advance_tick()?;
    info!(units = units.len(), matches = matches.len(), "matches populated");
    Ok(units)
}

fn enqueue_damage(container: &Container, units: &[EntityId]) {
    let tick = container.current_tick() as usize;
    if let Some(unit) = units.get(tick % units.len().max(1)) {
        container.enqueue(
            "damage",
            Payload::new().with("entityId", unit.id()).with("amount", DAMAGE_PER_TICK),
        );
    }
}
