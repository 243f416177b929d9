//! # sim_modules
//!
//! Built-in modules shipped with the runtime.
//!
//! - [`EntityModule`] — elevated module that spawns and despawns entities.
//! - [`HealthModule`] — hit points, damage, healing and death.

pub mod entity;
pub mod health;

pub use entity::EntityModule;
pub use health::{Health, HealthApi, HealthModule};
