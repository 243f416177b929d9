//! # sim_container
//!
//! Execution containers for the simulation runtime.
//!
//! A [`Container`] loads a set of [`sim_module::Module`]s, owns one store
//! and one command queue, and advances on a single tick lane, either
//! manually through [`Container::advance_tick`] or periodically through
//! [`Container::start_auto_advance`]. Observers pull snapshots and deltas
//! between ticks.

pub mod config;
pub mod container;
pub mod error;
pub mod lane;
pub mod loader;

pub use config::ContainerConfig;
pub use container::{Container, ContainerBuilder};
pub use error::ContainerError;
pub use lane::TickReport;
pub use loader::{LoadedModules, ScheduledSystem, load};
