//! # sim_store
//!
//! Entity/component storage for one simulation container.
//!
//! - [`ComponentStore`] — the storage contract; a component value is an
//!   `f32` and NaN means "absent".
//! - [`ArrayStore`] — row-major float table with FIFO row reclamation and a
//!   per-component index.
//! - [`DirtyTracker`] — decorator recording per-match added, removed and
//!   modified entities.
//! - [`ScopedStore`] — view that checks every mutation against the caller's
//!   permissions.
//! - [`EntityFactory`] — creates match-bound entities atomically.

pub mod array;
pub mod config;
pub mod dirty;
pub mod error;
pub mod factory;
pub mod scoped;
pub mod store;

pub use array::ArrayStore;
pub use config::StoreConfig;
pub use dirty::{DirtySet, DirtyTracker};
pub use error::StoreError;
pub use factory::EntityFactory;
pub use scoped::ScopedStore;
pub use store::ComponentStore;
