//! # sim_snapshot
//!
//! What leaves a container: full per-match [`Snapshot`]s in columnar form
//! and [`DeltaSnapshot`]s carrying only what changed since the previous
//! delta. Absent components are NaN in memory and `null` on the wire.
//!
//! - [`provider`] — builds snapshots from a store.
//! - [`DeltaCompressor`] — keeps a baseline per match and emits deltas.
//! - [`apply_delta`] — replays a delta onto a snapshot.
//! - [`codec`] — MessagePack and JSON encoding.

pub mod codec;
pub mod delta;
pub mod error;
pub mod layout;
pub mod nan;
pub mod provider;
pub mod snapshot;

pub use delta::{AddedEntity, DeltaCompressor, DeltaSnapshot, ModifiedEntity, apply_delta};
pub use error::SnapshotError;
pub use layout::{ColumnLayout, ColumnSpec, ModuleColumns};
pub use snapshot::{ComponentData, ModuleData, Snapshot};
