//! Entity identifiers and allocation.
//!
//! An [`EntityId`] is a lightweight `u64` with no inherent data. Ids are
//! issued monotonically and never handed out twice, so a stale id can never
//! alias a newer entity even though the store recycles the row behind it.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Identifier of a match (an isolated game session) hosted by a container.
pub type MatchId = u64;

/// A unique entity identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(pub u64);

impl EntityId {
    /// The null / invalid entity sentinel.
    pub const INVALID: EntityId = EntityId(0);

    /// Create an entity id from a raw `u64`.
    #[must_use]
    pub const fn from_raw(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw `u64` identifier.
    #[must_use]
    pub const fn id(self) -> u64 {
        self.0
    }

    /// Returns `true` if this is a valid (non-zero) entity.
    #[must_use]
    pub const fn is_valid(self) -> bool {
        self.0 != 0
    }

    /// Encodes the id as a component value (used by `ENTITY_ID`).
    #[must_use]
    pub fn as_value(self) -> f32 {
        self.0 as f32
    }

    /// Decodes an id previously stored as a component value.
    ///
    /// Returns `None` for NaN (absent) and negative values.
    #[must_use]
    pub fn from_value(value: f32) -> Option<Self> {
        if value.is_nan() || value < 0.0 {
            None
        } else {
            Some(Self(value as u64))
        }
    }
}

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Entity({})", self.0)
    }
}

/// Process-wide id sequence. Starts at 1 (0 is [`EntityId::INVALID`]).
static PROCESS_IDS: AtomicU64 = AtomicU64::new(1);

/// Allocates monotonically increasing entity ids.
///
/// The default allocator draws from a single process-wide sequence, so ids
/// are unique across every store in the process. [`EntityAllocator::starting_at`]
/// gives a private sequence for isolated tools and tests.
#[derive(Debug, Default)]
pub struct EntityAllocator {
    local: Option<AtomicU64>,
}

impl EntityAllocator {
    /// Creates an allocator backed by the process-wide sequence.
    #[must_use]
    pub const fn new() -> Self {
        Self { local: None }
    }

    /// Creates an allocator with its own sequence beginning at `first`.
    #[must_use]
    pub fn starting_at(first: u64) -> Self {
        Self {
            local: Some(AtomicU64::new(first.max(1))),
        }
    }

    /// Allocates a fresh entity id.
    pub fn allocate(&self) -> EntityId {
        let counter = self.local.as_ref().unwrap_or(&PROCESS_IDS);
        EntityId(counter.fetch_add(1, Ordering::Relaxed))
    }
}
