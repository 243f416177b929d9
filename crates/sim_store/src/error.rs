use sim_component::{AccessDenied, AuthorizeError, ComponentId, EntityId, MatchId};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    AccessDenied(#[from] AccessDenied),

    #[error("{0} does not exist")]
    EntityNotFound(EntityId),

    #[error("component {0} is not registered")]
    UnknownComponent(ComponentId),

    #[error("NaN is reserved for absent values (component {0})")]
    NanValue(ComponentId),

    #[error("core component {0} is managed by the entity factory")]
    Reserved(ComponentId),

    #[error("{entity} belongs to match {actual:?}, not match {expected}")]
    MatchMismatch {
        entity: EntityId,
        expected: MatchId,
        actual: Option<MatchId>,
    },

    /// An internal invariant no longer holds. The owning container must stop.
    #[error("store corrupted: {0}")]
    Corrupted(String),
}

impl StoreError {
    /// Whether the error leaves the store unusable.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Corrupted(_))
    }
}

impl From<AuthorizeError> for StoreError {
    fn from(err: AuthorizeError) -> Self {
        match err {
            AuthorizeError::Unknown(id) => Self::UnknownComponent(id),
            AuthorizeError::Denied(denied) => Self::AccessDenied(denied),
        }
    }
}
