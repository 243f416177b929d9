//! Snapshot-layer error types.

use sim_component::MatchId;

#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("failed to encode message: {0}")]
    Encode(#[from] rmp_serde::encode::Error),

    #[error("failed to decode message: {0}")]
    Decode(#[from] rmp_serde::decode::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("delta for match {delta} cannot be applied to a snapshot of match {base}")]
    MatchMismatch { base: MatchId, delta: MatchId },

    #[error("malformed snapshot: {0}")]
    Malformed(String),
}
