//! Container error types.

use sim_module::ModuleError;

#[derive(Debug, thiserror::Error)]
pub enum ContainerError {
    #[error(transparent)]
    Module(#[from] ModuleError),

    /// The container hit a fatal error earlier and refuses further ticks.
    #[error("container '{name}' has failed: {reason}")]
    Failed { name: String, reason: String },

    #[error("tick count must be at least 1, got {0}")]
    InvalidTickCount(u64),

    #[error("auto-advance interval must be greater than zero")]
    InvalidInterval,

    #[error("auto-advance requires a running tokio runtime")]
    NoRuntime,

    #[error("container state lock poisoned")]
    Poisoned,

    #[error("invalid value '{value}' for {var}")]
    Config { var: &'static str, value: String },
}

impl ContainerError {
    #[must_use]
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}
