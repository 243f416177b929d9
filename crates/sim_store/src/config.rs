use serde::{Deserialize, Serialize};

/// Sizing of an [`crate::ArrayStore`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StoreConfig {
    /// Rows allocated up front; the table doubles when full.
    pub initial_rows: usize,
    /// Row width, i.e. the maximum number of registered components.
    pub max_components: usize,
}

impl StoreConfig {
    #[must_use]
    pub fn with_initial_rows(mut self, rows: usize) -> Self {
        self.initial_rows = rows;
        self
    }

    #[must_use]
    pub fn with_max_components(mut self, max: usize) -> Self {
        self.max_components = max;
        self
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            initial_rows: 1024,
            max_components: 256,
        }
    }
}
