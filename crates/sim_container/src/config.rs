//! Container configuration.

use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use sim_store::StoreConfig;

use crate::error::ContainerError;

pub const NAME_VAR: &str = "SIM_CONTAINER_NAME";
pub const INITIAL_ROWS_VAR: &str = "SIM_INITIAL_ROWS";
pub const MAX_COMPONENTS_VAR: &str = "SIM_MAX_COMPONENTS";
pub const MAX_COMMANDS_VAR: &str = "SIM_MAX_COMMANDS_PER_TICK";

/// Settings for one [`Container`](crate::Container).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ContainerConfig {
    pub name: String,
    pub store: StoreConfig,
    /// Commands drained per tick, treated as at least one; the rest wait
    /// for the next tick.
    pub max_commands_per_tick: usize,
    /// A tick slower than this is logged as a warning.
    pub tick_budget: Duration,
    /// Check store invariants after every tick.
    pub verify_integrity: bool,
}

impl Default for ContainerConfig {
    fn default() -> Self {
        Self {
            name: "container".to_owned(),
            store: StoreConfig::default(),
            max_commands_per_tick: 10_000,
            tick_budget: Duration::from_millis(50),
            verify_integrity: cfg!(debug_assertions),
        }
    }
}

impl ContainerConfig {
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_store(mut self, store: StoreConfig) -> Self {
        self.store = store;
        self
    }

    #[must_use]
    pub fn with_max_commands_per_tick(mut self, max: usize) -> Self {
        self.max_commands_per_tick = max.max(1);
        self
    }

    #[must_use]
    pub fn with_tick_budget(mut self, budget: Duration) -> Self {
        self.tick_budget = budget;
        self
    }

    #[must_use]
    pub fn with_verify_integrity(mut self, verify: bool) -> Self {
        self.verify_integrity = verify;
        self
    }

    /// Defaults overlaid with the `SIM_*` environment variables.
    ///
    /// # Errors
    ///
    /// [`ContainerError::Config`] if a variable is set but does not parse.
    pub fn from_env() -> Result<Self, ContainerError> {
        Self::default().overlay(|var| std::env::var(var).ok())
    }

    fn overlay(mut self, lookup: impl Fn(&'static str) -> Option<String>) -> Result<Self, ContainerError> {
        if let Some(name) = lookup(NAME_VAR) {
            self.name = name;
        }
        if let Some(rows) = parse_var(&lookup, INITIAL_ROWS_VAR)? {
            self.store = self.store.with_initial_rows(rows);
        }
        if let Some(max) = parse_var(&lookup, MAX_COMPONENTS_VAR)? {
            self.store = self.store.with_max_components(max);
        }
        if let Some(max) = parse_var(&lookup, MAX_COMMANDS_VAR)? {
            self = self.with_max_commands_per_tick(max);
        }
        Ok(self)
    }
}

fn parse_var<T: FromStr>(
    lookup: &impl Fn(&'static str) -> Option<String>,
    var: &'static str,
) -> Result<Option<T>, ContainerError> {
    match lookup(var) {
        None => Ok(None),
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ContainerError::Config { var, value }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&'static str, &str)]) -> impl Fn(&'static str) -> Option<String> {
        let map: HashMap<&'static str, String> = pairs.iter().map(|(k, v)| (*k, (*v).to_owned())).collect();
        move |var| map.get(var).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ContainerConfig::default();
        assert_eq!(config.max_commands_per_tick, 10_000);
        assert_eq!(config.store, StoreConfig::default());
        assert_eq!(config.tick_budget, Duration::from_millis(50));
    }

    #[test]
    fn test_env_overlay() {
        let config = ContainerConfig::default()
            .overlay(env(&[
                (NAME_VAR, "arena-7"),
                (INITIAL_ROWS_VAR, "64"),
                (MAX_COMMANDS_VAR, " 250 "),
            ]))
            .unwrap();
        assert_eq!(config.name, "arena-7");
        assert_eq!(config.store.initial_rows, 64);
        assert_eq!(config.max_commands_per_tick, 250);
    }

    #[test]
    fn test_env_rejects_garbage() {
        let err = ContainerConfig::default()
            .overlay(env(&[(MAX_COMPONENTS_VAR, "lots")]))
            .unwrap_err();
        assert!(matches!(err, ContainerError::Config { var: MAX_COMPONENTS_VAR, ref value } if value == "lots"));
    }

    #[test]
    fn test_zero_command_limit_clamped() {
        assert_eq!(ContainerConfig::default().with_max_commands_per_tick(0).max_commands_per_tick, 1);
    }
}
