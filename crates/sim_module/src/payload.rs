//! Command payloads.
//!
//! A [`Payload`] is a JSON object of named parameters. Numbers arrive as JSON
//! numbers; the accessors convert them to the width the handler wants.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sim_component::EntityId;

use crate::error::ValidationError;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Payload(Map<String, Value>);

impl Payload {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wraps a JSON value, which must be an object.
    ///
    /// # Errors
    ///
    /// [`ValidationError::NotAnObject`] for any other JSON value.
    pub fn from_json(value: Value) -> Result<Self, ValidationError> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            Value::Null => Ok(Self::default()),
            _ => Err(ValidationError::NotAnObject),
        }
    }

    /// Builder-style insert.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key).filter(|v| !v.is_null())
    }

    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Integer parameter. Integral floats (`30.0`) are accepted.
    #[must_use]
    pub fn long(&self, key: &str) -> Option<i64> {
        let value = self.get(key)?;
        value.as_i64().or_else(|| {
            value
                .as_f64()
                .filter(|f| f.fract() == 0.0 && f.abs() < 9.007_199_254_740_992e15)
                .map(|f| f as i64)
        })
    }

    #[must_use]
    pub fn float(&self, key: &str) -> Option<f32> {
        self.get(key)?.as_f64().map(|f| f as f32)
    }

    #[must_use]
    pub fn bool(&self, key: &str) -> Option<bool> {
        self.get(key)?.as_bool()
    }

    #[must_use]
    pub fn string(&self, key: &str) -> Option<&str> {
        self.get(key)?.as_str()
    }

    /// Entity id parameter; negative values are rejected.
    #[must_use]
    pub fn entity(&self, key: &str) -> Option<EntityId> {
        self.long(key)
            .and_then(|id| u64::try_from(id).ok())
            .map(EntityId::from_raw)
    }

    #[must_use]
    pub fn float_or(&self, key: &str, default: f32) -> f32 {
        self.float(key).unwrap_or(default)
    }

    /// # Errors
    ///
    /// [`ValidationError::MissingField`] if absent or not an integer.
    pub fn require_long(&self, key: &str) -> Result<i64, ValidationError> {
        self.long(key)
            .ok_or_else(|| ValidationError::MissingField(key.to_owned()))
    }

    /// # Errors
    ///
    /// [`ValidationError::MissingField`] if absent or not a number.
    pub fn require_float(&self, key: &str) -> Result<f32, ValidationError> {
        self.float(key)
            .ok_or_else(|| ValidationError::MissingField(key.to_owned()))
    }

    /// # Errors
    ///
    /// [`ValidationError::MissingField`] if absent or not a valid id.
    pub fn require_entity(&self, key: &str) -> Result<EntityId, ValidationError> {
        self.entity(key)
            .ok_or_else(|| ValidationError::MissingField(key.to_owned()))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }
}

impl From<Map<String, Value>> for Payload {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}
