//! Command parameter schemas.
//!
//! A [`CommandSchema`] lists each parameter with its type and whether it is
//! required. Validation runs before the handler; unknown extra fields are
//! ignored and `null` counts as absent.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ValidationError;
use crate::payload::Payload;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    /// Integer (integral floats accepted).
    Long,
    Float,
    Bool,
    String,
}

impl FieldType {
    #[must_use]
    pub fn accepts(self, value: &Value) -> bool {
        match self {
            Self::Long => {
                value.is_i64()
                    || value.is_u64()
                    || value.as_f64().is_some_and(|f| f.fract() == 0.0)
            }
            Self::Float => value.is_number(),
            Self::Bool => value.is_boolean(),
            Self::String => value.is_string(),
        }
    }
}

impl std::fmt::Display for FieldType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Long => "an integer",
            Self::Float => "a number",
            Self::Bool => "a boolean",
            Self::String => "a string",
        })
    }
}

fn describe(value: &Value) -> String {
    match value {
        Value::Null => "null".into(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(_) => "a string".into(),
        Value::Array(_) => "an array".into(),
        Value::Object(_) => "an object".into(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    #[serde(rename = "type")]
    pub ty: FieldType,
    pub required: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandSchema {
    fields: BTreeMap<String, FieldSpec>,
}

impl CommandSchema {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn required(mut self, name: impl Into<String>, ty: FieldType) -> Self {
        self.fields.insert(name.into(), FieldSpec { ty, required: true });
        self
    }

    #[must_use]
    pub fn optional(mut self, name: impl Into<String>, ty: FieldType) -> Self {
        self.fields.insert(name.into(), FieldSpec { ty, required: false });
        self
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, FieldSpec)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Checks `payload` against the schema.
    ///
    /// # Errors
    ///
    /// The first [`ValidationError::MissingField`] or
    /// [`ValidationError::WrongType`] found, in field-name order.
    pub fn validate(&self, payload: &Payload) -> Result<(), ValidationError> {
        for (name, spec) in &self.fields {
            match payload.get(name) {
                None if spec.required => return Err(ValidationError::MissingField(name.clone())),
                None => {}
                Some(value) if !spec.ty.accepts(value) => {
                    return Err(ValidationError::WrongType {
                        field: name.clone(),
                        expected: spec.ty,
                        actual: describe(value),
                    });
                }
                Some(_) => {}
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn damage() -> CommandSchema {
        CommandSchema::new()
            .required("entityId", FieldType::Long)
            .required("amount", FieldType::Float)
            .optional("source", FieldType::String)
    }

    #[test]
    fn test_valid_payload_passes() {
        let payload = Payload::new().with("entityId", 4).with("amount", 30);
        assert!(damage().validate(&payload).is_ok());
    }

    #[test]
    fn test_missing_required_field() {
        let payload = Payload::new().with("entityId", 4);
        assert_eq!(
            damage().validate(&payload),
            Err(ValidationError::MissingField("amount".into()))
        );
    }

    #[test]
    fn test_wrong_type() {
        let payload = Payload::new().with("entityId", "four").with("amount", 1);
        let err = damage().validate(&payload).unwrap_err();
        assert!(matches!(err, ValidationError::WrongType { ref field, .. } if field == "entityId"));
        assert!(err.to_string().contains("an integer"));
    }

    #[test]
    fn test_extra_fields_ignored() {
        let payload = Payload::new()
            .with("entityId", 4)
            .with("amount", 1.5)
            .with("comment", "extra");
        assert!(damage().validate(&payload).is_ok());
    }

    #[test]
    fn test_fractional_long_rejected() {
        let payload = Payload::new().with("entityId", 4.5).with("amount", 1);
        assert!(damage().validate(&payload).is_err());
    }
}
