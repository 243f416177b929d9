//! Serde adapters writing NaN (absent) as `null`.
//!
//! Use with `#[serde(with = "crate::nan::vec")]` or
//! `#[serde(with = "crate::nan::map")]`.

/// `None` for NaN, otherwise the value.
#[must_use]
pub fn to_option(value: f32) -> Option<f32> {
    (!value.is_nan()).then_some(value)
}

pub mod vec {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(values: &[f32], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(values.iter().map(|v| super::to_option(*v)))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<f32>, D::Error> {
        let raw: Vec<Option<f32>> = Vec::deserialize(deserializer)?;
        Ok(raw.into_iter().map(|v| v.unwrap_or(f32::NAN)).collect())
    }
}

pub mod map {
    use std::collections::BTreeMap;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(values: &BTreeMap<String, f32>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(values.iter().map(|(k, v)| (k, super::to_option(*v))))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<BTreeMap<String, f32>, D::Error> {
        let raw: BTreeMap<String, Option<f32>> = BTreeMap::deserialize(deserializer)?;
        Ok(raw
            .into_iter()
            .map(|(k, v)| (k, v.unwrap_or(f32::NAN)))
            .collect())
    }
}
