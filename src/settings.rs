use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use std::collections::BTreeMap;

use crate::IndicatorError;

/// Generic key-value store for indicator configuration.
///
/// [`Indicator::save`](crate::Indicator::save) writes every tunable into
/// one of these; [`Indicator::load`](crate::Indicator::load) reads them
/// back through the same validated setters. The store itself is plain
/// serde data, so the wire format stays an external concern — anything
/// that can hold a JSON object can hold a `Settings`.
///
/// Composites nest their children's settings under one key each via
/// the same `put`/`get` pair, since `Settings` serializes as a map.
///
/// # Example
///
/// ```
/// use tideflow_ta::Settings;
///
/// let mut settings = Settings::new();
/// settings.put("length", &14usize);
///
/// assert_eq!(settings.get::<usize>("length").unwrap(), 14);
/// assert!(settings.get::<usize>("missing").is_err());
/// ```
#[derive(Default, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Settings {
    entries: BTreeMap<String, Value>,
}

impl Settings {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `value` under `key`, replacing any previous entry.
    ///
    /// # Panics
    ///
    /// Panics if `value` cannot be represented as serde data; indicator
    /// configuration types always can, so hitting this is a bug in the
    /// calling `save` implementation.
    pub fn put<T: Serialize>(&mut self, key: impl Into<String>, value: &T) {
        let value = serde_json::to_value(value).expect("setting values must be serializable");
        self.entries.insert(key.into(), value);
    }

    /// Reads the entry under `key` back as `T`.
    ///
    /// # Errors
    ///
    /// [`IndicatorError::MissingSetting`] when the key is absent,
    /// [`IndicatorError::InvalidSetting`] when the stored value does not
    /// deserialize into `T`.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<T, IndicatorError> {
        let value = self
            .entries
            .get(key)
            .ok_or_else(|| IndicatorError::MissingSetting(key.to_owned()))?;
        serde_json::from_value(value.clone()).map_err(|err| IndicatorError::InvalidSetting {
            key: key.to_owned(),
            reason: err.to_string(),
        })
    }

    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
