use thiserror::Error;

/// Configuration and settings failures.
///
/// Setters validate before mutating, so an `Err` always leaves the
/// indicator in its previous valid state. Caller bugs (reading an empty
/// value's payload, unregistering a dead token, out-of-bounds history
/// access through the panicking accessor) are panics, not variants here.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum IndicatorError {
    /// A window period outside the valid domain.
    #[error("length must be at least 1, got {0}")]
    InvalidLength(usize),

    /// Display names must contain at least one non-whitespace character.
    #[error("indicator name must not be empty")]
    EmptyName,

    /// A key expected by [`load`](crate::Indicator::load) is absent.
    #[error("missing setting `{0}`")]
    MissingSetting(String),

    /// A stored setting failed to deserialize into the expected type.
    #[error("setting `{key}` has an invalid value: {reason}")]
    InvalidSetting {
        /// The offending key.
        key: String,
        /// Deserialization failure detail.
        reason: String,
    },
}
