//! Core domain errors.

use thiserror::Error;

/// Core domain errors for run status tracking.
///
/// A failed run is never an error here: it is recorded as a `False`
/// Succeeded condition on the status.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CoreError {
    /// A cloud event was already delivered to this target.
    #[error("Cloud event to '{target}' was already sent")]
    DeliveryAlreadySent { target: String },
}

/// Reports that a resource cannot be converted to a newer API version.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("cannot convert field {field}: {message}")]
pub struct CannotConvertError {
    /// Field that blocks the conversion.
    pub field: String,
    /// Human-readable explanation.
    pub message: String,
}

impl CannotConvertError {
    /// Create a new CannotConvertError.
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}
