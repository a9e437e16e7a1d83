//! Error taxonomy shared across the simulation crates.
//!
//! Two kinds of conditions are modelled here because they cross crate
//! boundaries: packet validation failures (rejected and counted by receivers,
//! never fatal) and the top-level [`CoreError`] that downstream crates wrap
//! with `#[from]`.

use thiserror::Error;

/// A specialized `Result` type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Packet schema violations detected by receivers.
///
/// Validation failures are counted by the receiving side and the offending
/// packet is dropped; they never terminate a subsystem.
#[derive(Error, Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum ValidationError {
    /// A required field is empty or absent.
    #[error("missing or empty field '{field}'")]
    MissingField {
        /// Name of the offending field.
        field: &'static str,
    },

    /// A numeric field is outside its documented range or not finite.
    #[error("field '{field}' out of range: {value}")]
    FieldOutOfRange {
        /// Name of the offending field.
        field: &'static str,
        /// The rejected value.
        value: f64,
    },

    /// The payload could not be decoded at all.
    #[error("malformed payload: {reason}")]
    Malformed {
        /// Decoder diagnostic.
        reason: String,
    },
}

/// Top-level error for core-crate operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum CoreError {
    /// Packet failed schema validation.
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// JSON encode/decode failure on a wire packet.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl CoreError {
    /// Returns `true` if the condition is recoverable (the packet is dropped
    /// and processing continues).
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Validation(_) | Self::Serialization(_) => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_error_display() {
        let err = ValidationError::FieldOutOfRange {
            field: "effectiveness",
            value: 1.5,
        };
        let msg = err.to_string();
        assert!(msg.contains("effectiveness"));
        assert!(msg.contains("1.5"));
    }

    #[test]
    fn core_error_is_recoverable() {
        let err: CoreError = ValidationError::MissingField { field: "sensor_id" }.into();
        assert!(err.is_recoverable());
    }
}
