//! Error types for control rules.

use thiserror::Error;

/// Result type for control operations.
pub type ControlResult<T> = Result<T, ControlError>;

/// Errors raised while validating control rules.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ControlError {
    /// Invalid argument in a rule definition.
    #[error("Invalid control rule: {what}")]
    InvalidRule { what: &'static str },

    /// Rule references an entity not present in the network.
    #[error("Control {control} references unknown {what}")]
    UnknownReference {
        control: String,
        what: &'static str,
    },
}
