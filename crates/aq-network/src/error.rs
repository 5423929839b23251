//! Malformed-network error taxonomy.

use thiserror::Error;

/// Errors raised while building or validating a network.
///
/// All of these are fatal, pre-solve failures of the input contract.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum NetworkError {
    #[error("Duplicate {kind} name: {name}")]
    DuplicateName { kind: &'static str, name: String },

    #[error("Link {link} references a node that does not exist")]
    UnknownEndpoint { link: String },

    #[error("Link {link} connects a node to itself")]
    SelfLoop { link: String },

    #[error("{entity} references pattern that does not exist")]
    UnknownPattern { entity: String },

    #[error("{entity} references curve that does not exist")]
    UnknownCurve { entity: String },

    #[error("Tank {name} has inconsistent levels (need min <= init <= max, min < max)")]
    TankBounds { name: String },

    #[error("Non-positive {what} on {entity}")]
    NonPositive { what: &'static str, entity: String },

    #[error("Pattern {name} has no multipliers")]
    EmptyPattern { name: String },

    #[error("Curve {name} x values must be strictly ascending")]
    CurveNotAscending { name: String },

    #[error("Invalid pump curve: {what}")]
    BadPumpCurve { what: &'static str },

    #[error("Network has no fixed-head node (reservoir or tank)")]
    NoFixedHead,

    #[error("Network has no nodes")]
    Empty,
}
