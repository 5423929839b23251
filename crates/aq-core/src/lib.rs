//! aq-core: stable foundation for aquanet.
//!
//! Contains:
//! - ids (stable compact IDs for network objects)
//! - numeric (Real + tolerances + float helpers + smoothing)
//! - error (shared error types)

pub mod error;
pub mod ids;
pub mod numeric;

// Re-exports: nice ergonomics for downstream crates
pub use error::{CoreError, CoreResult};
pub use ids::*;
pub use numeric::*;
