//! Domain models for the quorum-counter node
//!
//! Leadership/counter types plus the attestation proof value objects.

mod proof;
mod types;

pub use proof::*;
pub use types::*;
