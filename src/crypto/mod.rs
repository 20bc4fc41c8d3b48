//! Cryptographic utilities for the quorum-counter node
//!
//! Provides:
//! - The cluster-wide instance-id digest (SHA-256)
//! - Hex/byte normalization for key-provider material

mod encoding;
mod hash;

pub use encoding::*;
pub use hash::*;
