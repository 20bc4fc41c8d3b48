//! Instance identifier hashing
//!
//! Every node derives the ledger-facing `bytes32` instance identifier as
//! the SHA-256 digest of the UTF-8 instance id. The algorithm is a
//! cluster-wide contract: two nodes hashing the same id must always get
//! the same 32 bytes, or registration and membership lookups diverge.

use sha2::{Digest, Sha256};

/// 32-byte SHA-256 hash
pub type Hash256 = [u8; 32];

/// Digest an instance id into its ledger-facing 32-byte identifier.
pub fn instance_id_digest(instance_id: &str) -> Hash256 {
    let mut hasher = Sha256::new();
    hasher.update(instance_id.as_bytes());
    hasher.finalize().into()
}
