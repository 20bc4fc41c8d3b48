//! Error types for the quorum-counter node

use thiserror::Error;

use crate::domain::ProofViolations;

/// Errors that can occur while running a cluster node
#[derive(Error, Debug)]
pub enum NodeError {
    /// No membership credential for the local account
    #[error("authorization error: {0}")]
    Authorization(String),

    /// Signature chain is missing or malformed
    #[error("proof generation failed: {0}")]
    ProofGeneration(String),

    /// Structural validation of an assembled proof failed
    #[error("proof format invalid: {0}")]
    ProofFormat(ProofViolations),

    /// Registration transaction was rejected or reverted
    #[error("registration failed: {0}")]
    Registration(String),

    /// Ledger RPC or transaction failure
    #[error("ledger call failed: {0}")]
    LedgerCall(String),

    /// Liveness probe could not reach a peer (distinct from a ledger failure)
    #[error("peer unreachable: {0}")]
    NetworkUnreachable(String),

    /// Key-provider request failed or returned malformed data
    #[error("key provider error: {0}")]
    KeyProvider(String),

    /// Counter mutation attempted while not holding leadership
    #[error("not the current leader")]
    NotLeader,

    /// Configuration error
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Internal error
    #[error("internal error: {0}")]
    Internal(String),
}

/// Result type for node operations
pub type Result<T> = std::result::Result<T, NodeError>;

impl NodeError {
    /// Whether the error is transient network/ledger trouble worth retrying.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            NodeError::LedgerCall(_) | NodeError::NetworkUnreachable(_)
        )
    }
}
