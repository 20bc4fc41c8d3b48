//! quorum-counter node library
//!
//! A cluster node holding an NFT-style membership credential. Nodes
//! register with a ledger-maintained membership registry by proving
//! their identity through a key-provider attestation chain, then watch
//! the ledger-recorded leader, probe its liveness, and cast
//! confidence/no-confidence votes. The elected leader serializes
//! counter updates into an append-only operation log.
//!
//! ## Modules
//!
//! - [`domain`] - Leadership, counter, and attestation proof types
//! - [`crypto`] - Instance-id digest and byte normalization
//! - [`infra`] - Errors, retry, graceful shutdown
//! - [`keyprovider`] - Key-derivation service client
//! - [`ledger`] - Membership registry contract client
//! - [`attestation`] - Signature proof generation
//! - [`registration`] - Startup registration sequence
//! - [`state`] - Owned node state (leadership snapshot, counter, log)
//! - [`monitor`] - Leader health monitoring and voting
//! - [`heartbeat`] - Leader heartbeat emitter
//! - [`api`] - REST surface
//! - [`server`] - Bootstrap and wiring

pub mod api;
pub mod attestation;
pub mod crypto;
pub mod domain;
pub mod heartbeat;
pub mod infra;
pub mod keyprovider;
pub mod ledger;
pub mod monitor;
pub mod registration;
pub mod server;
pub mod state;

// Re-export commonly used types
pub use domain::{
    LeaderState, Operation, OperationKind, ProofViolation, ProofViolations, RegistrationData,
    SignatureProof,
};
pub use infra::{NodeError, Result};
pub use state::NodeState;
