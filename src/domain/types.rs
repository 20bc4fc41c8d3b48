//! Core type definitions for the quorum-counter node

use alloy::primitives::Address;
use chrono::{DateTime, Utc};

/// Snapshot of the node's view of cluster leadership.
///
/// Leadership is derived solely from the ledger's `currentLeader` value;
/// the node never self-asserts it. The whole struct is read and written
/// as one unit so observers never see torn fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LeaderState {
    /// Leader the ledger currently reports, if any
    pub current_leader: Option<Address>,
    /// Whether the reported leader is this node's account
    pub is_self_leader: bool,
    /// Last time this node recorded an "alive as leader" heartbeat
    pub last_heartbeat: Option<DateTime<Utc>>,
}

/// Kind of counter operation recorded in the log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    Increment,
}

impl OperationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationKind::Increment => "increment",
        }
    }
}

/// One entry in the append-only operation log.
///
/// Entries are appended only while this node holds leadership, and the
/// recorded counter values are strictly increasing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operation {
    pub timestamp: DateTime<Utc>,
    pub kind: OperationKind,
    pub resulting_value: u64,
    pub actor: Address,
}
