//! Owned node state
//!
//! One object owns all shared mutable process state: the leadership
//! snapshot and the counter with its operation log. Other components go
//! through the methods here instead of touching shared memory, so the
//! design stays correct if moved onto preemptive threads.
//!
//! Writer discipline: the monitor writes leadership fields, the
//! heartbeat emitter writes the heartbeat timestamp, and counter
//! mutations are serialized by a single mutex.

use alloy::primitives::Address;
use chrono::Utc;
use tokio::sync::{Mutex, RwLock};

use crate::domain::{LeaderState, Operation, OperationKind};
use crate::infra::{NodeError, Result};

#[derive(Debug, Default)]
struct CounterLog {
    value: u64,
    operations: Vec<Operation>,
}

/// Shared state for one node process.
#[derive(Debug, Default)]
pub struct NodeState {
    leader: RwLock<LeaderState>,
    counter: Mutex<CounterLog>,
}

impl NodeState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Consistent snapshot of the leadership state.
    pub async fn leader_state(&self) -> LeaderState {
        self.leader.read().await.clone()
    }

    /// Record the ledger's view of leadership for this poll cycle.
    /// Returns the previous `is_self_leader` so the caller can log the
    /// transition edge exactly once.
    pub async fn set_leadership(&self, current_leader: Option<Address>, is_self: bool) -> bool {
        let mut state = self.leader.write().await;
        let was_self = state.is_self_leader;
        state.current_leader = current_leader;
        state.is_self_leader = is_self;
        was_self
    }

    /// Record an "alive as leader" heartbeat timestamp.
    pub async fn record_heartbeat(&self) {
        let mut state = self.leader.write().await;
        state.last_heartbeat = Some(Utc::now());
    }

    /// Increment the counter and append to the operation log.
    ///
    /// Leadership is re-checked under the counter lock, at the instant
    /// of mutation; losing leadership between an HTTP check and the
    /// mutation must not let a stale leader write.
    pub async fn increment(&self, actor: Address) -> Result<Operation> {
        let mut counter = self.counter.lock().await;
        if !self.leader.read().await.is_self_leader {
            return Err(NodeError::NotLeader);
        }

        counter.value += 1;
        let operation = Operation {
            timestamp: Utc::now(),
            kind: OperationKind::Increment,
            resulting_value: counter.value,
            actor,
        };
        counter.operations.push(operation.clone());
        Ok(operation)
    }

    pub async fn counter_value(&self) -> u64 {
        self.counter.lock().await.value
    }

    pub async fn operations(&self) -> Vec<Operation> {
        self.counter.lock().await.operations.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn actor() -> Address {
        Address::from([0x55u8; 20])
    }

    #[tokio::test]
    async fn increment_rejected_while_follower() {
        let state = NodeState::new();
        let err = state.increment(actor()).await.unwrap_err();
        assert!(matches!(err, NodeError::NotLeader));
        assert_eq!(state.counter_value().await, 0);
        assert!(state.operations().await.is_empty());
    }

    #[tokio::test]
    async fn increment_appends_monotonic_log_while_leader() {
        let state = NodeState::new();
        state.set_leadership(Some(actor()), true).await;

        for expected in 1..=5u64 {
            let op = state.increment(actor()).await.unwrap();
            assert_eq!(op.resulting_value, expected);
        }

        let log = state.operations().await;
        assert_eq!(log.len(), 5);
        assert!(log.windows(2).all(|w| w[0].resulting_value < w[1].resulting_value));
    }

    #[tokio::test]
    async fn losing_leadership_stops_mutation() {
        let state = NodeState::new();
        state.set_leadership(Some(actor()), true).await;
        state.increment(actor()).await.unwrap();

        state.set_leadership(Some(Address::from([9u8; 20])), false).await;
        assert!(matches!(
            state.increment(actor()).await,
            Err(NodeError::NotLeader)
        ));
        assert_eq!(state.counter_value().await, 1);
    }

    #[tokio::test]
    async fn set_leadership_reports_previous_flag() {
        let state = NodeState::new();
        assert!(!state.set_leadership(Some(actor()), true).await);
        assert!(state.set_leadership(Some(actor()), true).await);
        assert!(state.set_leadership(None, false).await);
        assert!(!state.set_leadership(None, false).await);
    }

    #[tokio::test]
    async fn heartbeat_updates_snapshot() {
        let state = NodeState::new();
        assert!(state.leader_state().await.last_heartbeat.is_none());
        state.record_heartbeat().await;
        assert!(state.leader_state().await.last_heartbeat.is_some());
    }

    #[tokio::test]
    async fn concurrent_increments_serialize() {
        use std::sync::Arc;

        let state = Arc::new(NodeState::new());
        state.set_leadership(Some(actor()), true).await;

        let mut handles = Vec::new();
        for _ in 0..8 {
            let state = state.clone();
            handles.push(tokio::spawn(async move {
                for _ in 0..25 {
                    state.increment(actor()).await.unwrap();
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(state.counter_value().await, 200);
        let log = state.operations().await;
        assert_eq!(log.len(), 200);
        assert!(log.windows(2).all(|w| w[0].resulting_value < w[1].resulting_value));
    }
}
