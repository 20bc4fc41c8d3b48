//! Leader heartbeat emitter
//!
//! Independent periodic task that records an "alive as leader"
//! timestamp while this node holds leadership. Purely observational: the
//! timestamp feeds the status endpoint, nothing is broadcast to peers.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use crate::infra::ShutdownSignal;
use crate::state::NodeState;

/// Heartbeat configuration
#[derive(Debug, Clone)]
pub struct HeartbeatConfig {
    /// Interval between heartbeats; longer than the monitor cadence
    pub interval: Duration,
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(30),
        }
    }
}

impl HeartbeatConfig {
    pub fn from_env() -> Self {
        let interval = std::env::var("HEARTBEAT_INTERVAL_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(Self::default().interval);
        Self { interval }
    }
}

/// Records leader heartbeats into [`NodeState`].
pub struct HeartbeatEmitter {
    state: Arc<NodeState>,
    config: HeartbeatConfig,
}

impl HeartbeatEmitter {
    pub fn new(state: Arc<NodeState>, config: HeartbeatConfig) -> Self {
        Self { state, config }
    }

    /// Run until cancelled.
    pub async fn run(self, mut shutdown: ShutdownSignal) {
        info!(
            interval_secs = self.config.interval.as_secs(),
            "heartbeat emitter started"
        );
        loop {
            tokio::select! {
                _ = shutdown.recv() => break,
                _ = tokio::time::sleep(self.config.interval) => {}
            }

            self.beat().await;
        }
        info!("heartbeat emitter stopped");
    }

    /// One heartbeat tick; a no-op unless this node is the leader.
    pub async fn beat(&self) {
        if self.state.leader_state().await.is_self_leader {
            debug!("leader heartbeat");
            self.state.record_heartbeat().await;
        }
    }
}
