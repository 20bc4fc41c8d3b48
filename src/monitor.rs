//! Leader health monitoring and voting
//!
//! Periodic task that tracks cluster leadership and votes on the ledger
//! based on liveness checks of the current leader. The node never
//! declares itself leader; the ledger's `currentLeader` is the only
//! authority, and this loop merely observes it and votes.
//!
//! # Configuration
//!
//! - `POLL_INTERVAL_SECS` - leadership poll cadence (default: 10)
//! - `MONITOR_BACKOFF_SECS` - delay after a failed cycle (default: 5)
//! - `PROBE_TIMEOUT_SECS` - bound on the liveness probe (default: 5)
//! - `RESUBMIT_UNCHANGED_VOTES` - resubmit an unchanged vote every cycle
//!   (default: true; the ledger treats repeated votes as idempotent)
//! - `PEERS` - peer directory entries, `address=base_url` comma-separated

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::Address;
use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use tracing::{debug, error, info, warn};

use crate::infra::{retry, NodeError, Result, RetryConfig, ShutdownSignal};
use crate::ledger::MembershipLedger;
use crate::state::NodeState;

/// Monitor configuration
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Leadership poll cadence
    pub poll_interval: Duration,
    /// Delay before the next cycle after an error
    pub error_backoff: Duration,
    /// Bound on each liveness probe
    pub probe_timeout: Duration,
    /// Resubmit a vote every cycle even when it matches the last one cast
    pub resubmit_unchanged_votes: bool,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(10),
            error_backoff: Duration::from_secs(5),
            probe_timeout: Duration::from_secs(5),
            resubmit_unchanged_votes: true,
        }
    }
}

impl MonitorConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let poll_interval = std::env::var("POLL_INTERVAL_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(defaults.poll_interval);
        let error_backoff = std::env::var("MONITOR_BACKOFF_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(defaults.error_backoff);
        let probe_timeout = std::env::var("PROBE_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(defaults.probe_timeout);
        let resubmit_unchanged_votes = std::env::var("RESUBMIT_UNCHANGED_VOTES")
            .ok()
            .map(|s| s != "false" && s != "0")
            .unwrap_or(defaults.resubmit_unchanged_votes);

        Self {
            poll_interval,
            error_backoff,
            probe_timeout,
            resubmit_unchanged_votes,
        }
    }
}

/// Maps a peer's account to its probe endpoint.
///
/// A required collaborator: without it the monitor has nothing real to
/// probe and cannot distinguish a dead leader from a misconfigured one.
#[cfg_attr(test, automock)]
pub trait PeerDirectory: Send + Sync {
    /// Base URL for the given peer, if known.
    fn resolve(&self, peer: Address) -> Option<String>;
}

/// Static peer directory from configuration.
#[derive(Debug, Clone, Default)]
pub struct StaticPeerDirectory {
    peers: HashMap<Address, String>,
}

impl StaticPeerDirectory {
    pub fn new(peers: HashMap<Address, String>) -> Self {
        Self { peers }
    }

    /// Parse `address=base_url` pairs separated by commas, e.g.
    /// `0xabc...=http://node-a:8080,0xdef...=http://node-b:8080`.
    pub fn parse(raw: &str) -> Result<Self> {
        let mut peers = HashMap::new();
        for entry in raw.split(',').filter(|e| !e.trim().is_empty()) {
            let (addr, url) = entry.split_once('=').ok_or_else(|| {
                NodeError::Configuration(format!("peer entry missing '=': {entry}"))
            })?;
            let addr: Address = addr.trim().parse().map_err(|e| {
                NodeError::Configuration(format!("invalid peer address {addr}: {e}"))
            })?;
            peers.insert(addr, url.trim().trim_end_matches('/').to_string());
        }
        Ok(Self { peers })
    }

    pub fn from_env() -> Result<Self> {
        match std::env::var("PEERS") {
            Ok(raw) => Self::parse(&raw),
            Err(_) => Ok(Self::default()),
        }
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }
}

impl PeerDirectory for StaticPeerDirectory {
    fn resolve(&self, peer: Address) -> Option<String> {
        self.peers.get(&peer).cloned()
    }
}

/// Bounded-timeout check of whether a remote node is responsive.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait LivenessProbe: Send + Sync {
    /// Probe the peer at `base_url`; `Ok(())` means alive.
    async fn probe(&self, base_url: &str) -> Result<()>;
}

/// HTTP liveness probe against a peer's `/health` endpoint.
pub struct HttpLivenessProbe {
    client: reqwest::Client,
}

impl HttpLivenessProbe {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| NodeError::Internal(format!("failed to build probe client: {e}")))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl LivenessProbe for HttpLivenessProbe {
    async fn probe(&self, base_url: &str) -> Result<()> {
        let url = format!("{}/health", base_url.trim_end_matches('/'));
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| NodeError::NetworkUnreachable(format!("{url}: {e}")))?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(NodeError::NetworkUnreachable(format!(
                "{url}: status {}",
                response.status()
            )))
        }
    }
}

/// Observes ledger leadership and votes on leader liveness.
///
/// States are `Follower` and `Leader`, derived each cycle from the
/// ledger; there is no candidate state and no self-declared leadership.
pub struct LeaderMonitor {
    ledger: Arc<dyn MembershipLedger>,
    state: Arc<NodeState>,
    peers: Arc<dyn PeerDirectory>,
    probe: Arc<dyn LivenessProbe>,
    self_address: Address,
    config: MonitorConfig,
    retry_policy: RetryConfig,
    /// Last vote actually recorded on the ledger, keyed by target
    last_vote: Option<(Address, bool)>,
}

impl LeaderMonitor {
    pub fn new(
        ledger: Arc<dyn MembershipLedger>,
        state: Arc<NodeState>,
        peers: Arc<dyn PeerDirectory>,
        probe: Arc<dyn LivenessProbe>,
        self_address: Address,
        config: MonitorConfig,
    ) -> Self {
        Self {
            ledger,
            state,
            peers,
            probe,
            self_address,
            config,
            retry_policy: RetryConfig::ledger(),
            last_vote: None,
        }
    }

    /// Run until cancelled. Errors inside a cycle are logged and the
    /// loop continues after a short backoff; only shutdown ends it.
    pub async fn run(mut self, mut shutdown: ShutdownSignal) {
        info!(
            poll_interval_secs = self.config.poll_interval.as_secs(),
            "leader monitor started"
        );
        loop {
            let delay = match self.poll_cycle().await {
                Ok(()) => self.config.poll_interval,
                Err(err) => {
                    error!(error = %err, "error in leader monitoring cycle");
                    self.config.error_backoff
                }
            };

            tokio::select! {
                _ = shutdown.recv() => break,
                _ = tokio::time::sleep(delay) => {}
            }
        }
        info!("leader monitor stopped");
    }

    /// One poll cycle: read leadership, update local state, probe and
    /// vote when a remote leader is reported.
    pub async fn poll_cycle(&mut self) -> Result<()> {
        let ledger = self.ledger.clone();
        let current_leader = retry(&self.retry_policy, "currentLeader", || {
            let ledger = ledger.clone();
            async move { ledger.current_leader().await }
        })
        .await?;

        match current_leader {
            Some(leader) if leader == self.self_address => {
                let was_leader = self.state.set_leadership(Some(leader), true).await;
                if !was_leader {
                    info!("this node is now the leader");
                }
            }
            None => {
                let was_leader = self.state.set_leadership(None, false).await;
                if was_leader {
                    info!("this node is no longer the leader");
                }
                // No leader elected yet; nothing to probe or vote on.
                debug!("ledger reports no current leader, skipping vote");
            }
            Some(leader) => {
                let was_leader = self.state.set_leadership(Some(leader), false).await;
                if was_leader {
                    info!("this node is no longer the leader");
                }

                let responsive = self.probe_leader(leader).await;
                if responsive {
                    self.cast_vote(leader, false).await?;
                } else {
                    info!(leader = %leader, "leader is unresponsive, voting no confidence");
                    self.cast_vote(leader, true).await?;
                }
            }
        }

        Ok(())
    }

    /// Probe the reported leader. An address missing from the peer
    /// directory counts as unresponsive, loudly: operators must be able
    /// to tell "unknown peer" from "dead peer".
    async fn probe_leader(&self, leader: Address) -> bool {
        let Some(endpoint) = self.peers.resolve(leader) else {
            warn!(leader = %leader, "leader has no peer directory entry, treating as unresponsive");
            return false;
        };
        match self.probe.probe(&endpoint).await {
            Ok(()) => true,
            Err(err) => {
                debug!(leader = %leader, error = %err, "leader probe failed");
                false
            }
        }
    }

    async fn cast_vote(&mut self, target: Address, no_confidence: bool) -> Result<()> {
        if !self.config.resubmit_unchanged_votes
            && self.last_vote == Some((target, no_confidence))
        {
            debug!(
                target = %target,
                no_confidence,
                "vote unchanged since last cycle, suppressing resubmission"
            );
            return Ok(());
        }

        let ledger = self.ledger.clone();
        retry(&self.retry_policy, "castVote", || {
            let ledger = ledger.clone();
            async move { ledger.cast_vote(target, no_confidence).await }
        })
        .await?;

        self.last_vote = Some((target, no_confidence));
        Ok(())
    }
}
