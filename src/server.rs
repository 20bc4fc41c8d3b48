//! Server bootstrap for the quorum-counter node.
//!
//! This module wires together:
//! - configuration
//! - the key provider and derived wallet identity
//! - the membership ledger client
//! - one-shot attested registration (fatal on failure)
//! - the leader monitor and heartbeat background tasks
//! - the Axum router

use std::net::SocketAddr;
use std::sync::Arc;

use alloy::primitives::Address;
use alloy::signers::local::PrivateKeySigner;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::api;
use crate::heartbeat::{HeartbeatConfig, HeartbeatEmitter};
use crate::infra::ShutdownCoordinator;
use crate::keyprovider::{HttpKeyProvider, KeyProvider, KeyProviderConfig};
use crate::ledger::{EvmMembershipLedger, LedgerConfig, MembershipLedger};
use crate::monitor::{HttpLivenessProbe, LeaderMonitor, MonitorConfig, StaticPeerDirectory};
use crate::registration::RegistrationCoordinator;
use crate::state::NodeState;

/// Server configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Unique instance id for this node.
    pub instance_id: String,
    /// Server listen address.
    pub listen_addr: SocketAddr,
    /// Key derivation path.
    pub key_path: String,
    /// Key derivation purpose.
    pub key_purpose: String,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> anyhow::Result<Self> {
        let instance_id = std::env::var("INSTANCE_ID")
            .map_err(|_| anyhow::anyhow!("INSTANCE_ID is required"))?;

        let port: u16 = std::env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(8080);

        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());

        let listen_addr: SocketAddr = format!("{host}:{port}")
            .parse()
            .map_err(|e| anyhow::anyhow!("invalid listen address: {e}"))?;

        let key_path =
            std::env::var("KEY_PATH").unwrap_or_else(|_| format!("node/{instance_id}"));
        let key_purpose = std::env::var("KEY_PURPOSE")
            .unwrap_or_else(|_| crate::attestation::DEFAULT_KEY_PURPOSE.to_string());

        Ok(Self {
            instance_id,
            listen_addr,
            key_path,
            key_purpose,
        })
    }
}

/// Identity material shared with the API handlers.
#[derive(Debug, Clone)]
pub struct NodeIdentity {
    pub instance_id: String,
    pub wallet_address: Address,
    pub key_path: String,
    pub key_purpose: String,
    pub key_provider_url: String,
}

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub node: Arc<NodeState>,
    pub ledger: Arc<dyn MembershipLedger>,
    pub identity: Arc<NodeIdentity>,
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,quorum_counter=debug")),
        )
        .init();
}

/// Start the node.
pub async fn run() -> anyhow::Result<()> {
    init_tracing();

    info!("Starting quorum-counter v{}", env!("CARGO_PKG_VERSION"));

    let config = Config::from_env()?;
    let ledger_config = LedgerConfig::from_env()?;
    let monitor_config = MonitorConfig::from_env();
    let heartbeat_config = HeartbeatConfig::from_env();

    let peers = StaticPeerDirectory::from_env()?;
    if peers.is_empty() {
        warn!("PEERS is not set; every remote leader will look unresponsive");
    }

    // Wallet identity comes from the key-derivation service; the same
    // key later signs ledger transactions.
    let provider_config = KeyProviderConfig::from_env();
    let key_provider_url = provider_config.base_url.clone();
    let keys: Arc<dyn KeyProvider> = Arc::new(HttpKeyProvider::new(provider_config)?);

    let provider_info = keys.info().await?;
    info!(
        app_name = %provider_info.app_name,
        app_id = %provider_info.app_id,
        "connected to key provider"
    );

    let material = keys.get_key(&config.key_path, &config.key_purpose).await?;
    let signer = PrivateKeySigner::from_slice(&material.key)
        .map_err(|e| anyhow::anyhow!("derived key is not a valid signing key: {e}"))?;
    let wallet_address = signer.address();
    info!(
        wallet = %wallet_address,
        key_path = %config.key_path,
        key_purpose = %config.key_purpose,
        "wallet initialized from derived key"
    );

    let ledger: Arc<dyn MembershipLedger> =
        Arc::new(EvmMembershipLedger::new(ledger_config, signer));

    // Registration is fatal on failure: an unregistered node must not
    // advertise itself as cluster-ready, so the listener binds after.
    let coordinator = RegistrationCoordinator::new(
        ledger.clone(),
        keys.clone(),
        wallet_address,
        config.instance_id.clone(),
        config.key_path.clone(),
        config.key_purpose.clone(),
    );
    coordinator.register().await?;

    let node = Arc::new(NodeState::new());
    let shutdown = Arc::new(ShutdownCoordinator::new());

    let signal_task = tokio::spawn({
        let shutdown = shutdown.clone();
        async move { shutdown.listen_for_signals().await }
    });

    let probe = HttpLivenessProbe::new(monitor_config.probe_timeout)?;
    let monitor = LeaderMonitor::new(
        ledger.clone(),
        node.clone(),
        Arc::new(peers),
        Arc::new(probe),
        wallet_address,
        monitor_config,
    );
    let monitor_handle = tokio::spawn(monitor.run(shutdown.subscribe()));

    let emitter = HeartbeatEmitter::new(node.clone(), heartbeat_config);
    let heartbeat_handle = tokio::spawn(emitter.run(shutdown.subscribe()));

    let state = AppState {
        node,
        ledger,
        identity: Arc::new(NodeIdentity {
            instance_id: config.instance_id.clone(),
            wallet_address,
            key_path: config.key_path.clone(),
            key_purpose: config.key_purpose.clone(),
            key_provider_url,
        }),
    };

    let app = api::router()
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;
    info!(addr = %config.listen_addr, instance_id = %config.instance_id, "node serving");

    let mut serve_shutdown = shutdown.subscribe();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move { serve_shutdown.recv().await })
        .await?;

    // Either a signal triggered shutdown or the server stopped on its
    // own; make sure the background tasks see the edge, then drain them.
    shutdown.trigger();
    signal_task.abort();
    let _ = monitor_handle.await;
    let _ = heartbeat_handle.await;

    info!("node stopped");
    Ok(())
}
