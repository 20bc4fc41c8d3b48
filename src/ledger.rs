//! Membership ledger client
//!
//! Talks to the MembershipRegistry contract, the source of truth for the
//! current leader, the active-node set, vote thresholds, and token
//! ownership. The contract's vote counting and leader selection stay on
//! chain; this module only reads state and submits transactions.

use std::time::Duration;

use alloy::primitives::{Address, FixedBytes, U256};
use alloy::providers::ProviderBuilder;
use alloy::signers::local::PrivateKeySigner;
use alloy::sol;
use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use tracing::info;

use crate::domain::RegistrationData;
use crate::infra::{NodeError, Result};

// Contract bindings
sol! {
    #[sol(rpc)]
    interface IMembershipRegistry {
        function currentLeader() external view returns (address);

        function totalActiveNodes() external view returns (uint256);

        function requiredVotes() external view returns (uint256);

        function castVote(address target, bool noConfidence) external;

        // Ledger-side leader recomputation; nodes never call this
        // directly, election is entirely contract-driven.
        function electLeader() external;

        function getActiveInstances() external view returns (bytes32[]);

        function registerInstance(bytes32 instanceId, uint256 tokenId) external;

        function registerInstanceWithProof(
            bytes32 instanceId,
            uint256 tokenId,
            bytes pubkey,
            bytes appSig,
            bytes kmsSig,
            string purpose
        ) external;

        function walletToTokenId(address wallet) external view returns (uint256);

        function updateClusterSize() external;
    }
}

/// Ledger client configuration
#[derive(Debug, Clone)]
pub struct LedgerConfig {
    /// RPC URL for the chain
    pub rpc_url: String,
    /// MembershipRegistry contract address
    pub registry_address: Address,
    /// Chain ID
    pub chain_id: u64,
    /// Bound on every RPC call, reads and writes alike
    pub call_timeout: Duration,
}

impl LedgerConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        let rpc_url =
            std::env::var("RPC_URL").unwrap_or_else(|_| "http://localhost:8545".to_string());
        let registry_address = std::env::var("REGISTRY_ADDRESS")
            .map_err(|_| NodeError::Configuration("REGISTRY_ADDRESS is required".into()))?
            .parse()
            .map_err(|e| NodeError::Configuration(format!("invalid REGISTRY_ADDRESS: {e}")))?;
        let chain_id = std::env::var("CHAIN_ID")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(31337);
        let call_timeout = std::env::var("LEDGER_CALL_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(15));

        Ok(Self {
            rpc_url,
            registry_address,
            chain_id,
            call_timeout,
        })
    }
}

/// Read/write surface of the membership registry as consumed by the node.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait MembershipLedger: Send + Sync {
    /// Current leader, `None` when the contract reports the zero address.
    async fn current_leader(&self) -> Result<Option<Address>>;

    /// Cluster size.
    async fn total_active_nodes(&self) -> Result<u64>;

    /// Quorum threshold for a leadership change.
    async fn required_votes(&self) -> Result<u64>;

    /// Cast or update this node's vote against `target`.
    async fn cast_vote(&self, target: Address, no_confidence: bool) -> Result<()>;

    /// Identifiers of all active instances.
    async fn get_active_instances(&self) -> Result<Vec<FixedBytes<32>>>;

    /// Membership credential for `wallet`; zero means none.
    async fn wallet_to_token_id(&self, wallet: Address) -> Result<U256>;

    /// Attested registration.
    async fn register_instance_with_proof(&self, data: &RegistrationData) -> Result<()>;

    /// Ask the contract to recompute the cluster size.
    async fn update_cluster_size(&self) -> Result<()>;
}

/// alloy-backed implementation against an EVM chain.
pub struct EvmMembershipLedger {
    config: LedgerConfig,
    signer: PrivateKeySigner,
}

impl EvmMembershipLedger {
    pub fn new(config: LedgerConfig, signer: PrivateKeySigner) -> Self {
        Self { config, signer }
    }

    /// Account that signs this node's transactions.
    pub fn signer_address(&self) -> Address {
        self.signer.address()
    }

    pub fn chain_id(&self) -> u64 {
        self.config.chain_id
    }

    fn rpc_url(&self) -> Result<reqwest::Url> {
        self.config
            .rpc_url
            .parse()
            .map_err(|e| NodeError::Configuration(format!("invalid RPC URL: {e}")))
    }

    async fn bounded<T>(
        &self,
        op: &str,
        fut: impl std::future::Future<Output = Result<T>>,
    ) -> Result<T> {
        tokio::time::timeout(self.config.call_timeout, fut)
            .await
            .map_err(|_| NodeError::LedgerCall(format!("{op} timed out")))?
    }
}

macro_rules! read_contract {
    ($self:ident, $op:literal, $call:ident) => {{
        let url = $self.rpc_url()?;
        $self
            .bounded($op, async {
                let provider = ProviderBuilder::new().on_http(url);
                let contract = IMembershipRegistry::new($self.config.registry_address, &provider);
                contract
                    .$call()
                    .call()
                    .await
                    .map_err(|e| NodeError::LedgerCall(format!(concat!($op, " failed: {}"), e)))
            })
            .await
    }};
}

#[async_trait]
impl MembershipLedger for EvmMembershipLedger {
    async fn current_leader(&self) -> Result<Option<Address>> {
        let leader = read_contract!(self, "currentLeader", currentLeader)?._0;
        Ok(if leader == Address::ZERO {
            None
        } else {
            Some(leader)
        })
    }

    async fn total_active_nodes(&self) -> Result<u64> {
        let total = read_contract!(self, "totalActiveNodes", totalActiveNodes)?._0;
        u64::try_from(total).map_err(|_| NodeError::LedgerCall("node count overflow".into()))
    }

    async fn required_votes(&self) -> Result<u64> {
        let votes = read_contract!(self, "requiredVotes", requiredVotes)?._0;
        u64::try_from(votes).map_err(|_| NodeError::LedgerCall("vote count overflow".into()))
    }

    async fn cast_vote(&self, target: Address, no_confidence: bool) -> Result<()> {
        let url = self.rpc_url()?;
        let signer = self.signer.clone();
        self.bounded("castVote", async {
            let provider = ProviderBuilder::new()
                .with_recommended_fillers()
                .wallet(alloy::network::EthereumWallet::from(signer))
                .on_http(url);
            let contract = IMembershipRegistry::new(self.config.registry_address, &provider);

            let pending = contract
                .castVote(target, no_confidence)
                .send()
                .await
                .map_err(|e| NodeError::LedgerCall(format!("castVote send failed: {e}")))?;
            let receipt = pending
                .get_receipt()
                .await
                .map_err(|e| NodeError::LedgerCall(format!("castVote receipt failed: {e}")))?;

            if !receipt.status() {
                return Err(NodeError::LedgerCall("castVote reverted".into()));
            }

            info!(
                target = %target,
                no_confidence,
                tx = %receipt.transaction_hash,
                "vote recorded on ledger"
            );
            Ok(())
        })
        .await
    }

    async fn get_active_instances(&self) -> Result<Vec<FixedBytes<32>>> {
        Ok(read_contract!(self, "getActiveInstances", getActiveInstances)?._0)
    }

    async fn wallet_to_token_id(&self, wallet: Address) -> Result<U256> {
        let url = self.rpc_url()?;
        self.bounded("walletToTokenId", async {
            let provider = ProviderBuilder::new().on_http(url);
            let contract = IMembershipRegistry::new(self.config.registry_address, &provider);
            contract
                .walletToTokenId(wallet)
                .call()
                .await
                .map(|r| r._0)
                .map_err(|e| NodeError::LedgerCall(format!("walletToTokenId failed: {e}")))
        })
        .await
    }

    async fn register_instance_with_proof(&self, data: &RegistrationData) -> Result<()> {
        let url = self.rpc_url()?;
        let signer = self.signer.clone();
        self.bounded("registerInstanceWithProof", async {
            let provider = ProviderBuilder::new()
                .with_recommended_fillers()
                .wallet(alloy::network::EthereumWallet::from(signer))
                .on_http(url);
            let contract = IMembershipRegistry::new(self.config.registry_address, &provider);

            let proof = &data.proof;
            let pending = contract
                .registerInstanceWithProof(
                    proof.instance_id_hash,
                    data.token_id,
                    proof.derived_public_key.as_slice().to_vec().into(),
                    proof.app_signature.clone().into(),
                    proof.kms_signature.clone().into(),
                    proof.purpose.clone(),
                )
                .send()
                .await
                .map_err(|e| {
                    NodeError::LedgerCall(format!("registerInstanceWithProof send failed: {e}"))
                })?;
            let receipt = pending.get_receipt().await.map_err(|e| {
                NodeError::LedgerCall(format!("registerInstanceWithProof receipt failed: {e}"))
            })?;

            if !receipt.status() {
                return Err(NodeError::Registration(
                    "registerInstanceWithProof reverted".into(),
                ));
            }

            info!(
                tx = %receipt.transaction_hash,
                token_id = %data.token_id,
                "instance registered with attestation proof"
            );
            Ok(())
        })
        .await
    }

    async fn update_cluster_size(&self) -> Result<()> {
        let url = self.rpc_url()?;
        let signer = self.signer.clone();
        self.bounded("updateClusterSize", async {
            let provider = ProviderBuilder::new()
                .with_recommended_fillers()
                .wallet(alloy::network::EthereumWallet::from(signer))
                .on_http(url);
            let contract = IMembershipRegistry::new(self.config.registry_address, &provider);

            let pending = contract
                .updateClusterSize()
                .send()
                .await
                .map_err(|e| NodeError::LedgerCall(format!("updateClusterSize send failed: {e}")))?;
            pending
                .get_receipt()
                .await
                .map_err(|e| NodeError::LedgerCall(format!("updateClusterSize receipt failed: {e}")))?;
            Ok(())
        })
        .await
    }
}
