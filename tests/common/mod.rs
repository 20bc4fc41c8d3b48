//! Common test fakes and fixtures for integration tests

#![allow(dead_code)]

use std::sync::Mutex;

use alloy::primitives::{Address, FixedBytes, U256};
use async_trait::async_trait;

use quorum_counter::infra::{NodeError, Result};
use quorum_counter::keyprovider::{KeyMaterial, KeyProvider, ProviderInfo};
use quorum_counter::ledger::MembershipLedger;
use quorum_counter::monitor::LivenessProbe;
use quorum_counter::RegistrationData;

/// Well-known secp256k1 test key (standard Ethereum example vector).
pub const TEST_KEY_HEX: &str = "4c0883a69102937d6231471b5dbb6204fe512961708279feb1be6ae5538da033";
/// Address derived from [`TEST_KEY_HEX`].
pub const TEST_KEY_ADDRESS: &str = "0x2c7536E3605D9C16a7a3D7b1898e529396a65c23";

pub fn self_address() -> Address {
    Address::from([0x01u8; 20])
}

pub fn peer_address() -> Address {
    Address::from([0x02u8; 20])
}

/// In-memory scriptable membership ledger.
///
/// `leader_schedule` is consumed front to back by `current_leader`; the
/// last entry repeats once the schedule is exhausted.
pub struct FakeLedger {
    pub token_id: U256,
    pub leader_schedule: Mutex<Vec<Option<Address>>>,
    pub votes: Mutex<Vec<(Address, bool)>>,
    pub registrations: Mutex<Vec<RegistrationData>>,
    pub cluster_size_updates: Mutex<u32>,
    pub fail_cluster_size_update: bool,
    pub active_instances: Vec<FixedBytes<32>>,
}

impl FakeLedger {
    pub fn new(token_id: u64) -> Self {
        Self {
            token_id: U256::from(token_id),
            leader_schedule: Mutex::new(Vec::new()),
            votes: Mutex::new(Vec::new()),
            registrations: Mutex::new(Vec::new()),
            cluster_size_updates: Mutex::new(0),
            fail_cluster_size_update: false,
            active_instances: Vec::new(),
        }
    }

    pub fn with_leaders(mut self, leaders: Vec<Option<Address>>) -> Self {
        self.leader_schedule = Mutex::new(leaders);
        self
    }

    pub fn recorded_votes(&self) -> Vec<(Address, bool)> {
        self.votes.lock().unwrap().clone()
    }

    pub fn recorded_registrations(&self) -> Vec<RegistrationData> {
        self.registrations.lock().unwrap().clone()
    }
}

#[async_trait]
impl MembershipLedger for FakeLedger {
    async fn current_leader(&self) -> Result<Option<Address>> {
        let mut schedule = self.leader_schedule.lock().unwrap();
        if schedule.len() > 1 {
            Ok(schedule.remove(0))
        } else {
            Ok(schedule.first().copied().flatten())
        }
    }

    async fn total_active_nodes(&self) -> Result<u64> {
        Ok(self.active_instances.len() as u64)
    }

    async fn required_votes(&self) -> Result<u64> {
        Ok((self.active_instances.len() as u64).div_ceil(2))
    }

    async fn cast_vote(&self, target: Address, no_confidence: bool) -> Result<()> {
        self.votes.lock().unwrap().push((target, no_confidence));
        Ok(())
    }

    async fn get_active_instances(&self) -> Result<Vec<FixedBytes<32>>> {
        Ok(self.active_instances.clone())
    }

    async fn wallet_to_token_id(&self, _wallet: Address) -> Result<U256> {
        Ok(self.token_id)
    }

    async fn register_instance_with_proof(&self, data: &RegistrationData) -> Result<()> {
        self.registrations.lock().unwrap().push(data.clone());
        Ok(())
    }

    async fn update_cluster_size(&self) -> Result<()> {
        if self.fail_cluster_size_update {
            return Err(NodeError::LedgerCall("recompute failed".into()));
        }
        *self.cluster_size_updates.lock().unwrap() += 1;
        Ok(())
    }
}

/// Key provider returning a fixed key and signature chain.
pub struct FakeKeyProvider {
    pub app_id: String,
    pub signature_chain: Vec<Vec<u8>>,
}

impl FakeKeyProvider {
    pub fn healthy() -> Self {
        Self {
            app_id: "0xa1b2c3d4".to_string(),
            signature_chain: vec![vec![0xaau8; 65], vec![0xbbu8; 65]],
        }
    }
}

#[async_trait]
impl KeyProvider for FakeKeyProvider {
    async fn info(&self) -> Result<ProviderInfo> {
        Ok(ProviderInfo {
            app_id: self.app_id.clone(),
            app_name: "test-app".to_string(),
            instance_id: "node-1".to_string(),
        })
    }

    async fn get_key(&self, _path: &str, _purpose: &str) -> Result<KeyMaterial> {
        Ok(KeyMaterial {
            key: hex::decode(TEST_KEY_HEX).unwrap(),
            signature_chain: self.signature_chain.clone(),
        })
    }
}

/// Probe whose verdict is fixed up front.
pub struct FakeProbe {
    pub responsive: bool,
    pub probes: Mutex<Vec<String>>,
}

impl FakeProbe {
    pub fn up() -> Self {
        Self {
            responsive: true,
            probes: Mutex::new(Vec::new()),
        }
    }

    pub fn down() -> Self {
        Self {
            responsive: false,
            probes: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl LivenessProbe for FakeProbe {
    async fn probe(&self, base_url: &str) -> Result<()> {
        self.probes.lock().unwrap().push(base_url.to_string());
        if self.responsive {
            Ok(())
        } else {
            Err(NodeError::NetworkUnreachable(format!("{base_url}: timed out")))
        }
    }
}
