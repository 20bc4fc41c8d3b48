//! End-to-end registration flow against fake collaborators

mod common;

use std::sync::Arc;

use alloy::primitives::U256;

use common::{peer_address, FakeKeyProvider, FakeLedger, TEST_KEY_ADDRESS};
use quorum_counter::registration::RegistrationCoordinator;
use quorum_counter::NodeError;

const NODE_1_DIGEST: &str = "35971be6e9bb024a895582fe0e42e04848a86da550aaef0fccbfba86f99f617d";

fn coordinator(
    ledger: Arc<FakeLedger>,
    keys: FakeKeyProvider,
) -> RegistrationCoordinator {
    RegistrationCoordinator::new(
        ledger,
        Arc::new(keys),
        peer_address(),
        "node-1",
        "node/node-1",
        "ethereum",
    )
}

#[tokio::test]
async fn registers_and_submits_expected_proof() {
    let ledger = Arc::new(FakeLedger::new(9));
    let data = coordinator(ledger.clone(), FakeKeyProvider::healthy())
        .register()
        .await
        .unwrap();

    assert_eq!(data.token_id, U256::from(9));

    let submitted = ledger.recorded_registrations();
    assert_eq!(submitted.len(), 1);
    let proof = &submitted[0].proof;

    // Pinned vectors: digest of "node-1" and the address of the
    // well-known test key must be reproducible across implementations.
    assert_eq!(hex::encode(proof.instance_id_hash), NODE_1_DIGEST);
    assert_eq!(proof.derived_public_key.to_string(), TEST_KEY_ADDRESS);
    assert_eq!(proof.purpose, "ethereum");
    assert_eq!(proof.app_signature, vec![0xaau8; 65]);
    assert_eq!(proof.kms_signature, vec![0xbbu8; 65]);
    // App id right-padded into bytes32
    assert_eq!(&proof.app_id[..4], &[0xa1, 0xb2, 0xc3, 0xd4]);
    assert!(proof.app_id[4..].iter().all(|&b| b == 0));

    assert_eq!(*ledger.cluster_size_updates.lock().unwrap(), 1);
}

#[tokio::test]
async fn zero_token_id_is_an_authorization_failure() {
    let ledger = Arc::new(FakeLedger::new(0));
    let err = coordinator(ledger.clone(), FakeKeyProvider::healthy())
        .register()
        .await
        .unwrap_err();

    assert!(matches!(err, NodeError::Authorization(_)));
    assert!(ledger.recorded_registrations().is_empty());
}

#[tokio::test]
async fn truncated_signature_chain_fails_generation() {
    let ledger = Arc::new(FakeLedger::new(3));
    let keys = FakeKeyProvider {
        signature_chain: vec![vec![0xaau8; 65]],
        ..FakeKeyProvider::healthy()
    };

    let err = coordinator(ledger.clone(), keys).register().await.unwrap_err();
    assert!(matches!(err, NodeError::ProofGeneration(_)));
    assert!(ledger.recorded_registrations().is_empty());
}

#[tokio::test]
async fn undersized_signatures_fail_structural_validation() {
    let ledger = Arc::new(FakeLedger::new(3));
    let keys = FakeKeyProvider {
        signature_chain: vec![vec![0xaau8; 64], vec![0xbbu8; 64]],
        ..FakeKeyProvider::healthy()
    };

    let err = coordinator(ledger.clone(), keys).register().await.unwrap_err();
    match err {
        NodeError::ProofFormat(violations) => assert_eq!(violations.0.len(), 2),
        other => panic!("expected ProofFormat, got {other:?}"),
    }
    assert!(ledger.recorded_registrations().is_empty());
}

#[tokio::test]
async fn cluster_size_recompute_failure_is_swallowed() {
    let mut ledger = FakeLedger::new(5);
    ledger.fail_cluster_size_update = true;
    let ledger = Arc::new(ledger);

    let data = coordinator(ledger.clone(), FakeKeyProvider::healthy())
        .register()
        .await
        .unwrap();
    assert_eq!(data.token_id, U256::from(5));
    assert_eq!(ledger.recorded_registrations().len(), 1);
}
