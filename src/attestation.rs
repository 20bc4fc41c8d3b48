//! Attestation proof generation
//!
//! Builds the `SignatureProof` submitted with an attested registration:
//! instance-id digest, derived account, the app/KMS signature pair from
//! the provider's chain, and the padded application id. Read-only with
//! respect to shared state; the key provider is the only collaborator
//! touched.

use alloy::primitives::FixedBytes;
use alloy::signers::local::PrivateKeySigner;
use std::sync::Arc;
use tracing::debug;

use crate::crypto::{decode_hex_loose, instance_id_digest};
use crate::domain::SignatureProof;
use crate::infra::{NodeError, Result};
use crate::keyprovider::KeyProvider;

/// Default key derivation purpose, matching the target ledger's network.
pub const DEFAULT_KEY_PURPOSE: &str = "ethereum";

/// Assembles signature proofs from key-provider output.
pub struct ProofGenerator {
    keys: Arc<dyn KeyProvider>,
}

impl ProofGenerator {
    pub fn new(keys: Arc<dyn KeyProvider>) -> Self {
        Self { keys }
    }

    /// Generate a complete signature chain proof for an instance.
    ///
    /// The signature chain must carry at least two entries: the
    /// application signature at index 0 and the KMS signature at index 1.
    /// Entries beyond index 1 are ignored.
    pub async fn generate_proof(
        &self,
        instance_id: &str,
        key_path: &str,
        key_purpose: &str,
    ) -> Result<SignatureProof> {
        let instance_id_hash = FixedBytes::from(instance_id_digest(instance_id));

        let material = self.keys.get_key(key_path, key_purpose).await?;
        if material.signature_chain.len() < 2 {
            return Err(NodeError::ProofGeneration(format!(
                "insufficient signature chain length: {}",
                material.signature_chain.len()
            )));
        }
        let app_signature = material.signature_chain[0].clone();
        let kms_signature = material.signature_chain[1].clone();

        let signer = PrivateKeySigner::from_slice(&material.key)
            .map_err(|e| NodeError::ProofGeneration(format!("invalid derived key: {e}")))?;
        let derived_public_key = signer.address();

        let info = self.keys.info().await?;
        let app_id = pad_app_id(&info.app_id)?;

        debug!(
            instance_id,
            key_path,
            derived = %derived_public_key,
            "assembled signature proof"
        );

        Ok(SignatureProof {
            instance_id_hash,
            derived_public_key,
            app_signature,
            kms_signature,
            purpose: key_purpose.to_string(),
            app_id,
        })
    }
}

/// Normalize a hex app id to exactly 32 bytes.
///
/// Right-padded with zero bytes; left-padding would shift the decoded
/// value and disagree with what the registry contract stores.
fn pad_app_id(app_id: &str) -> Result<FixedBytes<32>> {
    let raw = decode_hex_loose(app_id)
        .map_err(|e| NodeError::ProofGeneration(format!("invalid app id: {e}")))?;
    if raw.len() > 32 {
        return Err(NodeError::ProofGeneration(format!(
            "app id longer than 32 bytes: {}",
            raw.len()
        )));
    }
    let mut padded = [0u8; 32];
    padded[..raw.len()].copy_from_slice(&raw);
    Ok(FixedBytes::from(padded))
}
