//! Registration coordinator
//!
//! One-shot startup sequence: membership credential lookup, proof
//! generation, structural validation, attested registration on the
//! ledger, then a best-effort cluster-size recompute. Any failure before
//! the best-effort step is fatal; the node must not serve as a cluster
//! member unregistered.

use std::sync::Arc;

use alloy::primitives::Address;
use tracing::{info, warn};

use crate::attestation::ProofGenerator;
use crate::domain::RegistrationData;
use crate::infra::{NodeError, Result};
use crate::keyprovider::KeyProvider;
use crate::ledger::MembershipLedger;

pub struct RegistrationCoordinator {
    ledger: Arc<dyn MembershipLedger>,
    generator: ProofGenerator,
    wallet_address: Address,
    instance_id: String,
    key_path: String,
    key_purpose: String,
}

impl RegistrationCoordinator {
    pub fn new(
        ledger: Arc<dyn MembershipLedger>,
        keys: Arc<dyn KeyProvider>,
        wallet_address: Address,
        instance_id: impl Into<String>,
        key_path: impl Into<String>,
        key_purpose: impl Into<String>,
    ) -> Self {
        Self {
            ledger,
            generator: ProofGenerator::new(keys),
            wallet_address,
            instance_id: instance_id.into(),
            key_path: key_path.into(),
            key_purpose: key_purpose.into(),
        }
    }

    /// Run the registration sequence, returning the submitted data.
    pub async fn register(&self) -> Result<RegistrationData> {
        info!(
            instance_id = %self.instance_id,
            wallet = %self.wallet_address,
            "registering instance with signature chain verification"
        );

        // Credential check comes first; without a token there is no
        // point deriving keys or assembling a proof.
        let token_id = self.ledger.wallet_to_token_id(self.wallet_address).await?;
        if token_id.is_zero() {
            return Err(NodeError::Authorization(format!(
                "no membership credential for wallet {}",
                self.wallet_address
            )));
        }

        let proof = self
            .generator
            .generate_proof(&self.instance_id, &self.key_path, &self.key_purpose)
            .await?;

        proof.check_format().map_err(NodeError::ProofFormat)?;

        let data = RegistrationData { token_id, proof };
        self.ledger.register_instance_with_proof(&data).await?;

        info!(
            instance_id = %self.instance_id,
            token_id = %token_id,
            "instance registered with attestation proof"
        );

        // Registration already succeeded; a failed recompute is only a
        // stale cluster size until somebody else triggers it.
        if let Err(err) = self.ledger.update_cluster_size().await {
            warn!(error = %err, "failed to update cluster size");
        }

        Ok(data)
    }
}
