//! Attestation proof value objects and structural validation
//!
//! A `SignatureProof` carries the signature chain that ties a derived
//! node key back to the key-management root through the application
//! layer. The byte-length rules here are exact contracts with the
//! membership registry contract, not soft guidelines.

use std::fmt;

use alloy::primitives::{Address, FixedBytes, U256};
use tracing::error;

/// Minimum length of an ECDSA signature in the chain (r || s || v).
pub const MIN_SIGNATURE_LEN: usize = 65;

/// Signature chain proof for one instance, immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureProof {
    /// SHA-256 digest of the instance id (the ledger-facing identifier)
    pub instance_id_hash: FixedBytes<32>,
    /// Account derived from the provider-issued private key
    pub derived_public_key: Address,
    /// Application-layer signature over the derived key
    pub app_signature: Vec<u8>,
    /// Root/KMS-layer signature over the application layer
    pub kms_signature: Vec<u8>,
    /// Key derivation purpose tag
    pub purpose: String,
    /// Application identity, right-padded to 32 bytes
    pub app_id: FixedBytes<32>,
}

/// Registration payload: a validated proof plus the membership token.
#[derive(Debug, Clone)]
pub struct RegistrationData {
    /// Membership credential id; strictly positive by construction
    pub token_id: U256,
    pub proof: SignatureProof,
}

/// One violated structural rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProofViolation {
    InstanceIdHashLength(usize),
    PublicKeyLength(usize),
    AppSignatureTooShort(usize),
    KmsSignatureTooShort(usize),
    EmptyPurpose,
    EmptyAppId,
}

impl fmt::Display for ProofViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProofViolation::InstanceIdHashLength(len) => {
                write!(f, "instance_id_hash must be 32 bytes, got {len}")
            }
            ProofViolation::PublicKeyLength(len) => {
                write!(f, "derived_public_key must be 20 bytes, got {len}")
            }
            ProofViolation::AppSignatureTooShort(len) => {
                write!(f, "app_signature must be >= {MIN_SIGNATURE_LEN} bytes, got {len}")
            }
            ProofViolation::KmsSignatureTooShort(len) => {
                write!(f, "kms_signature must be >= {MIN_SIGNATURE_LEN} bytes, got {len}")
            }
            ProofViolation::EmptyPurpose => write!(f, "purpose is empty"),
            ProofViolation::EmptyAppId => write!(f, "app_id is empty"),
        }
    }
}

/// Every rule a proof violated, collected in one pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProofViolations(pub Vec<ProofViolation>);

impl fmt::Display for ProofViolations {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for violation in &self.0 {
            if !first {
                write!(f, "; ")?;
            }
            write!(f, "{violation}")?;
            first = false;
        }
        Ok(())
    }
}

impl SignatureProof {
    /// Check every structural rule, reporting all violations at once.
    ///
    /// The fixed-size fields (`instance_id_hash`, `derived_public_key`)
    /// are correct by type; their rules are listed for parity with the
    /// on-chain checks and with peers that assemble proofs dynamically.
    pub fn check_format(&self) -> Result<(), ProofViolations> {
        let mut violations = Vec::new();

        if self.instance_id_hash.len() != 32 {
            violations.push(ProofViolation::InstanceIdHashLength(
                self.instance_id_hash.len(),
            ));
        }
        if self.derived_public_key.len() != 20 {
            violations.push(ProofViolation::PublicKeyLength(
                self.derived_public_key.len(),
            ));
        }
        if self.app_signature.len() < MIN_SIGNATURE_LEN {
            violations.push(ProofViolation::AppSignatureTooShort(
                self.app_signature.len(),
            ));
        }
        if self.kms_signature.len() < MIN_SIGNATURE_LEN {
            violations.push(ProofViolation::KmsSignatureTooShort(
                self.kms_signature.len(),
            ));
        }
        if self.purpose.is_empty() {
            violations.push(ProofViolation::EmptyPurpose);
        }
        if self.app_id.is_zero() {
            violations.push(ProofViolation::EmptyAppId);
        }

        if violations.is_empty() {
            Ok(())
        } else {
            Err(ProofViolations(violations))
        }
    }
}

/// Fail-soft structural check: logs each violated rule and returns false.
///
/// Pure with respect to everything but the log sink; never panics.
/// Prefer [`SignatureProof::check_format`] where the caller can carry the
/// violation reasons forward.
pub fn verify_proof_format(proof: &SignatureProof) -> bool {
    match proof.check_format() {
        Ok(()) => true,
        Err(ProofViolations(violations)) => {
            for violation in &violations {
                error!(%violation, "proof format violation");
            }
            false
        }
    }
}
