//! Property-based tests using proptest.
//!
//! These tests verify invariants that should hold for any valid input.

use proptest::prelude::*;

use quorum_counter::crypto::{decode_hex_loose, instance_id_digest, RawSignature};
use quorum_counter::{SignatureProof, ProofViolation};

use alloy::primitives::{Address, FixedBytes};

proptest! {
    // Digest contract: 32 bytes, deterministic, input-sensitive.
    #[test]
    fn digest_is_deterministic_and_fixed_width(id in ".*") {
        let first = instance_id_digest(&id);
        let second = instance_id_digest(&id);
        prop_assert_eq!(first.len(), 32);
        prop_assert_eq!(first, second);
    }

    #[test]
    fn distinct_ids_rarely_collide(a in "[a-z0-9-]{1,32}", b in "[a-z0-9-]{1,32}") {
        prop_assume!(a != b);
        prop_assert_ne!(instance_id_digest(&a), instance_id_digest(&b));
    }

    // Hex normalization accepts the same bytes with or without prefix.
    #[test]
    fn hex_prefix_is_irrelevant(bytes in proptest::collection::vec(any::<u8>(), 0..128)) {
        let bare = hex::encode(&bytes);
        let prefixed = format!("0x{bare}");
        prop_assert_eq!(decode_hex_loose(&bare).unwrap(), bytes.clone());
        prop_assert_eq!(decode_hex_loose(&prefixed).unwrap(), bytes);
    }

    // Wire normalization: text and raw forms of a signature agree.
    #[test]
    fn raw_signature_forms_agree(bytes in proptest::collection::vec(any::<u8>(), 0..200)) {
        let text = RawSignature::Text(format!("0x{}", hex::encode(&bytes)));
        let raw = RawSignature::Bytes(bytes.clone());
        prop_assert_eq!(text.into_bytes().unwrap(), bytes.clone());
        prop_assert_eq!(raw.into_bytes().unwrap(), bytes);
    }

    // Structural validation: signature length is the only free variable
    // here, and 65 is the exact boundary.
    #[test]
    fn signature_length_boundary_is_exact(app_len in 0usize..130, kms_len in 0usize..130) {
        let proof = SignatureProof {
            instance_id_hash: FixedBytes::from([0x11u8; 32]),
            derived_public_key: Address::from([0x22u8; 20]),
            app_signature: vec![0u8; app_len],
            kms_signature: vec![0u8; kms_len],
            purpose: "ethereum".to_string(),
            app_id: FixedBytes::from([0x33u8; 32]),
        };

        match proof.check_format() {
            Ok(()) => {
                prop_assert!(app_len >= 65 && kms_len >= 65);
            }
            Err(violations) => {
                let app_flagged = violations.0.iter().any(|v| matches!(v, ProofViolation::AppSignatureTooShort(_)));
                let kms_flagged = violations.0.iter().any(|v| matches!(v, ProofViolation::KmsSignatureTooShort(_)));
                prop_assert_eq!(app_flagged, app_len < 65);
                prop_assert_eq!(kms_flagged, kms_len < 65);
            }
        }
    }
}
