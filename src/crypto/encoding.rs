//! Byte-encoding normalization at the key-provider boundary
//!
//! The key provider may hand back signatures and keys either as raw
//! bytes or as hex text, with or without a `0x` prefix, depending on the
//! underlying signing library. Everything is normalized to raw bytes
//! here, once, so no format sniffing leaks into business code.

use serde::Deserialize;

use crate::infra::{NodeError, Result};

/// Decode hex that may or may not carry a `0x`/`0X` prefix.
pub fn decode_hex_loose(input: &str) -> Result<Vec<u8>> {
    let stripped = input
        .strip_prefix("0x")
        .or_else(|| input.strip_prefix("0X"))
        .unwrap_or(input);
    hex::decode(stripped).map_err(|e| NodeError::KeyProvider(format!("invalid hex: {e}")))
}

/// A signature as delivered on the wire: hex text or raw bytes.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawSignature {
    Text(String),
    Bytes(Vec<u8>),
}

impl RawSignature {
    /// Normalize to raw bytes.
    pub fn into_bytes(self) -> Result<Vec<u8>> {
        match self {
            RawSignature::Text(s) => decode_hex_loose(&s),
            RawSignature::Bytes(b) => Ok(b),
        }
    }
}
