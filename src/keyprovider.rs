//! Key-provider client
//!
//! The key provider is an external service (a dstack-style guest agent)
//! that derives key material inside the trusted environment and hands
//! back, along with the raw key, the signature chain proving the key was
//! issued by the KMS root through the application layer. Its internal
//! cryptography is opaque here; this module only speaks its HTTP API and
//! normalizes the response into typed bytes at the boundary.

use std::time::Duration;

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use serde::Deserialize;
use tracing::debug;

use crate::crypto::{decode_hex_loose, RawSignature};
use crate::infra::{NodeError, Result};

/// Identity metadata of the provider's application context.
#[derive(Debug, Clone)]
pub struct ProviderInfo {
    /// Application id, hex with optional `0x` prefix
    pub app_id: String,
    pub app_name: String,
    pub instance_id: String,
}

/// Derived key material plus its attestation chain.
///
/// `signature_chain[0]` is the application-layer signature and
/// `signature_chain[1]` the root/KMS signature; later entries are
/// reserved and ignored by consumers.
#[derive(Debug, Clone)]
pub struct KeyMaterial {
    /// Raw private key bytes
    pub key: Vec<u8>,
    pub signature_chain: Vec<Vec<u8>>,
}

/// Handle to the external key-derivation service.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait KeyProvider: Send + Sync {
    /// Service identity metadata.
    async fn info(&self) -> Result<ProviderInfo>;

    /// Derive key material at (path, purpose).
    async fn get_key(&self, path: &str, purpose: &str) -> Result<KeyMaterial>;
}

/// Configuration for the HTTP key-provider client.
#[derive(Debug, Clone)]
pub struct KeyProviderConfig {
    /// Base URL of the guest agent, e.g. `http://127.0.0.1:8090`
    pub base_url: String,
    /// Bound on each request
    pub request_timeout: Duration,
}

impl KeyProviderConfig {
    pub fn from_env() -> Self {
        let base_url = std::env::var("KEY_PROVIDER_URL")
            .unwrap_or_else(|_| "http://127.0.0.1:8090".to_string());
        let request_timeout = std::env::var("KEY_PROVIDER_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(10));
        Self {
            base_url,
            request_timeout,
        }
    }
}

/// HTTP client for a dstack-style guest agent.
pub struct HttpKeyProvider {
    config: KeyProviderConfig,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct InfoResponse {
    app_id: String,
    #[serde(default)]
    app_name: String,
    #[serde(default)]
    instance_id: String,
}

#[derive(Debug, Deserialize)]
struct GetKeyResponse {
    /// Hex-encoded private key
    key: String,
    /// App signature first, KMS signature second
    signature_chain: Vec<RawSignature>,
}

impl HttpKeyProvider {
    pub fn new(config: KeyProviderConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| NodeError::KeyProvider(format!("failed to build client: {e}")))?;
        Ok(Self { config, client })
    }

    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), path)
    }
}

#[async_trait]
impl KeyProvider for HttpKeyProvider {
    async fn info(&self) -> Result<ProviderInfo> {
        let response: InfoResponse = self
            .client
            .post(self.endpoint("Info"))
            .json(&serde_json::json!({}))
            .send()
            .await
            .map_err(|e| NodeError::KeyProvider(format!("info request failed: {e}")))?
            .error_for_status()
            .map_err(|e| NodeError::KeyProvider(format!("info request rejected: {e}")))?
            .json()
            .await
            .map_err(|e| NodeError::KeyProvider(format!("info response malformed: {e}")))?;

        debug!(app_name = %response.app_name, app_id = %response.app_id, "key provider info");

        Ok(ProviderInfo {
            app_id: response.app_id,
            app_name: response.app_name,
            instance_id: response.instance_id,
        })
    }

    async fn get_key(&self, path: &str, purpose: &str) -> Result<KeyMaterial> {
        let response: GetKeyResponse = self
            .client
            .post(self.endpoint("GetKey"))
            .json(&serde_json::json!({ "path": path, "purpose": purpose }))
            .send()
            .await
            .map_err(|e| NodeError::KeyProvider(format!("key request failed: {e}")))?
            .error_for_status()
            .map_err(|e| NodeError::KeyProvider(format!("key request rejected: {e}")))?
            .json()
            .await
            .map_err(|e| NodeError::KeyProvider(format!("key response malformed: {e}")))?;

        let key = decode_hex_loose(&response.key)?;
        let signature_chain = response
            .signature_chain
            .into_iter()
            .map(RawSignature::into_bytes)
            .collect::<Result<Vec<_>>>()?;

        debug!(
            path,
            purpose,
            chain_len = signature_chain.len(),
            "derived key material"
        );

        Ok(KeyMaterial {
            key,
            signature_chain,
        })
    }
}
