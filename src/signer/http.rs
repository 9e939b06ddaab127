//! HTTP client for the enclave signing service

use super::{AddressProvider, RemoteSigner};
use crate::config::SignerConfig;
use crate::error::{WalletError, WalletResult};
use crate::tx::{Digest, RawSignature};

use async_trait::async_trait;
use ethers::core::k256::ecdsa::VerifyingKey;
use ethers::types::Address;
use ethers::utils::public_key_to_address;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

/// Signer reached over HTTP: `POST /sign` and `GET /address`
#[derive(Debug, Clone)]
pub struct HttpSigner {
    client: reqwest::Client,
    base_url: String,
}

impl HttpSigner {
    pub fn new(config: &SignerConfig) -> WalletResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| WalletError::Config(format!("Signer HTTP client: {}", e)))?;

        Ok(Self::with_client(client, &config.url))
    }

    /// Creates a signer with a custom HTTP client.
    pub fn with_client(client: reqwest::Client, url: &str) -> Self {
        Self {
            client,
            base_url: url.trim_end_matches('/').to_string(),
        }
    }

    pub fn url(&self) -> &str {
        &self.base_url
    }

    async fn read_body<T: for<'de> Deserialize<'de>>(
        response: reqwest::Response,
        endpoint: &str,
    ) -> WalletResult<T> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown".to_string());
            return Err(WalletError::SignerRejected(format!(
                "{} returned {}: {}",
                endpoint, status, body
            )));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| classify_body_error(endpoint, e))
    }
}

/// A body that never fully arrived is a transport failure; one that arrived
/// but does not parse is the signer's fault.
fn classify_body_error(endpoint: &str, error: reqwest::Error) -> WalletError {
    if error.is_timeout() || error.is_request() || error.is_body() || error.is_connect() {
        WalletError::SignerUnavailable(format!("{} body: {}", endpoint, error))
    } else {
        WalletError::SignerRejected(format!("{} body: {}", endpoint, error))
    }
}

#[derive(Debug, Serialize)]
struct SignRequest {
    /// Digest as 64 hex characters, no prefix
    message: String,
}

#[derive(Debug, Deserialize)]
struct SignResponse {
    r: Option<String>,
    s: Option<String>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AddressResponse {
    address: Option<String>,
    public_key: Option<String>,
    error: Option<String>,
}

#[async_trait]
impl RemoteSigner for HttpSigner {
    async fn sign_digest(&self, digest: &Digest) -> WalletResult<RawSignature> {
        let request = SignRequest {
            message: digest.to_hex(),
        };

        let response = self
            .client
            .post(format!("{}/sign", self.base_url))
            .json(&request)
            .send()
            .await
            .map_err(|e| WalletError::SignerUnavailable(e.to_string()))?;

        let body: SignResponse = Self::read_body(response, "/sign").await?;

        if let Some(error) = body.error {
            warn!("Signer refused digest {}: {}", digest, error);
            return Err(WalletError::SignerRejected(error));
        }

        match (body.r, body.s) {
            (Some(r), Some(s)) => {
                let signature =
                    RawSignature::from_hex_components(&r, &s).map_err(WalletError::SignerRejected)?;
                debug!("Signer returned signature for digest {}", digest);
                Ok(signature)
            }
            _ => Err(WalletError::SignerRejected(
                "response is missing r or s".to_string(),
            )),
        }
    }
}

#[async_trait]
impl AddressProvider for HttpSigner {
    async fn address(&self) -> WalletResult<Address> {
        let response = self
            .client
            .get(format!("{}/address", self.base_url))
            .send()
            .await
            .map_err(|e| WalletError::SignerUnavailable(e.to_string()))?;

        let body: AddressResponse = Self::read_body(response, "/address").await?;

        if let Some(error) = body.error {
            return Err(WalletError::SignerRejected(error));
        }

        match (body.address, body.public_key) {
            (Some(address), _) => address
                .trim()
                .parse::<Address>()
                .map_err(|e| WalletError::SignerRejected(format!("address {}: {}", address, e))),
            (None, Some(public_key)) => address_from_public_key(&public_key),
            (None, None) => Err(WalletError::SignerRejected(
                "response carries neither address nor public_key".to_string(),
            )),
        }
    }
}

/// Address of a hex SEC1 public key, compressed or not, `0x` optional
pub fn address_from_public_key(public_key: &str) -> WalletResult<Address> {
    let trimmed = public_key.trim();
    let digits = trimmed.strip_prefix("0x").unwrap_or(trimmed);

    let mut bytes = hex::decode(digits)
        .map_err(|e| WalletError::SignerRejected(format!("public_key is not hex: {}", e)))?;

    // bare 64-byte x || y
    if bytes.len() == 64 {
        bytes.insert(0, 0x04);
    }

    let key = VerifyingKey::from_sec1_bytes(&bytes)
        .map_err(|_| WalletError::SignerRejected("public_key is not a curve point".to_string()))?;

    Ok(public_key_to_address(&key))
}
