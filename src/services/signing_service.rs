use crate::error::Result;
use crate::utils::secure_hash::generate_secure_hash;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;

/// Trusted holder of the PaySky credentials. The checkout client never sees
/// the secret; it asks this component (directly in-process, or over the
/// signing endpoint) for the hash.
#[derive(Clone)]
pub struct SigningService {
    merchant_id: String,
    terminal_id: String,
    secret_key_hex: String,
}

impl SigningService {
    pub fn new(merchant_id: String, terminal_id: String, secret_key_hex: String) -> Self {
        Self {
            merchant_id,
            terminal_id,
            secret_key_hex,
        }
    }

    pub fn merchant_id(&self) -> &str {
        &self.merchant_id
    }

    pub fn terminal_id(&self) -> &str {
        &self.terminal_id
    }

    pub fn sign(
        &self,
        amount_piasters: i64,
        merchant_reference: &str,
        trx_date_time: &str,
    ) -> Result<String> {
        generate_secure_hash(
            &self.secret_key_hex,
            amount_piasters,
            trx_date_time,
            &self.merchant_id,
            merchant_reference,
            &self.terminal_id,
        )
    }
}

/// Capability the checkout flow uses to obtain a secure hash.
#[async_trait]
pub trait HashSigner: Send + Sync {
    async fn sign(
        &self,
        amount_piasters: i64,
        merchant_reference: &str,
        trx_date_time: &str,
    ) -> Result<String>;
}

/// In-process signer for the trusted agent itself (and tests).
pub struct LocalSigner {
    signing: SigningService,
}

impl LocalSigner {
    pub fn new(signing: SigningService) -> Self {
        Self { signing }
    }
}

#[async_trait]
impl HashSigner for LocalSigner {
    async fn sign(
        &self,
        amount_piasters: i64,
        merchant_reference: &str,
        trx_date_time: &str,
    ) -> Result<String> {
        self.signing
            .sign(amount_piasters, merchant_reference, trx_date_time)
    }
}

/// Signer for untrusted checkout clients: calls the agent's signing endpoint
/// instead of holding the PaySky secret locally.
pub struct RemoteSigner {
    client: Client,
    endpoint: String,
    agent_secret: String,
}

impl RemoteSigner {
    pub fn new(client: Client, endpoint: String, agent_secret: String) -> Self {
        Self {
            client,
            endpoint,
            agent_secret,
        }
    }
}

#[async_trait]
impl HashSigner for RemoteSigner {
    async fn sign(
        &self,
        amount_piasters: i64,
        merchant_reference: &str,
        trx_date_time: &str,
    ) -> Result<String> {
        let response = self
            .client
            .post(&self.endpoint)
            .header("X-Agent-Secret", &self.agent_secret)
            .json(&json!({
                "amount": amount_piasters,
                "merchant_reference": merchant_reference,
                "trx_date_time": trx_date_time,
            }))
            .send()
            .await?
            .error_for_status()?;

        let body: crate::dto::payment_dto::SignResponse = response.json().await?;
        Ok(body.secure_hash)
    }
}
