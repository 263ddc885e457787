use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Everything the hosted checkout needs to render one transaction. The
/// timestamp here must be byte-identical to the one that went into the hash;
/// the provider compares the strings, not the instants.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutConfig {
    pub merchant_id: String,
    pub terminal_id: String,
    pub amount_trxn: i64,
    pub secure_hash: String,
    pub merchant_reference: String,
    pub trx_date_time: String,
    pub transaction_type: String,
}

/// Resolution of one checkout session: the provider's complete, error, and
/// cancel callbacks collapsed into a single awaited outcome.
#[derive(Debug, Clone)]
pub enum CheckoutOutcome {
    Completed(JsonValue),
    Failed(String),
    Cancelled,
}

/// The third-party checkout surface, injected so a test double can stand in
/// for the real hosted widget.
#[async_trait]
pub trait PaymentWidget: Send + Sync {
    /// Prepares the widget (the script-tag load in the hosted version). May
    /// fail transiently; callers retry.
    async fn ensure_loaded(&self) -> Result<()>;

    /// Presents the checkout and suspends until the provider resolves it.
    /// There is no client-side timeout; abandoning the process is the only
    /// way to cancel an unresolved session.
    async fn checkout(&self, config: &CheckoutConfig) -> Result<CheckoutOutcome>;
}
