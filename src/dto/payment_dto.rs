use serde::{Deserialize, Serialize};
use validator::Validate;

/// Signing request from an untrusted checkout client. The client supplies the
/// transaction fields; the agent holds the PaySky secret and merchant/terminal
/// identity.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SignRequest {
    #[validate(range(min = 1, message = "amount must be at least 1 piaster"))]
    pub amount: i64,
    #[validate(length(min = 1, max = 128))]
    pub merchant_reference: String,
    #[validate(length(min = 1, max = 64))]
    pub trx_date_time: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignResponse {
    pub secure_hash: String,
    pub merchant_id: String,
    pub terminal_id: String,
}
