use super::payment::Plan;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Activation code generated when a payment completes. Embeds the triggering
/// merchant reference for audit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct License {
    pub code: String,
    pub plan: Plan,
    pub entity_id: String,
    pub merchant_reference: String,
    pub is_active: bool,
    pub auto_generated: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subscription {
    pub plan: Plan,
    pub status: String,
    pub license_code: String,
    pub payment_method: String,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub activated_at: DateTime<Utc>,
}

impl Subscription {
    pub fn activate(plan: Plan, license_code: String, now: DateTime<Utc>) -> Self {
        let end_date = now + chrono::Duration::days(plan.details().duration_days);
        Self {
            plan,
            status: "active".to_string(),
            license_code,
            payment_method: "paysky".to_string(),
            start_date: now,
            end_date,
            activated_at: now,
        }
    }
}
