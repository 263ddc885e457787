use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Completed,
    Failed,
    Cancelled,
}

impl PaymentStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, PaymentStatus::Pending)
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Completed => "completed",
            PaymentStatus::Failed => "failed",
            PaymentStatus::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Plan {
    #[serde(rename = "MONTHLY")]
    Monthly,
    #[serde(rename = "ANNUAL")]
    Annual,
    #[serde(rename = "TEST")]
    Test,
    #[serde(rename = "MINIMAL")]
    Minimal,
}

#[derive(Debug, Clone)]
pub struct PlanDetails {
    pub name: &'static str,
    pub price_egp: f64,
    pub description: &'static str,
    pub duration_days: i64,
}

impl Plan {
    /// Unknown identifiers fall back to the monthly plan rather than failing;
    /// the billing page treats MONTHLY as the default offer.
    pub fn resolve(id: &str) -> Plan {
        match id {
            "ANNUAL" => Plan::Annual,
            "TEST" => Plan::Test,
            "MINIMAL" => Plan::Minimal,
            _ => Plan::Monthly,
        }
    }

    pub fn id(&self) -> &'static str {
        match self {
            Plan::Monthly => "MONTHLY",
            Plan::Annual => "ANNUAL",
            Plan::Test => "TEST",
            Plan::Minimal => "MINIMAL",
        }
    }

    pub fn details(&self) -> PlanDetails {
        match self {
            Plan::Monthly => PlanDetails {
                name: "Monthly Premium",
                price_egp: 400.0,
                description: "Monthly subscription",
                duration_days: 30,
            },
            Plan::Annual => PlanDetails {
                name: "Annual Premium",
                price_egp: 4000.0,
                description: "Annual subscription",
                duration_days: 365,
            },
            Plan::Test => PlanDetails {
                name: "Test Payment",
                price_egp: 1.0,
                description: "Test payment for debugging",
                duration_days: 365,
            },
            Plan::Minimal => PlanDetails {
                name: "Minimal Test",
                price_egp: 0.01,
                description: "Minimal test payment (1 piaster)",
                duration_days: 365,
            },
        }
    }
}

impl PlanDetails {
    /// Canonical transaction amount in piasters (1 EGP = 100 piasters). The
    /// provider hashes and charges this integer, never the major-unit float.
    /// PaySky rejects zero-amount transactions, so non-positive amounts fail
    /// fast before the widget is ever shown.
    pub fn amount_piasters(&self) -> Result<i64> {
        let amount = (self.price_egp * 100.0).round() as i64;
        if amount <= 0 {
            return Err(Error::BadRequest(
                "Cannot process a zero-amount payment; the provider requires a minimum charge"
                    .to_string(),
            ));
        }
        Ok(amount)
    }
}

/// Local ledger entry for one checkout attempt. `merchant_reference` is the
/// only correlation key the provider's callbacks carry back to us.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentRecord {
    pub id: Uuid,
    pub merchant_reference: String,
    pub entity_id: String,
    pub plan: Plan,
    pub amount_piasters: i64,
    pub currency: String,
    pub status: PaymentStatus,
    pub payment_method: String,
    #[serde(default)]
    pub provider_response: Option<JsonValue>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub failed_at: Option<DateTime<Utc>>,
}

impl PaymentRecord {
    pub fn new(
        merchant_reference: String,
        entity_id: String,
        plan: Plan,
        amount_piasters: i64,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            merchant_reference,
            entity_id,
            plan,
            amount_piasters,
            currency: "EGP".to_string(),
            status: PaymentStatus::Pending,
            payment_method: "paysky".to_string(),
            provider_response: None,
            created_at: now,
            updated_at: now,
            completed_at: None,
            failed_at: None,
        }
    }

    /// Moves the record forward to a terminal status. Transitions are
    /// monotonic: a terminal record refuses any further transition.
    pub fn transition(&mut self, to: PaymentStatus, response: Option<JsonValue>) -> Result<()> {
        if self.status.is_terminal() {
            return Err(Error::Payment(format!(
                "Payment {} is already {} and cannot move to {}",
                self.merchant_reference, self.status, to
            )));
        }
        if to == PaymentStatus::Pending {
            return Err(Error::Payment(
                "Use reset_to_pending to reopen a record".to_string(),
            ));
        }

        let now = Utc::now();
        self.status = to;
        self.provider_response = response;
        self.updated_at = now;
        match to {
            PaymentStatus::Completed => self.completed_at = Some(now),
            PaymentStatus::Failed => self.failed_at = Some(now),
            _ => {}
        }
        Ok(())
    }

    /// Test tooling only: reopens a terminal record so a checkout can be
    /// replayed against it.
    pub fn reset_to_pending(&mut self) {
        self.status = PaymentStatus::Pending;
        self.provider_response = None;
        self.completed_at = None;
        self.failed_at = None;
        self.updated_at = Utc::now();
    }
}
