use crate::error::{Error, Result};
use crate::models::license::{License, Subscription};
use crate::models::payment::{PaymentRecord, PaymentStatus, Plan};
use crate::services::payment_ledger::PaymentLedger;
use crate::services::signing_service::HashSigner;
use crate::services::widget::{CheckoutConfig, CheckoutOutcome, PaymentWidget};
use crate::utils::license_code::generate_license_code;
use crate::utils::merchant_ref::generate_merchant_reference;
use crate::utils::time::{gmt_timestamp, now};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

const MAX_WIDGET_LOAD_ATTEMPTS: u32 = 3;

/// What a checkout attempt resolved to, for the caller's UI.
#[derive(Debug, Clone, Serialize)]
pub struct PaymentOutcome {
    pub merchant_reference: String,
    pub status: PaymentStatus,
    pub license: Option<License>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider_error: Option<String>,
}

/// Drives the PaySky hosted-checkout handshake: plan resolution, amount
/// normalization, reference and timestamp generation, hash signing, widget
/// hand-off, and reconciliation of the asynchronous outcome against the local
/// ledger.
#[derive(Clone)]
pub struct PaymentService {
    ledger: PaymentLedger,
    signer: Arc<dyn HashSigner>,
    widget: Arc<dyn PaymentWidget>,
    merchant_id: String,
    terminal_id: String,
}

impl PaymentService {
    pub fn new(
        ledger: PaymentLedger,
        signer: Arc<dyn HashSigner>,
        widget: Arc<dyn PaymentWidget>,
        merchant_id: String,
        terminal_id: String,
    ) -> Self {
        Self {
            ledger,
            signer,
            widget,
            merchant_id,
            terminal_id,
        }
    }

    pub fn ledger(&self) -> &PaymentLedger {
        &self.ledger
    }

    /// Runs one full checkout attempt for `plan_id` on behalf of `entity_id`.
    ///
    /// A pending ledger record exists before the widget is shown, so even an
    /// abandoned or crashed checkout leaves an auditable trail. If widget
    /// initialization or hash signing fails, the attempt aborts with no
    /// record at all.
    pub async fn process_payment(&self, plan_id: &str, entity_id: &str) -> Result<PaymentOutcome> {
        self.load_widget().await?;

        let plan = Plan::resolve(plan_id);
        let details = plan.details();
        let amount = details.amount_piasters()?;

        let merchant_reference = generate_merchant_reference(entity_id);
        // Captured once; the hash input and the widget config must carry the
        // identical rendered string.
        let trx_date_time = gmt_timestamp(now());

        let secure_hash = self
            .signer
            .sign(amount, &merchant_reference, &trx_date_time)
            .await?;

        self.ledger.create(PaymentRecord::new(
            merchant_reference.clone(),
            entity_id.to_string(),
            plan,
            amount,
        ))?;

        let config = CheckoutConfig {
            merchant_id: self.merchant_id.clone(),
            terminal_id: self.terminal_id.clone(),
            amount_trxn: amount,
            secure_hash,
            merchant_reference: merchant_reference.clone(),
            trx_date_time,
            transaction_type: "SALE".to_string(),
        };

        info!(
            merchant_reference = %merchant_reference,
            plan = plan.id(),
            amount,
            "Opening checkout"
        );
        let outcome = self.widget.checkout(&config).await?;
        self.reconcile(&merchant_reference, plan, entity_id, outcome)
    }

    async fn load_widget(&self) -> Result<()> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.widget.ensure_loaded().await {
                Ok(()) => return Ok(()),
                Err(e) if attempt < MAX_WIDGET_LOAD_ATTEMPTS => {
                    warn!(attempt, error = %e, "Checkout widget failed to load, retrying");
                    tokio::time::sleep(Duration::from_secs(attempt as u64)).await;
                }
                Err(e) => {
                    error!(attempt, error = %e, "Checkout widget failed to load");
                    return Err(Error::Payment(format!(
                        "Checkout initialization failed after {} attempts: {}",
                        MAX_WIDGET_LOAD_ATTEMPTS, e
                    )));
                }
            }
        }
    }

    /// Resolves a checkout outcome against the ledger record identified by
    /// the merchant reference.
    fn reconcile(
        &self,
        merchant_reference: &str,
        plan: Plan,
        entity_id: &str,
        outcome: CheckoutOutcome,
    ) -> Result<PaymentOutcome> {
        match outcome {
            CheckoutOutcome::Completed(data) => {
                self.ledger
                    .update_status(merchant_reference, PaymentStatus::Completed, Some(data))?;
                let license = self.provision(merchant_reference, plan, entity_id)?;
                info!(merchant_reference, license = %license.code, "Payment completed");
                Ok(PaymentOutcome {
                    merchant_reference: merchant_reference.to_string(),
                    status: PaymentStatus::Completed,
                    license: Some(license),
                    provider_error: None,
                })
            }
            CheckoutOutcome::Failed(message) => {
                self.ledger.update_status(
                    merchant_reference,
                    PaymentStatus::Failed,
                    Some(serde_json::json!({ "error": message })),
                )?;
                warn!(merchant_reference, provider_error = %message, "Payment failed");
                Ok(PaymentOutcome {
                    merchant_reference: merchant_reference.to_string(),
                    status: PaymentStatus::Failed,
                    license: None,
                    provider_error: Some(message),
                })
            }
            CheckoutOutcome::Cancelled => {
                self.ledger.update_status(
                    merchant_reference,
                    PaymentStatus::Cancelled,
                    Some(serde_json::json!({ "reason": "user_cancelled" })),
                )?;
                info!(merchant_reference, "Payment cancelled by user");
                Ok(PaymentOutcome {
                    merchant_reference: merchant_reference.to_string(),
                    status: PaymentStatus::Cancelled,
                    license: None,
                    provider_error: None,
                })
            }
        }
    }

    /// Generates the activation license and turns the subscription on. Only
    /// reached after the ledger record is `completed`.
    fn provision(
        &self,
        merchant_reference: &str,
        plan: Plan,
        entity_id: &str,
    ) -> Result<License> {
        let activated_at = now();
        let license = License {
            code: generate_license_code(),
            plan,
            entity_id: entity_id.to_string(),
            merchant_reference: merchant_reference.to_string(),
            is_active: true,
            auto_generated: true,
            created_at: activated_at,
        };
        self.ledger.save_license(license.clone())?;

        let subscription = Subscription::activate(plan, license.code.clone(), activated_at);
        self.ledger.activate_subscription(entity_id, &subscription)?;
        info!(
            entity_id,
            plan = plan.id(),
            end_date = %subscription.end_date,
            "Subscription activated"
        );
        Ok(license)
    }
}
