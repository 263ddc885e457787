use crate::error::{Error, Result};
use crate::models::license::{License, Subscription};
use crate::models::payment::{PaymentRecord, PaymentStatus};
use crate::storage::{subscription_key, LocalStore, LICENSES_KEY, PAYMENTS_KEY};
use serde_json::Value as JsonValue;
use tracing::info;

/// Store-backed payment ledger. Records are reconciled by merchant reference,
/// never by internal id; the provider's callbacks only carry the reference.
#[derive(Clone)]
pub struct PaymentLedger {
    store: LocalStore,
}

impl PaymentLedger {
    pub fn new(store: LocalStore) -> Self {
        Self { store }
    }

    pub fn list(&self) -> Result<Vec<PaymentRecord>> {
        Ok(self
            .store
            .get::<Vec<PaymentRecord>>(PAYMENTS_KEY)?
            .unwrap_or_default())
    }

    pub fn create(&self, record: PaymentRecord) -> Result<()> {
        let mut records = self.list()?;
        if records
            .iter()
            .any(|r| r.merchant_reference == record.merchant_reference)
        {
            return Err(Error::Payment(format!(
                "Duplicate merchant reference {}",
                record.merchant_reference
            )));
        }
        info!(
            merchant_reference = %record.merchant_reference,
            plan = record.plan.id(),
            amount = record.amount_piasters,
            "Payment record created"
        );
        records.push(record);
        self.store.set(PAYMENTS_KEY, &records)
    }

    pub fn find_by_reference(&self, merchant_reference: &str) -> Result<PaymentRecord> {
        self.list()?
            .into_iter()
            .find(|r| r.merchant_reference == merchant_reference)
            .ok_or_else(|| {
                Error::NotFound(format!(
                    "No payment record for reference {}",
                    merchant_reference
                ))
            })
    }

    /// Moves the record identified by the merchant reference to a terminal
    /// status, storing the provider's raw response for audit.
    pub fn update_status(
        &self,
        merchant_reference: &str,
        status: PaymentStatus,
        provider_response: Option<JsonValue>,
    ) -> Result<PaymentRecord> {
        let mut records = self.list()?;
        let record = records
            .iter_mut()
            .find(|r| r.merchant_reference == merchant_reference)
            .ok_or_else(|| {
                Error::NotFound(format!(
                    "No payment record for reference {}",
                    merchant_reference
                ))
            })?;

        record.transition(status, provider_response)?;
        info!(merchant_reference, status = %status, "Payment record updated");
        let updated = record.clone();
        self.store.set(PAYMENTS_KEY, &records)?;
        Ok(updated)
    }

    /// Test tooling only: reopens a terminal record.
    pub fn reset_to_pending(&self, merchant_reference: &str) -> Result<PaymentRecord> {
        let mut records = self.list()?;
        let record = records
            .iter_mut()
            .find(|r| r.merchant_reference == merchant_reference)
            .ok_or_else(|| {
                Error::NotFound(format!(
                    "No payment record for reference {}",
                    merchant_reference
                ))
            })?;
        record.reset_to_pending();
        let updated = record.clone();
        self.store.set(PAYMENTS_KEY, &records)?;
        Ok(updated)
    }

    pub fn licenses(&self) -> Result<Vec<License>> {
        Ok(self
            .store
            .get::<Vec<License>>(LICENSES_KEY)?
            .unwrap_or_default())
    }

    pub fn save_license(&self, license: License) -> Result<()> {
        let mut licenses = self.licenses()?;
        licenses.push(license);
        self.store.set(LICENSES_KEY, &licenses)
    }

    pub fn activate_subscription(&self, entity_id: &str, subscription: &Subscription) -> Result<()> {
        self.store.set(&subscription_key(entity_id), subscription)
    }

    pub fn subscription(&self, entity_id: &str) -> Result<Option<Subscription>> {
        self.store.get(&subscription_key(entity_id))
    }
}
