pub mod config;
pub mod dto;
pub mod error;
pub mod models;
pub mod routes;
pub mod services;
pub mod storage;
pub mod utils;

use crate::services::{
    payment_ledger::PaymentLedger,
    signing_service::SigningService,
    sync_service::{SyncPolicy, SyncService},
};
use crate::storage::LocalStore;
use reqwest::Client;

#[derive(Clone)]
pub struct AppState {
    pub store: LocalStore,
    pub sync_service: SyncService,
    pub payment_ledger: PaymentLedger,
    pub signing_service: SigningService,
}

impl AppState {
    pub fn new(store: LocalStore) -> Self {
        let config = crate::config::get_config();
        let http_client = Client::builder()
            .timeout(std::time::Duration::from_secs(60))
            .build()
            .unwrap();

        let sync_service = SyncService::new(
            store.clone(),
            http_client,
            config.grading_endpoint(),
            config.grading_anon_key.clone(),
            SyncPolicy {
                max_attempts: config.sync_max_attempts,
                backoff_base_secs: config.sync_backoff_base_secs,
                backoff_cap_secs: config.sync_backoff_cap_secs,
            },
        );
        let payment_ledger = PaymentLedger::new(store.clone());
        let signing_service = SigningService::new(
            config.paysky_merchant_id.clone(),
            config.paysky_terminal_id.clone(),
            config.paysky_secret_key.clone(),
        );

        Self {
            store,
            sync_service,
            payment_ledger,
            signing_service,
        }
    }
}
