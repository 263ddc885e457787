pub mod payment_ledger;
pub mod payment_service;
pub mod signing_service;
pub mod sync_service;
pub mod widget;
