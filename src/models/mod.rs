pub mod license;
pub mod payment;
pub mod submission;
