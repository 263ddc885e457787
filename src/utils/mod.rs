pub mod license_code;
pub mod merchant_ref;
pub mod secure_hash;
pub mod time;
