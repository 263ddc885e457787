use chrono::{DateTime, Utc};

pub fn now() -> DateTime<Utc> {
    Utc::now()
}

pub fn to_rfc3339(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339()
}

/// Checkout timestamp in the GMT string form the provider expects, e.g.
/// "Tue, 14 Nov 2023 22:13:20 GMT". The provider checks exact string equality
/// between the hashed timestamp and the configured one, so the same rendered
/// string must be reused for both.
pub fn gmt_timestamp(dt: DateTime<Utc>) -> String {
    dt.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}
