use chrono::Utc;

pub const MERCHANT_REF_PREFIX: &str = "DURRAH";

/// Client-generated correlation key: `DURRAH_{entityId}_{epochMillis}`.
/// Unique per attempt as long as the clock advances between calls; uniqueness
/// is best-effort at sub-millisecond resolution.
pub fn generate_merchant_reference(entity_id: &str) -> String {
    format!(
        "{}_{}_{}",
        MERCHANT_REF_PREFIX,
        entity_id,
        Utc::now().timestamp_millis()
    )
}
