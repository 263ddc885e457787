use crate::error::{Error, Result};
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Computes the PaySky secure hash: HMAC-SHA256 over the ordered,
/// ampersand-joined transaction fields, hex-encoded upper-case.
///
/// The shared secret is a hex string and must be decoded to raw bytes before
/// keying the MAC. Keying with the UTF-8 bytes of the hex text produces a
/// well-formed hash that the provider silently rejects.
pub fn generate_secure_hash(
    secret_key_hex: &str,
    amount_piasters: i64,
    trx_date_time: &str,
    merchant_id: &str,
    merchant_reference: &str,
    terminal_id: &str,
) -> Result<String> {
    let key = hex::decode(secret_key_hex)
        .map_err(|e| Error::Config(format!("PaySky secret key is not valid hex: {}", e)))?;

    let hashing = format!(
        "Amount={}&DateTimeLocalTrxn={}&MerchantId={}&MerchantReference={}&TerminalId={}",
        amount_piasters, trx_date_time, merchant_id, merchant_reference, terminal_id
    );

    let mut mac = HmacSha256::new_from_slice(&key)
        .map_err(|e| Error::Config(format!("PaySky secret key rejected by HMAC: {}", e)))?;
    mac.update(hashing.as_bytes());

    Ok(hex::encode(mac.finalize().into_bytes()).to_uppercase())
}
