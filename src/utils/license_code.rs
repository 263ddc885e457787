use rand::{thread_rng, Rng};

const CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Generates a human-enterable activation code: 16 characters from [A-Z0-9],
/// grouped with hyphens every 4 (XXXX-XXXX-XXXX-XXXX). Uses the thread RNG;
/// the code is not a security boundary.
pub fn generate_license_code() -> String {
    let mut rng = thread_rng();
    let mut code = String::with_capacity(19);
    for i in 0..16 {
        if i > 0 && i % 4 == 0 {
            code.push('-');
        }
        let idx = rng.gen_range(0..CHARSET.len());
        code.push(CHARSET[idx] as char);
    }
    code
}
