use {
    crate::domain::settings::Mode,
    hmac::{Hmac, Mac},
    sha2::Sha256,
};

type HmacSha256 = Hmac<Sha256>;

/// Verify an inbound webhook: HMAC-SHA-256 over the raw payload, hex-encoded,
/// compared in constant time.
///
/// Missing secret is a deliberate development escape hatch: sandbox mode
/// accepts the payload (loudly), live mode rejects it. Neither branch is
/// silent.
pub fn verify_webhook(
    payload: &[u8],
    signature: &str,
    secret: Option<&str>,
    mode: Mode,
) -> bool {
    let Some(secret) = secret.filter(|s| !s.is_empty()) else {
        return match mode {
            Mode::Sandbox => {
                tracing::warn!(
                    "webhook secret not configured; accepting unverified payload in sandbox mode"
                );
                true
            }
            Mode::Live => {
                tracing::warn!("webhook secret not configured; rejecting payload in live mode");
                false
            }
        };
    };

    let mut mac = match HmacSha256::new_from_slice(secret.as_bytes()) {
        Ok(mac) => mac,
        Err(_) => return false,
    };
    mac.update(payload);
    let expected = hex::encode(mac.finalize().into_bytes());

    secure_eq(expected.as_bytes(), signature.trim().as_bytes())
}

pub fn secure_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter()
        .zip(b.iter())
        .fold(0_u8, |acc, (x, y)| acc | (x ^ y))
        == 0
}

/// Hex HMAC-SHA-256 of a payload. Exposed for tests and for signing
/// outbound test fixtures.
pub fn sign(payload: &[u8], secret: &str) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).expect("hmac accepts any key size");
    mac.update(payload);
    hex::encode(mac.finalize().into_bytes())
}
