//! App proxy request signatures.
//!
//! The storefront platform signs every forwarded request: all query parameters
//! except `signature` are sorted by name, concatenated as `name=value` with no
//! separator, and signed with HMAC-SHA256 under the shared secret. The result
//! travels as lowercase hex in the `signature` parameter.

use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::routing::query::{QueryParams, SIGNATURE};

type HmacSha256 = Hmac<Sha256>;

/// Length of a hex-encoded SHA-256 MAC.
const SIGNATURE_HEX_LEN: usize = 64;

/// Build the canonical string covered by the signature.
///
/// Values are used exactly as received; nothing is re-encoded.
pub fn canonical_string(params: &QueryParams) -> String {
    let mut pairs: Vec<(&str, &str)> = params
        .iter()
        .filter(|(name, _)| *name != SIGNATURE)
        .collect();
    pairs.sort_by(|a, b| a.0.as_bytes().cmp(b.0.as_bytes()));

    pairs
        .into_iter()
        .map(|(name, value)| format!("{}={}", name, value))
        .collect()
}

/// Compute the lowercase hex signature for `params` under `secret`.
pub fn sign(params: &QueryParams, secret: &str) -> String {
    let mut mac = mac_for(secret);
    mac.update(canonical_string(params).as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// Check the `signature` parameter of `params`.
///
/// Without a secret, verification is skipped and every request passes.
pub fn verify(params: &QueryParams, secret: Option<&str>) -> bool {
    let secret = match secret.filter(|s| !s.is_empty()) {
        Some(s) => s,
        None => {
            tracing::warn!("No shared secret configured, skipping signature verification");
            return true;
        }
    };

    let presented = match params.get(SIGNATURE) {
        Some(sig) => sig,
        None => {
            tracing::debug!("Request carries no signature");
            return false;
        }
    };

    if !is_lowercase_hex(presented) {
        return false;
    }
    let presented = match hex::decode(presented) {
        Ok(bytes) => bytes,
        Err(_) => return false,
    };

    let mut mac = mac_for(secret);
    mac.update(canonical_string(params).as_bytes());
    // verify_slice compares in constant time.
    mac.verify_slice(&presented).is_ok()
}

/// # Panics
///
/// Never in practice: HMAC accepts keys of any length.
fn mac_for(secret: &str) -> HmacSha256 {
    <HmacSha256 as Mac>::new_from_slice(secret.as_bytes())
        .expect("HMAC accepts any key size")
}

fn is_lowercase_hex(s: &str) -> bool {
    s.len() == SIGNATURE_HEX_LEN && s.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}
