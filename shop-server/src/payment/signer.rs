//! Canonical query signing (HMAC-SHA512)
//!
//! Both directions use the same canonical form: parameters sorted by key,
//! keys and values form-encoded (space as `+`), joined as `k=v&k=v`.

use std::collections::BTreeMap;

use hmac::{Hmac, Mac};
use sha2::Sha512;

use super::{PaymentError, PaymentResult};

type HmacSha512 = Hmac<Sha512>;

/// Form-encode a component, space as `+`
pub fn encode_component(value: &str) -> String {
    urlencoding::encode(value).replace("%20", "+")
}

/// Sorted, encoded `k=v&k=v` string
pub fn canonical_query(params: &BTreeMap<String, String>) -> String {
    params
        .iter()
        .map(|(k, v)| format!("{}={}", encode_component(k), encode_component(v)))
        .collect::<Vec<_>>()
        .join("&")
}

/// Lowercase hex HMAC-SHA512 of the canonical query
pub fn canonical_sign(params: &BTreeMap<String, String>, secret: &str) -> PaymentResult<String> {
    let mut mac = new_mac(secret)?;
    mac.update(canonical_query(params).as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Constant-time check of a hex signature over `params`
pub fn verify_signature(params: &BTreeMap<String, String>, secret: &str, signature: &str) -> bool {
    let Ok(sig_bytes) = hex::decode(signature.trim()) else {
        return false;
    };
    let Ok(mut mac) = new_mac(secret) else {
        return false;
    };
    mac.update(canonical_query(params).as_bytes());
    mac.verify_slice(&sig_bytes).is_ok()
}

fn new_mac(secret: &str) -> PaymentResult<HmacSha512> {
    HmacSha512::new_from_slice(secret.as_bytes()).map_err(|_| PaymentError::InvalidKey)
}
