//! Webhook signature verification
//!
//! GitHub signs each delivery with HMAC-SHA256 over the raw request
//! body, keyed by the shared webhook secret, and sends the hex digest
//! in the `X-Hub-Signature-256` header as `sha256=<digest>`. The
//! digest comparison goes through `Mac::verify_slice`, which is
//! constant-time with respect to the expected value.

use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::api::error::ApiError;

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the delivery signature
pub const SIGNATURE_HEADER: &str = "x-hub-signature-256";

/// Algorithm prefix in front of the hex digest
const SIGNATURE_PREFIX: &str = "sha256=";

/// Anything shorter than the prefix plus one digest byte is garbage
const MIN_SIGNATURE_LEN: usize = 8;

/// Verifies the delivery signature against the raw body
///
/// Fails when the header is absent, implausibly short, carries the
/// wrong algorithm prefix, is not valid hex, or does not match the
/// digest computed with the shared secret.
pub fn verify_signature(secret: &str, body: &[u8], header: Option<&str>) -> Result<(), ApiError> {
    let header = header.ok_or_else(|| ApiError::Auth("No HMAC signature provided".to_string()))?;

    if header.len() < MIN_SIGNATURE_LEN {
        return Err(ApiError::Auth("Invalid HMAC signature provided".to_string()));
    }

    let digest = header
        .strip_prefix(SIGNATURE_PREFIX)
        .ok_or_else(|| ApiError::Auth("Invalid HMAC signature provided".to_string()))?;

    let digest = hex::decode(digest)
        .map_err(|_| ApiError::Auth("Invalid HMAC signature provided".to_string()))?;

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|_| ApiError::Auth("Invalid HMAC key".to_string()))?;
    mac.update(body);

    mac.verify_slice(&digest)
        .map_err(|_| ApiError::Auth("Invalid HMAC signature provided".to_string()))
}

/// Computes the signature header value for a body, for tests and tooling
#[cfg(test)]
pub fn sign(secret: &str, body: &[u8]) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key size");
    mac.update(body);
    format!("sha256={}", hex::encode(mac.finalize().into_bytes()))
}
