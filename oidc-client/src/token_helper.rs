//! Reading claims out of JWTs without verifying them.
//!
//! Signature and claim verification belong to callback handling; this module
//! only answers "when does this token expire".

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Duration, TimeZone, Utc};
use serde_json::Value;

/// Decode the payload (second segment) of a compact JWT.
pub fn get_payload_from_token(token: &str) -> Option<Value> {
    let mut parts = token.split('.');
    let (Some(_header), Some(payload), Some(_signature)) = (parts.next(), parts.next(), parts.next())
    else {
        return None;
    };
    // Some issuers pad their segments.
    let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')).ok()?;
    serde_json::from_slice(&bytes).ok()
}

/// Expiry of a decoded payload, from its `exp` claim.
pub fn get_token_expiration_date(payload: &Value) -> Option<DateTime<Utc>> {
    let exp = payload.get("exp")?;
    let secs = exp.as_i64().or_else(|| exp.as_f64().map(|f| f as i64))?;
    Utc.timestamp_opt(secs, 0).single()
}

/// Whether `token` is expired at `now`, treating it as expired `offset_secs` early.
///
/// A token that cannot be decoded is expired; a token without `exp` never is.
pub fn has_token_expired_at(token: &str, offset_secs: u64, now: DateTime<Utc>) -> bool {
    let Some(payload) = get_payload_from_token(token) else {
        return true;
    };
    match get_token_expiration_date(&payload) {
        Some(expires_at) => now + offset(offset_secs) >= expires_at,
        None => false,
    }
}

pub fn has_token_expired(token: &str, offset_secs: u64) -> bool {
    has_token_expired_at(token, offset_secs, Utc::now())
}

/// Whether an epoch-millisecond expiry has passed at `now`, `offset_secs` early.
pub fn has_expiry_passed_at(expires_at_ms: i64, offset_secs: u64, now: DateTime<Utc>) -> bool {
    (now + offset(offset_secs)).timestamp_millis() >= expires_at_ms
}

/// Offsets are clamped so that `now + offset` cannot overflow.
const MAX_OFFSET_SECS: u64 = 10 * 365 * 24 * 60 * 60;

fn offset(secs: u64) -> Duration {
    Duration::seconds(secs.min(MAX_OFFSET_SECS) as i64)
}
