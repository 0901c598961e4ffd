use brain_core::error::{BrainError, ErrorContext, Result};
use brain_core::session::SessionState;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// Canonical JSON of `state` with the `signature` field omitted.
///
/// `serde_json::Value`'s object type is a `BTreeMap` under this workspace's
/// default (non-`preserve_order`) feature set, so keys come out
/// lexicographically sorted at every nesting level for free; `to_string`
/// never inserts insignificant whitespace.
pub fn canonical_json(state: &SessionState) -> Result<String> {
    let mut value = serde_json::to_value(state).map_err(|e| BrainError::Protocol {
        message: format!("failed to serialize session state: {e}"),
        context: ErrorContext::new().with_session_id(state.session_id.clone()),
    })?;
    if let serde_json::Value::Object(map) = &mut value {
        map.remove("signature");
    }
    serde_json::to_string(&value).map_err(|e| BrainError::Protocol {
        message: format!("failed to render canonical json: {e}"),
        context: ErrorContext::new().with_session_id(state.session_id.clone()),
    })
}

/// HMAC-SHA256 over `canonical_json(state)`, hex-encoded.
pub fn sign(secret: &[u8], state: &SessionState) -> Result<String> {
    let payload = canonical_json(state)?;
    let mut mac = HmacSha256::new_from_slice(secret).map_err(|e| BrainError::Config {
        message: format!("invalid HMAC key: {e}"),
    })?;
    mac.update(payload.as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Recomputes the expected signature and compares it constant-time against
/// `state.signature`.
pub fn verify(secret: &[u8], state: &SessionState) -> Result<bool> {
    let expected = sign(secret, state)?;
    let expected_bytes = expected.as_bytes();
    let actual_bytes = state.signature.as_bytes();
    if expected_bytes.len() != actual_bytes.len() {
        return Ok(false);
    }
    Ok(bool::from(expected_bytes.ct_eq(actual_bytes)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn sample() -> SessionState {
        SessionState::new("s1", Some("topic".to_string()), Utc::now())
    }

    #[test]
    fn sign_then_verify_round_trips() {
        let mut state = sample();
        state.signature = sign(b"secret", &state).unwrap();
        assert!(verify(b"secret", &state).unwrap());
    }

    #[test]
    fn tampered_payload_fails_verification() {
        let mut state = sample();
        state.signature = sign(b"secret", &state).unwrap();
        state.active_task = Some("tampered".to_string());
        assert!(!verify(b"secret", &state).unwrap());
    }

    #[test]
    fn canonical_json_is_deterministic_and_reparseable() {
        let state = sample();
        let first = canonical_json(&state).unwrap();
        let second = canonical_json(&state).unwrap();
        assert_eq!(first, second);
        let reparsed: serde_json::Value = serde_json::from_str(&first).unwrap();
        let recanon = serde_json::to_string(&reparsed).unwrap();
        assert_eq!(first, recanon);
        assert!(!first.contains(' '));
    }

    #[test]
    fn different_secrets_produce_different_signatures() {
        let state = sample();
        assert_ne!(sign(b"a", &state).unwrap(), sign(b"b", &state).unwrap());
    }
}
