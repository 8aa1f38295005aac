//! Shared helpers and constants.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, SecondsFormat, Utc};
use rand::RngCore;

pub const APP_NAME: &str = "perch_backend";

/// Current time as microseconds since the Unix epoch. Every row timestamp
/// is stored in this form so keyset comparisons stay numeric.
pub fn now_micros() -> i64 {
    Utc::now().timestamp_micros()
}

/// Renders a stored microsecond timestamp as RFC 3339 for API views.
pub fn micros_to_rfc3339(micros: i64) -> String {
    DateTime::<Utc>::from_timestamp_micros(micros)
        .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
        .to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Mints an opaque session token. Only the BLAKE3 hash is persisted.
pub fn new_session_token() -> String {
    let mut bytes = [0u8; 32];
    rand::rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

pub fn token_hash(token: &str) -> String {
    blake3::hash(token.as_bytes()).to_hex().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn micros_render_as_rfc3339() {
        assert_eq!(
            micros_to_rfc3339(1_700_000_000_000_000),
            "2023-11-14T22:13:20.000000Z"
        );
    }

    #[test]
    fn session_tokens_are_unique_and_hash_stable() {
        let first = new_session_token();
        let second = new_session_token();
        assert_ne!(first, second);
        assert_eq!(token_hash(&first), token_hash(&first));
        assert_ne!(token_hash(&first), token_hash(&second));
    }
}
