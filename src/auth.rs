//! Bybit V5 REST request signing.
//!
//! Private and rate-limited endpoints accept an HMAC-SHA256 signature over
//! `timestamp + api_key + recv_window + query_string`, sent hex-encoded in
//! the `X-BAPI-SIGN` header alongside the key, timestamp and receive window.
//! See <https://bybit-exchange.github.io/docs/v5/guide#authentication>.

use std::time::{SystemTime, UNIX_EPOCH};

use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::Result;
use crate::models::Credentials;

pub const HEADER_API_KEY: &str = "X-BAPI-API-KEY";
pub const HEADER_TIMESTAMP: &str = "X-BAPI-TIMESTAMP";
pub const HEADER_RECV_WINDOW: &str = "X-BAPI-RECV-WINDOW";
pub const HEADER_SIGN: &str = "X-BAPI-SIGN";
pub const HEADER_SIGN_TYPE: &str = "X-BAPI-SIGN-TYPE";

/// `2` selects HMAC-SHA256.
pub const SIGN_TYPE_HMAC: &str = "2";

/// Headers to attach to one signed request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedHeaders {
    pub api_key: String,
    pub timestamp: String,
    pub recv_window: String,
    pub signature: String,
}

impl SignedHeaders {
    /// Name/value pairs in the order Bybit documents them.
    pub fn pairs(&self) -> [(&'static str, &str); 5] {
        [
            (HEADER_API_KEY, self.api_key.as_str()),
            (HEADER_TIMESTAMP, self.timestamp.as_str()),
            (HEADER_RECV_WINDOW, self.recv_window.as_str()),
            (HEADER_SIGN, self.signature.as_str()),
            (HEADER_SIGN_TYPE, SIGN_TYPE_HMAC),
        ]
    }
}

/// Signs a GET request whose query string is `query` at the current time.
///
/// # Errors
///
/// Returns [`GridError::MalformedMessage`](crate::GridError::MalformedMessage)
/// if the HMAC cannot be keyed with the secret.
pub fn sign_request(
    credentials: &Credentials,
    recv_window_ms: u64,
    query: &str,
) -> Result<SignedHeaders> {
    sign_request_at(credentials, timestamp_ms(), recv_window_ms, query)
}

fn sign_request_at(
    credentials: &Credentials,
    timestamp_ms: u64,
    recv_window_ms: u64,
    query: &str,
) -> Result<SignedHeaders> {
    let payload = format!(
        "{timestamp_ms}{}{recv_window_ms}{query}",
        credentials.api_key
    );
    let signature = hmac_sha256_hex(credentials.api_secret.as_str(), &payload)?;

    Ok(SignedHeaders {
        api_key: credentials.api_key.clone(),
        timestamp: timestamp_ms.to_string(),
        recv_window: recv_window_ms.to_string(),
        signature,
    })
}

/// Lowercase hex of HMAC-SHA256(`secret`, `message`).
fn hmac_sha256_hex(secret: &str, message: &str) -> Result<String> {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
        .map_err(|e| crate::GridError::MalformedMessage(format!("invalid HMAC key: {e}")))?;
    mac.update(message.as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Milliseconds since the UNIX epoch; 0 if the clock is before it.
fn timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}
