use chrono::{DateTime, SecondsFormat, Utc};
use hmac::{Hmac, Mac};
use sha1::Sha1;

type HmacSha1 = Hmac<Sha1>;

/// Authentication header attached to every outbound call.
#[derive(Debug, Clone)]
pub struct AuthHeader {
    pub user_id: String,
    pub request_timestamp: String,
    pub request_signature: String,
}

/// Builds the keyed-hash auth header the vendor requires on each request.
///
/// Signatures expire within a short window, so a fresh one is computed
/// immediately before every transmission and never cached across calls.
#[derive(Debug, Clone)]
pub struct RequestSigner {
    user_id: String,
    encryption_key: String,
}

impl RequestSigner {
    pub fn new(user_id: impl Into<String>, encryption_key: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            encryption_key: encryption_key.into(),
        }
    }

    pub fn sign(&self, now: DateTime<Utc>) -> AuthHeader {
        let timestamp = now.to_rfc3339_opts(SecondsFormat::Secs, true);
        self.sign_with_timestamp(&timestamp)
    }

    fn sign_with_timestamp(&self, timestamp: &str) -> AuthHeader {
        let encryption_string = format!("{timestamp}{}", self.user_id);
        AuthHeader {
            user_id: self.user_id.clone(),
            request_timestamp: timestamp.to_string(),
            request_signature: hmac_sha1_hex(&self.encryption_key, &encryption_string),
        }
    }
}

fn hmac_sha1_hex(key: &str, data: &str) -> String {
    // HMAC accepts keys of any length; new_from_slice cannot fail for SHA-1.
    let mut mac =
        HmacSha1::new_from_slice(key.as_bytes()).expect("hmac-sha1 accepts any key length");
    mac.update(data.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/* ---------------- Tests ---------------- */
