//! Authenticated-encrypted session cookie.
//!
//! Wire format: `base64url(timestamp|payload|mac)` where `payload` is
//! `base64url(nonce || AES-256-GCM(block key, {"username": ...}))` and `mac`
//! is `HMAC-SHA256(hash key, name|timestamp|payload)`. The MAC is checked
//! before anything is decrypted.

use crate::utils::{random_bytes, RandomError};
use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use axum::http::{
    header::{InvalidHeaderValue, COOKIE},
    HeaderMap, HeaderValue,
};
use base64ct::{Base64UrlUnpadded, Encoding};
use chrono::Utc;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use thiserror::Error;

pub const COOKIE_NAME: &str = "authsvc-login-cookie";
pub const HASH_KEY_LEN: usize = 64;
pub const BLOCK_KEY_LEN: usize = 32;
const NONCE_LEN: usize = 12;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Error)]
pub enum CookieError {
    #[error("malformed cookie")]
    Malformed,
    #[error("invalid cookie signature")]
    InvalidMac,
    #[error("cookie expired")]
    Expired,
    #[error("invalid key: {0}")]
    InvalidKey(String),
    #[error("cookie encryption failed")]
    Crypto,
    #[error("invalid cookie payload: {0}")]
    Payload(#[from] serde_json::Error),
    #[error(transparent)]
    Random(#[from] RandomError),
}

#[derive(Serialize, Deserialize)]
struct SessionPayload {
    username: String,
}

/// Encodes and decodes the login cookie. Changing either key invalidates
/// every outstanding session.
#[derive(Clone)]
pub struct CookieCodec {
    name: String,
    hash_key: Vec<u8>,
    cipher: Aes256Gcm,
    max_age_seconds: i64,
}

impl CookieCodec {
    /// # Errors
    /// Returns an error if the hash key is empty or the block key is not 32 bytes.
    pub fn new(hash_key: &[u8], block_key: &[u8], max_age_seconds: i64) -> Result<Self, CookieError> {
        if hash_key.is_empty() {
            return Err(CookieError::InvalidKey("hash key is empty".to_string()));
        }
        let cipher = Aes256Gcm::new_from_slice(block_key).map_err(|_| {
            CookieError::InvalidKey(format!(
                "block key must be {BLOCK_KEY_LEN} bytes, got {}",
                block_key.len()
            ))
        })?;
        Ok(Self {
            name: COOKIE_NAME.to_string(),
            hash_key: hash_key.to_vec(),
            cipher,
            max_age_seconds,
        })
    }

    /// Codec with fresh random keys; sessions do not survive a restart.
    ///
    /// # Errors
    /// Returns an error if the OS random source is unavailable.
    pub fn generate(max_age_seconds: i64) -> Result<Self, CookieError> {
        Self::new(
            &random_bytes(HASH_KEY_LEN)?,
            &random_bytes(BLOCK_KEY_LEN)?,
            max_age_seconds,
        )
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn max_age_seconds(&self) -> i64 {
        self.max_age_seconds
    }

    /// # Errors
    /// Returns an error if encryption fails.
    pub fn encode(&self, username: &str) -> Result<String, CookieError> {
        self.encode_at(username, Utc::now().timestamp())
    }

    fn encode_at(&self, username: &str, timestamp: i64) -> Result<String, CookieError> {
        let plaintext = serde_json::to_vec(&SessionPayload {
            username: username.to_string(),
        })?;
        let nonce = random_bytes(NONCE_LEN)?;
        let ciphertext = self
            .cipher
            .encrypt(Nonce::from_slice(&nonce), plaintext.as_ref())
            .map_err(|_| CookieError::Crypto)?;
        let mut sealed = nonce;
        sealed.extend_from_slice(&ciphertext);
        let payload = Base64UrlUnpadded::encode_string(&sealed);
        let timestamp = timestamp.to_string();

        let mut value = format!("{timestamp}|{payload}|").into_bytes();
        value.extend_from_slice(&self.mac(&timestamp, &payload)?);
        Ok(Base64UrlUnpadded::encode_string(&value))
    }

    /// Verify and decrypt a cookie value into the username it carries.
    ///
    /// # Errors
    /// `Malformed`, `InvalidMac`, `Expired` or a decryption failure.
    pub fn decode(&self, value: &str) -> Result<String, CookieError> {
        self.decode_at(value, Utc::now().timestamp())
    }

    fn decode_at(&self, value: &str, now: i64) -> Result<String, CookieError> {
        let raw = Base64UrlUnpadded::decode_vec(value).map_err(|_| CookieError::Malformed)?;
        let mut parts = raw.splitn(3, |b| *b == b'|');
        let (Some(timestamp), Some(payload), Some(mac)) = (parts.next(), parts.next(), parts.next())
        else {
            return Err(CookieError::Malformed);
        };
        let timestamp = std::str::from_utf8(timestamp).map_err(|_| CookieError::Malformed)?;
        let payload = std::str::from_utf8(payload).map_err(|_| CookieError::Malformed)?;

        let mut expected = self.hmac()?;
        expected.update(format!("{}|{timestamp}|{payload}", self.name).as_bytes());
        expected
            .verify_slice(mac)
            .map_err(|_| CookieError::InvalidMac)?;

        let issued_at: i64 = timestamp.parse().map_err(|_| CookieError::Malformed)?;
        if now - issued_at > self.max_age_seconds {
            return Err(CookieError::Expired);
        }

        let sealed = Base64UrlUnpadded::decode_vec(payload).map_err(|_| CookieError::Malformed)?;
        if sealed.len() <= NONCE_LEN {
            return Err(CookieError::Malformed);
        }
        let (nonce, ciphertext) = sealed.split_at(NONCE_LEN);
        let plaintext = self
            .cipher
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|_| CookieError::Crypto)?;
        let session: SessionPayload = serde_json::from_slice(&plaintext)?;
        Ok(session.username)
    }

    fn hmac(&self) -> Result<HmacSha256, CookieError> {
        <HmacSha256 as Mac>::new_from_slice(&self.hash_key)
            .map_err(|err| CookieError::InvalidKey(err.to_string()))
    }

    fn mac(&self, timestamp: &str, payload: &str) -> Result<Vec<u8>, CookieError> {
        let mut mac = self.hmac()?;
        mac.update(format!("{}|{timestamp}|{payload}", self.name).as_bytes());
        Ok(mac.finalize().into_bytes().to_vec())
    }

    /// `Set-Cookie` value carrying a fresh session for `username`.
    ///
    /// # Errors
    /// Returns an error if encoding fails or the header is invalid.
    pub fn session_cookie(&self, username: &str, secure: bool) -> Result<HeaderValue, CookieError> {
        let value = self.encode(username)?;
        let mut cookie = format!(
            "{}={value}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
            self.name, self.max_age_seconds
        );
        if secure {
            cookie.push_str("; Secure");
        }
        HeaderValue::from_str(&cookie).map_err(|_| CookieError::Malformed)
    }

    /// `Set-Cookie` value that removes the session.
    ///
    /// # Errors
    /// Returns an error if the header is invalid.
    pub fn clear_cookie(&self, secure: bool) -> Result<HeaderValue, InvalidHeaderValue> {
        let mut cookie = format!("{}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0", self.name);
        if secure {
            cookie.push_str("; Secure");
        }
        HeaderValue::from_str(&cookie)
    }

    /// Raw cookie value from the request `Cookie` headers, if present.
    #[must_use]
    pub fn extract(&self, headers: &HeaderMap) -> Option<String> {
        extract_cookie(headers, &self.name)
    }
}

pub(crate) fn extract_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|header| header.to_str().ok())
        .flat_map(|value| value.split(';'))
        .find_map(|pair| {
            let (key, value) = pair.trim().split_once('=')?;
            (key.trim() == name).then(|| value.trim().to_string())
        })
}
