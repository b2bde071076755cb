//! Random identifiers and small form helpers shared by the handlers.

use rand::{rngs::OsRng, RngCore};
use std::collections::BTreeMap;
use url::form_urlencoded;

const TOKEN_BYTES: usize = 16;

#[derive(Debug, thiserror::Error)]
#[error("failed to generate random token: {0}")]
pub struct RandomError(#[from] rand::Error);

/// Create a 128-bit random identifier from the OS CSPRNG, hex encoded.
///
/// Used for correlation ids, authorization codes and bearer tokens.
///
/// # Errors
/// Returns an error if the OS random source is unavailable.
pub fn generate_token() -> Result<String, RandomError> {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng.try_fill_bytes(&mut bytes)?;
    Ok(hex::encode(bytes))
}

/// Fill `len` random bytes, used for generated cookie keys.
///
/// # Errors
/// Returns an error if the OS random source is unavailable.
pub fn random_bytes(len: usize) -> Result<Vec<u8>, RandomError> {
    let mut bytes = vec![0u8; len];
    OsRng.try_fill_bytes(&mut bytes)?;
    Ok(bytes)
}

/// Decode a query string or url-encoded form body into its values per key.
#[must_use]
pub fn form_values(input: &str) -> BTreeMap<String, Vec<String>> {
    let mut values: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (key, value) in form_urlencoded::parse(input.as_bytes()) {
        values
            .entry(key.into_owned())
            .or_default()
            .push(value.into_owned());
    }
    values
}

/// Minimal escaping for values interpolated into the HTML forms.
#[must_use]
pub fn escape_html(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
