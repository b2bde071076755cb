use crate::{
    authentication::cookie::{BLOCK_KEY_LEN, HASH_KEY_LEN},
    utils::random_bytes,
};
use anyhow::Result;
use base64ct::{Base64, Encoding};

/// Fresh base64 cookie keys as `(hash key, block key)`.
///
/// # Errors
/// Returns an error if the OS random source is unavailable.
pub fn generate() -> Result<(String, String)> {
    Ok((
        Base64::encode_string(&random_bytes(HASH_KEY_LEN)?),
        Base64::encode_string(&random_bytes(BLOCK_KEY_LEN)?),
    ))
}

/// Print keys in environment form, ready for `AUTHSVC_HASH_KEY`/`AUTHSVC_BLOCK_KEY`.
///
/// # Errors
/// Returns an error if the OS random source is unavailable.
pub fn execute() -> Result<()> {
    let (hash_key, block_key) = generate()?;
    println!("AUTHSVC_HASH_KEY={hash_key}");
    println!("AUTHSVC_BLOCK_KEY={block_key}");
    Ok(())
}
