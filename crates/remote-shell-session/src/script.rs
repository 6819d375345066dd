//! Script payload encoding for the remote script host.

use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use thiserror::Error;

/// Script payload decode error.
#[derive(Debug, Error)]
pub enum ScriptDecodeError {
    #[error("Invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("Payload length {0} is not a whole number of UTF-16 units")]
    OddLength(usize),
    #[error("Invalid UTF-16 payload: {0}")]
    Utf16(#[from] std::string::FromUtf16Error),
}

/// Encode a script as base64 of its UTF-16LE bytes.
///
/// This is the only form the script host accepts for scripts containing
/// characters the shell would otherwise re-quote.
#[must_use]
pub fn encode_script(script: &str) -> String {
    let bytes: Vec<u8> = script.encode_utf16().flat_map(u16::to_le_bytes).collect();
    BASE64.encode(bytes)
}

/// Decode a payload produced by `encode_script`.
///
/// # Errors
/// Returns error if the payload is not base64 of valid UTF-16LE.
pub fn decode_script(encoded: &str) -> Result<String, ScriptDecodeError> {
    let bytes = BASE64.decode(encoded)?;
    if bytes.len() % 2 != 0 {
        return Err(ScriptDecodeError::OddLength(bytes.len()));
    }
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
        .collect();
    Ok(String::from_utf16(&units)?)
}
