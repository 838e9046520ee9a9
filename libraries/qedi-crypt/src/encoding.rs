use base64::{Engine as _, engine::general_purpose::STANDARD};
use thiserror::Error;

#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("invalid base64")]
pub struct InvalidBase64;

pub fn encode_base64(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

pub fn decode_base64(input: &str) -> Result<Vec<u8>, InvalidBase64> {
    STANDARD
        .decode(input.trim().as_bytes())
        .map_err(|_| InvalidBase64)
}
