//! Key material, digests and signature encodings for talking to the Sui ledger.

mod encoding;
pub mod hash;
pub mod signing;

pub use encoding::{InvalidBase64, decode_base64, encode_base64};

/// `Debug` formatter for fields that must never reach a log line.
pub fn redacted_debug<T>(_value: &T, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    formatter.write_str("REDACTED")
}
