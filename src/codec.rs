use base64::{
    engine::general_purpose,
    Engine as _,
};

use crate::error::SaslError;

/// Line sent in place of a present but zero-length response.
pub const EMPTY_RESPONSE: &[u8] = b"=";

/// Base64-encodes a SASL payload for the wire.
///
/// The encoded bytes are sent as-is, never as a literal or quoted string,
/// and no line breaks are inserted however long the payload is.
pub fn encode(data: &[u8]) -> Vec<u8> {
    general_purpose::STANDARD.encode(data).into_bytes()
}

/// Decodes the payload of a continuation line.
///
/// An empty payload decodes to an empty challenge. Surrounding whitespace is
/// ignored; anything else that is not valid base64 is a protocol violation.
pub fn decode(data: &str) -> Result<Vec<u8>, SaslError> {
    let data = data.trim();
    if data.is_empty() || data.as_bytes() == EMPTY_RESPONSE {
        return Ok(Vec::new());
    }
    general_purpose::STANDARD
        .decode(data)
        .map_err(|e| SaslError::ProtocolViolation(format!("invalid base64 challenge: {}", e)))
}
