//! Shared API helper functions.

use crate::error::ApiError;
use ztna_crypto::{decode_base64, PUBLIC_KEY_SIZE};

/// Parse a hex string into a 32-byte array
pub fn parse_hex_32(hex_str: &str) -> Result<[u8; PUBLIC_KEY_SIZE], ApiError> {
    let bytes = hex::decode(hex_str.trim())
        .map_err(|_| ApiError::InvalidRequest("Invalid hex encoding".to_string()))?;
    bytes
        .try_into()
        .map_err(|_| ApiError::InvalidRequest("Expected 32 bytes".to_string()))
}

/// Decode a base64 signature
pub fn parse_signature(encoded: &str) -> Result<Vec<u8>, ApiError> {
    decode_base64(encoded.trim())
        .map_err(|_| ApiError::InvalidRequest("Invalid base64 signature".to_string()))
}

/// Format a unix timestamp (seconds) as RFC3339.
pub fn format_timestamp_rfc3339(timestamp: u64) -> Result<String, ApiError> {
    Ok(chrono::DateTime::from_timestamp(timestamp as i64, 0)
        .ok_or_else(|| ApiError::Internal(anyhow::anyhow!("Invalid timestamp")))?
        .to_rfc3339())
}
