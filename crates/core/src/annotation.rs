//! Annotation payload checks.
//!
//! The clinical form schema is owned by the client; the server only checks
//! the envelope before it consumes a video slot.

use crate::error::CoreError;

/// Maximum serialized size of an annotation payload.
pub const MAX_PAYLOAD_BYTES: usize = 64 * 1024;

/// Maximum length of a client identifier recorded with an annotation.
pub const MAX_CLIENT_ID_LENGTH: usize = 128;

/// Validate an annotation payload: a non-empty JSON object within
/// [`MAX_PAYLOAD_BYTES`].
pub fn validate_payload(payload: &serde_json::Value) -> Result<(), CoreError> {
    let fields = payload.as_object().ok_or_else(|| {
        CoreError::Validation("Annotation payload must be a JSON object".to_string())
    })?;

    if fields.is_empty() {
        return Err(CoreError::Validation(
            "Annotation payload must not be empty".to_string(),
        ));
    }

    let size = serde_json::to_vec(payload)
        .map_err(|e| CoreError::Internal(format!("Failed to serialize payload: {e}")))?
        .len();
    if size > MAX_PAYLOAD_BYTES {
        return Err(CoreError::Validation(format!(
            "Annotation payload is {size} bytes, maximum is {MAX_PAYLOAD_BYTES}"
        )));
    }

    Ok(())
}

/// Validate a client identifier taken from a request header.
pub fn validate_client_id(client_id: &str) -> Result<(), CoreError> {
    if client_id.trim().is_empty() {
        return Err(CoreError::Validation("Client id must not be blank".to_string()));
    }
    if client_id.len() > MAX_CLIENT_ID_LENGTH {
        return Err(CoreError::Validation(format!(
            "Client id exceeds {MAX_CLIENT_ID_LENGTH} characters"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn object_payload_is_valid() {
        assert!(validate_payload(&json!({"diagnosis": "normal", "confidence": 4})).is_ok());
    }

    #[test]
    fn non_object_payload_is_rejected() {
        for payload in [json!([1, 2]), json!("text"), json!(null), json!(3)] {
            assert!(matches!(
                validate_payload(&payload),
                Err(CoreError::Validation(_))
            ));
        }
    }

    #[test]
    fn empty_object_is_rejected() {
        assert!(matches!(
            validate_payload(&json!({})),
            Err(CoreError::Validation(_))
        ));
    }

    #[test]
    fn oversized_payload_is_rejected() {
        let big = "x".repeat(MAX_PAYLOAD_BYTES);
        assert!(matches!(
            validate_payload(&json!({ "notes": big })),
            Err(CoreError::Validation(_))
        ));
    }

    #[test]
    fn blank_client_id_is_rejected() {
        assert!(validate_client_id("   ").is_err());
        assert!(validate_client_id("reviewer-7").is_ok());
    }

    #[test]
    fn long_client_id_is_rejected() {
        assert!(validate_client_id(&"a".repeat(MAX_CLIENT_ID_LENGTH + 1)).is_err());
        assert!(validate_client_id(&"a".repeat(MAX_CLIENT_ID_LENGTH)).is_ok());
    }
}
