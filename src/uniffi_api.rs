//! UniFFI API module for Swift and Kotlin bindings.
//!
//! All functions use JSON strings for input/output, the same shapes the
//! C FFI and WASM surfaces accept.

use crate::error::FinderError;

/// Get the version of the credential-finder-core library.
#[uniffi::export]
pub fn get_core_version() -> String {
    crate::get_core_version().to_string()
}

/// Find entries for an AutoFill request.
///
/// # Arguments
/// * `input_json` - JSON string with format:
///   ```json
///   {
///     "database": {"groups": [...], "entries": [...]},
///     "service_identifiers": [{"identifier": "https://github.com", "kind": "url"}],
///     "relying_party": null
///   }
///   ```
///
/// # Returns
/// JSON string with format:
///   ```json
///   {
///     "exact_match": [{"group_id": 0, "entries": [{"entry_id": 3, "score": 1.0}]}],
///     "partial_match": [],
///     "perfect_match": 3
///   }
///   ```
#[uniffi::export]
pub fn find_json(input_json: String) -> Result<String, FinderError> {
    crate::credential_matcher::find_json(&input_json)
}

/// Plain-text search as typed into the search bar.
///
/// Input is `{"database": ..., "text": "...", "options": {...}}`; the result
/// is a JSON array of grouped entries.
#[uniffi::export]
pub fn find_text_json(input_json: String) -> Result<String, FinderError> {
    crate::search::find_text_json(&input_json)
}

/// Current one-time code for an entry's fields.
#[uniffi::export]
pub fn generate_totp_json(input_json: String) -> Result<String, FinderError> {
    crate::otp::generate_totp_json(&input_json)
}

/// Build an `otpauth://` URI for a new OTP setup.
#[uniffi::export]
pub fn make_otpauth_uri(base32_seed: String, issuer: Option<String>, account_name: Option<String>) -> String {
    crate::otp::make_otpauth_uri(&base32_seed, issuer.as_deref(), account_name.as_deref())
}

/// Derive an Argon2 key.
///
/// # Returns
/// Derived key as uppercase hex string (64 characters = 32 bytes)
#[uniffi::export]
pub fn derive_key_json(input_json: String) -> Result<String, FinderError> {
    crate::kdf::derive_key_json(&input_json)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_json_passes_errors_through() {
        let err = find_json("not valid json".to_string()).unwrap_err();
        assert!(matches!(err, FinderError::JsonError(_)));
    }

    #[test]
    fn test_generate_totp_json() {
        let input = serde_json::json!({
            "fields": [{"name": "TOTP Seed", "value": "GEZDGNBVGY3TQOJQGEZDGNBVGY3TQOJQ"}],
            "unix_time": 59
        });
        let output: crate::otp::TotpOutput =
            serde_json::from_str(&generate_totp_json(input.to_string()).unwrap()).unwrap();
        assert_eq!(output.code.as_deref(), Some("287082"));
    }

    #[test]
    fn test_get_core_version() {
        assert_eq!(get_core_version(), env!("CARGO_PKG_VERSION"));
    }
}
