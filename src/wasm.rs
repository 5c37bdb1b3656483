//! WASM bindings for the browser extension.

use wasm_bindgen::prelude::*;

use crate::credential_matcher::{EntryFinder, FinderInput, FuzzySearchOutput};
use crate::search::{find_text, TextSearchInput};

/// Initialize panic hook for better error messages.
#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
}

#[wasm_bindgen(js_name = getCoreVersion)]
pub fn get_core_version_js() -> String {
    crate::get_core_version().to_string()
}

// ═══════════════════════════════════════════════════════════════════════════════
// Credential Matcher WASM Bindings
// ═══════════════════════════════════════════════════════════════════════════════

/// Find entries for AutoFill.
///
/// Takes a JsValue (FinderInput) and returns a JsValue (FuzzySearchOutput).
#[wasm_bindgen(js_name = findEntries)]
pub fn find_entries_js(input: JsValue) -> Result<JsValue, JsValue> {
    let input: FinderInput = serde_wasm_bindgen::from_value(input)
        .map_err(|e| JsValue::from_str(&format!("Failed to parse input: {}", e)))?;
    input
        .database
        .validate()
        .map_err(|e| JsValue::from_str(&e.to_string()))?;

    let output: FuzzySearchOutput = EntryFinder::new()
        .find(
            &input.database,
            &input.service_identifiers,
            input.relying_party.as_deref(),
        )
        .to_output();

    serde_wasm_bindgen::to_value(&output)
        .map_err(|e| JsValue::from_str(&format!("Failed to serialize output: {}", e)))
}

/// Find entries using JSON strings (alternative API).
#[wasm_bindgen(js_name = findEntriesJson)]
pub fn find_entries_json_js(input_json: &str) -> Result<String, JsValue> {
    crate::credential_matcher::find_json(input_json)
        .map_err(|e| JsValue::from_str(&format!("Find entries failed: {}", e)))
}

// ═══════════════════════════════════════════════════════════════════════════════
// Text Search WASM Bindings
// ═══════════════════════════════════════════════════════════════════════════════

/// Plain-text search.
///
/// Takes a JsValue (TextSearchInput) and returns an array of grouped entries.
#[wasm_bindgen(js_name = findText)]
pub fn find_text_js(input: JsValue) -> Result<JsValue, JsValue> {
    let input: TextSearchInput = serde_wasm_bindgen::from_value(input)
        .map_err(|e| JsValue::from_str(&format!("Failed to parse input: {}", e)))?;
    input
        .database
        .validate()
        .map_err(|e| JsValue::from_str(&e.to_string()))?;

    let results = find_text(&input.database, &input.text, &input.options);
    let output = crate::credential_matcher::to_grouped_output(&results);

    serde_wasm_bindgen::to_value(&output)
        .map_err(|e| JsValue::from_str(&format!("Failed to serialize output: {}", e)))
}

// ═══════════════════════════════════════════════════════════════════════════════
// OTP and KDF WASM Bindings
// ═══════════════════════════════════════════════════════════════════════════════

/// Generate a one-time code from JSON-encoded entry fields.
#[wasm_bindgen(js_name = generateTotpJson)]
pub fn generate_totp_json_js(input_json: &str) -> Result<String, JsValue> {
    crate::otp::generate_totp_json(input_json)
        .map_err(|e| JsValue::from_str(&format!("TOTP failed: {}", e)))
}

/// Build an `otpauth://` URI for a new OTP setup.
#[wasm_bindgen(js_name = makeOtpauthUri)]
pub fn make_otpauth_uri_js(base32_seed: &str, issuer: Option<String>, account_name: Option<String>) -> String {
    crate::otp::make_otpauth_uri(base32_seed, issuer.as_deref(), account_name.as_deref())
}

/// Derive an Argon2 key; returns uppercase hex.
#[wasm_bindgen(js_name = deriveKeyJson)]
pub fn derive_key_json_js(input_json: &str) -> Result<String, JsValue> {
    crate::kdf::derive_key_json(input_json)
        .map_err(|e| JsValue::from_str(&format!("Key derivation failed: {}", e)))
}
