//! C FFI exports for .NET P/Invoke.
//!
//! Swift and Kotlin hosts use the UniFFI bindings instead.
//!
//! Every function takes and returns JSON strings so hosts only marshal
//! `char*`. Strings returned by this module must be released with
//! [`free_string`].

use std::ffi::{c_char, CStr, CString};
use std::ptr;

use crate::error::FinderResult;

/// Find entries matching AutoFill service identifiers or a passkey relying party.
///
/// # Safety
///
/// - `input_json` must be a valid null-terminated C string (a `FinderInput`)
/// - The returned pointer must be freed by calling `free_string`
///
/// # Returns
///
/// A null-terminated C string containing the JSON result (`FuzzySearchOutput`),
/// or an error object. Returns null when the input is null or not UTF-8.
#[no_mangle]
pub unsafe extern "C" fn find_entries_ffi(input_json: *const c_char) -> *mut c_char {
    call_json(input_json, "Find entries", crate::credential_matcher::find_json)
}

/// Plain-text search over a database.
///
/// # Safety
///
/// - `input_json` must be a valid null-terminated C string (a `TextSearchInput`)
/// - The returned pointer must be freed by calling `free_string`
#[no_mangle]
pub unsafe extern "C" fn find_text_ffi(input_json: *const c_char) -> *mut c_char {
    call_json(input_json, "Text search", crate::search::find_text_json)
}

/// Generate the current one-time code for an entry's fields.
///
/// # Safety
///
/// - `input_json` must be a valid null-terminated C string (a `TotpInput`)
/// - The returned pointer must be freed by calling `free_string`
#[no_mangle]
pub unsafe extern "C" fn generate_totp_ffi(input_json: *const c_char) -> *mut c_char {
    call_json(input_json, "TOTP", crate::otp::generate_totp_json)
}

/// Derive an Argon2 key; the result is a JSON string holding uppercase hex.
///
/// # Safety
///
/// - `input_json` must be a valid null-terminated C string (a `DeriveKeyInput`)
/// - The returned pointer must be freed by calling `free_string`
#[no_mangle]
pub unsafe extern "C" fn derive_key_ffi(input_json: *const c_char) -> *mut c_char {
    call_json(input_json, "Key derivation", |input| {
        let key = crate::kdf::derive_key_json(input)?;
        Ok(serde_json::to_string(&key)?)
    })
}

/// Get the library version.
///
/// # Safety
///
/// - The returned pointer must be freed by calling `free_string`
#[no_mangle]
pub extern "C" fn get_core_version_ffi() -> *mut c_char {
    string_to_c_char(crate::get_core_version().to_string())
}

/// Free a string that was allocated by Rust.
///
/// # Safety
///
/// - `s` must be a pointer that was returned by one of the FFI functions
/// - This function must only be called once per pointer
/// - After calling this function, the pointer is invalid
#[no_mangle]
pub unsafe extern "C" fn free_string(s: *mut c_char) {
    if !s.is_null() {
        drop(CString::from_raw(s));
    }
}

/// Decode the C input, run `f` and encode its result or error.
unsafe fn call_json(
    input_json: *const c_char,
    operation: &str,
    f: impl FnOnce(&str) -> FinderResult<String>,
) -> *mut c_char {
    if input_json.is_null() {
        return ptr::null_mut();
    }

    let c_str = match CStr::from_ptr(input_json).to_str() {
        Ok(s) => s,
        Err(_) => return ptr::null_mut(),
    };

    match f(c_str) {
        Ok(json) => string_to_c_char(json),
        Err(e) => {
            tracing::warn!(operation, error = %e, "FFI call failed");
            create_error_response(&format!("{} failed: {}", operation, e))
        }
    }
}

/// Convert a Rust string to a C string pointer.
fn string_to_c_char(s: String) -> *mut c_char {
    match CString::new(s) {
        Ok(c_string) => c_string.into_raw(),
        Err(_) => ptr::null_mut(),
    }
}

/// Create an error response JSON string.
fn create_error_response(message: &str) -> *mut c_char {
    let error_json = serde_json::json!({ "success": false, "error": message });
    string_to_c_char(error_json.to_string())
}
