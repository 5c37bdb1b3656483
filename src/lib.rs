//! Credential Finder Core Library
//!
//! Platform-independent core of a password-manager AutoFill extension:
//! - **credential_matcher**: fuzzy matching of database entries against the
//!   domains/URLs an AutoFill request carries, or a passkey relying party
//! - **search**: plain-text search as typed into a search bar
//! - **otp**: TOTP/HOTP/Steam one-time codes read from entry fields
//! - **kdf**: Argon2 key derivation and the legacy AES-KDF
//! - **crypto**: the database ciphers (AES-256, ChaCha20, Twofish), the
//!   Salsa20 inner stream and block HMAC keys
//!
//! The host application hands over a [`Database`] snapshot (as Rust values or
//! JSON) and renders the grouped results; this library never performs I/O.
//!
//! # Example (conceptual)
//! ```ignore
//! let db = Database::new(groups, entries)?;
//! let results = EntryFinder::new().find(&db, &[ServiceIdentifier::url("https://github.com/login")], None);
//! if let Some(entry) = results.perfect_match() {
//!     autofill(entry);
//! }
//! ```

pub mod credential_matcher;
pub mod crypto;
pub mod database;
pub mod error;
pub mod kdf;
pub mod otp;
pub mod search;

pub use credential_matcher::{
    find_json, EntryFinder, FinderInput, FuzzySearchOutput, FuzzySearchResults, SearchMode,
    ServiceIdentifier, ServiceIdentifierKind,
};
pub use crypto::DataCipher;
pub use database::{Database, Entry, EntryField, EntryId, ExtendedEntry, Group, GroupId};
pub use error::{FinderError, FinderResult};
pub use kdf::{aes_kdf, derive_key, derive_key_json, generate_salt, Argon2Params, Argon2Variant};
pub use otp::{generate_totp_json, make_otpauth_uri, OtpAlgorithm, TotpGenerator};
pub use search::{find_text, find_text_json, TextSearchOptions};

/// Version of this library, exposed to hosts for diagnostics.
pub fn get_core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

// WASM bindings
#[cfg(feature = "wasm")]
pub mod wasm;

#[cfg(feature = "wasm")]
pub use wasm::*;

// C FFI exports for .NET P/Invoke
#[cfg(feature = "ffi")]
pub mod ffi;

// UniFFI bindings for Swift/Kotlin
#[cfg(feature = "uniffi")]
pub mod uniffi_api;

#[cfg(feature = "uniffi")]
pub use uniffi_api::*;

// UniFFI scaffolding - generates the FFI glue code
#[cfg(feature = "uniffi")]
uniffi::setup_scaffolding!();
