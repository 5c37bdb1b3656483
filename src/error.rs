//! Error types for the credential finder core library.

use thiserror::Error;

use crate::database::{EntryId, GroupId};

/// Errors that can occur outside the matching engine.
///
/// Matching itself is total: malformed URLs and unknown hosts simply score
/// zero. Errors come from building a database snapshot, parsing JSON input,
/// reading OTP configuration, deriving keys and running ciphers.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "uniffi", derive(uniffi::Error))]
#[cfg_attr(feature = "uniffi", uniffi(flat_error))]
pub enum FinderError {
    /// Error serializing/deserializing JSON
    #[error("JSON error: {0}")]
    JsonError(String),

    /// An entry or group points at a parent group that does not exist
    #[error("Unknown group {0:?}")]
    UnknownGroup(GroupId),

    /// Group ids must match their position in the group list
    #[error("Group at index {index} has id {id:?}")]
    MisplacedGroup { index: usize, id: GroupId },

    /// Entry ids must match their position in the entry list
    #[error("Entry at index {index} has id {id:?}")]
    MisplacedEntry { index: usize, id: EntryId },

    /// OTP configuration is missing or malformed
    #[error("OTP error: {0}")]
    Otp(String),

    /// Key derivation failed
    #[error("KDF error: {0}")]
    Kdf(String),

    /// Bad key or IV length, or ciphertext that does not decrypt
    #[error("Crypto error: {0}")]
    Crypto(String),
}

impl From<serde_json::Error> for FinderError {
    fn from(err: serde_json::Error) -> Self {
        FinderError::JsonError(err.to_string())
    }
}

/// Result type alias for fallible operations.
pub type FinderResult<T> = Result<T, FinderError>;
