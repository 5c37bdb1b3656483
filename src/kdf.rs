//! Key derivation for database unlocking: Argon2 and the legacy AES-KDF.

use aes::cipher::generic_array::GenericArray;
use aes::cipher::{BlockEncrypt, KeyInit};
use aes::Aes256;
use argon2::{Algorithm, Argon2, Params, Version};
use data_encoding::{BASE64, HEXUPPER};
use rand::RngCore;
use serde::{Deserialize, Serialize};

use sha2::{Digest, Sha256};

use crate::error::{FinderError, FinderResult};

/// Length of derived keys and generated salts.
pub const KEY_LENGTH: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Argon2Variant {
    #[default]
    Argon2d,
    Argon2id,
}

impl From<Argon2Variant> for Algorithm {
    fn from(variant: Argon2Variant) -> Self {
        match variant {
            Argon2Variant::Argon2d => Algorithm::Argon2d,
            Argon2Variant::Argon2id => Algorithm::Argon2id,
        }
    }
}

/// Argon2 cost parameters as stored in a database header.
///
/// Missing fields take the defaults KeePass uses for new databases:
/// Argon2d, 64 MiB, 2 iterations, 2 lanes, version 0x13.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Argon2Params {
    pub variant: Argon2Variant,
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
    /// `0x10` or `0x13`
    pub version: u32,
}

impl Default for Argon2Params {
    fn default() -> Self {
        Self {
            variant: Argon2Variant::Argon2d,
            memory_kib: 64 * 1024,
            iterations: 2,
            parallelism: 2,
            version: 0x13,
        }
    }
}

impl Argon2Params {
    fn argon2_version(&self) -> FinderResult<Version> {
        match self.version {
            0x10 => Ok(Version::V0x10),
            0x13 => Ok(Version::V0x13),
            other => Err(FinderError::Kdf(format!("Unsupported Argon2 version: {:#x}", other))),
        }
    }
}

/// Derive a 32-byte key from `password` and `salt`.
pub fn derive_key(password: &[u8], salt: &[u8], params: &Argon2Params) -> FinderResult<[u8; KEY_LENGTH]> {
    let version = params.argon2_version()?;
    let argon2_params = Params::new(
        params.memory_kib,
        params.iterations,
        params.parallelism,
        Some(KEY_LENGTH),
    )
    .map_err(|e| FinderError::Kdf(format!("Invalid Argon2 params: {}", e)))?;

    let argon2 = Argon2::new(params.variant.into(), version, argon2_params);

    let mut output = [0u8; KEY_LENGTH];
    argon2
        .hash_password_into(password, salt, &mut output)
        .map_err(|e| FinderError::Kdf(format!("Argon2 hash failed: {}", e)))?;

    tracing::debug!(
        variant = ?params.variant,
        memory_kib = params.memory_kib,
        iterations = params.iterations,
        "Derived Argon2 key"
    );
    Ok(output)
}

/// Rounds KeePass uses for new AES-KDF databases.
pub const AES_KDF_DEFAULT_ROUNDS: u64 = 100_000;

/// AES-KDF: encrypt the composite key `rounds` times with AES-256-ECB keyed
/// by `seed`, then hash the result with SHA-256.
pub fn aes_kdf(composite_key: &[u8; KEY_LENGTH], seed: &[u8; KEY_LENGTH], rounds: u64) -> [u8; KEY_LENGTH] {
    let cipher = Aes256::new(GenericArray::from_slice(seed));
    let mut blocks = [
        GenericArray::clone_from_slice(&composite_key[..16]),
        GenericArray::clone_from_slice(&composite_key[16..]),
    ];
    for _ in 0..rounds {
        cipher.encrypt_blocks(&mut blocks);
    }
    tracing::debug!(rounds, "Derived AES-KDF key");
    Sha256::new()
        .chain_update(blocks[0])
        .chain_update(blocks[1])
        .finalize()
        .into()
}

/// A fresh random salt.
pub fn generate_salt() -> [u8; KEY_LENGTH] {
    let mut salt = [0u8; KEY_LENGTH];
    rand::thread_rng().fill_bytes(&mut salt);
    salt
}

/// Input for [`derive_key_json`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeriveKeyInput {
    pub password: String,
    /// Salt as standard base64
    pub salt: String,
    #[serde(default)]
    pub params: Argon2Params,
}

/// Derive a key from JSON input; the result is an uppercase hex string.
pub fn derive_key_json(input_json: &str) -> FinderResult<String> {
    let input: DeriveKeyInput = serde_json::from_str(input_json)?;
    let salt = BASE64
        .decode(input.salt.as_bytes())
        .map_err(|e| FinderError::Kdf(format!("Invalid salt: {}", e)))?;
    let key = derive_key(input.password.as_bytes(), &salt, &input.params)?;
    Ok(HEXUPPER.encode(&key))
}

#[cfg(test)]
mod tests {
    use super::*;
    use data_encoding::HEXLOWER;

    fn cheap_params(variant: Argon2Variant) -> Argon2Params {
        Argon2Params {
            variant,
            memory_kib: 64,
            iterations: 1,
            parallelism: 1,
            version: 0x13,
        }
    }

    #[test]
    fn test_defaults_from_json() {
        let params: Argon2Params = serde_json::from_str(r#"{"variant": "argon2id"}"#).unwrap();
        assert_eq!(params.variant, Argon2Variant::Argon2id);
        assert_eq!(params.memory_kib, 65536);
        assert_eq!(params.iterations, 2);
        assert_eq!(params.parallelism, 2);
        assert_eq!(params.version, 0x13);
    }

    #[test]
    fn test_derive_key_is_deterministic() {
        let salt = [7u8; 32];
        let params = cheap_params(Argon2Variant::Argon2d);
        let a = derive_key(b"correct horse", &salt, &params).unwrap();
        let b = derive_key(b"correct horse", &salt, &params).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_derive_key_depends_on_inputs() {
        let salt = [7u8; 32];
        let params = cheap_params(Argon2Variant::Argon2d);
        let base = derive_key(b"correct horse", &salt, &params).unwrap();

        assert_ne!(base, derive_key(b"correct horsf", &salt, &params).unwrap());
        assert_ne!(base, derive_key(b"correct horse", &[8u8; 32], &params).unwrap());
        assert_ne!(
            base,
            derive_key(b"correct horse", &salt, &cheap_params(Argon2Variant::Argon2id)).unwrap()
        );
        let old_version = Argon2Params {
            version: 0x10,
            ..params
        };
        assert_ne!(base, derive_key(b"correct horse", &salt, &old_version).unwrap());
    }

    #[test]
    fn test_invalid_params() {
        let salt = [7u8; 32];
        let bad_version = Argon2Params {
            version: 0x12,
            ..cheap_params(Argon2Variant::Argon2id)
        };
        assert!(matches!(derive_key(b"pw", &salt, &bad_version), Err(FinderError::Kdf(_))));

        let no_iterations = Argon2Params {
            iterations: 0,
            ..cheap_params(Argon2Variant::Argon2id)
        };
        assert!(matches!(derive_key(b"pw", &salt, &no_iterations), Err(FinderError::Kdf(_))));

        // Argon2 requires salts of at least 8 bytes
        let params = cheap_params(Argon2Variant::Argon2id);
        assert!(matches!(derive_key(b"pw", &[1, 2, 3], &params), Err(FinderError::Kdf(_))));
    }

    #[test]
    fn test_aes_kdf_single_round() {
        // NIST SP 800-38A F.1.5: the ECB-AES256 block, once per half of the key
        let seed: [u8; 32] = HEXLOWER
            .decode(b"603deb1015ca71be2b73aef0857d77811f352c073b6108d72d9810a30914dff4")
            .unwrap()
            .try_into()
            .unwrap();
        let block = HEXLOWER.decode(b"6bc1bee22e409f96e93d7e117393172a").unwrap();
        let composite: [u8; 32] = [block.clone(), block].concat().try_into().unwrap();

        assert_eq!(
            HEXLOWER.encode(&aes_kdf(&composite, &seed, 1)),
            "40edcea92a73b568817df155882d83659cd60a6d17202daf9dd817e3ad055dcb"
        );
    }

    #[test]
    fn test_aes_kdf_rounds() {
        let composite: [u8; 32] = std::array::from_fn(|i| i as u8);
        let seed: [u8; 32] = std::array::from_fn(|i| 32 + i as u8);
        assert_eq!(
            HEXLOWER.encode(&aes_kdf(&composite, &seed, 1000)),
            "b66182a0c7acd3f37a5864872aa9951022319c0e78719442322a6e87834b5059"
        );
        // Zero rounds is just the hash of the composite key
        assert_eq!(
            HEXLOWER.encode(&aes_kdf(&composite, &seed, 0)),
            "630dcd2966c4336691125448bbb25b4ff412a49c732db2c8abc1b8581bd710dd"
        );
    }

    #[test]
    fn test_derive_key_json() {
        let salt = BASE64.encode(&[7u8; 32]);
        let input = serde_json::json!({
            "password": "correct horse",
            "salt": salt,
            "params": {"memory_kib": 64, "iterations": 1, "parallelism": 1}
        });
        let hex = derive_key_json(&input.to_string()).unwrap();
        let expected = derive_key(
            b"correct horse",
            &[7u8; 32],
            &Argon2Params {
                memory_kib: 64,
                iterations: 1,
                parallelism: 1,
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(hex, HEXUPPER.encode(&expected));

        let bad_salt = serde_json::json!({"password": "pw", "salt": "***"});
        assert!(matches!(derive_key_json(&bad_salt.to_string()), Err(FinderError::Kdf(_))));
    }

    #[test]
    fn test_generate_salt() {
        let a = generate_salt();
        let b = generate_salt();
        assert_eq!(a.len(), KEY_LENGTH);
        assert_ne!(a, b);
    }
}
