//! Database ciphers and the keyed hashes around them.
//!
//! # Outer ciphers
//! - AES-256-CBC and Twofish-CBC with PKCS#7 padding
//! - ChaCha20 (12-byte nonce, 32-bit block counter starting at 0)
//!
//! # Inner stream
//! Protected values inside a decrypted database are XORed with a Salsa20 or
//! ChaCha20 keystream that runs across all values in document order.
//!
//! # Block HMAC
//! Each data block (and the header, at index `u64::MAX`) is authenticated
//! with HMAC-SHA256 under `SHA512(index_le || hmac_key)`.

use cbc::cipher::block_padding::{NoPadding, Pkcs7};
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit, StreamCipher};
use digest::Digest;
use hmac::{Hmac, Mac};
use sha2::{Sha256, Sha512};

use crate::error::{FinderError, FinderResult};

type Aes256CbcEnc = cbc::Encryptor<aes::Aes256>;
type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;
type TwofishCbcEnc = cbc::Encryptor<twofish::Twofish>;
type TwofishCbcDec = cbc::Decryptor<twofish::Twofish>;

/// Block index reserved for the header HMAC.
pub const HEADER_BLOCK_INDEX: u64 = u64::MAX;

const SALSA20_INNER_NONCE: [u8; 8] = [0xE8, 0x30, 0x09, 0x4B, 0x97, 0x20, 0x5D, 0x2A];

pub fn sha256(data: &[u8]) -> [u8; 32] {
    Sha256::digest(data).into()
}

pub fn sha512(data: &[u8]) -> [u8; 64] {
    Sha512::digest(data).into()
}

/// Cipher key and HMAC key from the master seed and the KDF output.
///
/// `cipher_key = SHA256(seed || transformed)`,
/// `hmac_key = SHA512(seed || transformed || 0x01)`.
pub fn final_keys(master_seed: &[u8], transformed_key: &[u8; 32]) -> ([u8; 32], [u8; 64]) {
    let cipher_key: [u8; 32] = Sha256::new()
        .chain_update(master_seed)
        .chain_update(transformed_key)
        .finalize()
        .into();
    let hmac_key: [u8; 64] = Sha512::new()
        .chain_update(master_seed)
        .chain_update(transformed_key)
        .chain_update([1u8])
        .finalize()
        .into();
    (cipher_key, hmac_key)
}

/// Per-block HMAC key: `SHA512(block_index as u64 LE || hmac_key)`.
pub fn block_hmac_key(hmac_key: &[u8; 64], block_index: u64) -> [u8; 64] {
    Sha512::new()
        .chain_update(block_index.to_le_bytes())
        .chain_update(hmac_key)
        .finalize()
        .into()
}

pub fn hmac_sha256(key: &[u8], data: &[u8]) -> FinderResult<[u8; 32]> {
    let mut mac = <Hmac<Sha256> as Mac>::new_from_slice(key)
        .map_err(|e| FinderError::Crypto(format!("Invalid HMAC key: {}", e)))?;
    mac.update(data);
    Ok(mac.finalize().into_bytes().into())
}

/// HMAC-SHA256 of one block under its per-block key.
pub fn block_hmac(hmac_key: &[u8; 64], block_index: u64, data: &[u8]) -> FinderResult<[u8; 32]> {
    hmac_sha256(&block_hmac_key(hmac_key, block_index), data)
}

/// XOR `data` in place with the ChaCha20 keystream (32-byte key, 12-byte nonce).
pub fn chacha20_xor(key: &[u8], nonce: &[u8], data: &mut [u8]) -> FinderResult<()> {
    let mut cipher = chacha20::ChaCha20::new_from_slices(key, nonce)
        .map_err(|_| FinderError::Crypto("ChaCha20 expects a 32-byte key and 12-byte nonce".into()))?;
    cipher.apply_keystream(data);
    Ok(())
}

/// XOR `data` in place with the Salsa20 keystream (32-byte key, 8-byte nonce).
pub fn salsa20_xor(key: &[u8], nonce: &[u8], data: &mut [u8]) -> FinderResult<()> {
    let mut cipher = salsa20::Salsa20::new_from_slices(key, nonce)
        .map_err(|_| FinderError::Crypto("Salsa20 expects a 32-byte key and 8-byte nonce".into()))?;
    cipher.apply_keystream(data);
    Ok(())
}

/// Cipher of the encrypted database payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataCipher {
    Aes256,
    ChaCha20,
    /// Some writers produce Twofish payloads with broken padding; with
    /// `lenient_padding` those decrypt to the unpadded plaintext instead of failing.
    Twofish { lenient_padding: bool },
}

impl DataCipher {
    const AES256_UUID: [u8; 16] = [
        0x31, 0xC1, 0xF2, 0xE6, 0xBF, 0x71, 0x43, 0x50, 0xBE, 0x58, 0x05, 0x21, 0x6A, 0xFC, 0x5A, 0xFF,
    ];
    const CHACHA20_UUID: [u8; 16] = [
        0xD6, 0x03, 0x8A, 0x2B, 0x8B, 0x6F, 0x4C, 0xB5, 0xA5, 0x24, 0x33, 0x9A, 0x31, 0xDB, 0xB5, 0x9A,
    ];
    const TWOFISH_UUID: [u8; 16] = [
        0xAD, 0x68, 0xF2, 0x9F, 0x57, 0x6F, 0x4B, 0xB9, 0xA3, 0x6A, 0xD4, 0x7A, 0xF9, 0x65, 0x34, 0x6C,
    ];

    /// Cipher for a header cipher id; unknown ids give `None`.
    pub fn from_uuid(uuid: &[u8]) -> Option<Self> {
        if uuid == Self::AES256_UUID {
            Some(DataCipher::Aes256)
        } else if uuid == Self::CHACHA20_UUID {
            Some(DataCipher::ChaCha20)
        } else if uuid == Self::TWOFISH_UUID {
            Some(DataCipher::Twofish {
                lenient_padding: false,
            })
        } else {
            None
        }
    }

    pub fn uuid(&self) -> [u8; 16] {
        match self {
            DataCipher::Aes256 => Self::AES256_UUID,
            DataCipher::ChaCha20 => Self::CHACHA20_UUID,
            DataCipher::Twofish { .. } => Self::TWOFISH_UUID,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            DataCipher::Aes256 => "AES",
            DataCipher::ChaCha20 => "ChaCha20",
            DataCipher::Twofish { .. } => "Twofish",
        }
    }

    pub fn key_size(&self) -> usize {
        32
    }

    pub fn iv_size(&self) -> usize {
        match self {
            DataCipher::ChaCha20 => 12,
            DataCipher::Aes256 | DataCipher::Twofish { .. } => 16,
        }
    }

    fn check_sizes(&self, key: &[u8], iv: &[u8]) -> FinderResult<()> {
        if key.len() != self.key_size() || iv.len() != self.iv_size() {
            return Err(FinderError::Crypto(format!(
                "{} expects a {}-byte key and {}-byte IV, got {} and {}",
                self.name(),
                self.key_size(),
                self.iv_size(),
                key.len(),
                iv.len()
            )));
        }
        Ok(())
    }

    pub fn encrypt(&self, plaintext: &[u8], key: &[u8], iv: &[u8]) -> FinderResult<Vec<u8>> {
        self.check_sizes(key, iv)?;
        match self {
            DataCipher::Aes256 => Ok(Aes256CbcEnc::new_from_slices(key, iv)
                .map_err(invalid_length)?
                .encrypt_padded_vec_mut::<Pkcs7>(plaintext)),
            DataCipher::Twofish { .. } => Ok(TwofishCbcEnc::new_from_slices(key, iv)
                .map_err(invalid_length)?
                .encrypt_padded_vec_mut::<Pkcs7>(plaintext)),
            DataCipher::ChaCha20 => {
                let mut data = plaintext.to_vec();
                chacha20_xor(key, iv, &mut data)?;
                Ok(data)
            }
        }
    }

    pub fn decrypt(&self, ciphertext: &[u8], key: &[u8], iv: &[u8]) -> FinderResult<Vec<u8>> {
        self.check_sizes(key, iv)?;
        match self {
            DataCipher::Aes256 => Aes256CbcDec::new_from_slices(key, iv)
                .map_err(invalid_length)?
                .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
                .map_err(|_| FinderError::Crypto("AES: wrong key or corrupted data".into())),
            DataCipher::Twofish { lenient_padding } => {
                let mut data = TwofishCbcDec::new_from_slices(key, iv)
                    .map_err(invalid_length)?
                    .decrypt_padded_vec_mut::<NoPadding>(ciphertext)
                    .map_err(|_| FinderError::Crypto("Twofish: data is not whole blocks".into()))?;
                match pkcs7_padding_len(&data) {
                    Some(padding) => data.truncate(data.len() - padding),
                    None if *lenient_padding => {
                        tracing::warn!("Twofish padding is malformed, keeping unpadded data");
                    }
                    None => return Err(FinderError::Crypto("Twofish: wrong key or corrupted data".into())),
                }
                Ok(data)
            }
            DataCipher::ChaCha20 => {
                let mut data = ciphertext.to_vec();
                chacha20_xor(key, iv, &mut data)?;
                Ok(data)
            }
        }
    }
}

fn invalid_length(_: cbc::cipher::InvalidLength) -> FinderError {
    FinderError::Crypto("Invalid key or IV length".into())
}

/// Length of a valid PKCS#7 tail (16-byte blocks), if there is one.
fn pkcs7_padding_len(data: &[u8]) -> Option<usize> {
    let padding = usize::from(*data.last()?);
    if padding == 0 || padding > 16 || padding > data.len() {
        return None;
    }
    data[data.len() - padding..]
        .iter()
        .all(|&b| usize::from(b) == padding)
        .then_some(padding)
}

/// Algorithm of the inner stream that hides protected values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InnerStreamAlgorithm {
    Salsa20,
    ChaCha20,
}

impl InnerStreamAlgorithm {
    /// Header id: 2 is Salsa20, 3 is ChaCha20. Other ids are not supported.
    pub fn from_id(id: u32) -> Option<Self> {
        match id {
            2 => Some(InnerStreamAlgorithm::Salsa20),
            3 => Some(InnerStreamAlgorithm::ChaCha20),
            _ => None,
        }
    }
}

/// Keystream shared by all protected values of one database.
pub enum InnerStream {
    Salsa20(salsa20::Salsa20),
    ChaCha20(chacha20::ChaCha20),
}

impl InnerStream {
    /// Salsa20 keys with `SHA256(key)` and a fixed nonce. ChaCha20 takes key
    /// and nonce from `SHA512(key)`.
    pub fn new(algorithm: InnerStreamAlgorithm, key: &[u8]) -> FinderResult<Self> {
        match algorithm {
            InnerStreamAlgorithm::Salsa20 => {
                let cipher = salsa20::Salsa20::new_from_slices(&sha256(key), &SALSA20_INNER_NONCE)
                    .map_err(|_| FinderError::Crypto("Invalid Salsa20 key".into()))?;
                Ok(InnerStream::Salsa20(cipher))
            }
            InnerStreamAlgorithm::ChaCha20 => {
                let hash = sha512(key);
                let cipher = chacha20::ChaCha20::new_from_slices(&hash[..32], &hash[32..44])
                    .map_err(|_| FinderError::Crypto("Invalid ChaCha20 key".into()))?;
                Ok(InnerStream::ChaCha20(cipher))
            }
        }
    }

    /// XOR the next `data.len()` keystream bytes into `data`.
    pub fn apply(&mut self, data: &mut [u8]) {
        match self {
            InnerStream::Salsa20(cipher) => cipher.apply_keystream(data),
            InnerStream::ChaCha20(cipher) => cipher.apply_keystream(data),
        }
    }
}
