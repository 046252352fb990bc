//! Symmetric transform used for the encrypted store.
//!
//! The store treats the cipher as opaque: one call per frame, deterministic
//! for a given key and IV. [`AesGcmCipher`] is the shipped implementation;
//! key and IV are injected from configuration.

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use thiserror::Error;

pub const KEY_LEN: usize = 32;
pub const IV_LEN: usize = 12;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CipherError {
    #[error("invalid key material: {0}")]
    InvalidKey(String),
    #[error("encryption failed: {0}")]
    Encryption(String),
    #[error("decryption failed: {0}")]
    Decryption(String),
}

pub trait Cipher {
    fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>, CipherError>;
    fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>, CipherError>;
}

/// AES-256-GCM with a fixed, pre-shared IV.
pub struct AesGcmCipher {
    cipher: Aes256Gcm,
    iv: [u8; IV_LEN],
}

impl AesGcmCipher {
    pub fn new(key: &[u8; KEY_LEN], iv: &[u8; IV_LEN]) -> Result<Self, CipherError> {
        let cipher =
            Aes256Gcm::new_from_slice(key).map_err(|e| CipherError::InvalidKey(e.to_string()))?;
        Ok(Self { cipher, iv: *iv })
    }

    /// Key and IV as hex strings (64 and 24 characters).
    pub fn from_hex(key_hex: &str, iv_hex: &str) -> Result<Self, CipherError> {
        let key: [u8; KEY_LEN] = decode_fixed("key", key_hex)?;
        let iv: [u8; IV_LEN] = decode_fixed("iv", iv_hex)?;
        Self::new(&key, &iv)
    }
}

impl Cipher for AesGcmCipher {
    fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>, CipherError> {
        self.cipher
            .encrypt(Nonce::from_slice(&self.iv), plaintext)
            .map_err(|e| CipherError::Encryption(e.to_string()))
    }

    fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>, CipherError> {
        self.cipher
            .decrypt(Nonce::from_slice(&self.iv), ciphertext)
            .map_err(|e| CipherError::Decryption(e.to_string()))
    }
}

fn decode_fixed<const N: usize>(what: &str, text: &str) -> Result<[u8; N], CipherError> {
    let bytes = hex::decode(text.trim())
        .map_err(|e| CipherError::InvalidKey(format!("{what}: {e}")))?;
    <[u8; N]>::try_from(bytes.as_slice()).map_err(|_| {
        CipherError::InvalidKey(format!(
            "{what}: expected {} bytes, got {}",
            N,
            bytes.len()
        ))
    })
}
