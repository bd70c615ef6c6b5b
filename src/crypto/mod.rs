//! Cryptographic primitives for the data-protection pipeline
//!
//! One AEAD (AES-256-GCM) covers both uses in the pipeline: whole-file
//! sealing for the split-transfer protocol and payload sealing for
//! reversible tokens. Ciphertext layout is `nonce || ciphertext+tag`, so a
//! single byte buffer is self-contained.

use crate::error::TransferError;
use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use rand::RngCore;
use zeroize::Zeroizing;

/// AES-256-GCM encryption key size
pub const KEY_SIZE: usize = 32;

/// Nonce size for AES-GCM
pub const NONCE_SIZE: usize = 12;

/// Encrypt data using AES-256-GCM, prepending the random nonce
pub fn encrypt(key: &[u8; KEY_SIZE], plaintext: &[u8]) -> Result<Vec<u8>, TransferError> {
    let cipher = Aes256Gcm::new_from_slice(key).map_err(|e| TransferError::EncryptionFailed {
        reason: format!("failed to create cipher: {}", e),
    })?;

    let mut nonce_bytes = [0u8; NONCE_SIZE];
    rand::thread_rng().fill_bytes(&mut nonce_bytes);
    let nonce = Nonce::from_slice(&nonce_bytes);

    let ciphertext = cipher
        .encrypt(nonce, plaintext)
        .map_err(|_| TransferError::EncryptionFailed {
            reason: "AEAD seal produced no output".to_string(),
        })?;

    let mut result = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
    result.extend_from_slice(&nonce_bytes);
    result.extend_from_slice(&ciphertext);

    Ok(result)
}

/// Decrypt data sealed by [`encrypt`]. Fails closed on any tampering.
pub fn decrypt(key: &[u8; KEY_SIZE], ciphertext: &[u8]) -> Result<Vec<u8>, TransferError> {
    if ciphertext.len() < NONCE_SIZE {
        return Err(TransferError::DecryptionFailed);
    }

    let cipher = Aes256Gcm::new_from_slice(key).map_err(|_| TransferError::KeyLength {
        expected: KEY_SIZE,
        actual: key.len(),
    })?;

    let nonce = Nonce::from_slice(&ciphertext[..NONCE_SIZE]);
    let encrypted = &ciphertext[NONCE_SIZE..];

    cipher
        .decrypt(nonce, encrypted)
        .map_err(|_| TransferError::DecryptionFailed)
}

/// Generate a random 256-bit key, zeroized when dropped
pub fn generate_key() -> Zeroizing<[u8; KEY_SIZE]> {
    let mut key = Zeroizing::new([0u8; KEY_SIZE]);
    rand::thread_rng().fill_bytes(key.as_mut());
    key
}

/// Borrow a slice as a fixed-size key, checking the length
pub fn key_from_slice(bytes: &[u8]) -> Result<[u8; KEY_SIZE], TransferError> {
    let key: [u8; KEY_SIZE] = bytes.try_into().map_err(|_| TransferError::KeyLength {
        expected: KEY_SIZE,
        actual: bytes.len(),
    })?;
    Ok(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encrypt_decrypt() {
        let key = generate_key();
        let plaintext = b"Hello, SafeRelay!";

        let ciphertext = encrypt(&key, plaintext).unwrap();
        let decrypted = decrypt(&key, &ciphertext).unwrap();

        assert_eq!(plaintext.as_slice(), decrypted.as_slice());
    }

    #[test]
    fn test_empty_plaintext_produces_nonempty_ciphertext() {
        let key = generate_key();
        let ciphertext = encrypt(&key, b"").unwrap();

        // nonce + GCM tag are always present
        assert!(ciphertext.len() >= NONCE_SIZE + 16);
        assert_eq!(decrypt(&key, &ciphertext).unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn test_decrypt_wrong_key() {
        let key1 = generate_key();
        let key2 = generate_key();
        let plaintext = b"Secret message";

        let ciphertext = encrypt(&key1, plaintext).unwrap();
        let result = decrypt(&key2, &ciphertext);

        assert!(matches!(result, Err(TransferError::DecryptionFailed)));
    }

    #[test]
    fn test_decrypt_tampered() {
        let key = generate_key();
        let mut ciphertext = encrypt(&key, b"payload").unwrap();
        let last = ciphertext.len() - 1;
        ciphertext[last] ^= 0x01;

        assert!(matches!(
            decrypt(&key, &ciphertext),
            Err(TransferError::DecryptionFailed)
        ));
    }

    #[test]
    fn test_key_from_slice_rejects_short_keys() {
        let err = key_from_slice(&[0u8; 16]).unwrap_err();
        assert!(matches!(
            err,
            TransferError::KeyLength {
                expected: 32,
                actual: 16
            }
        ));
    }
}
