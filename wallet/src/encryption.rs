//! Wallet encryption and security module
//!
//! Seals seed and mnemonic material at rest with a password.
//!
//! - Key derivation: PBKDF2-HMAC-SHA256, 100,000 iterations, 16-byte random salt
//! - Cipher: AES-256-GCM with a 12-byte random nonce
//! - Blob: `base64(salt || nonce || ciphertext || tag)`
//!
//! Every call to [`encrypt_seed`] draws a fresh salt and nonce. A wrong
//! password and a tampered blob both fail tag verification and are reported
//! identically.

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use pbkdf2::pbkdf2_hmac;
use rand::{rngs::OsRng, RngCore};
use sha2::Sha256;
use std::fmt;
use thiserror::Error;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

pub const SALT_LEN: usize = 16;
pub const NONCE_LEN: usize = 12;
pub const TAG_LEN: usize = 16;
pub const KEY_LEN: usize = 32;

/// Fixed by the blob format: the iteration count is not stored alongside the data.
pub const PBKDF2_ITERATIONS: u32 = 100_000;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum EncryptionError {
    #[error("Encryption failed")]
    EncryptionFailed,

    /// Wrong password or modified ciphertext.
    #[error("Decryption failed")]
    DecryptionFailed,

    #[error("Malformed encrypted blob")]
    MalformedBlob,
}

/// Secure password wrapper that zeros memory on drop
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct SecurePassword(String);

impl SecurePassword {
    pub fn new(password: impl Into<String>) -> Self {
        Self(password.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    /// Length in characters, not bytes.
    pub fn char_count(&self) -> usize {
        self.0.chars().count()
    }
}

impl fmt::Debug for SecurePassword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecurePassword(..)")
    }
}

/// 256-bit AES key stretched from a password.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct VaultKey([u8; KEY_LEN]);

impl VaultKey {
    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }
}

/// Persisted form of an encrypted secret.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedBlob(String);

impl EncryptedBlob {
    /// Wrap a stored base64 string. Its contents are checked on decryption.
    pub fn from_base64(encoded: impl Into<String>) -> Self {
        Self(encoded.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    fn encode(salt: &[u8; SALT_LEN], nonce: &[u8; NONCE_LEN], ciphertext: &[u8]) -> Self {
        let mut combined = Vec::with_capacity(SALT_LEN + NONCE_LEN + ciphertext.len());
        combined.extend_from_slice(salt);
        combined.extend_from_slice(nonce);
        combined.extend_from_slice(ciphertext);
        Self(BASE64.encode(combined))
    }

    fn decode(&self) -> Result<Vec<u8>, EncryptionError> {
        let combined = BASE64
            .decode(self.0.trim())
            .map_err(|_| EncryptionError::MalformedBlob)?;

        if combined.len() < SALT_LEN + NONCE_LEN + TAG_LEN {
            return Err(EncryptionError::MalformedBlob);
        }
        Ok(combined)
    }
}

impl fmt::Display for EncryptedBlob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Stretch a password into an AES-256 key.
pub fn derive_key_from_password(password: &SecurePassword, salt: &[u8]) -> VaultKey {
    let mut key = [0u8; KEY_LEN];
    pbkdf2_hmac::<Sha256>(password.as_bytes(), salt, PBKDF2_ITERATIONS, &mut key);
    let vault_key = VaultKey(key);
    key.zeroize();
    vault_key
}

/// Encrypt `plaintext` under `password` into a self-contained blob.
pub fn encrypt_seed(
    plaintext: &[u8],
    password: &SecurePassword,
) -> Result<EncryptedBlob, EncryptionError> {
    let mut salt = [0u8; SALT_LEN];
    OsRng.fill_bytes(&mut salt);
    let mut nonce_bytes = [0u8; NONCE_LEN];
    OsRng.fill_bytes(&mut nonce_bytes);

    let key = derive_key_from_password(password, &salt);
    let cipher = Aes256Gcm::new_from_slice(key.as_bytes())
        .map_err(|_| EncryptionError::EncryptionFailed)?;

    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&nonce_bytes), plaintext)
        .map_err(|_| EncryptionError::EncryptionFailed)?;

    Ok(EncryptedBlob::encode(&salt, &nonce_bytes, &ciphertext))
}

/// Decrypt a blob produced by [`encrypt_seed`].
pub fn decrypt_seed(
    blob: &EncryptedBlob,
    password: &SecurePassword,
) -> Result<Zeroizing<Vec<u8>>, EncryptionError> {
    let combined = blob.decode()?;
    let (salt, rest) = combined.split_at(SALT_LEN);

    let key = derive_key_from_password(password, salt);
    open(&key, rest)
}

/// Authenticated decryption of `nonce || ciphertext || tag`.
fn open(key: &VaultKey, sealed: &[u8]) -> Result<Zeroizing<Vec<u8>>, EncryptionError> {
    let (nonce, ciphertext) = sealed.split_at(NONCE_LEN);

    let cipher = Aes256Gcm::new_from_slice(key.as_bytes())
        .map_err(|_| EncryptionError::DecryptionFailed)?;

    cipher
        .decrypt(Nonce::from_slice(nonce), ciphertext)
        .map(Zeroizing::new)
        .map_err(|_| EncryptionError::DecryptionFailed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encrypt_decrypt() {
        let data = [42u8; 64];
        let password = SecurePassword::new("correcthorse123");

        let encrypted = encrypt_seed(&data, &password).unwrap();
        let decrypted = decrypt_seed(&encrypted, &password).unwrap();

        assert_eq!(decrypted.as_slice(), &data[..]);
    }

    #[test]
    fn test_empty_plaintext_round_trip() {
        let password = SecurePassword::new("correcthorse123");
        let encrypted = encrypt_seed(b"", &password).unwrap();
        assert!(decrypt_seed(&encrypted, &password).unwrap().is_empty());
    }

    #[test]
    fn test_wrong_password() {
        let password = SecurePassword::new("correct_password");
        let wrong_password = SecurePassword::new("wrong_password");

        let encrypted = encrypt_seed(b"sensitive wallet data", &password).unwrap();

        assert_eq!(
            decrypt_seed(&encrypted, &wrong_password),
            Err(EncryptionError::DecryptionFailed)
        );
    }

    #[test]
    fn test_blob_layout() {
        let password = SecurePassword::new("layout-check");
        let encrypted = encrypt_seed(&[1u8; 64], &password).unwrap();

        let raw = BASE64.decode(encrypted.as_str()).unwrap();
        assert_eq!(raw.len(), SALT_LEN + NONCE_LEN + 64 + TAG_LEN);
    }

    #[test]
    fn test_fresh_salt_and_nonce_per_call() {
        let password = SecurePassword::new("same password");
        let a = BASE64
            .decode(encrypt_seed(b"same data", &password).unwrap().as_str())
            .unwrap();
        let b = BASE64
            .decode(encrypt_seed(b"same data", &password).unwrap().as_str())
            .unwrap();

        assert_ne!(a[..SALT_LEN], b[..SALT_LEN]);
        assert_ne!(
            a[SALT_LEN..SALT_LEN + NONCE_LEN],
            b[SALT_LEN..SALT_LEN + NONCE_LEN]
        );
        assert_ne!(a[SALT_LEN + NONCE_LEN..], b[SALT_LEN + NONCE_LEN..]);
    }

    #[test]
    fn test_any_flipped_bit_after_salt_is_rejected() {
        let password = SecurePassword::new("tamper-check");
        let encrypted = encrypt_seed(b"seed bytes under test", &password).unwrap();
        let raw = BASE64.decode(encrypted.as_str()).unwrap();

        let key = derive_key_from_password(&password, &raw[..SALT_LEN]);
        assert!(open(&key, &raw[SALT_LEN..]).is_ok());

        for byte in SALT_LEN..raw.len() {
            for bit in 0..8 {
                let mut tampered = raw.clone();
                tampered[byte] ^= 1 << bit;
                assert_eq!(
                    open(&key, &tampered[SALT_LEN..]),
                    Err(EncryptionError::DecryptionFailed),
                    "bit {} of byte {} went undetected",
                    bit,
                    byte
                );
            }
        }
    }

    #[test]
    fn test_flipped_salt_bit_is_rejected() {
        let password = SecurePassword::new("tamper-check");
        let encrypted = encrypt_seed(b"seed bytes under test", &password).unwrap();
        let mut raw = BASE64.decode(encrypted.as_str()).unwrap();
        raw[3] ^= 0x10;

        let tampered = EncryptedBlob::from_base64(BASE64.encode(&raw));
        assert_eq!(
            decrypt_seed(&tampered, &password),
            Err(EncryptionError::DecryptionFailed)
        );
    }

    #[test]
    fn test_malformed_blob() {
        let password = SecurePassword::new("whatever");

        let not_base64 = EncryptedBlob::from_base64("!!not base64!!");
        assert_eq!(
            decrypt_seed(&not_base64, &password),
            Err(EncryptionError::MalformedBlob)
        );

        let too_short = EncryptedBlob::from_base64(BASE64.encode([0u8; SALT_LEN + NONCE_LEN]));
        assert_eq!(
            decrypt_seed(&too_short, &password),
            Err(EncryptionError::MalformedBlob)
        );
    }

    #[test]
    fn test_key_derivation_depends_on_salt() {
        let password = SecurePassword::new("password");
        let a = derive_key_from_password(&password, &[0u8; SALT_LEN]);
        let b = derive_key_from_password(&password, &[0u8; SALT_LEN]);
        let c = derive_key_from_password(&password, &[1u8; SALT_LEN]);

        assert_eq!(a.as_bytes(), b.as_bytes());
        assert_ne!(a.as_bytes(), c.as_bytes());
    }

    #[test]
    fn test_password_debug_is_redacted() {
        let password = SecurePassword::new("sensitive");
        assert_eq!(password.char_count(), 9);
        assert_eq!(format!("{:?}", password), "SecurePassword(..)");
    }
}
