//! Shade Wallet Cryptography
//!
//! Ed25519 keypairs in the Solana encoding: addresses are the base58 form of
//! the 32-byte public key, exported secret keys are the base58 form of the
//! 64-byte `secret || public` pair.

use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use rand::rngs::OsRng;
use std::fmt;
use thiserror::Error;
use zeroize::Zeroizing;

/// Length of an Ed25519 public key (and of a decoded address).
pub const PUBLIC_KEY_LEN: usize = 32;
/// Length of the exported `secret || public` keypair bytes.
pub const KEYPAIR_LEN: usize = 64;
/// Length of an Ed25519 signature.
pub const SIGNATURE_LEN: usize = 64;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum CryptoError {
    #[error("Invalid signature")]
    InvalidSignature,
    #[error("Invalid public key")]
    InvalidPublicKey,
    #[error("Invalid private key")]
    InvalidPrivateKey,
    #[error("Invalid base58 encoding")]
    InvalidEncoding,
}

/// Ed25519 signing keypair.
///
/// Cloning is cheap and intentional: callers that sign take their own copy so
/// the wallet session can be locked while a signature is being produced.
#[derive(Clone)]
pub struct KeyPair {
    signing_key: SigningKey,
    verifying_key: VerifyingKey,
}

impl KeyPair {
    pub fn generate() -> Self {
        let mut csprng = OsRng;
        let signing_key = SigningKey::generate(&mut csprng);
        let verifying_key = signing_key.verifying_key();

        Self {
            signing_key,
            verifying_key,
        }
    }

    /// Build a keypair from a 32-byte private key, e.g. the output of an HD derivation.
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        let signing_key = SigningKey::from_bytes(seed);
        let verifying_key = signing_key.verifying_key();

        Self {
            signing_key,
            verifying_key,
        }
    }

    /// Import a keypair from its 64-byte `secret || public` form.
    ///
    /// The public half must match the one computed from the secret half.
    pub fn from_keypair_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        let key_array: &[u8; KEYPAIR_LEN] = bytes
            .try_into()
            .map_err(|_| CryptoError::InvalidPrivateKey)?;

        let signing_key =
            SigningKey::from_keypair_bytes(key_array).map_err(|_| CryptoError::InvalidPrivateKey)?;
        let verifying_key = signing_key.verifying_key();

        Ok(Self {
            signing_key,
            verifying_key,
        })
    }

    /// Import a keypair exported with [`KeyPair::secret_key_base58`].
    pub fn from_secret_key_base58(encoded: &str) -> Result<Self, CryptoError> {
        let bytes = Zeroizing::new(
            bs58::decode(encoded.trim())
                .into_vec()
                .map_err(|_| CryptoError::InvalidEncoding)?,
        );
        Self::from_keypair_bytes(&bytes)
    }

    pub fn public_key_bytes(&self) -> [u8; PUBLIC_KEY_LEN] {
        self.verifying_key.to_bytes()
    }

    /// The wallet address: base58 of the public key.
    pub fn public_key_base58(&self) -> String {
        bs58::encode(self.verifying_key.to_bytes()).into_string()
    }

    /// `secret || public`, the layout Solana tooling exports.
    pub fn secret_key_bytes(&self) -> Zeroizing<[u8; KEYPAIR_LEN]> {
        Zeroizing::new(self.signing_key.to_keypair_bytes())
    }

    pub fn secret_key_base58(&self) -> Zeroizing<String> {
        let bytes = self.secret_key_bytes();
        Zeroizing::new(bs58::encode(&bytes[..]).into_string())
    }

    pub fn sign(&self, message: &[u8]) -> [u8; SIGNATURE_LEN] {
        self.signing_key.sign(message).to_bytes()
    }

    pub fn verify(
        public_key_base58: &str,
        message: &[u8],
        signature_bytes: &[u8],
    ) -> Result<(), CryptoError> {
        let pub_key_array = public_key_from_base58(public_key_base58)?;

        let verifying_key =
            VerifyingKey::from_bytes(&pub_key_array).map_err(|_| CryptoError::InvalidPublicKey)?;

        let sig_array: [u8; SIGNATURE_LEN] = signature_bytes
            .try_into()
            .map_err(|_| CryptoError::InvalidSignature)?;

        let signature = Signature::from_bytes(&sig_array);

        verifying_key
            .verify(message, &signature)
            .map_err(|_| CryptoError::InvalidSignature)
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("public_key", &self.public_key_base58())
            .finish_non_exhaustive()
    }
}

impl PartialEq for KeyPair {
    fn eq(&self, other: &Self) -> bool {
        self.verifying_key == other.verifying_key
    }
}

impl Eq for KeyPair {}

/// Decode a base58 address into its 32 public key bytes.
pub fn public_key_from_base58(address: &str) -> Result<[u8; PUBLIC_KEY_LEN], CryptoError> {
    let bytes = bs58::decode(address)
        .into_vec()
        .map_err(|_| CryptoError::InvalidEncoding)?;

    bytes
        .try_into()
        .map_err(|_| CryptoError::InvalidPublicKey)
}

/// Shorten an address for display: `abcd...wxyz`.
pub fn truncate_address(address: &str, chars: usize) -> String {
    let len = address.chars().count();
    if len <= chars * 2 {
        return address.to_string();
    }

    let head: String = address.chars().take(chars).collect();
    let tail: String = address.chars().skip(len - chars).collect();
    format!("{}...{}", head, tail)
}
