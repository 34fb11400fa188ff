//! Shade Wallet core
//!
//! Local key management for a non-custodial Solana wallet:
//! - BIP-39 recovery phrases (12 or 24 words)
//! - SLIP-0010 Ed25519 derivation of spendable accounts and stealth addresses
//! - Password vault: PBKDF2-HMAC-SHA256 + AES-256-GCM
//! - Lock/unlock session with persisted, encrypted seed and mnemonic
//! - Auto-lock after inactivity

pub mod auto_lock;
pub mod client;
pub mod config;
pub mod encryption;
pub mod error;
pub mod hd;
pub mod mnemonic;
pub mod session;
pub mod shared;
pub mod storage;

pub use auto_lock::{AutoLockConfig, AutoLockManager};
pub use client::AccountClientSlot;
pub use config::{ConfigError, NetworkMode, WalletConfig};
pub use encryption::{
    decrypt_seed, derive_key_from_password, encrypt_seed, EncryptedBlob, EncryptionError,
    SecurePassword, PBKDF2_ITERATIONS,
};
pub use error::WalletError;
pub use hd::{
    derive_keypair, derive_stealth_address, derive_wallets_from_seed, AddressKind,
    DerivationPath, DerivedWallet, DEFAULT_ACCOUNT_COUNT, STEALTH_ACCOUNT_OFFSET,
};
pub use mnemonic::{
    generate_mnemonic, is_valid_bip39_word, mnemonic_to_seed, normalize_mnemonic,
    parse_mnemonic, validate_mnemonic, MnemonicError, MnemonicStrength, Seed,
};
pub use session::{AccountSummary, SessionState, WalletSession, WalletState, MIN_PASSWORD_LEN};
pub use shade_crypto::{CryptoError, KeyPair};
pub use shared::SharedSession;
pub use storage::{KeyValueStore, MemoryStore, SledStore, StorageError, WalletStore};
