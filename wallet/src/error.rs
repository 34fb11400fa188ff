use crate::config::ConfigError;
use crate::mnemonic::MnemonicError;
use crate::storage::StorageError;
use thiserror::Error;

/// Errors surfaced by the wallet session.
#[derive(Debug, Error)]
pub enum WalletError {
    #[error("Invalid mnemonic: {0}")]
    InvalidMnemonic(#[from] MnemonicError),

    /// Also returned for a corrupted vault blob; the two are not told apart.
    #[error("Incorrect password")]
    IncorrectPassword,

    #[error("No wallet found")]
    NoWalletFound,

    #[error("Wallet is locked")]
    WalletLocked,

    #[error("A wallet already exists; delete it first")]
    WalletExists,

    #[error("Unsupported word count: {0} (must be 12 or 24)")]
    UnsupportedWordCount(usize),

    #[error("Password must be at least {min} characters")]
    WeakPassword { min: usize },

    #[error("Stealth index {0} out of range")]
    InvalidStealthIndex(u32),

    #[error("Account index {0} out of range")]
    InvalidAccountIndex(u32),

    #[error("Recovery phrase is not available in this session")]
    MnemonicUnavailable,

    #[error("Encryption failed")]
    Encryption,

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Client error: {0}")]
    Client(String),

    #[error("Background task failed: {0}")]
    Task(String),
}

pub type Result<T> = std::result::Result<T, WalletError>;
