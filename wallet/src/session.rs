//! Wallet session manager
//!
//! Owns the lock/unlock lifecycle. While unlocked it is the only holder of
//! the decrypted seed, the derived account keypairs and (when recoverable)
//! the mnemonic text. Locking drops all of them.
//!
//! ```text
//!   NoWallet ──create/import──▶ Unlocked ◀──unlock── Locked
//!      ▲                          │  └──────lock──────▶ │
//!      └──────────delete──────────┴──────delete─────────┘
//! ```

use crate::client::AccountClientSlot;
use crate::config::{NetworkMode, WalletConfig};
use crate::encryption::{decrypt_seed, encrypt_seed, SecurePassword};
use crate::error::{Result, WalletError};
use crate::hd::{derive_stealth_address, derive_wallets_from_seed, DerivedWallet, MAX_STEALTH_INDEX};
use crate::mnemonic::{generate_mnemonic, mnemonic_to_seed, parse_mnemonic, MnemonicStrength, Seed};
use crate::storage::{KeyValueStore, WalletStore};
use serde::Serialize;
use shade_crypto::{KeyPair, SIGNATURE_LEN};
use std::fmt;
use zeroize::Zeroizing;

/// Minimum password length in characters for create and import.
pub const MIN_PASSWORD_LEN: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    NoWallet,
    Locked,
    Unlocked,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountSummary {
    pub index: u32,
    pub public_key: String,
    pub path: String,
}

/// Point-in-time view of the session for a UI layer. Holds no secrets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletState {
    pub is_unlocked: bool,
    pub has_wallet: bool,
    pub active_wallet_index: u32,
    pub derived_wallets: Vec<AccountSummary>,
    pub mnemonic_available: bool,
    pub network: NetworkMode,
}

struct UnlockedSecrets {
    seed: Seed,
    wallets: Vec<DerivedWallet>,
    mnemonic: Option<Zeroizing<String>>,
}

pub struct WalletSession<S: KeyValueStore, C = ()> {
    store: WalletStore<S>,
    network: NetworkMode,
    account_count: u32,
    has_wallet: bool,
    active_index: u32,
    secrets: Option<UnlockedSecrets>,
    client: AccountClientSlot<C>,
}

impl<S: KeyValueStore, C> WalletSession<S, C> {
    /// Start a locked session over `store`.
    pub fn open(store: S, config: &WalletConfig) -> Result<Self> {
        config.validate()?;

        let store = WalletStore::new(store);
        let has_wallet = store.has_wallet()?;
        let active_index = store.active_index()?.unwrap_or(0);

        log::info!(
            "Wallet session opened on {} (wallet present: {})",
            config.network,
            has_wallet
        );

        Ok(Self {
            store,
            network: config.network,
            account_count: config.account_count,
            has_wallet,
            active_index,
            secrets: None,
            client: AccountClientSlot::new(),
        })
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    /// Create a fresh wallet and return its recovery phrase.
    ///
    /// The phrase is returned exactly once; the caller must make the user
    /// back it up before treating the wallet as durable.
    pub fn create_wallet(&mut self, password: &str, word_count: usize) -> Result<Zeroizing<String>> {
        let strength = MnemonicStrength::from_word_count(word_count)
            .map_err(|_| WalletError::UnsupportedWordCount(word_count))?;
        let password = check_password(password)?;
        self.ensure_no_wallet()?;

        let mnemonic = generate_mnemonic(strength)?;
        self.provision(&mnemonic, &password)?;

        log::info!("Created new {}-word wallet", word_count);
        Ok(mnemonic)
    }

    /// Restore a wallet from an existing recovery phrase.
    pub fn import_wallet(&mut self, mnemonic: &str, password: &str) -> Result<()> {
        let mnemonic = parse_mnemonic(mnemonic)?;
        let password = check_password(password)?;
        self.ensure_no_wallet()?;

        self.provision(&mnemonic, &password)?;

        log::info!("Imported wallet from recovery phrase");
        Ok(())
    }

    /// Decrypt the stored seed and derive the account set.
    ///
    /// The mnemonic is recovered on a best-effort basis: if its blob is
    /// missing or unreadable the session still unlocks without it.
    pub fn unlock_wallet(&mut self, password: &str) -> Result<()> {
        let blob = self.store.seed_blob()?.ok_or(WalletError::NoWalletFound)?;
        let password = SecurePassword::new(password);

        let seed_bytes = decrypt_seed(&blob, &password).map_err(|_| {
            log::warn!("Unlock failed");
            WalletError::IncorrectPassword
        })?;
        let seed = Seed::from_slice(&seed_bytes).ok_or(WalletError::IncorrectPassword)?;

        let wallets = derive_wallets_from_seed(&seed, self.account_count);
        let mnemonic = self.recover_mnemonic(&password);

        let stored_index = self.store.active_index()?.unwrap_or(0);
        self.active_index = if stored_index < self.account_count {
            stored_index
        } else {
            log::warn!(
                "Stored account index {} out of range, using account 0",
                stored_index
            );
            0
        };

        self.has_wallet = true;
        self.client.reset();
        self.secrets = Some(UnlockedSecrets {
            seed,
            wallets,
            mnemonic,
        });

        log::info!("Wallet unlocked ({} accounts)", self.account_count);
        Ok(())
    }

    /// Drop every in-memory secret. Persisted blobs are untouched.
    pub fn lock_wallet(&mut self) {
        self.client.reset();
        if self.secrets.take().is_some() {
            log::info!("Wallet locked");
        }
    }

    /// Irreversibly wipe the local wallet. On-chain funds are unaffected but
    /// only recoverable with the recovery phrase.
    pub fn delete_wallet(&mut self) -> Result<()> {
        if !self.store.has_wallet()? {
            return Err(WalletError::NoWalletFound);
        }

        self.lock_wallet();
        self.store.clear()?;
        self.has_wallet = false;
        self.active_index = 0;

        log::warn!("Wallet deleted from local storage");
        Ok(())
    }

    /// Make `index` the active account and persist the choice.
    ///
    /// Returns `Ok(false)` and changes nothing when `index` is out of range.
    pub fn switch_wallet(&mut self, index: u32) -> Result<bool> {
        let count = self.unlocked()?.wallets.len();
        if index as usize >= count {
            log::debug!("Ignoring switch to account {} ({} accounts)", index, count);
            return Ok(false);
        }

        self.store.set_active_index(index)?;
        if index != self.active_index {
            self.client.reset();
        }
        self.active_index = index;

        log::info!("Switched to account {}", index);
        Ok(true)
    }

    // ── Keys ─────────────────────────────────────────────────────────

    /// Derive a one-off stealth receiving address. Nothing is persisted.
    pub fn get_stealth_address(&self, stealth_index: u32) -> Result<DerivedWallet> {
        let secrets = self.unlocked()?;
        if stealth_index > MAX_STEALTH_INDEX {
            return Err(WalletError::InvalidStealthIndex(stealth_index));
        }
        Ok(derive_stealth_address(&secrets.seed, stealth_index))
    }

    /// A copy of the active keypair, or `None` while locked.
    ///
    /// Signers hold their own copy, so a concurrent lock never pulls key
    /// material out from under them.
    pub fn active_keypair(&self) -> Option<KeyPair> {
        self.active_wallet().map(|wallet| wallet.keypair.clone())
    }

    /// Sign serialized transaction bytes with the active account.
    pub fn sign_transaction(&self, message: &[u8]) -> Result<[u8; SIGNATURE_LEN]> {
        let keypair = self.active_keypair().ok_or(WalletError::WalletLocked)?;
        Ok(keypair.sign(message))
    }

    /// Re-check `password` and hand out the recovery phrase for one display.
    pub fn reveal_mnemonic(&self, password: &str) -> Result<Zeroizing<String>> {
        let secrets = self.unlocked()?;
        self.verify_password(password)?;

        let mnemonic = secrets
            .mnemonic
            .as_ref()
            .ok_or(WalletError::MnemonicUnavailable)?;

        log::info!("Recovery phrase revealed");
        Ok(Zeroizing::new(mnemonic.as_str().to_string()))
    }

    /// Re-check `password` and export account `index` in base58 keypair form.
    pub fn export_private_key(&self, index: u32, password: &str) -> Result<Zeroizing<String>> {
        let secrets = self.unlocked()?;
        let wallet = secrets
            .wallets
            .get(index as usize)
            .ok_or(WalletError::InvalidAccountIndex(index))?;
        self.verify_password(password)?;

        log::info!("Private key exported for account {}", index);
        Ok(wallet.keypair.secret_key_base58())
    }

    /// Client bound to the active account, built by `connect` on first use.
    ///
    /// The client is dropped on switch, lock and delete, so it never outlives
    /// the account it was built for.
    pub fn account_client<E, F>(&mut self, connect: F) -> Result<&mut C>
    where
        E: fmt::Display,
        F: FnOnce(&KeyPair, NetworkMode) -> std::result::Result<C, E>,
    {
        let secrets = self.secrets.as_ref().ok_or(WalletError::WalletLocked)?;
        let wallet = secrets
            .wallets
            .get(self.active_index as usize)
            .ok_or(WalletError::InvalidAccountIndex(self.active_index))?;
        let network = self.network;

        self.client
            .get_or_try_init(self.active_index, || connect(&wallet.keypair, network))
            .map_err(|e| WalletError::Client(e.to_string()))
    }

    // ── Accessors ────────────────────────────────────────────────────

    pub fn state(&self) -> SessionState {
        match (self.has_wallet, self.secrets.is_some()) {
            (_, true) => SessionState::Unlocked,
            (true, false) => SessionState::Locked,
            (false, false) => SessionState::NoWallet,
        }
    }

    pub fn is_unlocked(&self) -> bool {
        self.secrets.is_some()
    }

    pub fn has_wallet(&self) -> bool {
        self.has_wallet
    }

    pub fn active_index(&self) -> u32 {
        self.active_index
    }

    pub fn network(&self) -> NetworkMode {
        self.network
    }

    pub fn account_count(&self) -> u32 {
        self.account_count
    }

    /// Address of the active account.
    pub fn public_key(&self) -> Option<&str> {
        self.active_wallet().map(|wallet| wallet.public_key.as_str())
    }

    /// Derived accounts in index order; empty while locked.
    pub fn derived_wallets(&self) -> &[DerivedWallet] {
        self.secrets
            .as_ref()
            .map(|s| s.wallets.as_slice())
            .unwrap_or(&[])
    }

    pub fn snapshot(&self) -> WalletState {
        WalletState {
            is_unlocked: self.is_unlocked(),
            has_wallet: self.has_wallet,
            active_wallet_index: self.active_index,
            derived_wallets: self
                .derived_wallets()
                .iter()
                .map(|wallet| AccountSummary {
                    index: wallet.index,
                    public_key: wallet.public_key.clone(),
                    path: wallet.path.clone(),
                })
                .collect(),
            mnemonic_available: self
                .secrets
                .as_ref()
                .map_or(false, |s| s.mnemonic.is_some()),
            network: self.network,
        }
    }

    pub fn store(&self) -> &S {
        self.store.inner()
    }

    // ── Internals ────────────────────────────────────────────────────

    fn unlocked(&self) -> Result<&UnlockedSecrets> {
        self.secrets.as_ref().ok_or(WalletError::WalletLocked)
    }

    fn active_wallet(&self) -> Option<&DerivedWallet> {
        self.secrets
            .as_ref()
            .and_then(|s| s.wallets.get(self.active_index as usize))
    }

    fn ensure_no_wallet(&self) -> Result<()> {
        if self.store.has_wallet()? {
            return Err(WalletError::WalletExists);
        }
        Ok(())
    }

    /// Derive, seal and persist a wallet from a normalized, valid phrase.
    fn provision(&mut self, mnemonic: &str, password: &SecurePassword) -> Result<()> {
        let seed = mnemonic_to_seed(mnemonic, "")?;
        let wallets = derive_wallets_from_seed(&seed, self.account_count);

        let seed_blob =
            encrypt_seed(seed.as_bytes(), password).map_err(|_| WalletError::Encryption)?;
        let mnemonic_blob =
            encrypt_seed(mnemonic.as_bytes(), password).map_err(|_| WalletError::Encryption)?;

        self.store.save_wallet(&seed_blob, &mnemonic_blob)?;

        self.has_wallet = true;
        self.active_index = 0;
        self.client.reset();
        self.secrets = Some(UnlockedSecrets {
            seed,
            wallets,
            mnemonic: Some(Zeroizing::new(mnemonic.to_string())),
        });
        Ok(())
    }

    fn recover_mnemonic(&self, password: &SecurePassword) -> Option<Zeroizing<String>> {
        let blob = match self.store.mnemonic_blob() {
            Ok(Some(blob)) => blob,
            Ok(None) => {
                log::warn!("No stored recovery phrase; unlocking without it");
                return None;
            }
            Err(e) => {
                log::warn!("Could not read stored recovery phrase: {}", e);
                return None;
            }
        };

        let bytes = match decrypt_seed(&blob, password) {
            Ok(bytes) => bytes,
            Err(_) => {
                log::warn!("Stored recovery phrase could not be decrypted; unlocking without it");
                return None;
            }
        };

        std::str::from_utf8(&bytes)
            .ok()
            .map(|phrase| Zeroizing::new(phrase.to_string()))
    }

    fn verify_password(&self, password: &str) -> Result<()> {
        let blob = self.store.seed_blob()?.ok_or(WalletError::NoWalletFound)?;
        decrypt_seed(&blob, &SecurePassword::new(password))
            .map(|_| ())
            .map_err(|_| WalletError::IncorrectPassword)
    }
}

impl<S: KeyValueStore, C> fmt::Debug for WalletSession<S, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WalletSession")
            .field("state", &self.state())
            .field("network", &self.network)
            .field("active_index", &self.active_index)
            .field("account_count", &self.account_count)
            .finish_non_exhaustive()
    }
}

fn check_password(password: &str) -> Result<SecurePassword> {
    let password = SecurePassword::new(password);
    if password.char_count() < MIN_PASSWORD_LEN {
        return Err(WalletError::WeakPassword {
            min: MIN_PASSWORD_LEN,
        });
    }
    Ok(password)
}
