//! SLIP-0010 Ed25519 HD derivation for Shade wallet accounts
//!
//! Every level is hardened (Ed25519 has no public-parent to public-child
//! derivation). Paths follow the Solana layout `m/44'/501'/account'/change'`.
//!
//! Two disjoint account ranges are derived from the same seed:
//! - spendable accounts use `account` in `0..STEALTH_ACCOUNT_OFFSET`
//! - stealth addresses use `account = STEALTH_ACCOUNT_OFFSET + stealth_index`
//!
//! Nothing here is persisted; any address can be re-derived from the seed and
//! its index.

use crate::mnemonic::Seed;
use hmac::{Hmac, Mac};
use serde::Serialize;
use sha2::Sha512;
use shade_crypto::KeyPair;
use std::fmt;
use zeroize::Zeroize;

type HmacSha512 = Hmac<Sha512>;

pub const PURPOSE: u32 = 44;
pub const SOLANA_COIN_TYPE: u32 = 501;

/// Number of spendable accounts derived on unlock.
pub const DEFAULT_ACCOUNT_COUNT: u32 = 5;

/// First account index of the stealth range.
pub const STEALTH_ACCOUNT_OFFSET: u32 = 1000;

const HARDENED_OFFSET: u32 = 0x8000_0000;

/// Largest stealth index whose account index still fits below the hardened bit.
pub const MAX_STEALTH_INDEX: u32 = HARDENED_OFFSET - 1 - STEALTH_ACCOUNT_OFFSET;

// ── SLIP-0010 Ed25519 HD derivation ──────────────────────────────────

/// Derive the SLIP-0010 master key and chain code from a BIP-39 seed.
fn slip10_master_key(seed: &[u8]) -> ([u8; 32], [u8; 32]) {
    let mut mac =
        HmacSha512::new_from_slice(b"ed25519 seed").expect("HMAC can take key of any size");
    mac.update(seed);
    split_output(mac)
}

/// Derive a hardened child key using SLIP-0010.
fn slip10_derive_child(key: &[u8; 32], chain_code: &[u8; 32], index: u32) -> ([u8; 32], [u8; 32]) {
    let hardened = index | HARDENED_OFFSET;
    let mut mac = HmacSha512::new_from_slice(chain_code).expect("HMAC can take key of any size");
    mac.update(&[0x00]);
    mac.update(key);
    mac.update(&hardened.to_be_bytes());
    split_output(mac)
}

fn split_output(mac: HmacSha512) -> ([u8; 32], [u8; 32]) {
    let result = mac.finalize().into_bytes();
    let mut key = [0u8; 32];
    let mut chain_code = [0u8; 32];
    key.copy_from_slice(&result[..32]);
    chain_code.copy_from_slice(&result[32..]);
    (key, chain_code)
}

/// Walk `path` from the master key and return the final private key.
fn slip10_derive_path(seed: &[u8], path: &[u32]) -> [u8; 32] {
    let (mut key, mut cc) = slip10_master_key(seed);
    for &index in path {
        let (k, c) = slip10_derive_child(&key, &cc, index);
        key.zeroize();
        cc.zeroize();
        key = k;
        cc = c;
    }
    cc.zeroize();
    key
}

// ── Paths ────────────────────────────────────────────────────────────

/// `m/44'/501'/account'/change'`, all levels hardened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DerivationPath {
    account: u32,
    change: u32,
}

impl DerivationPath {
    /// # Panics
    ///
    /// If either index has the hardened bit set.
    pub fn new(account: u32, change: u32) -> Self {
        assert!(
            account < HARDENED_OFFSET && change < HARDENED_OFFSET,
            "derivation index out of range: {}'/{}'",
            account,
            change
        );
        Self { account, change }
    }

    /// Path of spendable account `index`.
    ///
    /// # Panics
    ///
    /// If `index` falls into the stealth range.
    pub fn account(index: u32) -> Self {
        assert!(
            index < STEALTH_ACCOUNT_OFFSET,
            "account index {} overlaps the stealth range",
            index
        );
        Self::new(index, 0)
    }

    /// Path of stealth address `index`.
    ///
    /// # Panics
    ///
    /// If `index` exceeds [`MAX_STEALTH_INDEX`].
    pub fn stealth(index: u32) -> Self {
        assert!(
            index <= MAX_STEALTH_INDEX,
            "stealth index {} out of range",
            index
        );
        Self::new(STEALTH_ACCOUNT_OFFSET + index, 0)
    }

    pub fn account_index(&self) -> u32 {
        self.account
    }

    pub fn change_index(&self) -> u32 {
        self.change
    }

    pub fn is_stealth(&self) -> bool {
        self.account >= STEALTH_ACCOUNT_OFFSET
    }

    /// Unhardened components; hardening is applied during derivation.
    pub fn components(&self) -> [u32; 4] {
        [PURPOSE, SOLANA_COIN_TYPE, self.account, self.change]
    }

    pub fn derive(&self, seed: &Seed) -> KeyPair {
        let mut key = slip10_derive_path(seed.as_bytes(), &self.components());
        let keypair = KeyPair::from_seed(&key);
        key.zeroize();
        keypair
    }
}

impl fmt::Display for DerivationPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "m/{}'/{}'/{}'/{}'",
            PURPOSE, SOLANA_COIN_TYPE, self.account, self.change
        )
    }
}

// ── Derived wallets ──────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AddressKind {
    Account,
    Stealth,
}

/// A keypair together with its address and the index it was derived from.
#[derive(Debug, Clone)]
pub struct DerivedWallet {
    pub keypair: KeyPair,
    /// Base58 address
    pub public_key: String,
    /// Account index, or stealth index for stealth wallets
    pub index: u32,
    pub path: String,
    pub kind: AddressKind,
}

impl DerivedWallet {
    fn at(seed: &Seed, path: DerivationPath, index: u32, kind: AddressKind) -> Self {
        let keypair = path.derive(seed);
        Self {
            public_key: keypair.public_key_base58(),
            keypair,
            index,
            path: path.to_string(),
            kind,
        }
    }
}

/// Derive the keypair at `m/44'/501'/account_index'/change_index'`.
pub fn derive_keypair(seed: &Seed, account_index: u32, change_index: u32) -> KeyPair {
    DerivationPath::new(account_index, change_index).derive(seed)
}

/// Derive spendable accounts `0..count`, in index order.
///
/// # Panics
///
/// If `count` reaches into the stealth range.
pub fn derive_wallets_from_seed(seed: &Seed, count: u32) -> Vec<DerivedWallet> {
    (0..count)
        .map(|index| {
            DerivedWallet::at(
                seed,
                DerivationPath::account(index),
                index,
                AddressKind::Account,
            )
        })
        .collect()
}

/// Derive the one-off receiving wallet for `stealth_index`.
///
/// # Panics
///
/// If `stealth_index` exceeds [`MAX_STEALTH_INDEX`].
pub fn derive_stealth_address(seed: &Seed, stealth_index: u32) -> DerivedWallet {
    DerivedWallet::at(
        seed,
        DerivationPath::stealth(stealth_index),
        stealth_index,
        AddressKind::Stealth,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mnemonic::mnemonic_to_seed;
    use std::collections::HashSet;

    const ABANDON_ABOUT: &str = "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";

    fn test_seed() -> Seed {
        mnemonic_to_seed(ABANDON_ABOUT, "").unwrap()
    }

    #[test]
    fn test_slip10_vector_1() {
        // SLIP-0010 ed25519 test vector 1
        let seed = hex::decode("000102030405060708090a0b0c0d0e0f").unwrap();

        let (key, chain_code) = slip10_master_key(&seed);
        assert_eq!(
            hex::encode(key),
            "2b4be7f19ee27bbf30c667b642d5f4aa69fd169872f8fc3059c08ebae2eb19e7"
        );
        assert_eq!(
            hex::encode(chain_code),
            "90046a93de5380a72b5e45010748567d5ea02bbf6522f979e05c0d8d8ca9fffb"
        );

        let (child_key, child_cc) = slip10_derive_child(&key, &chain_code, 0);
        assert_eq!(
            hex::encode(child_key),
            "68e0fe46dfb67e368c75379acec591dad19df3cde26e63b93a8e704f1dade7a3"
        );
        assert_eq!(
            hex::encode(child_cc),
            "8b59aa11380b624e81507a27fedda59fea6d0b779a778918a2fd3590e16e9c69"
        );
        assert_eq!(slip10_derive_path(&seed, &[0]), child_key);
    }

    #[test]
    fn test_derivation_deterministic() {
        let seed = test_seed();
        for index in 0..3 {
            let a = derive_keypair(&seed, index, 0);
            let b = derive_keypair(&seed, index, 0);
            assert_eq!(a.secret_key_bytes(), b.secret_key_bytes());
        }

        let again = mnemonic_to_seed(ABANDON_ABOUT, "").unwrap();
        assert_eq!(
            derive_keypair(&seed, 0, 0).public_key_bytes(),
            derive_keypair(&again, 0, 0).public_key_bytes()
        );
    }

    #[test]
    fn test_change_index_changes_key() {
        let seed = test_seed();
        assert_ne!(
            derive_keypair(&seed, 0, 0).public_key_bytes(),
            derive_keypair(&seed, 0, 1).public_key_bytes()
        );
    }

    #[test]
    fn test_derive_wallets_from_seed() {
        let seed = test_seed();
        let wallets = derive_wallets_from_seed(&seed, DEFAULT_ACCOUNT_COUNT);

        assert_eq!(wallets.len(), 5);
        for (i, wallet) in wallets.iter().enumerate() {
            assert_eq!(wallet.index, i as u32);
            assert_eq!(wallet.path, format!("m/44'/501'/{}'/0'", i));
            assert_eq!(wallet.kind, AddressKind::Account);
            assert_eq!(wallet.public_key, wallet.keypair.public_key_base58());
            assert_eq!(
                wallet.keypair.public_key_bytes(),
                derive_keypair(&seed, i as u32, 0).public_key_bytes()
            );
        }

        let unique: HashSet<_> = wallets.iter().map(|w| w.public_key.clone()).collect();
        assert_eq!(unique.len(), wallets.len());
    }

    #[test]
    fn test_stealth_uses_offset_range() {
        let seed = test_seed();
        let stealth = derive_stealth_address(&seed, 7);

        assert_eq!(stealth.index, 7);
        assert_eq!(stealth.kind, AddressKind::Stealth);
        assert_eq!(stealth.path, "m/44'/501'/1007'/0'");
        assert_eq!(
            stealth.keypair.public_key_bytes(),
            derive_keypair(&seed, STEALTH_ACCOUNT_OFFSET + 7, 0).public_key_bytes()
        );
    }

    #[test]
    fn test_stealth_disjoint_from_accounts() {
        let seed = test_seed();
        let accounts: HashSet<String> = derive_wallets_from_seed(&seed, DEFAULT_ACCOUNT_COUNT)
            .into_iter()
            .map(|w| w.public_key)
            .collect();

        for index in 0..50 {
            let stealth = derive_stealth_address(&seed, index);
            assert!(!accounts.contains(&stealth.public_key));
        }
    }

    #[test]
    fn test_path_helpers() {
        let path = DerivationPath::stealth(0);
        assert!(path.is_stealth());
        assert_eq!(path.account_index(), STEALTH_ACCOUNT_OFFSET);
        assert_eq!(path.components(), [44, 501, 1000, 0]);
        assert!(!DerivationPath::account(4).is_stealth());

        let last = DerivationPath::stealth(MAX_STEALTH_INDEX);
        assert_eq!(last.account_index(), HARDENED_OFFSET - 1);
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn test_stealth_index_overflow_panics() {
        DerivationPath::stealth(MAX_STEALTH_INDEX + 1);
    }

    #[test]
    #[should_panic(expected = "overlaps the stealth range")]
    fn test_account_range_guard() {
        DerivationPath::account(STEALTH_ACCOUNT_OFFSET);
    }
}
