//! BIP-39 mnemonic phrases for the Shade wallet
//!
//! Generation, validation and seed stretching. Only 12 and 24 word phrases
//! from the English wordlist are accepted. Seeds follow BIP-39:
//! PBKDF2-HMAC-SHA512, 2048 rounds, salt `"mnemonic" || passphrase`.

use bip39::{Language, Mnemonic};
use rand::{rngs::OsRng, RngCore};
use std::fmt;
use thiserror::Error;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

/// Length of a BIP-39 seed in bytes.
pub const SEED_LEN: usize = 64;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MnemonicError {
    #[error("Invalid word count: {0} (must be 12 or 24)")]
    InvalidWordCount(usize),

    #[error("Word {position} is not in the BIP-39 wordlist")]
    UnknownWord { position: usize },

    #[error("Mnemonic checksum does not match")]
    InvalidChecksum,

    #[error("Invalid mnemonic phrase: {0}")]
    InvalidMnemonic(String),
}

/// Supported phrase lengths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MnemonicStrength {
    /// 128 bits of entropy
    Words12,
    /// 256 bits of entropy
    Words24,
}

impl MnemonicStrength {
    pub fn from_word_count(word_count: usize) -> Result<Self, MnemonicError> {
        match word_count {
            12 => Ok(Self::Words12),
            24 => Ok(Self::Words24),
            other => Err(MnemonicError::InvalidWordCount(other)),
        }
    }

    pub fn word_count(self) -> usize {
        match self {
            Self::Words12 => 12,
            Self::Words24 => 24,
        }
    }

    pub fn entropy_bits(self) -> usize {
        match self {
            Self::Words12 => 128,
            Self::Words24 => 256,
        }
    }

    fn entropy_len(self) -> usize {
        self.entropy_bits() / 8
    }
}

impl Default for MnemonicStrength {
    fn default() -> Self {
        Self::Words12
    }
}

/// Root secret stretched from a mnemonic. Zeroed on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct Seed([u8; SEED_LEN]);

impl Seed {
    pub fn from_bytes(bytes: [u8; SEED_LEN]) -> Self {
        Self(bytes)
    }

    /// Returns `None` unless `bytes` is exactly [`SEED_LEN`] long.
    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        let array: [u8; SEED_LEN] = bytes.try_into().ok()?;
        Some(Self(array))
    }

    pub fn as_bytes(&self) -> &[u8; SEED_LEN] {
        &self.0
    }
}

impl fmt::Debug for Seed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Seed(..)")
    }
}

/// Generate a new random phrase from OS entropy.
pub fn generate_mnemonic(strength: MnemonicStrength) -> Result<Zeroizing<String>, MnemonicError> {
    let mut entropy = Zeroizing::new([0u8; 32]);
    let entropy = &mut entropy[..strength.entropy_len()];
    OsRng.fill_bytes(entropy);

    let mnemonic = Mnemonic::from_entropy_in(Language::English, entropy)
        .map_err(|e| MnemonicError::InvalidMnemonic(e.to_string()))?;

    Ok(Zeroizing::new(mnemonic.to_string()))
}

/// Trim, lowercase and collapse any run of whitespace into a single space.
pub fn normalize_mnemonic(phrase: &str) -> Zeroizing<String> {
    let words: Vec<&str> = phrase.split_whitespace().collect();
    let mut normalized = Zeroizing::new(words.join(" "));
    normalized.make_ascii_lowercase();
    normalized
}

/// Normalize and fully validate a phrase, reporting why it was rejected.
///
/// The word count is checked before any checksum work.
pub fn parse_mnemonic(phrase: &str) -> Result<Zeroizing<String>, MnemonicError> {
    parse_checked(phrase).map(|(normalized, _)| normalized)
}

fn parse_checked(phrase: &str) -> Result<(Zeroizing<String>, Mnemonic), MnemonicError> {
    let normalized = normalize_mnemonic(phrase);
    let words: Vec<&str> = normalized.split(' ').filter(|w| !w.is_empty()).collect();

    MnemonicStrength::from_word_count(words.len())?;

    if let Some(position) = words
        .iter()
        .position(|word| !is_valid_bip39_word(word))
    {
        return Err(MnemonicError::UnknownWord {
            position: position + 1,
        });
    }

    let mnemonic =
        Mnemonic::parse_in_normalized(Language::English, &normalized).map_err(|e| match e {
            bip39::Error::InvalidChecksum => MnemonicError::InvalidChecksum,
            other => MnemonicError::InvalidMnemonic(other.to_string()),
        })?;

    Ok((normalized, mnemonic))
}

/// Fail-closed validity check: wordlist membership, word count and checksum.
pub fn validate_mnemonic(phrase: &str) -> bool {
    parse_mnemonic(phrase).is_ok()
}

/// Check if a single word is in the BIP-39 English wordlist.
pub fn is_valid_bip39_word(word: &str) -> bool {
    Language::English.find_word(word).is_some()
}

/// Stretch a phrase (and optional passphrase) into a 64-byte seed.
///
/// The passphrase is NFKD-normalized before stretching, so composed and
/// decomposed forms of the same text give the same seed.
pub fn mnemonic_to_seed(phrase: &str, passphrase: &str) -> Result<Seed, MnemonicError> {
    let (_, mnemonic) = parse_checked(phrase)?;

    let mut bytes = mnemonic.to_seed(passphrase);
    let seed = Seed(bytes);
    bytes.zeroize();
    Ok(seed)
}

#[cfg(test)]
mod tests {
    use super::*;

    const ABANDON_ABOUT: &str = "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";

    #[test]
    fn test_generate_mnemonic_12_words() {
        let mnemonic = generate_mnemonic(MnemonicStrength::Words12).unwrap();
        assert_eq!(mnemonic.split_whitespace().count(), 12);
        assert!(validate_mnemonic(&mnemonic));
    }

    #[test]
    fn test_generate_mnemonic_24_words() {
        let mnemonic = generate_mnemonic(MnemonicStrength::Words24).unwrap();
        assert_eq!(mnemonic.split_whitespace().count(), 24);
        assert!(validate_mnemonic(&mnemonic));
    }

    #[test]
    fn test_generated_mnemonics_differ() {
        let a = generate_mnemonic(MnemonicStrength::Words12).unwrap();
        let b = generate_mnemonic(MnemonicStrength::Words12).unwrap();
        assert_ne!(*a, *b);
    }

    #[test]
    fn test_strength_from_word_count() {
        assert_eq!(
            MnemonicStrength::from_word_count(24),
            Ok(MnemonicStrength::Words24)
        );
        assert_eq!(MnemonicStrength::Words12.entropy_bits(), 128);
        assert_eq!(
            MnemonicStrength::from_word_count(15),
            Err(MnemonicError::InvalidWordCount(15))
        );
    }

    #[test]
    fn test_irregular_whitespace_is_normalized() {
        let messy = format!("  {}\n", ABANDON_ABOUT.replace(' ', " \t "));
        assert!(validate_mnemonic(&messy));
        assert_eq!(parse_mnemonic(&messy).unwrap().as_str(), ABANDON_ABOUT);
        assert_eq!(
            normalize_mnemonic("  Abandon   ABOUT ").as_str(),
            "abandon about"
        );
    }

    #[test]
    fn test_invalid_word_count() {
        let thirteen = format!("{} abandon", ABANDON_ABOUT);
        assert!(!validate_mnemonic(&thirteen));
        assert_eq!(
            parse_mnemonic(&thirteen),
            Err(MnemonicError::InvalidWordCount(13))
        );
        assert_eq!(parse_mnemonic("   "), Err(MnemonicError::InvalidWordCount(0)));
    }

    #[test]
    fn test_unknown_word() {
        let phrase = ABANDON_ABOUT.replacen("abandon", "shadewallet", 1);
        assert_eq!(
            parse_mnemonic(&phrase),
            Err(MnemonicError::UnknownWord { position: 1 })
        );
        assert!(!is_valid_bip39_word("shadewallet"));
        assert!(is_valid_bip39_word("zoo"));
    }

    #[test]
    fn test_bad_checksum() {
        let phrase = vec!["abandon"; 12].join(" ");
        assert!(!validate_mnemonic(&phrase));
        assert_eq!(parse_mnemonic(&phrase), Err(MnemonicError::InvalidChecksum));
    }

    #[test]
    fn test_seed_matches_bip39_vector() {
        // BIP-39 reference vector: all-zero entropy, passphrase "TREZOR"
        let seed = mnemonic_to_seed(ABANDON_ABOUT, "TREZOR").unwrap();
        assert_eq!(
            hex::encode(seed.as_bytes()),
            "c55257c360c07c72029aebc1b53c05ed0362ada38ead3e3e9efa3708e53495531f09a6987599d18264c1e1c92f2cf141630c7a3c4ab7c81b2f001698e7463b04"
        );
    }

    #[test]
    fn test_seed_matches_bip39_crate() {
        let mnemonic = generate_mnemonic(MnemonicStrength::Words24).unwrap();
        let parsed = Mnemonic::parse_in_normalized(Language::English, &mnemonic).unwrap();

        let seed = mnemonic_to_seed(&mnemonic, "").unwrap();
        assert_eq!(seed.as_bytes(), &parsed.to_seed(""));
    }

    #[test]
    fn test_non_ascii_passphrase_is_nfkd_normalized() {
        let parsed = Mnemonic::parse_in_normalized(Language::English, ABANDON_ABOUT).unwrap();

        let composed = mnemonic_to_seed(ABANDON_ABOUT, "caf\u{e9}").unwrap();
        let decomposed = mnemonic_to_seed(ABANDON_ABOUT, "cafe\u{301}").unwrap();

        assert_eq!(composed.as_bytes(), &parsed.to_seed("caf\u{e9}"));
        assert_eq!(composed.as_bytes(), decomposed.as_bytes());
        assert_ne!(
            composed.as_bytes(),
            mnemonic_to_seed(ABANDON_ABOUT, "cafe").unwrap().as_bytes()
        );
    }

    #[test]
    fn test_seed_requires_valid_phrase() {
        let phrase = vec!["abandon"; 12].join(" ");
        assert!(matches!(
            mnemonic_to_seed(&phrase, ""),
            Err(MnemonicError::InvalidChecksum)
        ));
        assert!(matches!(
            mnemonic_to_seed("abandon about", ""),
            Err(MnemonicError::InvalidWordCount(2))
        ));
    }

    #[test]
    fn test_seed_deterministic() {
        let a = mnemonic_to_seed(ABANDON_ABOUT, "").unwrap();
        let b = mnemonic_to_seed(&ABANDON_ABOUT.to_uppercase(), "").unwrap();
        assert_eq!(a.as_bytes(), b.as_bytes());

        let other = generate_mnemonic(MnemonicStrength::Words12).unwrap();
        assert_ne!(a.as_bytes(), mnemonic_to_seed(&other, "").unwrap().as_bytes());
        assert_ne!(a.as_bytes(), mnemonic_to_seed(ABANDON_ABOUT, "extra").unwrap().as_bytes());
    }

    #[test]
    fn test_seed_from_slice() {
        assert!(Seed::from_slice(&[7u8; SEED_LEN]).is_some());
        assert!(Seed::from_slice(&[7u8; 32]).is_none());
        assert_eq!(format!("{:?}", Seed::from_bytes([1u8; SEED_LEN])), "Seed(..)");
    }
}
