//! Thread-safe session handle
//!
//! Wraps a [`WalletSession`] in `Arc<tokio::sync::RwLock<_>>`. Key stretching
//! (create, import, unlock, password re-checks) runs on the blocking pool
//! while holding an owned write guard, so no other operation observes a
//! half-finished transition.
//!
//! Every operation made through the handle stamps the last-activity time
//! before its guard is released, which is what auto-lock measures idleness
//! against.

use crate::error::{Result, WalletError};
use crate::hd::DerivedWallet;
use crate::session::{SessionState, WalletSession, WalletState};
use crate::storage::KeyValueStore;
use shade_crypto::{KeyPair, SIGNATURE_LEN};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::sync::{RwLock, RwLockReadGuard};
use zeroize::Zeroizing;

pub struct SharedSession<S: KeyValueStore, C = ()> {
    inner: Arc<RwLock<WalletSession<S, C>>>,
    last_activity: Arc<Mutex<Instant>>,
}

impl<S: KeyValueStore, C> Clone for SharedSession<S, C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            last_activity: Arc::clone(&self.last_activity),
        }
    }
}

impl<S, C> SharedSession<S, C>
where
    S: KeyValueStore + 'static,
    C: Send + Sync + 'static,
{
    pub fn new(session: WalletSession<S, C>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(session)),
            last_activity: Arc::new(Mutex::new(Instant::now())),
        }
    }

    /// Restart the inactivity clock.
    pub fn record_activity(&self) {
        stamp(&self.last_activity);
    }

    /// Time since the last operation made through any clone of this handle.
    pub fn idle_time(&self) -> Duration {
        self.last_activity
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .elapsed()
    }

    /// Run `f` on the blocking pool with exclusive access to the session.
    async fn run_blocking<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut WalletSession<S, C>) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let mut guard = Arc::clone(&self.inner).write_owned().await;
        let last_activity = Arc::clone(&self.last_activity);
        tokio::task::spawn_blocking(move || {
            let result = f(&mut *guard);
            // stamped before the guard drops so a fresh unlock is never seen as idle
            stamp(&last_activity);
            result
        })
        .await
        .map_err(|e| WalletError::Task(e.to_string()))?
    }

    pub async fn create_wallet(&self, password: &str, word_count: usize) -> Result<Zeroizing<String>> {
        let password = Zeroizing::new(password.to_string());
        self.run_blocking(move |session| session.create_wallet(&password, word_count))
            .await
    }

    pub async fn import_wallet(&self, mnemonic: &str, password: &str) -> Result<()> {
        let mnemonic = Zeroizing::new(mnemonic.to_string());
        let password = Zeroizing::new(password.to_string());
        self.run_blocking(move |session| session.import_wallet(&mnemonic, &password))
            .await
    }

    pub async fn unlock_wallet(&self, password: &str) -> Result<()> {
        let password = Zeroizing::new(password.to_string());
        self.run_blocking(move |session| session.unlock_wallet(&password))
            .await
    }

    pub async fn lock_wallet(&self) {
        self.inner.write().await.lock_wallet();
    }

    pub async fn delete_wallet(&self) -> Result<()> {
        self.run_blocking(|session| session.delete_wallet()).await
    }

    pub async fn switch_wallet(&self, index: u32) -> Result<bool> {
        let mut session = self.inner.write().await;
        self.record_activity();
        session.switch_wallet(index)
    }

    pub async fn get_stealth_address(&self, stealth_index: u32) -> Result<DerivedWallet> {
        let session = self.inner.read().await;
        self.record_activity();
        session.get_stealth_address(stealth_index)
    }

    pub async fn active_keypair(&self) -> Option<KeyPair> {
        self.inner.read().await.active_keypair()
    }

    /// Signs with a copy of the active keypair taken under a short read
    /// lock; the session may lock while the signature is computed.
    pub async fn sign_transaction(&self, message: &[u8]) -> Result<[u8; SIGNATURE_LEN]> {
        let keypair = {
            let session = self.inner.read().await;
            self.record_activity();
            session.active_keypair().ok_or(WalletError::WalletLocked)?
        };
        Ok(keypair.sign(message))
    }

    pub async fn reveal_mnemonic(&self, password: &str) -> Result<Zeroizing<String>> {
        let password = Zeroizing::new(password.to_string());
        self.run_blocking(move |session| session.reveal_mnemonic(&password))
            .await
    }

    pub async fn export_private_key(&self, index: u32, password: &str) -> Result<Zeroizing<String>> {
        let password = Zeroizing::new(password.to_string());
        self.run_blocking(move |session| session.export_private_key(index, &password))
            .await
    }

    pub async fn state(&self) -> SessionState {
        self.inner.read().await.state()
    }

    pub async fn is_unlocked(&self) -> bool {
        self.inner.read().await.is_unlocked()
    }

    pub async fn snapshot(&self) -> WalletState {
        self.inner.read().await.snapshot()
    }

    /// Shared read access for anything not wrapped above.
    pub async fn read(&self) -> RwLockReadGuard<'_, WalletSession<S, C>> {
        self.inner.read().await
    }
}

fn stamp(last_activity: &Mutex<Instant>) {
    *last_activity
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner()) = Instant::now();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WalletConfig;
    use crate::storage::MemoryStore;

    const PASSWORD: &str = "correcthorse123";

    fn shared() -> SharedSession<MemoryStore> {
        SharedSession::new(WalletSession::open(MemoryStore::new(), &WalletConfig::default()).unwrap())
    }

    #[tokio::test]
    async fn test_shared_lifecycle() {
        let session = shared();
        assert_eq!(session.state().await, SessionState::NoWallet);

        let mnemonic = session.create_wallet(PASSWORD, 12).await.unwrap();
        assert_eq!(mnemonic.split(' ').count(), 12);
        assert!(session.is_unlocked().await);

        session.lock_wallet().await;
        assert_eq!(session.state().await, SessionState::Locked);

        assert!(matches!(
            session.unlock_wallet("wrongpassword").await,
            Err(WalletError::IncorrectPassword)
        ));
        session.unlock_wallet(PASSWORD).await.unwrap();
        assert_eq!(
            session.reveal_mnemonic(PASSWORD).await.unwrap().as_str(),
            mnemonic.as_str()
        );

        session.delete_wallet().await.unwrap();
        assert_eq!(session.state().await, SessionState::NoWallet);
    }

    #[tokio::test]
    async fn test_signature_survives_concurrent_lock() {
        let session = shared();
        session.create_wallet(PASSWORD, 12).await.unwrap();

        let keypair = session.active_keypair().await.unwrap();
        session.lock_wallet().await;

        // the copy taken before locking is still usable
        let signature = keypair.sign(b"payload");
        assert!(KeyPair::verify(&keypair.public_key_base58(), b"payload", &signature).is_ok());

        assert!(matches!(
            session.sign_transaction(b"payload").await,
            Err(WalletError::WalletLocked)
        ));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_clones_share_state() {
        let session = shared();
        let other = session.clone();
        session.create_wallet(PASSWORD, 12).await.unwrap();

        let signer = tokio::spawn(async move { other.sign_transaction(b"tx").await });
        let signature = signer.await.unwrap().unwrap();

        let address = session.read().await.public_key().unwrap().to_string();
        assert!(KeyPair::verify(&address, b"tx", &signature).is_ok());

        assert!(session.switch_wallet(3).await.unwrap());
        assert_eq!(session.snapshot().await.active_wallet_index, 3);
        assert!(session.get_stealth_address(0).await.is_ok());
    }

    #[tokio::test]
    async fn test_operations_reset_idle_time() {
        let session = shared();
        session.create_wallet(PASSWORD, 12).await.unwrap();
        session.lock_wallet().await;

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert!(session.idle_time() >= Duration::from_millis(150));

        session.unlock_wallet(PASSWORD).await.unwrap();
        assert!(session.idle_time() < Duration::from_millis(100));

        tokio::time::sleep(Duration::from_millis(150)).await;
        let other = session.clone();
        other.sign_transaction(b"tx").await.unwrap();
        assert!(session.idle_time() < Duration::from_millis(100));
    }
}
