//! Auto-lock functionality for wallet security
//!
//! Locks the shared session after a period of inactivity so decrypted key
//! material does not stay in memory when the user steps away. Idleness is
//! measured from the session's own activity stamp, so work done through any
//! clone of the [`SharedSession`] keeps it unlocked.

use crate::config::WalletConfig;
use crate::error::Result;
use crate::session::SessionState;
use crate::shared::SharedSession;
use crate::storage::KeyValueStore;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::sleep;

/// Auto-lock configuration
#[derive(Debug, Clone)]
pub struct AutoLockConfig {
    /// Duration of inactivity before auto-locking
    pub timeout: Duration,
    /// Whether auto-lock is enabled
    pub enabled: bool,
}

impl Default for AutoLockConfig {
    fn default() -> Self {
        Self::with_timeout(Duration::from_secs(300))
    }
}

impl AutoLockConfig {
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout,
            enabled: true,
        }
    }

    pub fn disabled() -> Self {
        Self {
            timeout: Duration::ZERO,
            enabled: false,
        }
    }

    /// `auto_lock_secs = 0` disables auto-lock.
    pub fn from_wallet_config(config: &WalletConfig) -> Self {
        config
            .auto_lock_timeout()
            .map(Self::with_timeout)
            .unwrap_or_else(Self::disabled)
    }
}

type LockCallback = Box<dyn Fn() + Send + Sync>;

/// Locks a [`SharedSession`] once it has been idle for the configured timeout.
pub struct AutoLockManager<S: KeyValueStore, C = ()> {
    session: SharedSession<S, C>,
    config: Arc<RwLock<AutoLockConfig>>,
    on_lock: Arc<RwLock<Option<LockCallback>>>,
}

impl<S, C> AutoLockManager<S, C>
where
    S: KeyValueStore + 'static,
    C: Send + Sync + 'static,
{
    pub fn new(session: SharedSession<S, C>, config: AutoLockConfig) -> Self {
        Self {
            session,
            config: Arc::new(RwLock::new(config)),
            on_lock: Arc::new(RwLock::new(None)),
        }
    }

    pub fn session(&self) -> &SharedSession<S, C> {
        &self.session
    }

    pub async fn is_locked(&self) -> bool {
        self.session.state().await == SessionState::Locked
    }

    /// Lock the wallet immediately
    pub async fn lock(&self) {
        self.session.lock_wallet().await;

        if let Some(callback) = &*self.on_lock.read().await {
            callback();
        }
    }

    /// Unlock the wallet; the session restarts the inactivity timer.
    pub async fn unlock(&self, password: &str) -> Result<()> {
        self.session.unlock_wallet(password).await
    }

    /// Update last activity timestamp (call on UI interaction that does not
    /// go through the session)
    pub async fn update_activity(&self) {
        self.session.record_activity();
    }

    pub async fn time_until_lock(&self) -> Option<Duration> {
        let config = self.config.read().await;
        if !config.enabled {
            return None;
        }

        let elapsed = self.session.idle_time();
        Some(config.timeout.saturating_sub(elapsed))
    }

    pub async fn set_on_lock<F>(&self, callback: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        *self.on_lock.write().await = Some(Box::new(callback));
    }

    pub async fn update_config(&self, config: AutoLockConfig) {
        *self.config.write().await = config;
    }

    pub async fn get_config(&self) -> AutoLockConfig {
        self.config.read().await.clone()
    }

    /// Spawn the background task that locks the session after the timeout.
    ///
    /// `check_interval` bounds how late the lock may happen.
    pub fn start_monitor_with_interval(
        self: Arc<Self>,
        check_interval: Duration,
    ) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                sleep(check_interval).await;

                let config = self.config.read().await.clone();

                // Only an unlocked session has anything to lock
                if !config.enabled || !self.session.is_unlocked().await {
                    continue;
                }

                let elapsed = self.session.idle_time();
                if elapsed >= config.timeout {
                    log::info!(
                        "Auto-locking wallet after {} seconds of inactivity",
                        elapsed.as_secs()
                    );
                    self.lock().await;
                }
            }
        })
    }

    /// Start the monitor with a 10-second check interval
    pub fn start_monitor(self: Arc<Self>) -> tokio::task::JoinHandle<()> {
        self.start_monitor_with_interval(Duration::from_secs(10))
    }
}
