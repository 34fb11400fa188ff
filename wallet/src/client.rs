//! Account-scoped external client slot
//!
//! Privacy and swap integrations need a client bound to one account's
//! keypair. The session owns exactly one such client, builds it on first use
//! and drops it whenever the active account changes or the wallet locks.

use std::fmt;

pub struct AccountClientSlot<C> {
    slot: Option<(u32, C)>,
}

impl<C> AccountClientSlot<C> {
    pub fn new() -> Self {
        Self { slot: None }
    }

    /// Return the client for `account_index`, building it with `init` when
    /// the slot is empty or holds a client for another account.
    pub fn get_or_try_init<E, F>(&mut self, account_index: u32, init: F) -> Result<&mut C, E>
    where
        F: FnOnce() -> Result<C, E>,
    {
        let client = match self.slot.take() {
            Some((index, client)) if index == account_index => client,
            _ => {
                let client = init()?;
                log::debug!("Account client initialised for account {}", account_index);
                client
            }
        };

        let (_, client) = self.slot.insert((account_index, client));
        Ok(client)
    }

    pub fn reset(&mut self) {
        if self.slot.take().is_some() {
            log::debug!("Account client reset");
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.slot.is_some()
    }

    pub fn account_index(&self) -> Option<u32> {
        self.slot.as_ref().map(|(index, _)| *index)
    }
}

impl<C> Default for AccountClientSlot<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> fmt::Debug for AccountClientSlot<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccountClientSlot")
            .field("account_index", &self.account_index())
            .finish()
    }
}
