//! Handle access-control state.
//!
//! The encryption service only decrypts a handle for accounts that are on
//! that handle's access list. The registry adds entries: itself and the
//! creator when a record is created, the recipient when access is granted.
//! Entries are never removed.

use std::collections::{HashMap, HashSet};
use std::sync::{PoisonError, RwLock};

use timelock_core::{Address, EncryptedHandle};

/// Access-control layer of the encryption service.
pub trait AccessControl: Send + Sync {
    /// Allow `account` to decrypt `handle`. Allowing twice is a no-op.
    fn allow(&self, handle: &EncryptedHandle, account: Address);

    /// Whether `account` may decrypt `handle`.
    fn is_allowed(&self, handle: &EncryptedHandle, account: &Address) -> bool;
}

/// In-memory access lists, indexed both ways.
#[derive(Debug, Default)]
pub struct HandleAcl {
    inner: RwLock<AclInner>,
}

#[derive(Debug, Default)]
struct AclInner {
    /// handle -> accounts allowed on it.
    by_handle: HashMap<EncryptedHandle, HashSet<Address>>,

    /// Index: account -> handles it may decrypt, in the order granted.
    by_account: HashMap<Address, Vec<EncryptedHandle>>,
}

impl HandleAcl {
    /// Create an empty access list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Accounts allowed on `handle`, sorted.
    pub fn allowed_accounts(&self, handle: &EncryptedHandle) -> Vec<Address> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        let mut accounts: Vec<Address> = inner
            .by_handle
            .get(handle)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default();
        accounts.sort();
        accounts
    }

    /// Handles `account` may decrypt, in the order they were allowed.
    pub fn handles_for(&self, account: &Address) -> Vec<EncryptedHandle> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner.by_account.get(account).cloned().unwrap_or_default()
    }
}

impl AccessControl for HandleAcl {
    fn allow(&self, handle: &EncryptedHandle, account: Address) {
        // Entries are inserted whole, so state behind a poisoned lock is
        // still consistent.
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);

        let inserted = inner.by_handle.entry(*handle).or_default().insert(account);
        if inserted {
            inner.by_account.entry(account).or_default().push(*handle);
            tracing::debug!(handle = ?handle, account = %account, "handle access allowed");
        }
    }

    fn is_allowed(&self, handle: &EncryptedHandle, account: &Address) -> bool {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner
            .by_handle
            .get(handle)
            .is_some_and(|set| set.contains(account))
    }
}

impl<A: AccessControl + ?Sized> AccessControl for std::sync::Arc<A> {
    fn allow(&self, handle: &EncryptedHandle, account: Address) {
        (**self).allow(handle, account)
    }

    fn is_allowed(&self, handle: &EncryptedHandle, account: &Address) -> bool {
        (**self).is_allowed(handle, account)
    }
}
