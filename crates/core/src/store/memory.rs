//! In-memory user store.
//!
//! Suitable for tests and throwaway deployments. Data is lost on restart.

use std::collections::HashMap;
use std::sync::RwLock;

use chrono::Utc;
use tracing::info;

use super::UserStore;
use crate::errors::StoreError;
use crate::models::{NewAccount, UserAccount};

#[derive(Debug, Default)]
struct Inner {
    next_id: i64,
    by_email: HashMap<String, UserAccount>,
}

/// [`UserStore`] keeping accounts in a lock-protected map keyed by
/// lowercased email.
#[derive(Debug, Default)]
pub struct MemoryUserStore {
    inner: RwLock<Inner>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a fully-formed account, replacing any with the same email.
    /// Intended for seeding fixtures.
    pub fn insert(&self, account: UserAccount) {
        let mut inner = self.write();
        inner.next_id = inner.next_id.max(account.id);
        inner.by_email.insert(account.email.to_lowercase(), account);
    }

    pub fn len(&self) -> usize {
        self.read().by_email.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Inner> {
        self.inner.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Inner> {
        self.inner.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl UserStore for MemoryUserStore {
    fn find_by_email(&self, email: &str) -> Result<Option<UserAccount>, StoreError> {
        Ok(self.read().by_email.get(&email.to_lowercase()).cloned())
    }

    fn create_account(&self, account: &NewAccount) -> Result<UserAccount, StoreError> {
        let key = account.email.to_lowercase();
        let mut inner = self.write();
        if inner.by_email.contains_key(&key) {
            return Err(StoreError::DuplicateEmail(account.email.clone()));
        }

        inner.next_id += 1;
        let now = Utc::now();
        let user = UserAccount {
            id: inner.next_id,
            email: account.email.clone(),
            first_name: account.first_name.clone(),
            last_name: account.last_name.clone(),
            is_active: account.is_active,
            created_at: now,
            updated_at: now,
        };
        inner.by_email.insert(key, user.clone());
        info!(id = user.id, email = %user.email, "account created in memory store");
        Ok(user)
    }
}
