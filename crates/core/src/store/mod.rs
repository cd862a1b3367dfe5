//! User store abstraction.
//!
//! The authorization service only needs two operations from persistence:
//! find an account by email and create one. Both backends enforce email
//! uniqueness and report a lost creation race as
//! [`StoreError::DuplicateEmail`] instead of overwriting.

pub mod memory;
pub mod sqlite;

pub use memory::MemoryUserStore;
pub use sqlite::SqliteUserStore;

use crate::errors::StoreError;
use crate::models::{NewAccount, UserAccount};

/// Persistence boundary consumed by the authorization service.
///
/// Implementations must be thread-safe; concurrent requests share one store.
pub trait UserStore: Send + Sync {
    /// Fetch the account registered under `email`, if any.
    fn find_by_email(&self, email: &str) -> Result<Option<UserAccount>, StoreError>;

    /// Create an account. Fails with [`StoreError::DuplicateEmail`] if the
    /// email is already registered.
    fn create_account(&self, account: &NewAccount) -> Result<UserAccount, StoreError>;

    /// Liveness check used by the health endpoint.
    fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

impl<S: UserStore + ?Sized> UserStore for std::sync::Arc<S> {
    fn find_by_email(&self, email: &str) -> Result<Option<UserAccount>, StoreError> {
        (**self).find_by_email(email)
    }

    fn create_account(&self, account: &NewAccount) -> Result<UserAccount, StoreError> {
        (**self).create_account(account)
    }

    fn ping(&self) -> Result<(), StoreError> {
        (**self).ping()
    }
}
