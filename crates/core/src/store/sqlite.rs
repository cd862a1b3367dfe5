//! SQLite-backed user store.

use std::sync::Arc;

use tracing::{debug, warn};

use super::UserStore;
use crate::db::Database;
use crate::errors::StoreError;
use crate::models::{NewAccount, UserAccount};

/// [`UserStore`] over the shared [`Database`] handle.
#[derive(Clone)]
pub struct SqliteUserStore {
    db: Arc<Database>,
}

impl SqliteUserStore {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    pub fn database(&self) -> &Arc<Database> {
        &self.db
    }
}

impl UserStore for SqliteUserStore {
    fn find_by_email(&self, email: &str) -> Result<Option<UserAccount>, StoreError> {
        Ok(self.db.get_user_by_email(email)?)
    }

    fn create_account(&self, account: &NewAccount) -> Result<UserAccount, StoreError> {
        match self.db.insert_user(
            &account.email,
            &account.first_name,
            &account.last_name,
            account.is_active,
        ) {
            Ok(user) => {
                debug!(id = user.id, email = %user.email, "account created");
                Ok(user)
            }
            Err(e) if e.is_unique_violation() => {
                warn!(email = %account.email, "account already exists, create lost a race");
                Err(StoreError::DuplicateEmail(account.email.clone()))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn ping(&self) -> Result<(), StoreError> {
        Ok(self.db.ping()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> SqliteUserStore {
        let db = Database::in_memory().unwrap();
        db.initialize().unwrap();
        SqliteUserStore::new(Arc::new(db))
    }

    fn new_account(email: &str) -> NewAccount {
        NewAccount {
            email: email.into(),
            first_name: "Test".into(),
            last_name: "User".into(),
            is_active: true,
        }
    }

    #[test]
    fn test_create_then_find() {
        let store = store();
        let created = store.create_account(&new_account("t@example.com")).unwrap();
        let found = store.find_by_email("t@example.com").unwrap();
        assert_eq!(found, Some(created));
        store.ping().unwrap();
    }

    #[test]
    fn test_duplicate_create_is_distinguishable() {
        let store = store();
        store.create_account(&new_account("t@example.com")).unwrap();
        let err = store.create_account(&new_account("t@example.com")).unwrap_err();
        assert!(matches!(err, StoreError::DuplicateEmail(ref e) if e == "t@example.com"));
    }

    #[test]
    fn test_backend_failure_is_not_duplicate() {
        let db = Database::in_memory().unwrap();
        // Schema never initialized: every query fails.
        let store = SqliteUserStore::new(Arc::new(db));
        let err = store.find_by_email("t@example.com").unwrap_err();
        assert!(matches!(err, StoreError::Backend(_)));
        let err = store.create_account(&new_account("t@example.com")).unwrap_err();
        assert!(matches!(err, StoreError::Backend(_)));
    }
}
