//! Error types for the JitGate core library.
//!
//! Each subsystem has its own error type derived with `thiserror`. The
//! daemon wraps them in `anyhow` with context at the binary boundary.

use thiserror::Error;

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

/// Errors from configuration loading and validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file not found.
    #[error("configuration file not found: {0}")]
    FileNotFound(String),

    /// TOML parse error.
    #[error("configuration parse error: {0}")]
    ParseError(String),

    /// A config value is invalid.
    #[error("invalid configuration value for '{field}': {detail}")]
    InvalidValue {
        field: String,
        detail: String,
    },

    /// Generic I/O error reading the config file.
    #[error("configuration I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// Database errors
// ---------------------------------------------------------------------------

/// Errors from the SQLite persistence layer.
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Underlying rusqlite error.
    #[error("database error: {0}")]
    SqliteError(#[from] rusqlite::Error),

    /// A migration failed.
    #[error("database migration failed (version {version}): {detail}")]
    MigrationFailed {
        version: u32,
        detail: String,
    },
}

impl DatabaseError {
    /// True when the underlying SQLite error is a UNIQUE constraint failure.
    pub fn is_unique_violation(&self) -> bool {
        match self {
            Self::SqliteError(rusqlite::Error::SqliteFailure(err, _)) => {
                err.code == rusqlite::ErrorCode::ConstraintViolation
                    && err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
            }
            _ => false,
        }
    }
}

// ---------------------------------------------------------------------------
// User store errors
// ---------------------------------------------------------------------------

/// Errors surfaced by a [`UserStore`](crate::store::UserStore).
#[derive(Debug, Error)]
pub enum StoreError {
    /// An account with this email already exists. Raised by `create_account`
    /// when a concurrent first login won the race.
    #[error("an account for '{0}' already exists")]
    DuplicateEmail(String),

    /// The persistence backend failed.
    #[error("user store backend error: {0}")]
    Backend(#[from] DatabaseError),

    /// The store could not be reached or is shutting down.
    #[error("user store unavailable: {0}")]
    Unavailable(String),

    /// The store contradicted itself, e.g. reported a duplicate email and
    /// then no row for it.
    #[error("user store inconsistent: {0}")]
    Inconsistent(String),
}

// ---------------------------------------------------------------------------
// Authorization errors
// ---------------------------------------------------------------------------

/// Failures of the authorization pipeline. Denials are not errors and never
/// appear here.
#[derive(Debug, Error)]
pub enum AuthorizationError {
    /// No usable email after all claim sources were consulted.
    #[error("no email found in identity claims")]
    MissingIdentity,

    /// JIT creation refused because strict mode requires both names.
    #[error("missing required attributes for JIT creation of '{email}' (first name: '{first_name}', last name: '{last_name}')")]
    MissingAttributes {
        email: String,
        first_name: String,
        last_name: String,
    },

    /// A store operation failed for this identity.
    #[error("{operation} failed for '{email}': {source}")]
    Store {
        email: String,
        operation: StoreOperation,
        #[source]
        source: StoreError,
    },
}

/// The store operation that was in flight when an error occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOperation {
    FindByEmail,
    CreateAccount,
}

impl std::fmt::Display for StoreOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::FindByEmail => write!(f, "find_by_email"),
            Self::CreateAccount => write!(f, "create_account"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_messages() {
        let err = StoreError::DuplicateEmail("alice@example.com".into());
        assert_eq!(
            err.to_string(),
            "an account for 'alice@example.com' already exists"
        );

        let err = AuthorizationError::MissingAttributes {
            email: "bob@example.com".into(),
            first_name: "Bob".into(),
            last_name: String::new(),
        };
        assert!(err.to_string().contains("bob@example.com"));
        assert!(err.to_string().contains("last name: ''"));

        let err = AuthorizationError::Store {
            email: "carol@example.com".into(),
            operation: StoreOperation::CreateAccount,
            source: StoreError::Unavailable("closed".into()),
        };
        assert_eq!(
            err.to_string(),
            "create_account failed for 'carol@example.com': user store unavailable: closed"
        );
    }

    #[test]
    fn test_unique_violation_detection() {
        let conn = rusqlite::Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE t (email TEXT NOT NULL UNIQUE);")
            .unwrap();
        conn.execute("INSERT INTO t (email) VALUES ('a')", []).unwrap();
        let err: DatabaseError = conn
            .execute("INSERT INTO t (email) VALUES ('a')", [])
            .unwrap_err()
            .into();
        assert!(err.is_unique_violation());

        let err = DatabaseError::MigrationFailed {
            version: 1,
            detail: "x".into(),
        };
        assert!(!err.is_unique_violation());
    }
}
