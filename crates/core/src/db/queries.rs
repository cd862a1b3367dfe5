//! Typed query helpers for every table in the JitGate database.

use chrono::{DateTime, Utc};
use rusqlite::{params, Row};
use tracing::debug;

use super::Database;
use crate::errors::DatabaseError;
use crate::models::UserAccount;

const USER_COLUMNS: &str = "id, email, first_name, last_name, is_active, created_at, updated_at";

/// A row from the `audit_log` table.
#[derive(Debug, Clone)]
pub struct AuditLogEntry {
    pub id: i64,
    pub action: String,
    pub email: Option<String>,
    pub outcome: String,
    pub success: bool,
    pub details: Option<String>,
    pub created_at: String,
}

impl Database {
    // -- users --------------------------------------------------------------

    /// Look up a user by email. Matching ignores ASCII case.
    pub fn get_user_by_email(&self, email: &str) -> Result<Option<UserAccount>, DatabaseError> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = ?1 LIMIT 1"
        ))?;
        let mut rows = stmt.query_map(params![email], user_from_row)?;
        match rows.next() {
            Some(Ok(user)) => Ok(Some(user)),
            Some(Err(e)) => Err(e.into()),
            None => Ok(None),
        }
    }

    /// Insert a new user and return the stored row.
    ///
    /// Fails with a UNIQUE constraint violation if the email is taken; see
    /// [`DatabaseError::is_unique_violation`].
    pub fn insert_user(
        &self,
        email: &str,
        first_name: &str,
        last_name: &str,
        is_active: bool,
    ) -> Result<UserAccount, DatabaseError> {
        let now = Utc::now().to_rfc3339();
        let conn = self.conn();
        let user = conn.query_row(
            &format!(
                "INSERT INTO users (email, first_name, last_name, is_active, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?5)
                 RETURNING {USER_COLUMNS}"
            ),
            params![email, first_name, last_name, is_active, now],
            user_from_row,
        )?;
        debug!(id = user.id, email, "inserted user");
        Ok(user)
    }

    /// Count all user rows.
    pub fn count_users(&self) -> Result<i64, DatabaseError> {
        let conn = self.conn();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?;
        Ok(count)
    }

    // -- audit_log ----------------------------------------------------------

    /// Insert an audit-log entry.
    pub fn insert_audit_log(
        &self,
        action: &str,
        email: Option<&str>,
        outcome: &str,
        success: bool,
        details: Option<&str>,
    ) -> Result<i64, DatabaseError> {
        let now = Utc::now().to_rfc3339();
        let conn = self.conn();
        conn.execute(
            "INSERT INTO audit_log (action, email, outcome, success, details, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![action, email, outcome, success, details, now],
        )?;
        let id = conn.last_insert_rowid();
        debug!(id, action, outcome, "inserted audit_log entry");
        Ok(id)
    }

    /// List recent audit-log entries, newest first.
    pub fn list_audit_log(&self, limit: u32) -> Result<Vec<AuditLogEntry>, DatabaseError> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, action, email, outcome, success, details, created_at
             FROM audit_log ORDER BY id DESC LIMIT ?1",
        )?;
        let entries = stmt
            .query_map(params![limit], |row| {
                Ok(AuditLogEntry {
                    id: row.get(0)?,
                    action: row.get(1)?,
                    email: row.get(2)?,
                    outcome: row.get(3)?,
                    success: row.get(4)?,
                    details: row.get(5)?,
                    created_at: row.get(6)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    /// Count total audit-log entries.
    pub fn count_audit_log(&self) -> Result<i64, DatabaseError> {
        let conn = self.conn();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM audit_log", [], |row| row.get(0))?;
        Ok(count)
    }
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<UserAccount> {
    Ok(UserAccount {
        id: row.get(0)?,
        email: row.get(1)?,
        first_name: row.get(2)?,
        last_name: row.get(3)?,
        is_active: row.get(4)?,
        created_at: timestamp(row, 5)?,
        updated_at: timestamp(row, 6)?,
    })
}

fn timestamp(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn db() -> Database {
        let db = Database::in_memory().unwrap();
        db.initialize().unwrap();
        db
    }

    #[test]
    fn test_insert_and_get_user() {
        let db = db();
        let created = db.insert_user("jdoe@example.com", "John", "Doe", true).unwrap();
        assert!(created.id > 0);
        assert!(created.is_active);
        assert_eq!(created.created_at, created.updated_at);

        let found = db.get_user_by_email("jdoe@example.com").unwrap().unwrap();
        assert_eq!(found, created);
        assert!(db.get_user_by_email("nobody@example.com").unwrap().is_none());
    }

    #[test]
    fn test_duplicate_email_is_unique_violation() {
        let db = db();
        db.insert_user("dup@example.com", "A", "B", true).unwrap();
        let err = db.insert_user("dup@example.com", "C", "D", false).unwrap_err();
        assert!(err.is_unique_violation());
        assert_eq!(db.count_users().unwrap(), 1);
    }

    #[test]
    fn test_lookup_ignores_case() {
        let db = db();
        db.insert_user("mixed@example.com", "M", "X", true).unwrap();
        assert!(db.get_user_by_email("MIXED@example.com").unwrap().is_some());
    }

    #[test]
    fn test_inactive_flag_round_trips() {
        let db = db();
        db.insert_user("off@example.com", "Off", "Line", false).unwrap();
        let found = db.get_user_by_email("off@example.com").unwrap().unwrap();
        assert!(!found.is_active);
    }

    #[test]
    fn test_corrupt_timestamp_surfaces_error() {
        let db = db();
        db.conn()
            .execute(
                "INSERT INTO users (email, created_at, updated_at) VALUES ('bad@example.com', 'yesterday', 'yesterday')",
                [],
            )
            .unwrap();
        assert!(db.get_user_by_email("bad@example.com").is_err());
    }

    #[test]
    fn test_audit_log() {
        let db = db();
        db.insert_audit_log("authorize", Some("a@example.com"), "authorized", true, None)
            .unwrap();
        db.insert_audit_log("authorize", None, "error_missing_identity", false, Some("no email"))
            .unwrap();

        let entries = db.list_audit_log(10).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].outcome, "error_missing_identity");
        assert!(!entries[0].success);
        assert_eq!(entries[1].email.as_deref(), Some("a@example.com"));
        assert_eq!(db.count_audit_log().unwrap(), 2);
    }
}
