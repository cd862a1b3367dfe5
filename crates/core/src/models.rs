//! Domain model types used throughout JitGate.
//!
//! These types bridge the authorization pipeline, the user store, and the
//! web layer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::AuthorizationError;

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// Canonical identity fields resolved from a claim set.
///
/// `email` is empty when no claim source provided one; empty names are left
/// for the provisioning policy to interpret.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResolvedIdentity {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
}

impl ResolvedIdentity {
    pub fn has_email(&self) -> bool {
        !self.email.is_empty()
    }

    /// True when both name fields carry a value.
    pub fn has_full_name(&self) -> bool {
        !self.first_name.is_empty() && !self.last_name.is_empty()
    }
}

// ---------------------------------------------------------------------------
// User account
// ---------------------------------------------------------------------------

/// A row from the `users` table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserAccount {
    pub id: i64,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserAccount {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    /// `is_active` is the sole authorization gate once an account exists.
    pub fn is_authorized(&self) -> bool {
        self.is_active
    }
}

/// Field values for a new account; the store assigns id and timestamps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAccount {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub is_active: bool,
}

// ---------------------------------------------------------------------------
// Decision
// ---------------------------------------------------------------------------

/// Why an identity was refused access.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DenyReason {
    /// No account exists and JIT provisioning is disabled.
    NotFound,
    /// The account exists but is deactivated.
    Inactive,
}

impl std::fmt::Display for DenyReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound => write!(f, "not_found"),
            Self::Inactive => write!(f, "inactive"),
        }
    }
}

/// Classification of a failed authorization attempt.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DecisionErrorKind {
    MissingIdentity,
    MissingAttributes,
    Store,
}

impl std::fmt::Display for DecisionErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingIdentity => write!(f, "missing_identity"),
            Self::MissingAttributes => write!(f, "missing_attributes"),
            Self::Store => write!(f, "store"),
        }
    }
}

impl From<&AuthorizationError> for DecisionErrorKind {
    fn from(err: &AuthorizationError) -> Self {
        match err {
            AuthorizationError::MissingIdentity => Self::MissingIdentity,
            AuthorizationError::MissingAttributes { .. } => Self::MissingAttributes,
            AuthorizationError::Store { .. } => Self::Store,
        }
    }
}

/// Final outcome of one authorization request.
#[derive(Debug)]
pub enum ProvisioningDecision {
    Authorized(UserAccount),
    Denied(DenyReason),
    Error(AuthorizationError),
}

impl ProvisioningDecision {
    pub fn is_authorized(&self) -> bool {
        matches!(self, Self::Authorized(_))
    }

    /// The authorized account, if any.
    pub fn account(&self) -> Option<&UserAccount> {
        match self {
            Self::Authorized(account) => Some(account),
            _ => None,
        }
    }

    /// Error classification, if this decision is an error.
    pub fn error_kind(&self) -> Option<DecisionErrorKind> {
        match self {
            Self::Error(err) => Some(err.into()),
            _ => None,
        }
    }

    /// Stable label used in logs and the audit trail.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Authorized(_) => "authorized",
            Self::Denied(DenyReason::NotFound) => "denied_not_found",
            Self::Denied(DenyReason::Inactive) => "denied_inactive",
            Self::Error(err) => match DecisionErrorKind::from(err) {
                DecisionErrorKind::MissingIdentity => "error_missing_identity",
                DecisionErrorKind::MissingAttributes => "error_missing_attributes",
                DecisionErrorKind::Store => "error_store",
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::{StoreError, StoreOperation};

    fn account(active: bool) -> UserAccount {
        let now = Utc::now();
        UserAccount {
            id: 7,
            email: "jane@example.com".into(),
            first_name: "Jane".into(),
            last_name: "Doe".into(),
            is_active: active,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_account_helpers() {
        let acct = account(true);
        assert_eq!(acct.full_name(), "Jane Doe");
        assert!(acct.is_authorized());
        assert!(!account(false).is_authorized());
    }

    #[test]
    fn test_decision_labels() {
        assert_eq!(
            ProvisioningDecision::Authorized(account(true)).label(),
            "authorized"
        );
        assert_eq!(
            ProvisioningDecision::Denied(DenyReason::Inactive).label(),
            "denied_inactive"
        );
        let err = ProvisioningDecision::Error(AuthorizationError::Store {
            email: "x@example.com".into(),
            operation: StoreOperation::FindByEmail,
            source: StoreError::Unavailable("down".into()),
        });
        assert_eq!(err.label(), "error_store");
        assert_eq!(err.error_kind(), Some(DecisionErrorKind::Store));
        assert!(err.account().is_none());
    }

    #[test]
    fn test_identity_helpers() {
        let mut id = ResolvedIdentity::default();
        assert!(!id.has_email());
        id.email = "a@b.c".into();
        id.first_name = "A".into();
        assert!(id.has_email());
        assert!(!id.has_full_name());
        id.last_name = "B".into();
        assert!(id.has_full_name());
    }
}
