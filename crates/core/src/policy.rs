//! Just-in-time provisioning policy.
//!
//! [`decide`] is a pure function of the resolved identity, the account the
//! store returned (if any), and the [`JitConfig`]. Rules are evaluated top to
//! bottom and the first match wins:
//!
//! 1. empty email -> reject (missing identity)
//! 2. existing, inactive -> deny (inactive)
//! 3. existing, active -> authorize
//! 4. absent, JIT disabled -> deny (not found)
//! 5. absent, strict mode, a name is missing -> reject (missing attributes)
//! 6. absent -> create with placeholder names, then authorize

use crate::config::JitConfig;
use crate::models::{DenyReason, NewAccount, ResolvedIdentity, UserAccount};

/// Placeholder for a missing first name on JIT-created accounts.
pub const DEFAULT_FIRST_NAME: &str = "Unknown";
/// Placeholder for a missing last name on JIT-created accounts.
pub const DEFAULT_LAST_NAME: &str = "User";

/// Why the policy refused to proceed at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    MissingIdentity,
    MissingAttributes,
}

/// What the authorization service should do next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProvisioningOutcome {
    Authorize(UserAccount),
    Deny(DenyReason),
    CreateThenAuthorize(NewAccount),
    Reject(RejectReason),
}

/// Apply the provisioning rules.
pub fn decide(
    identity: &ResolvedIdentity,
    existing: Option<UserAccount>,
    cfg: &JitConfig,
) -> ProvisioningOutcome {
    if !identity.has_email() {
        return ProvisioningOutcome::Reject(RejectReason::MissingIdentity);
    }

    if let Some(account) = existing {
        return if account.is_authorized() {
            ProvisioningOutcome::Authorize(account)
        } else {
            ProvisioningOutcome::Deny(DenyReason::Inactive)
        };
    }

    if !cfg.enabled {
        return ProvisioningOutcome::Deny(DenyReason::NotFound);
    }

    if cfg.require_attributes_for_creation && !identity.has_full_name() {
        return ProvisioningOutcome::Reject(RejectReason::MissingAttributes);
    }

    ProvisioningOutcome::CreateThenAuthorize(NewAccount {
        email: identity.email.clone(),
        first_name: or_default(&identity.first_name, DEFAULT_FIRST_NAME),
        last_name: or_default(&identity.last_name, DEFAULT_LAST_NAME),
        is_active: cfg.default_user_active,
    })
}

fn or_default(value: &str, default: &str) -> String {
    if value.is_empty() {
        default.to_string()
    } else {
        value.to_string()
    }
}
