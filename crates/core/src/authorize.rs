//! Authorization service: resolve claims, consult the user store, apply the
//! provisioning policy, and create the account when the policy asks for it.
//!
//! The service holds no mutable state of its own. The user store is the only
//! shared mutable resource, so the service is safe to call from many threads
//! at once. Two concurrent first logins for the same email both see "absent"
//! and both try to create; the loser gets [`StoreError::DuplicateEmail`],
//! re-reads the winner's row once, and continues from that row.

use std::sync::Arc;

use tracing::{debug, info};

use crate::audit::{AuditSink, AuthorizationEvent, TracingAuditSink};
use crate::claims::{self, ClaimsProvider};
use crate::config::JitConfig;
use crate::errors::{AuthorizationError, StoreError, StoreOperation};
use crate::models::{NewAccount, ProvisioningDecision, ResolvedIdentity, UserAccount};
use crate::policy::{self, ProvisioningOutcome, RejectReason};
use crate::store::UserStore;

/// Per-request authorization pipeline over an injected user store.
pub struct AuthorizationService {
    store: Arc<dyn UserStore>,
    audit: Arc<dyn AuditSink>,
    jit: JitConfig,
}

impl AuthorizationService {
    /// Create a service that audits through `tracing`.
    pub fn new(store: Arc<dyn UserStore>, jit: JitConfig) -> Self {
        Self::with_audit(store, jit, Arc::new(TracingAuditSink))
    }

    pub fn with_audit(store: Arc<dyn UserStore>, jit: JitConfig, audit: Arc<dyn AuditSink>) -> Self {
        info!(
            jit = jit.enabled_label(),
            default_status = jit.default_status_label(),
            required_attributes = jit.attributes_label(),
            "authorization service ready"
        );
        Self { store, audit, jit }
    }

    pub fn jit_config(&self) -> &JitConfig {
        &self.jit
    }

    pub fn store(&self) -> &Arc<dyn UserStore> {
        &self.store
    }

    /// Decide whether the identity behind `primary` (falling back per field
    /// to `secondary`) may use the application, provisioning an account on
    /// first visit when policy allows.
    ///
    /// Emits exactly one audit event.
    pub fn authorize(
        &self,
        primary: &dyn ClaimsProvider,
        secondary: Option<&dyn ClaimsProvider>,
    ) -> ProvisioningDecision {
        let identity = claims::resolve(primary, secondary);
        debug!(
            email = %identity.email,
            first_name = %identity.first_name,
            last_name = %identity.last_name,
            "resolved identity from claims"
        );

        let (decision, provisioned) = self.decide(&identity);
        self.audit
            .record(&AuthorizationEvent::new(&identity, &decision, provisioned));
        decision
    }

    /// Returns the decision and whether this call created the account.
    fn decide(&self, identity: &ResolvedIdentity) -> (ProvisioningDecision, bool) {
        if !identity.has_email() {
            return (
                ProvisioningDecision::Error(AuthorizationError::MissingIdentity),
                false,
            );
        }

        let existing = match self.store.find_by_email(&identity.email) {
            Ok(existing) => existing,
            Err(e) => return (store_failure(identity, StoreOperation::FindByEmail, e), false),
        };

        match policy::decide(identity, existing, &self.jit) {
            ProvisioningOutcome::CreateThenAuthorize(account) => self.provision(identity, &account),
            outcome => (settle(identity, outcome), false),
        }
    }

    fn provision(
        &self,
        identity: &ResolvedIdentity,
        account: &NewAccount,
    ) -> (ProvisioningDecision, bool) {
        info!(
            email = %account.email,
            first_name = %account.first_name,
            last_name = %account.last_name,
            is_active = account.is_active,
            "creating account via JIT"
        );

        match self.store.create_account(account) {
            Ok(created) => (ProvisioningDecision::Authorized(created), true),
            Err(StoreError::DuplicateEmail(_)) => (self.adopt_existing(identity), false),
            Err(e) => (store_failure(identity, StoreOperation::CreateAccount, e), false),
        }
    }

    /// A concurrent request created the account first; continue with its row.
    fn adopt_existing(&self, identity: &ResolvedIdentity) -> ProvisioningDecision {
        info!(email = %identity.email, "account created concurrently, re-reading");

        match self.store.find_by_email(&identity.email) {
            Ok(Some(account)) => settle_existing(identity, account, &self.jit),
            Ok(None) => store_failure(
                identity,
                StoreOperation::FindByEmail,
                StoreError::Inconsistent(format!(
                    "duplicate email reported for '{}' but no account found",
                    identity.email
                )),
            ),
            Err(e) => store_failure(identity, StoreOperation::FindByEmail, e),
        }
    }
}

/// Resume the policy from the existing-account rules.
fn settle_existing(
    identity: &ResolvedIdentity,
    account: UserAccount,
    jit: &JitConfig,
) -> ProvisioningDecision {
    settle(identity, policy::decide(identity, Some(account), jit))
}

/// Map a terminal policy outcome to the decision returned to callers.
fn settle(identity: &ResolvedIdentity, outcome: ProvisioningOutcome) -> ProvisioningDecision {
    match outcome {
        ProvisioningOutcome::Authorize(account) => ProvisioningDecision::Authorized(account),
        ProvisioningOutcome::Deny(reason) => ProvisioningDecision::Denied(reason),
        ProvisioningOutcome::Reject(RejectReason::MissingIdentity) => {
            ProvisioningDecision::Error(AuthorizationError::MissingIdentity)
        }
        ProvisioningOutcome::Reject(RejectReason::MissingAttributes) => {
            ProvisioningDecision::Error(AuthorizationError::MissingAttributes {
                email: identity.email.clone(),
                first_name: identity.first_name.clone(),
                last_name: identity.last_name.clone(),
            })
        }
        // The policy only asks for creation when no row was found.
        ProvisioningOutcome::CreateThenAuthorize(account) => {
            ProvisioningDecision::Error(AuthorizationError::Store {
                email: account.email,
                operation: StoreOperation::CreateAccount,
                source: StoreError::Inconsistent("creation requested for an existing account".into()),
            })
        }
    }
}

fn store_failure(
    identity: &ResolvedIdentity,
    operation: StoreOperation,
    source: StoreError,
) -> ProvisioningDecision {
    ProvisioningDecision::Error(AuthorizationError::Store {
        email: identity.email.clone(),
        operation,
        source,
    })
}
