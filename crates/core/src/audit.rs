//! Audit trail for authorization decisions.
//!
//! The authorization service emits exactly one [`AuthorizationEvent`] per
//! request through an [`AuditSink`]. Sinks must not fail the request: a sink
//! that cannot record an event logs the problem and moves on.

use std::sync::Arc;

use tracing::{error, info, warn};

use crate::db::Database;
use crate::models::{DecisionErrorKind, ProvisioningDecision, ResolvedIdentity};

/// Audit action recorded for authorization decisions.
pub const AUTHORIZE_ACTION: &str = "authorize";

/// Summary of one authorization decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationEvent {
    /// Resolved email; `None` when the claims carried none.
    pub email: Option<String>,
    pub first_name: String,
    pub last_name: String,
    /// Stable decision label, e.g. `authorized` or `denied_inactive`.
    pub outcome: &'static str,
    /// Account id, when the decision references one.
    pub account_id: Option<i64>,
    /// True when this request created the account.
    pub provisioned: bool,
    /// Classification of failed decisions.
    pub error_kind: Option<DecisionErrorKind>,
    /// Error message for failed decisions.
    pub error: Option<String>,
}

impl AuthorizationEvent {
    pub fn new(
        identity: &ResolvedIdentity,
        decision: &ProvisioningDecision,
        provisioned: bool,
    ) -> Self {
        let error = match decision {
            ProvisioningDecision::Error(err) => Some(err.to_string()),
            _ => None,
        };
        Self {
            email: Some(identity.email.clone()).filter(|e| !e.is_empty()),
            first_name: identity.first_name.clone(),
            last_name: identity.last_name.clone(),
            outcome: decision.label(),
            error_kind: decision.error_kind(),
            account_id: decision.account().map(|a| a.id),
            provisioned,
            error,
        }
    }

    /// Errors are failures; denials are legitimate outcomes.
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// Destination for authorization audit events.
pub trait AuditSink: Send + Sync {
    fn record(&self, event: &AuthorizationEvent);
}

impl<S: AuditSink + ?Sized> AuditSink for Arc<S> {
    fn record(&self, event: &AuthorizationEvent) {
        (**self).record(event)
    }
}

/// Emits events as structured `tracing` records on the `jitgate::audit`
/// target.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn record(&self, event: &AuthorizationEvent) {
        let email = event.email.as_deref().unwrap_or("");
        match (&event.error, event.error_kind) {
            (Some(err), Some(DecisionErrorKind::Store)) => error!(
                target: "jitgate::audit",
                email,
                outcome = event.outcome,
                error = %err,
                "authorization failed"
            ),
            (Some(err), _) => warn!(
                target: "jitgate::audit",
                email,
                first_name = %event.first_name,
                last_name = %event.last_name,
                outcome = event.outcome,
                error = %err,
                "authorization rejected"
            ),
            (None, _) => info!(
                target: "jitgate::audit",
                email,
                outcome = event.outcome,
                account_id = ?event.account_id,
                provisioned = event.provisioned,
                "authorization decided"
            ),
        }
    }
}

impl AuditSink for Database {
    fn record(&self, event: &AuthorizationEvent) {
        let details = match (&event.error, event.account_id) {
            (Some(err), _) => Some(err.clone()),
            (None, Some(id)) if event.provisioned => Some(format!("account {id} provisioned")),
            (None, Some(id)) => Some(format!("account {id}")),
            (None, None) => None,
        };
        if let Err(e) = self.insert_audit_log(
            AUTHORIZE_ACTION,
            event.email.as_deref(),
            event.outcome,
            !event.is_error(),
            details.as_deref(),
        ) {
            warn!(error = %e, outcome = event.outcome, "failed to persist audit entry");
        }
    }
}

/// Fans each event out to several sinks.
#[derive(Default)]
pub struct CompositeAuditSink {
    sinks: Vec<Arc<dyn AuditSink>>,
}

impl CompositeAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, sink: Arc<dyn AuditSink>) -> Self {
        self.sinks.push(sink);
        self
    }
}

impl AuditSink for CompositeAuditSink {
    fn record(&self, event: &AuthorizationEvent) {
        for sink in &self.sinks {
            sink.record(event);
        }
    }
}
