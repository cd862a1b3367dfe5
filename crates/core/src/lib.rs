//! JitGate core library.
//!
//! This crate provides the authorization decision pipeline for federated
//! logins: configuration, database persistence, attribute resolution, the
//! just-in-time provisioning policy, user stores, and the audit trail.

pub mod audit;
pub mod authorize;
pub mod claims;
pub mod config;
pub mod db;
pub mod errors;
pub mod models;
pub mod policy;
pub mod store;

// Re-exports for convenience.
pub use audit::{AuditSink, CompositeAuditSink, TracingAuditSink};
pub use authorize::AuthorizationService;
pub use claims::{ClaimSet, ClaimsProvider};
pub use config::{AppConfig, JitConfig};
pub use db::Database;
pub use models::{ProvisioningDecision, ResolvedIdentity, UserAccount};
pub use store::{MemoryUserStore, SqliteUserStore, UserStore};
