//! Audit log API endpoints.

use std::sync::Arc;

use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use crate::api::status::AppError;
use crate::AppState;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
pub struct AuditQuery {
    pub limit: Option<u32>,
}

#[derive(Serialize)]
struct AuditEntryView {
    id: i64,
    created_at: String,
    action: String,
    email: Option<String>,
    outcome: String,
    success: bool,
    details: Option<String>,
}

#[derive(Serialize)]
struct AuditListResponse {
    entries: Vec<AuditEntryView>,
    total: usize,
}

// ---------------------------------------------------------------------------
// Routes
// ---------------------------------------------------------------------------

/// Routes behind the authorization middleware.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/audit", get(list_audit))
}

async fn list_audit(
    State(state): State<Arc<AppState>>,
    query: Result<Query<AuditQuery>, QueryRejection>,
) -> Result<Json<AuditListResponse>, AppError> {
    let Query(query) = query.map_err(|e| AppError::BadRequest(e.body_text()))?;
    let limit = query.limit.unwrap_or(50).min(500);

    let db = state
        .db
        .clone()
        .ok_or_else(|| AppError::NotFound("audit log is not persisted by this store".into()))?;
    let entries = tokio::task::spawn_blocking(move || db.list_audit_log(limit))
        .await
        .map_err(|e| AppError::Internal(format!("audit query task failed: {}", e)))?
        .map_err(|e| AppError::Internal(format!("database error: {}", e)))?;

    let total = entries.len();
    let views: Vec<AuditEntryView> = entries
        .into_iter()
        .map(|e| AuditEntryView {
            id: e.id,
            created_at: e.created_at,
            action: e.action,
            email: e.email,
            outcome: e.outcome,
            success: e.success,
            details: e.details,
        })
        .collect();

    Ok(Json(AuditListResponse {
        entries: views,
        total,
    }))
}
