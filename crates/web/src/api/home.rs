//! Landing redirect and the protected identity endpoint.

use std::sync::Arc;

use axum::response::Redirect;
use axum::routing::get;
use axum::{Extension, Json, Router};
use chrono::{DateTime, Utc};
use serde::Serialize;

use jitgate_core::models::UserAccount;

use crate::AppState;

#[derive(Serialize)]
struct HomeResponse {
    id: i64,
    email: String,
    first_name: String,
    last_name: String,
    full_name: String,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// Public routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/", get(|| async { Redirect::to("/home") }))
}

/// Routes behind the authorization middleware.
pub fn protected_routes() -> Router<Arc<AppState>> {
    Router::new().route("/home", get(home))
}

async fn home(Extension(account): Extension<UserAccount>) -> Json<HomeResponse> {
    Json(HomeResponse {
        full_name: account.full_name(),
        id: account.id,
        email: account.email,
        first_name: account.first_name,
        last_name: account.last_name,
        is_active: account.is_active,
        created_at: account.created_at,
        updated_at: account.updated_at,
    })
}
