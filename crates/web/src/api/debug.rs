//! Diagnostics endpoint, mounted only when `web.debug_endpoint` is set.
//!
//! Shows the JIT switches, the federation settings handed to the external
//! protocol layer, and what the attribute resolver makes of the current
//! request's claims. It never touches the user store.

use std::sync::Arc;

use axum::body::Body;
use axum::extract::State;
use axum::http::Request;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;

use jitgate_core::models::ResolvedIdentity;

use crate::auth::RequestClaims;
use crate::AppState;

#[derive(Serialize)]
struct DebugResponse {
    jit: JitView,
    federation: FederationView,
    claims: ClaimsView,
    resolved: Option<ResolvedIdentity>,
}

#[derive(Serialize)]
struct JitView {
    enabled: &'static str,
    default_user_status: &'static str,
    required_attributes: &'static str,
}

#[derive(Serialize)]
struct FederationView {
    entity_id: String,
    acs_url: String,
    idp_metadata_path: String,
    cert_file: String,
}

#[derive(Serialize)]
struct ClaimsView {
    primary: usize,
    forwarded_headers: bool,
}

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/debug", get(debug_info))
}

async fn debug_info(State(state): State<Arc<AppState>>, request: Request<Body>) -> Json<DebugResponse> {
    let claims = RequestClaims::from_request(&state, &request);
    let jit = state.service.jit_config();
    let federation = &state.config.federation;

    Json(DebugResponse {
        jit: JitView {
            enabled: jit.enabled_label(),
            default_user_status: jit.default_status_label(),
            required_attributes: jit.attributes_label(),
        },
        federation: FederationView {
            entity_id: federation.entity_id.clone(),
            acs_url: federation.acs_url.clone(),
            idp_metadata_path: federation.idp_metadata_path.display().to_string(),
            cert_file: federation.cert_file.display().to_string(),
        },
        claims: ClaimsView {
            primary: claims.primary.as_ref().map_or(0, |c| c.len()),
            forwarded_headers: claims.secondary.is_some(),
        },
        resolved: (!claims.is_empty()).then(|| claims.resolve()),
    })
}
