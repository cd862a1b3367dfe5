//! Authorization middleware for protected routes.
//!
//! Claims reach a request two ways. The federation layer mounted in front
//! of the router inserts a [`ClaimSet`] extension (the primary source), and
//! a federating reverse proxy may forward attributes as
//! `<prefix><claim-name>` headers (the secondary source). The middleware
//! runs the synchronous authorization pipeline on the blocking pool and maps
//! the decision to a response:
//!
//! | Decision | Response |
//! |---|---|
//! | no claims at all | 401 |
//! | `Authorized` | handler runs with the `UserAccount` in request extensions |
//! | `Denied` | 403 |
//! | missing identity or attributes | 400 |
//! | store failure | 500 |

use std::sync::Arc;

use axum::body::Body;
use axum::extract::State;
use axum::http::{HeaderMap, Request};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use tracing::{debug, error};

use jitgate_core::claims::{ClaimSet, ClaimsProvider};
use jitgate_core::models::{DecisionErrorKind, ProvisioningDecision};

use crate::api::status::AppError;
use crate::AppState;

/// Claims forwarded as request headers named `<prefix><claim-name>`.
///
/// Header names are case-insensitive, so `X-Claim-firstName` and
/// `x-claim-firstname` are the same claim. Values are read as UTF-8.
/// Claim names that are not valid header names (URI-style claims) are
/// never found here.
#[derive(Debug, Clone)]
pub struct HeaderClaims {
    headers: HeaderMap,
    prefix: String,
}

impl HeaderClaims {
    pub fn new(headers: HeaderMap, prefix: impl Into<String>) -> Self {
        Self {
            headers,
            prefix: prefix.into(),
        }
    }

    /// True when no header carries the claim prefix.
    pub fn is_empty(&self) -> bool {
        let prefix = self.prefix.to_ascii_lowercase();
        !self
            .headers
            .keys()
            .any(|name| name.as_str().starts_with(&prefix))
    }
}

impl ClaimsProvider for HeaderClaims {
    fn get(&self, name: &str) -> Option<&str> {
        self.headers
            .get(format!("{}{}", self.prefix, name).as_str())
            .and_then(|v| std::str::from_utf8(v.as_bytes()).ok())
    }
}

/// Both claim sources of a request, each `None` when absent or empty.
pub struct RequestClaims {
    pub primary: Option<ClaimSet>,
    pub secondary: Option<HeaderClaims>,
}

impl RequestClaims {
    pub fn from_request(state: &AppState, request: &Request<Body>) -> Self {
        let primary = request
            .extensions()
            .get::<ClaimSet>()
            .filter(|claims| !claims.is_empty())
            .cloned();
        let secondary = state
            .config
            .web
            .claim_header_prefix
            .as_deref()
            .map(|prefix| HeaderClaims::new(request.headers().clone(), prefix))
            .filter(|claims| !claims.is_empty());
        Self { primary, secondary }
    }

    pub fn is_empty(&self) -> bool {
        self.primary.is_none() && self.secondary.is_none()
    }

    /// Resolve canonical identity fields without touching the store.
    pub fn resolve(&self) -> jitgate_core::ResolvedIdentity {
        let empty = ClaimSet::new();
        let primary = self.primary.as_ref().unwrap_or(&empty);
        jitgate_core::claims::resolve(primary, self.secondary_provider())
    }

    fn secondary_provider(&self) -> Option<&dyn ClaimsProvider> {
        self.secondary.as_ref().map(|c| c as &dyn ClaimsProvider)
    }
}

/// Middleware guarding routes that require an authorized account.
pub async fn require_authorization(
    State(state): State<Arc<AppState>>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let claims = RequestClaims::from_request(&state, &request);
    if claims.is_empty() {
        debug!(path = %request.uri().path(), "no identity claims on request");
        return AppError::Unauthorized("authentication required".into()).into_response();
    }

    let service = state.service.clone();
    let decision = tokio::task::spawn_blocking(move || {
        let empty = ClaimSet::new();
        let primary = claims.primary.as_ref().unwrap_or(&empty);
        service.authorize(primary, claims.secondary_provider())
    })
    .await;

    let decision = match decision {
        Ok(decision) => decision,
        Err(e) => {
            error!(error = %e, "authorization task failed");
            return AppError::Internal("internal server error".into()).into_response();
        }
    };

    match decision {
        ProvisioningDecision::Authorized(account) => {
            request.extensions_mut().insert(account);
            next.run(request).await
        }
        ProvisioningDecision::Denied(reason) => {
            AppError::Forbidden(format!("access denied: {}", reason)).into_response()
        }
        ProvisioningDecision::Error(err) => match DecisionErrorKind::from(&err) {
            DecisionErrorKind::MissingIdentity | DecisionErrorKind::MissingAttributes => {
                AppError::BadRequest(err.to_string()).into_response()
            }
            DecisionErrorKind::Store => {
                AppError::Internal("internal server error".into()).into_response()
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (k, v) in pairs {
            map.insert(*k, HeaderValue::from_static(v));
        }
        map
    }

    #[test]
    fn test_header_claims_lookup_ignores_case() {
        let claims = HeaderClaims::new(
            headers(&[("x-claim-firstname", "Hedda"), ("x-claim-mail", "h@example.com")]),
            "X-Claim-",
        );
        assert_eq!(claims.get("firstName"), Some("Hedda"));
        assert_eq!(claims.get("mail"), Some("h@example.com"));
        assert_eq!(claims.get("email"), None);
        assert!(!claims.is_empty());
    }

    #[test]
    fn test_header_claims_decode_utf8_values() {
        let mut map = HeaderMap::new();
        map.insert(
            "x-claim-lastname",
            HeaderValue::from_bytes("Müller".as_bytes()).unwrap(),
        );
        map.insert("x-claim-sn", HeaderValue::from_bytes(&[0xff, 0xfe]).unwrap());
        let claims = HeaderClaims::new(map, "X-Claim-");

        assert_eq!(claims.get("lastName"), Some("Müller"));
        assert_eq!(claims.get("sn"), None);
    }

    #[test]
    fn test_header_claims_empty_without_prefixed_headers() {
        let claims = HeaderClaims::new(headers(&[("accept", "*/*")]), "X-Claim-");
        assert!(claims.is_empty());
    }

    #[test]
    fn test_uri_claim_names_are_not_found() {
        let claims = HeaderClaims::new(headers(&[("x-claim-email", "a@b.c")]), "X-Claim-");
        assert_eq!(
            claims.get("http://schemas.xmlsoap.org/ws/2005/05/identity/claims/emailaddress"),
            None
        );
    }
}
