//! JitGate web server.
//!
//! Provides an Axum-based HTTP server with:
//! - Authorization middleware mapping decisions to response classes
//! - Protected identity endpoint and landing redirect
//! - Health endpoint
//! - Audit log API
//! - Optional debug endpoint

pub mod api;
pub mod auth;

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::middleware;
use axum::Router;
use tower_http::trace::TraceLayer;
use tracing::info;

use jitgate_core::config::AppConfig;
use jitgate_core::db::Database;
use jitgate_core::AuthorizationService;

/// Shared application state accessible from all handlers.
pub struct AppState {
    pub service: Arc<AuthorizationService>,
    /// Backing database when the user store is SQLite; serves the audit log.
    pub db: Option<Arc<Database>>,
    pub config: AppConfig,
}

/// Build the application router.
pub fn router(state: Arc<AppState>) -> Router {
    let protected = Router::new()
        .merge(api::home::protected_routes())
        .merge(api::audit::routes())
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_authorization,
        ));

    let mut app = Router::new()
        .merge(api::home::routes())
        .merge(api::status::routes())
        .merge(protected);

    if state.config.web.debug_endpoint {
        app = app.merge(api::debug::routes());
    }

    app.layer(DefaultBodyLimit::max(64 * 1024))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// The web server.
pub struct WebServer {
    state: Arc<AppState>,
}

impl WebServer {
    /// Create a new web server with the given dependencies.
    pub fn new(config: AppConfig, service: Arc<AuthorizationService>, db: Option<Arc<Database>>) -> Self {
        let state = Arc::new(AppState {
            service,
            db,
            config,
        });
        Self { state }
    }

    /// Serve until `shutdown` resolves, then drain in-flight requests.
    pub async fn start<F>(self, listen_addr: &str, shutdown: F) -> anyhow::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr: SocketAddr = listen_addr.parse()?;
        let app = router(self.state);

        info!(addr = %addr, "starting web server");

        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await?;

        info!("web server stopped");
        Ok(())
    }
}
