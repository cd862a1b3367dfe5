//! JitGate daemon entry point.
//!
//! Loads configuration, opens the user database, wires the authorization
//! service into the web server, and handles graceful shutdown.

mod signals;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use jitgate_core::audit::{AuditSink, CompositeAuditSink, TracingAuditSink};
use jitgate_core::config::AppConfig;
use jitgate_core::db::Database;
use jitgate_core::store::SqliteUserStore;
use jitgate_core::AuthorizationService;
use jitgate_web::WebServer;

// ---------------------------------------------------------------------------
// CLI arguments
// ---------------------------------------------------------------------------

/// JitGate authorization daemon.
#[derive(Parser, Debug)]
#[command(
    name = "jitgate-daemon",
    version,
    about = "Just-in-time provisioning and authorization for federated logins"
)]
struct Args {
    /// Path to the TOML configuration file. Without it, built-in defaults
    /// plus environment overrides are used.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the log level from the config file (trace, debug, info, warn, error).
    #[arg(long)]
    log_level: Option<String>,
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Load and resolve configuration
    let config = match &args.config {
        Some(path) => AppConfig::load_and_resolve(path).context("failed to load configuration")?,
        None => {
            let mut config = AppConfig::default();
            config.apply_env_overrides();
            config
                .validate()
                .context("configuration validation failed")?;
            config
        }
    };

    // Initialize tracing
    let log_level = args
        .log_level
        .as_deref()
        .unwrap_or(&config.server.log_level);

    let filter = EnvFilter::try_new(log_level).unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .init();

    // Startup banner
    let config_source = args
        .config
        .as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "(defaults)".into());
    info!("========================================");
    info!("  JitGate Daemon v{}", env!("CARGO_PKG_VERSION"));
    info!("========================================");
    info!("Config file       : {}", config_source);
    info!("Entity ID         : {}", config.federation.entity_id);
    info!("ACS URL           : {}", config.federation.acs_url);
    info!("JIT provisioning  : {}", config.jit.enabled_label());
    info!("New user status   : {}", config.jit.default_status_label());
    info!("Name attributes   : {}", config.jit.attributes_label());
    info!("Web listen        : {}", config.web.listen);
    info!("Data dir          : {}", config.server.data_dir.display());
    info!("Log level         : {}", log_level);
    info!("========================================");

    // Initialize database
    let db = if config.database.is_in_memory() {
        warn!("using in-memory database, accounts will not survive a restart");
        Database::in_memory().context("failed to open in-memory database")?
    } else {
        std::fs::create_dir_all(&config.server.data_dir)
            .context("failed to create data directory")?;
        let db_path = config.database.resolve_path(&config.server.data_dir);
        let db = Database::new(&db_path).context("failed to open database")?;
        info!("Database opened at {}", db_path.display());
        db
    };
    db.initialize()
        .context("failed to initialize database schema")?;
    let db = Arc::new(db);

    // Wire the authorization pipeline
    let store = Arc::new(SqliteUserStore::new(db.clone()));
    let audit: Arc<dyn AuditSink> = Arc::new(
        CompositeAuditSink::new()
            .with(Arc::new(TracingAuditSink))
            .with(db.clone()),
    );
    let service = Arc::new(AuthorizationService::with_audit(store, config.jit, audit));

    // Serve until a shutdown signal arrives
    let listen_addr = config.web.listen.clone();
    let web_server = WebServer::new(config, service, Some(db.clone()));
    web_server
        .start(&listen_addr, signals::wait_for_shutdown())
        .await
        .context("web server failed")?;

    info!("Shutdown signal received, closing database...");

    // The server has dropped its state, so this is the last handle.
    match Arc::try_unwrap(db) {
        Ok(db) => db.close().context("failed to close database")?,
        Err(_) => warn!("database still referenced at shutdown, leaving it to drop"),
    }

    info!("JitGate daemon stopped.");
    Ok(())
}
