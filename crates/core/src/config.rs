//! TOML-based configuration system for JitGate.
//!
//! The file is loaded with [`AppConfig::load_from_file`], then a small set of
//! well-known environment variables may override individual values via
//! [`AppConfig::apply_env_overrides`]. The JIT policy section is read once at
//! startup and treated as immutable for the lifetime of the process.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::errors::ConfigError;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Top-level application configuration loaded from a TOML file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Process-level settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// User store settings.
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Settings consumed by the external federation layer.
    #[serde(default)]
    pub federation: FederationConfig,

    /// Just-in-time provisioning policy.
    #[serde(default)]
    pub jit: JitConfig,

    /// HTTP surface settings.
    #[serde(default)]
    pub web: WebConfig,
}

// ---------------------------------------------------------------------------
// Server
// ---------------------------------------------------------------------------

/// Process-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Minimum tracing level: trace, debug, info, warn, error.
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Directory for persistent data (the user database).
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

fn default_log_level() -> String {
    "info".into()
}
fn default_data_dir() -> PathBuf {
    PathBuf::from("/var/lib/jitgate")
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            data_dir: default_data_dir(),
        }
    }
}

// ---------------------------------------------------------------------------
// Database
// ---------------------------------------------------------------------------

/// SQLite user store location.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Database file, relative to `server.data_dir` unless absolute.
    /// The special value `:memory:` opens a throwaway in-memory store.
    #[serde(default = "default_db_path")]
    pub path: String,
}

fn default_db_path() -> String {
    "jitgate.db".into()
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

impl DatabaseConfig {
    /// True when the configured path requests an in-memory database.
    pub fn is_in_memory(&self) -> bool {
        self.path == ":memory:"
    }

    /// Resolve the database file path against the data directory.
    pub fn resolve_path(&self, data_dir: &Path) -> PathBuf {
        let path = Path::new(&self.path);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            data_dir.join(path)
        }
    }
}

// ---------------------------------------------------------------------------
// Federation
// ---------------------------------------------------------------------------

/// Service-provider settings handed to the external federation layer.
///
/// JitGate never interprets these beyond reporting them on the debug
/// endpoint; trust establishment and assertion validation happen upstream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FederationConfig {
    #[serde(default = "default_entity_id")]
    pub entity_id: String,

    #[serde(default = "default_acs_url")]
    pub acs_url: String,

    #[serde(default = "default_idp_metadata_path")]
    pub idp_metadata_path: PathBuf,

    #[serde(default = "default_cert_file")]
    pub cert_file: PathBuf,

    #[serde(default = "default_key_file")]
    pub key_file: PathBuf,
}

fn default_entity_id() -> String {
    "http://localhost:8080/saml/metadata".into()
}
fn default_acs_url() -> String {
    "http://localhost:8080/saml/acs".into()
}
fn default_idp_metadata_path() -> PathBuf {
    PathBuf::from("configs/idp_metadata.xml")
}
fn default_cert_file() -> PathBuf {
    PathBuf::from("sp.crt")
}
fn default_key_file() -> PathBuf {
    PathBuf::from("sp.key")
}

impl Default for FederationConfig {
    fn default() -> Self {
        Self {
            entity_id: default_entity_id(),
            acs_url: default_acs_url(),
            idp_metadata_path: default_idp_metadata_path(),
            cert_file: default_cert_file(),
            key_file: default_key_file(),
        }
    }
}

// ---------------------------------------------------------------------------
// JIT policy
// ---------------------------------------------------------------------------

/// Just-in-time provisioning policy flags.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct JitConfig {
    /// Create unknown users on first login.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// `is_active` value given to JIT-created accounts.
    #[serde(default = "default_true")]
    pub default_user_active: bool,

    /// Refuse JIT creation unless both first and last name were asserted.
    #[serde(default = "default_true")]
    pub require_attributes_for_creation: bool,
}

fn default_true() -> bool {
    true
}

impl Default for JitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            default_user_active: true,
            require_attributes_for_creation: true,
        }
    }
}

impl JitConfig {
    /// Human-readable label for `enabled`.
    pub fn enabled_label(&self) -> &'static str {
        if self.enabled {
            "enabled"
        } else {
            "disabled"
        }
    }

    /// Human-readable label for `default_user_active`.
    pub fn default_status_label(&self) -> &'static str {
        if self.default_user_active {
            "active"
        } else {
            "inactive"
        }
    }

    /// Human-readable label for `require_attributes_for_creation`.
    pub fn attributes_label(&self) -> &'static str {
        if self.require_attributes_for_creation {
            "enforced"
        } else {
            "optional"
        }
    }
}

// ---------------------------------------------------------------------------
// Web
// ---------------------------------------------------------------------------

/// HTTP surface configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebConfig {
    /// Listen address (default `127.0.0.1:8080`).
    #[serde(default = "default_listen")]
    pub listen: String,

    /// Header prefix under which a federating reverse proxy forwards claims
    /// (e.g. `X-Claim-` makes `X-Claim-mail` carry the `mail` claim).
    /// Forwarded headers are ignored when unset.
    #[serde(default)]
    pub claim_header_prefix: Option<String>,

    /// Expose `GET /debug`.
    #[serde(default)]
    pub debug_endpoint: bool,
}

fn default_listen() -> String {
    "127.0.0.1:8080".into()
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            claim_header_prefix: None,
            debug_endpoint: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Loading & resolving
// ---------------------------------------------------------------------------

impl AppConfig {
    /// Load an [`AppConfig`] from a TOML file at the given path.
    ///
    /// This does **not** apply environment overrides -- call
    /// [`apply_env_overrides`](Self::apply_env_overrides) afterwards.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        info!(path = %path.display(), "loading configuration");

        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()));
        }

        let contents = std::fs::read_to_string(path)?;
        let config: AppConfig =
            toml::from_str(&contents).map_err(|e| ConfigError::ParseError(e.to_string()))?;

        debug!("configuration parsed successfully");
        Ok(config)
    }

    /// Override individual settings from well-known environment variables.
    ///
    /// Unset variables leave the file value alone. A boolean variable that
    /// cannot be parsed logs a warning and is ignored.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|name| std::env::var(name).ok());
    }

    /// Same as [`apply_env_overrides`](Self::apply_env_overrides) with an
    /// injectable variable source.
    pub fn apply_overrides_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.is_empty());

        if let Some(v) = get("JIT_ENABLED") {
            override_bool(&mut self.jit.enabled, "JIT_ENABLED", &v);
        }
        if let Some(v) = get("JIT_DEFAULT_USER_ACTIVE") {
            override_bool(
                &mut self.jit.default_user_active,
                "JIT_DEFAULT_USER_ACTIVE",
                &v,
            );
        }
        if let Some(v) = get("JIT_REQUIRED_ATTRIBUTES") {
            override_bool(
                &mut self.jit.require_attributes_for_creation,
                "JIT_REQUIRED_ATTRIBUTES",
                &v,
            );
        }
        if let Some(v) = get("SERVER_LISTEN") {
            debug!(env_name = "SERVER_LISTEN", "overriding web.listen");
            self.web.listen = v;
        }
        if let Some(v) = get("DATABASE_PATH") {
            debug!(env_name = "DATABASE_PATH", "overriding database.path");
            self.database.path = v;
        }
    }

    /// Validate that all required fields are present and sane.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.web.listen.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "web.listen".into(),
                detail: "listen address must not be empty".into(),
            });
        }
        if self.web.listen.parse::<SocketAddr>().is_err() {
            return Err(ConfigError::InvalidValue {
                field: "web.listen".into(),
                detail: format!("'{}' is not a socket address", self.web.listen),
            });
        }
        if self.database.path.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "database.path".into(),
                detail: "database path must not be empty".into(),
            });
        }
        if let Some(prefix) = &self.web.claim_header_prefix {
            if prefix.is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: "web.claim_header_prefix".into(),
                    detail: "prefix must not be empty when set".into(),
                });
            }
        }

        Ok(())
    }

    /// Convenience: load, apply env overrides, and validate in one call.
    pub fn load_and_resolve<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let mut config = Self::load_from_file(path)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }
}

fn override_bool(target: &mut bool, env_name: &str, raw: &str) {
    match parse_bool(raw) {
        Some(value) => {
            debug!(env_name, value, "applied boolean override");
            *target = value;
        }
        None => warn!(env_name, raw, "ignoring unparsable boolean override"),
    }
}

/// Lenient boolean parsing for environment overrides.
fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "t" | "true" | "yes" | "on" => Some(true),
        "0" | "f" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn sample_toml() -> &'static str {
        r#"
[server]
log_level = "debug"
data_dir = "/tmp/jitgate"

[database]
path = "users.db"

[federation]
entity_id = "https://app.example.com/saml/metadata"
acs_url = "https://app.example.com/saml/acs"
idp_metadata_path = "/etc/jitgate/idp.xml"

[jit]
enabled = true
default_user_active = false
require_attributes_for_creation = false

[web]
listen = "0.0.0.0:9000"
claim_header_prefix = "X-Claim-"
debug_endpoint = true
"#
    }

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_parse_full_config() {
        let config: AppConfig = toml::from_str(sample_toml()).expect("failed to parse toml");
        assert_eq!(config.server.log_level, "debug");
        assert_eq!(config.database.path, "users.db");
        assert!(config.jit.enabled);
        assert!(!config.jit.default_user_active);
        assert!(!config.jit.require_attributes_for_creation);
        assert_eq!(config.web.claim_header_prefix.as_deref(), Some("X-Claim-"));
        assert!(config.web.debug_endpoint);
        config.validate().unwrap();
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(sample_toml().as_bytes()).unwrap();

        let config = AppConfig::load_from_file(&path).expect("load_from_file failed");
        assert_eq!(config.web.listen, "0.0.0.0:9000");
    }

    #[test]
    fn test_file_not_found() {
        let result = AppConfig::load_from_file("/nonexistent/jitgate.toml");
        assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
    }

    #[test]
    fn test_defaults() {
        let config: AppConfig = toml::from_str("").unwrap();
        assert_eq!(config.server.log_level, "info");
        assert_eq!(config.database.path, "jitgate.db");
        assert_eq!(config.web.listen, "127.0.0.1:8080");
        assert_eq!(config.jit, JitConfig::default());
        assert!(config.jit.enabled);
        assert!(config.jit.default_user_active);
        assert!(config.jit.require_attributes_for_creation);
        assert!(config.web.claim_header_prefix.is_none());
        assert!(!config.web.debug_endpoint);
    }

    #[test]
    fn test_env_overrides() {
        let mut config: AppConfig = toml::from_str(sample_toml()).unwrap();
        let vars = env(&[
            ("JIT_ENABLED", "false"),
            ("JIT_DEFAULT_USER_ACTIVE", "1"),
            ("JIT_REQUIRED_ATTRIBUTES", "yes"),
            ("SERVER_LISTEN", "127.0.0.1:7000"),
        ]);
        config.apply_overrides_from(|name| vars.get(name).cloned());

        assert!(!config.jit.enabled);
        assert!(config.jit.default_user_active);
        assert!(config.jit.require_attributes_for_creation);
        assert_eq!(config.web.listen, "127.0.0.1:7000");
        assert_eq!(config.database.path, "users.db");
    }

    #[test]
    fn test_unparsable_bool_override_is_ignored() {
        let mut config = AppConfig::default();
        let vars = env(&[("JIT_ENABLED", "maybe"), ("JIT_DEFAULT_USER_ACTIVE", "")]);
        config.apply_overrides_from(|name| vars.get(name).cloned());
        assert!(config.jit.enabled);
        assert!(config.jit.default_user_active);
    }

    #[test]
    fn test_validate_rejects_bad_listen() {
        let mut config = AppConfig::default();
        config.web.listen = "localhost".into();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { ref field, .. }) if field == "web.listen"
        ));
    }

    #[test]
    fn test_validate_rejects_empty_db_path() {
        let mut config = AppConfig::default();
        config.database.path = String::new();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { ref field, .. }) if field == "database.path"
        ));
    }

    #[test]
    fn test_load_and_resolve_validates_file_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "[web]\nlisten = \"not-an-address\"\n").unwrap();

        let result = AppConfig::load_and_resolve(&path);
        assert!(matches!(
            result,
            Err(ConfigError::InvalidValue { ref field, .. }) if field == "web.listen"
        ));

        let path = dir.path().join("good.toml");
        std::fs::write(&path, sample_toml()).unwrap();
        let config = AppConfig::load_and_resolve(&path).unwrap();
        assert_eq!(config.database.path, "users.db");
    }

    #[test]
    fn test_db_path_resolution() {
        let db = DatabaseConfig::default();
        assert_eq!(
            db.resolve_path(Path::new("/data")),
            PathBuf::from("/data/jitgate.db")
        );
        let abs = DatabaseConfig {
            path: "/srv/users.db".into(),
        };
        assert_eq!(
            abs.resolve_path(Path::new("/data")),
            PathBuf::from("/srv/users.db")
        );
        assert!(DatabaseConfig {
            path: ":memory:".into()
        }
        .is_in_memory());
    }

    #[test]
    fn test_jit_labels() {
        let jit = JitConfig {
            enabled: false,
            default_user_active: false,
            require_attributes_for_creation: true,
        };
        assert_eq!(jit.enabled_label(), "disabled");
        assert_eq!(jit.default_status_label(), "inactive");
        assert_eq!(jit.attributes_label(), "enforced");
    }
}
