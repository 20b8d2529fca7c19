//! Settings — one immutable configuration value for a whole run.
//!
//! # Storage layout
//!
//! ```text
//! ~/.fieldsync/
//!   config.yaml        (service endpoints + account names — mode 0600)
//!   credentials.json   (written by the client crate's credential cache)
//! ```
//!
//! # API pattern
//!
//! Loading has two forms:
//! - `load_at(home: &Path)` — explicit home; used in tests with `TempDir`
//! - `load()` — derives home from `dirs::home_dir()`, delegates to `_at`
//!
//! Tests must NEVER call the no-arg wrapper; always use `_at`.
//!
//! Passwords never live in the file; they are read from the environment on
//! demand (`FIELDSYNC_READ_PASSWORD`, `FIELDSYNC_WRITE_PASSWORD`).

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Environment variable holding the read-scoped account password.
pub const READ_PASSWORD_VAR: &str = "FIELDSYNC_READ_PASSWORD";
/// Environment variable holding the write-scoped account password.
pub const WRITE_PASSWORD_VAR: &str = "FIELDSYNC_WRITE_PASSWORD";

fn default_role_cookie() -> String {
    "AGS_ROLES".to_string()
}

fn default_token_lifetime() -> u32 {
    60
}

/// Immutable run configuration, loaded once and passed by reference into
/// every component constructor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    pub version: u32,
    /// Portal root, e.g. `https://maps.example.com` — also the edit Origin.
    pub portal_url: String,
    /// Fully qualified feature layer URL ending in `/FeatureServer/<n>`.
    pub feature_layer_url: String,
    /// Referer the service's front end sends; required by the token and
    /// edit endpoints.
    pub referer: String,
    /// Owner identifier scoping every query.
    pub user_id: String,
    pub read_username: String,
    pub write_username: String,
    /// Name of the role cookie the privileged login sets.
    #[serde(default = "default_role_cookie")]
    pub role_cookie: String,
    /// Requested token lifetime, in minutes.
    #[serde(default = "default_token_lifetime")]
    pub token_lifetime_minutes: u32,
}

impl Settings {
    /// `<home>/.fieldsync/config.yaml` — pure, no I/O.
    pub fn path_at(home: &Path) -> PathBuf {
        home.join(".fieldsync").join("config.yaml")
    }

    /// Load settings from `<home>/.fieldsync/config.yaml`.
    ///
    /// Returns `ConfigError::NotFound` if absent,
    /// `ConfigError::Parse` (with path + line context) if malformed YAML.
    pub fn load_at(home: &Path) -> Result<Self, ConfigError> {
        let path = Self::path_at(home);
        if !path.exists() {
            return Err(ConfigError::NotFound { path });
        }
        let contents = std::fs::read_to_string(&path)?;
        serde_yaml::from_str(&contents).map_err(|e| ConfigError::Parse { path, source: e })
    }

    /// `load_at` convenience wrapper.
    pub fn load() -> Result<Self, ConfigError> {
        let home = dirs::home_dir().ok_or(ConfigError::HomeNotFound)?;
        Self::load_at(&home)
    }

    // -----------------------------------------------------------------------
    // Derived endpoints
    // -----------------------------------------------------------------------

    /// Token endpoint: `<portal_url>/portal/sharing/rest/generateToken`.
    pub fn token_url(&self) -> String {
        format!(
            "{}/portal/sharing/rest/generateToken",
            self.portal_url.trim_end_matches('/')
        )
    }

    /// Read endpoint: `<feature_layer_url>/query`.
    pub fn query_url(&self) -> String {
        format!("{}/query", self.feature_layer_url.trim_end_matches('/'))
    }

    /// Edit endpoint: `<feature_layer_url>/applyEdits`.
    pub fn edit_url(&self) -> String {
        format!("{}/applyEdits", self.feature_layer_url.trim_end_matches('/'))
    }

    /// The map-server URL the scope-exchange step targets: the feature layer
    /// URL with its trailing `/FeatureServer/<n>` replaced by `/MapServer`.
    pub fn server_url(&self) -> String {
        let url = self.feature_layer_url.trim_end_matches('/');
        match url.rfind("/FeatureServer") {
            Some(idx) => format!("{}/MapServer", &url[..idx]),
            None => url.to_string(),
        }
    }

    // -----------------------------------------------------------------------
    // Secrets
    // -----------------------------------------------------------------------

    pub fn read_password(&self) -> Result<String, ConfigError> {
        env_var(READ_PASSWORD_VAR)
    }

    pub fn write_password(&self) -> Result<String, ConfigError> {
        env_var(WRITE_PASSWORD_VAR)
    }
}

fn env_var(var: &str) -> Result<String, ConfigError> {
    std::env::var(var).map_err(|_| ConfigError::MissingEnv {
        var: var.to_string(),
    })
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
