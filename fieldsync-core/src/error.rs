//! Error types for fieldsync-core.

use std::path::PathBuf;

use thiserror::Error;

/// All errors that can arise from settings loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Underlying I/O failure (file not found, permission denied, etc.).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parse error on load — includes file path and line context from serde_yaml.
    #[error("failed to parse settings at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// The settings file did not exist at the expected path.
    #[error("settings not found at {path}; create it before running any workflow")]
    NotFound { path: PathBuf },

    /// `dirs::home_dir()` returned `None` — cannot locate `~/.fieldsync/`.
    #[error("cannot determine home directory; set $HOME or equivalent")]
    HomeNotFound,

    /// A required secret was not present in the environment.
    #[error("missing environment variable {var}")]
    MissingEnv { var: String },
}
