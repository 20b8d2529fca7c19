//! Error types for fieldsync-client.
//!
//! One enum per seam: the handshake, the query endpoint, the edit endpoint,
//! and the on-disk credential cache. All of them are fatal to a workflow —
//! recoverable per-item conditions never reach these types.

use std::path::PathBuf;

use serde::Deserialize;
use thiserror::Error;

/// Service-level error object embedded in an otherwise-2xx JSON body.
///
/// The feature store reports most rejections this way rather than with an
/// HTTP status.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceError {
    pub code: i64,
    #[serde(default)]
    pub message: String,
}

/// All errors that can arise from the token handshake.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Step 1 response carried no token.
    #[error("primary login did not yield a token")]
    PrimaryLogin,

    /// Step 2 response carried no token.
    #[error("scope exchange did not yield a token")]
    ScopeExchange,

    /// Step 3 response was missing its token or expiry.
    #[error("privileged login did not yield a token and expiry")]
    PrivilegedLogin,

    /// The fixed-name role cookie never appeared in any response.
    #[error("role cookie '{name}' missing from handshake responses")]
    MissingSessionCookie { name: String },

    /// Transport failure or non-2xx from the token endpoint.
    #[error("token endpoint transport failure: {source}")]
    Transport {
        #[source]
        source: Box<ureq::Error>,
    },

    /// The response body was not the expected JSON shape.
    #[error("token endpoint returned a malformed response: {0}")]
    Malformed(#[source] std::io::Error),

    /// Failed to persist the refreshed credential.
    #[error(transparent)]
    Cache(#[from] CacheError),

    /// Settings problem discovered mid-handshake (missing password env).
    #[error(transparent)]
    Config(#[from] fieldsync_core::ConfigError),
}

/// All errors that can arise from a read query.
#[derive(Debug, Error)]
pub enum QueryError {
    #[error("query transport failure: {source}")]
    Transport {
        #[source]
        source: Box<ureq::Error>,
    },

    #[error("query endpoint returned HTTP {status}")]
    Status { status: u16 },

    /// A 2xx body carrying a service-level error object.
    #[error("query rejected by the service: code {code}: {message}")]
    Rejected { code: i64, message: String },

    #[error("query response was malformed: {0}")]
    Malformed(#[source] std::io::Error),
}

/// All errors that can arise from a batch edit call.
#[derive(Debug, Error)]
pub enum EditError {
    #[error("edit transport failure: {source}")]
    Transport {
        #[source]
        source: Box<ureq::Error>,
    },

    #[error("edit endpoint returned HTTP {status}")]
    Status { status: u16 },

    /// A 2xx body carrying a service-level error object.
    #[error("edit rejected by the service: code {code}: {message}")]
    Rejected { code: i64, message: String },

    #[error("edit response was malformed: {0}")]
    Malformed(#[source] std::io::Error),

    #[error("edit payload serialization failed: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Errors writing the credential cache. Reads never fail — a file that
/// cannot be read or parsed is a cache miss.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("credential cache JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience constructor for [`CacheError::Io`].
pub(crate) fn cache_io_err(path: impl Into<PathBuf>, source: std::io::Error) -> CacheError {
    CacheError::Io {
        path: path.into(),
        source,
    }
}
