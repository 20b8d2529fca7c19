//! # fieldsync-client
//!
//! Remote feature-store plumbing: the chained token handshake and its
//! on-disk credential cache, the filtered query client, and the batch edit
//! executor. Everything here blocks the calling thread — one sequential
//! workflow is the concurrency model.

pub mod cache;
pub mod edit;
pub mod error;
pub mod query;
pub mod store;
pub mod token;

pub use edit::{EditExecutor, EditOutcome};
pub use error::{AuthError, CacheError, EditError, QueryError};
pub use query::{FeatureQuery, WhereClause};
pub use store::{FeatureStore, LiveStore};
pub use token::{TokenEndpoint, TokenManager, UreqTokenEndpoint};
