//! Fieldsync core library — domain types, settings, survey extraction, errors.
//!
//! Public API surface:
//! - [`types`] — newtypes and domain structs
//! - [`config`] — [`Settings`] load / derived endpoints
//! - [`survey`] — survey-file field extraction
//! - [`error`] — [`ConfigError`]

pub mod config;
pub mod error;
pub mod survey;
pub mod types;

pub use config::Settings;
pub use error::ConfigError;
pub use survey::{ExtractError, SurveyFields};
pub use types::{BusinessKey, Credential, FeatureRecord, FeatureUpdate, ObjectId};
