//! # fieldsync-recon
//!
//! Reconciliation engine and workflow pipeline.
//!
//! Call [`pipeline::dedupe`], [`pipeline::rekey`], [`pipeline::update_heights`],
//! [`pipeline::report_nulls`] or [`pipeline::purge`] with a
//! [`fieldsync_client::FeatureStore`]; [`engine::reconcile`] is the pure
//! duplicate-elimination rule they all share.

pub mod engine;
pub mod error;
pub mod pipeline;

pub use engine::{reconcile, swap_keys, ReconcileOutcome};
pub use error::WorkflowError;
pub use pipeline::{
    DedupeOutcome, Discard, FileResult, ProgressSink, PurgeOutcome, RekeyOutcome,
};
