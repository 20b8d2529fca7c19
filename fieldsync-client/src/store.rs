//! `FeatureStore` — the seam the workflow pipeline drives.
//!
//! Workflows only ever need three verbs: search, delete, update. Putting
//! them behind a trait keeps the pipeline testable against an in-memory
//! store; [`LiveStore`] is the production pair of query client and edit
//! executor sharing one agent and credential.

use fieldsync_core::{Credential, FeatureRecord, FeatureUpdate, ObjectId, Settings};

use crate::edit::{EditExecutor, EditOutcome};
use crate::error::{EditError, QueryError};
use crate::query::{FeatureQuery, WhereClause};

/// The three operations a workflow performs against the feature store.
pub trait FeatureStore {
    fn search(
        &mut self,
        filter: &WhereClause,
        max_records: Option<u32>,
    ) -> Result<Vec<FeatureRecord>, QueryError>;

    fn delete(&mut self, ids: &[ObjectId]) -> Result<EditOutcome, EditError>;

    fn update(&mut self, updates: &[FeatureUpdate]) -> Result<EditOutcome, EditError>;
}

/// Production store: query + edit clients over one agent and credential.
pub struct LiveStore<'a> {
    query: FeatureQuery<'a>,
    edit: EditExecutor<'a>,
}

impl<'a> LiveStore<'a> {
    pub fn new(agent: &'a ureq::Agent, settings: &'a Settings, credential: &'a Credential) -> Self {
        Self {
            query: FeatureQuery::new(agent, settings, credential),
            edit: EditExecutor::new(agent, settings, credential),
        }
    }
}

impl FeatureStore for LiveStore<'_> {
    fn search(
        &mut self,
        filter: &WhereClause,
        max_records: Option<u32>,
    ) -> Result<Vec<FeatureRecord>, QueryError> {
        self.query.search(filter, max_records)
    }

    fn delete(&mut self, ids: &[ObjectId]) -> Result<EditOutcome, EditError> {
        self.edit.delete(ids)
    }

    fn update(&mut self, updates: &[FeatureUpdate]) -> Result<EditOutcome, EditError> {
        self.edit.update(updates)
    }
}
