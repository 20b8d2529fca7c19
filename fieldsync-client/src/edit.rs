//! Batch edit executor — deletes and updates against the edit endpoint.
//!
//! One POST per logical batch: deletes travel as a comma-separated id list,
//! updates as a JSON array of `{"attributes": {...}}` serialized into a form
//! field. Every call carries the bearer token, the captured role cookie, and
//! the origin/referer pair the service's front end would send.
//!
//! The response is per-operation: the store may apply part of a batch. This
//! system reports per-operation failures but never rolls back.

use serde::{Deserialize, Serialize};

use fieldsync_core::{Credential, FeatureUpdate, ObjectId, Settings};

use crate::error::{EditError, ServiceError};

// ---------------------------------------------------------------------------
// Outcome types
// ---------------------------------------------------------------------------

/// Per-operation error reported by the store.
#[derive(Debug, Clone, Deserialize)]
pub struct EditOpError {
    pub code: i64,
    #[serde(default)]
    pub description: String,
}

/// One operation's result within a batch response.
#[derive(Debug, Clone, Deserialize)]
pub struct EditOpResult {
    #[serde(rename = "objectId")]
    pub object_id: ObjectId,
    pub success: bool,
    #[serde(default)]
    pub error: Option<EditOpError>,
}

/// Parsed batch response.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EditOutcome {
    #[serde(default, rename = "updateResults")]
    pub update_results: Vec<EditOpResult>,
    #[serde(default, rename = "deleteResults")]
    pub delete_results: Vec<EditOpResult>,
}

impl EditOutcome {
    /// Object ids of operations the store accepted.
    pub fn succeeded(&self) -> Vec<ObjectId> {
        self.all()
            .filter(|r| r.success)
            .map(|r| r.object_id)
            .collect()
    }

    /// Operations the store rejected.
    pub fn failures(&self) -> Vec<&EditOpResult> {
        self.all().filter(|r| !r.success).collect()
    }

    fn all(&self) -> impl Iterator<Item = &EditOpResult> {
        self.update_results.iter().chain(self.delete_results.iter())
    }
}

#[derive(Debug, Deserialize)]
struct EditResponse {
    #[serde(default)]
    error: Option<ServiceError>,
    #[serde(flatten)]
    outcome: EditOutcome,
}

// ---------------------------------------------------------------------------
// Payload encoding
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct UpdateEnvelope<'a> {
    attributes: &'a FeatureUpdate,
}

/// `1,2,3` — the wire shape of a delete batch.
pub fn encode_deletes(ids: &[ObjectId]) -> String {
    ids.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(",")
}

/// `[{"attributes":{...}}, ...]` — the wire shape of an update batch.
pub fn encode_updates(updates: &[FeatureUpdate]) -> Result<String, serde_json::Error> {
    let envelopes: Vec<UpdateEnvelope<'_>> = updates
        .iter()
        .map(|attributes| UpdateEnvelope { attributes })
        .collect();
    serde_json::to_string(&envelopes)
}

// ---------------------------------------------------------------------------
// EditExecutor
// ---------------------------------------------------------------------------

/// Write client for the feature store's edit endpoint.
pub struct EditExecutor<'a> {
    agent: &'a ureq::Agent,
    settings: &'a Settings,
    credential: &'a Credential,
}

impl<'a> EditExecutor<'a> {
    pub fn new(agent: &'a ureq::Agent, settings: &'a Settings, credential: &'a Credential) -> Self {
        Self {
            agent,
            settings,
            credential,
        }
    }

    /// Delete a batch of records in one call.
    pub fn delete(&self, ids: &[ObjectId]) -> Result<EditOutcome, EditError> {
        let deletes = encode_deletes(ids);
        tracing::debug!("deleting {} records", ids.len());
        self.post(&[
            ("f", "json"),
            ("token", &self.credential.token),
            ("deletes", &deletes),
        ])
    }

    /// Delete a single record.
    pub fn delete_one(&self, id: ObjectId) -> Result<EditOutcome, EditError> {
        self.delete(&[id])
    }

    /// Submit a batch of updates in one call. Each update must already carry
    /// the complete non-nullable attribute set — nothing is validated here.
    pub fn update(&self, updates: &[FeatureUpdate]) -> Result<EditOutcome, EditError> {
        let payload = encode_updates(updates)?;
        tracing::debug!("updating {} records", updates.len());
        self.post(&[
            ("f", "json"),
            ("token", &self.credential.token),
            ("updates", &payload),
        ])
    }

    fn post(&self, form: &[(&str, &str)]) -> Result<EditOutcome, EditError> {
        let cookie = format!(
            "{}=\"{}\"",
            self.settings.role_cookie, self.credential.session_cookie
        );
        let response = self
            .agent
            .post(&self.settings.edit_url())
            .set("Origin", &self.settings.portal_url)
            .set("Referer", &self.settings.referer)
            .set("Cookie", &cookie)
            .send_form(form)
            .map_err(|e| match e {
                ureq::Error::Status(status, _) => EditError::Status { status },
                other => EditError::Transport {
                    source: Box::new(other),
                },
            })?;
        let body: EditResponse = response.into_json().map_err(EditError::Malformed)?;
        if let Some(error) = body.error {
            return Err(EditError::Rejected {
                code: error.code,
                message: error.message,
            });
        }
        Ok(body.outcome)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
