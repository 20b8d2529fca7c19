//! Feature query client — filtered attribute reads.
//!
//! Every query is scoped to the owning identity and suppresses geometry;
//! records are attribute-only for this system's purposes. An empty result
//! set is a valid outcome, not an error.

use serde::Deserialize;

use fieldsync_core::{Credential, FeatureRecord, Settings};

use crate::error::{QueryError, ServiceError};

// ---------------------------------------------------------------------------
// WhereClause
// ---------------------------------------------------------------------------

/// Builder for the SQL-like predicate string the query endpoint accepts.
///
/// Starts from the identity scope and composes further conditions with
/// `AND`. Values are single-quote escaped at this boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WhereClause {
    expr: String,
}

impl WhereClause {
    /// `(UserID='<user_id>')` — the scope every query carries.
    pub fn scoped(user_id: &str) -> Self {
        Self {
            expr: format!("(UserID='{}')", escape(user_id)),
        }
    }

    /// Append `(field='value')`.
    pub fn and_eq(mut self, field: &str, value: &str) -> Self {
        self.push(format!("({}='{}')", field, escape(value)));
        self
    }

    /// Append `(field LIKE 'prefix%')`.
    pub fn and_like_prefix(mut self, field: &str, prefix: &str) -> Self {
        self.push(format!("({} LIKE '{}%')", field, escape(prefix)));
        self
    }

    /// Append `(field IS NULL)`.
    pub fn and_is_null(mut self, field: &str) -> Self {
        self.push(format!("({field} IS NULL)"));
        self
    }

    /// Append `(field >= DATE 'YYYY-MM-DD')`.
    pub fn and_date_since(mut self, field: &str, date: chrono::NaiveDate) -> Self {
        self.push(format!("({} >= DATE '{}')", field, date.format("%Y-%m-%d")));
        self
    }

    pub fn as_str(&self) -> &str {
        &self.expr
    }

    fn push(&mut self, condition: String) {
        self.expr.push_str(" AND ");
        self.expr.push_str(&condition);
    }
}

fn escape(value: &str) -> String {
    value.replace('\'', "''")
}

// ---------------------------------------------------------------------------
// FeatureQuery
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    features: Vec<Feature>,
    #[serde(default)]
    error: Option<ServiceError>,
}

#[derive(Debug, Deserialize)]
struct Feature {
    attributes: FeatureRecord,
}

/// Read client for the feature store's query endpoint.
pub struct FeatureQuery<'a> {
    agent: &'a ureq::Agent,
    settings: &'a Settings,
    token: String,
}

impl<'a> FeatureQuery<'a> {
    pub fn new(agent: &'a ureq::Agent, settings: &'a Settings, credential: &Credential) -> Self {
        Self {
            agent,
            settings,
            token: credential.token.clone(),
        }
    }

    /// Run one filtered query and parse the attribute records.
    pub fn search(
        &self,
        filter: &WhereClause,
        max_records: Option<u32>,
    ) -> Result<Vec<FeatureRecord>, QueryError> {
        let url = self.settings.query_url();
        let out_fields = FeatureRecord::FIELDS.join(",");
        let mut request = self
            .agent
            .get(&url)
            .query("f", "json")
            .query("where", filter.as_str())
            .query("outFields", &out_fields)
            .query("returnGeometry", "false")
            .query("token", &self.token);
        if let Some(max) = max_records {
            request = request.query("resultRecordCount", &max.to_string());
        }

        tracing::debug!("query: {}", filter.as_str());
        let response = request.call().map_err(|e| match e {
            ureq::Error::Status(status, _) => QueryError::Status { status },
            other => QueryError::Transport {
                source: Box::new(other),
            },
        })?;
        let body: QueryResponse = response.into_json().map_err(QueryError::Malformed)?;
        if let Some(error) = body.error {
            return Err(QueryError::Rejected {
                code: error.code,
                message: error.message,
            });
        }
        tracing::debug!("query returned {} records", body.features.len());
        Ok(body.features.into_iter().map(|f| f.attributes).collect())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
