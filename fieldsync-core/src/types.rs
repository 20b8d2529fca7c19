//! Domain types for the fieldsync reconciliation pipeline.
//!
//! Records mirror the remote feature store's attribute schema, so the serde
//! field names here are the wire names. Timestamps are kept in the unit the
//! store uses (epoch milliseconds); `chrono` is only pulled in where a
//! human-readable rendering is needed.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// The store-assigned stable identity of a feature record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectId(pub i64);

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<i64> for ObjectId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

// ---------------------------------------------------------------------------
// Domain structs
// ---------------------------------------------------------------------------

/// The caller-meaningful identifier pair used to detect duplicate records,
/// distinct from the store-assigned [`ObjectId`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BusinessKey {
    pub flight_id: String,
    pub spk_number: String,
}

impl fmt::Display for BusinessKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.flight_id, self.spk_number)
    }
}

/// One attribute record as held by the remote feature store.
///
/// Business keys are not guaranteed unique; duplicates are the expected
/// failure mode the reconciliation engine corrects. Records are read and
/// mutated by this system, never created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureRecord {
    #[serde(rename = "OBJECTID")]
    pub object_id: ObjectId,
    #[serde(rename = "SPKNumber")]
    pub spk_number: String,
    #[serde(rename = "KeyID")]
    pub key_id: String,
    #[serde(rename = "FlightID")]
    pub flight_id: String,
    /// Creation timestamp in epoch milliseconds, as stored remotely.
    #[serde(rename = "CRT_Date")]
    pub created_at_ms: i64,
    #[serde(rename = "Height", default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
}

impl FeatureRecord {
    /// The wire names of every field the query client requests.
    pub const FIELDS: &'static [&'static str] = &[
        "OBJECTID",
        "SPKNumber",
        "KeyID",
        "FlightID",
        "CRT_Date",
        "Height",
    ];

    pub fn business_key(&self) -> BusinessKey {
        BusinessKey {
            flight_id: self.flight_id.clone(),
            spk_number: self.spk_number.clone(),
        }
    }
}

/// The complete non-nullable attribute set the remote schema requires for one
/// update. Assembling every required field is the caller's responsibility —
/// the store rejects an update that omits one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureUpdate {
    #[serde(rename = "OBJECTID")]
    pub object_id: ObjectId,
    #[serde(rename = "SPKNumber")]
    pub spk_number: String,
    #[serde(rename = "KeyID")]
    pub key_id: String,
    #[serde(rename = "CRT_Date")]
    pub created_at_ms: i64,
    #[serde(rename = "Height", skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
}

/// A token/cookie pair issued by the privileged handshake.
///
/// Valid for use only while `now < expires_at_ms`; replaced wholesale on
/// refresh, never mutated in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    pub token: String,
    /// Expiry in epoch milliseconds, the unit the token endpoint reports.
    #[serde(rename = "expires")]
    pub expires_at_ms: i64,
    #[serde(rename = "cookie")]
    pub session_cookie: String,
}

impl Credential {
    /// Strictly-greater comparison: a credential expiring exactly now is stale.
    pub fn is_valid_at(&self, now_ms: i64) -> bool {
        now_ms < self.expires_at_ms
    }

    /// Expiry as a UTC instant, for display. `None` if the stored millis are
    /// out of chrono's representable range.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.expires_at_ms)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
