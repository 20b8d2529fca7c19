//! Reconciliation engine — duplicate elimination over business keys.
//!
//! Records are grouped by their composite business key; within each group
//! the most recently created record survives and every other member is
//! scheduled for deletion. Ordering inside a group is fully deterministic:
//! creation timestamp descending, then object id ascending, so two runs over
//! the same records always pick the same survivor regardless of the order
//! the store returned them in.

use std::collections::HashMap;

use fieldsync_core::{BusinessKey, FeatureRecord, FeatureUpdate, ObjectId};

/// The engine's verdict: survivors and the ids to delete.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReconcileOutcome {
    pub keep: Vec<FeatureRecord>,
    pub delete: Vec<ObjectId>,
}

/// Split records into one survivor per business key plus a deletion set.
///
/// Groups of one contribute their sole member to `keep` and nothing to
/// `delete`. Output order is ascending object id on both sides.
pub fn reconcile(records: Vec<FeatureRecord>) -> ReconcileOutcome {
    let mut groups: HashMap<BusinessKey, Vec<FeatureRecord>> = HashMap::new();
    for record in records {
        groups.entry(record.business_key()).or_default().push(record);
    }

    let mut keep = Vec::new();
    let mut delete = Vec::new();
    for (_, mut members) in groups {
        members.sort_by(|a, b| {
            b.created_at_ms
                .cmp(&a.created_at_ms)
                .then(a.object_id.cmp(&b.object_id))
        });
        let mut members = members.into_iter();
        if let Some(survivor) = members.next() {
            keep.push(survivor);
        }
        delete.extend(members.map(|r| r.object_id));
    }

    keep.sort_by_key(|r| r.object_id);
    delete.sort();
    ReconcileOutcome { keep, delete }
}

/// Exchange the two business-key fields of each survivor, producing the
/// update batch for the re-key workflow. Creation timestamps are preserved;
/// no other field travels.
pub fn swap_keys(keep: &[FeatureRecord]) -> Vec<FeatureUpdate> {
    keep.iter()
        .map(|record| FeatureUpdate {
            object_id: record.object_id,
            spk_number: record.key_id.clone(),
            key_id: record.spk_number.clone(),
            created_at_ms: record.created_at_ms,
            height: None,
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
