//! Workflow pipeline — the canonical entrypoints the CLI drives.
//!
//! Every workflow runs one sequential pass: query → reconcile → mutate, with
//! the re-key workflow adding a second query/reconcile round after the swap.
//! Fatal failures (query, edit) unwind as [`WorkflowError`]; per-item
//! conditions (a survey file that won't parse, an update target with no
//! matching records) are reported through the [`ProgressSink`] and skipped.
//!
//! Dry-run mode stops each workflow after its read/decide phases and reports
//! what would change without issuing a single edit call.

use std::path::{Path, PathBuf};

use fieldsync_core::{survey, FeatureUpdate, ObjectId, Settings};

use fieldsync_client::edit::EditOutcome;
use fieldsync_client::{FeatureStore, WhereClause};

use crate::engine::{reconcile, swap_keys, ReconcileOutcome};
use crate::error::{io_err, WorkflowError};

/// Upper bound requested from every broad query.
const MAX_RECORDS: u32 = 10_000;

// ---------------------------------------------------------------------------
// Progress reporting
// ---------------------------------------------------------------------------

/// Receives one line per reported operation as a workflow runs.
pub trait ProgressSink {
    fn line(&mut self, message: &str);
}

/// Sink that discards all progress output.
pub struct Discard;

impl ProgressSink for Discard {
    fn line(&mut self, _message: &str) {}
}

/// Surface per-operation edit failures, returning the accepted ids.
fn report_edit(outcome: &EditOutcome, verb: &str, progress: &mut dyn ProgressSink) -> Vec<ObjectId> {
    for failure in outcome.failures() {
        let detail = failure
            .error
            .as_ref()
            .map(|e| e.description.clone())
            .unwrap_or_else(|| "unknown error".to_string());
        progress.line(&format!("{verb} {} failed: {detail}", failure.object_id));
    }
    outcome.succeeded()
}

// ---------------------------------------------------------------------------
// Duplicate cleanup
// ---------------------------------------------------------------------------

/// Outcome of a duplicate-cleanup run.
#[derive(Debug)]
pub struct DedupeOutcome {
    pub fetched: usize,
    pub kept: usize,
    /// Ids deleted, or scheduled for deletion under `--dry-run`.
    pub deleted: Vec<ObjectId>,
    pub dry_run: bool,
}

/// Remove every duplicate record in the identity scope, optionally narrowed
/// to one SPK prefix. The newest record per business key survives.
pub fn dedupe(
    store: &mut dyn FeatureStore,
    settings: &Settings,
    spk_prefix: Option<&str>,
    dry_run: bool,
    progress: &mut dyn ProgressSink,
) -> Result<DedupeOutcome, WorkflowError> {
    let mut filter = WhereClause::scoped(&settings.user_id);
    if let Some(prefix) = spk_prefix {
        filter = filter.and_like_prefix("SPKNumber", prefix);
    }
    tracing::debug!("dedupe: {}", filter.as_str());
    let records = store.search(&filter, Some(MAX_RECORDS))?;
    let fetched = records.len();
    progress.line(&format!("{fetched} records fetched"));

    let ReconcileOutcome { keep, delete } = reconcile(records);
    if delete.is_empty() {
        progress.line("no duplicates found");
        return Ok(DedupeOutcome {
            fetched,
            kept: keep.len(),
            deleted: Vec::new(),
            dry_run,
        });
    }

    if dry_run {
        for id in &delete {
            progress.line(&format!("would delete {id}"));
        }
        return Ok(DedupeOutcome {
            fetched,
            kept: keep.len(),
            deleted: delete,
            dry_run,
        });
    }

    let outcome = store.delete(&delete)?;
    let deleted = report_edit(&outcome, "delete", progress);
    progress.line(&format!("{} duplicates deleted", deleted.len()));
    Ok(DedupeOutcome {
        fetched,
        kept: keep.len(),
        deleted,
        dry_run,
    })
}

// ---------------------------------------------------------------------------
// Re-key
// ---------------------------------------------------------------------------

/// Outcome of a re-key run.
#[derive(Debug)]
pub struct RekeyOutcome {
    pub first_pass_deleted: Vec<ObjectId>,
    pub swapped: usize,
    pub second_pass_deleted: Vec<ObjectId>,
    pub dry_run: bool,
}

/// Exchange the two business-key fields on every record under `from_prefix`,
/// deduplicating before the swap and again after it — the swap itself can
/// create fresh collisions under the new key scheme. After both passes no
/// business key collides under either scheme.
pub fn rekey(
    store: &mut dyn FeatureStore,
    settings: &Settings,
    from_prefix: &str,
    to_prefix: &str,
    dry_run: bool,
    progress: &mut dyn ProgressSink,
) -> Result<RekeyOutcome, WorkflowError> {
    let scoped = WhereClause::scoped(&settings.user_id);
    tracing::debug!("rekey: '{from_prefix}' -> '{to_prefix}'");

    // Pass 1: dedupe under the pre-swap key scheme.
    let filter = scoped.clone().and_like_prefix("SPKNumber", from_prefix);
    let records = store.search(&filter, Some(MAX_RECORDS))?;
    progress.line(&format!(
        "{} records under prefix '{from_prefix}'",
        records.len()
    ));
    let ReconcileOutcome { keep, delete } = reconcile(records);
    let first_pass_deleted = if delete.is_empty() {
        Vec::new()
    } else if dry_run {
        progress.line(&format!("would delete {} duplicates", delete.len()));
        delete
    } else {
        let outcome = store.delete(&delete)?;
        report_edit(&outcome, "delete", progress)
    };

    // Swap the key pair on every survivor.
    let updates = swap_keys(&keep);
    progress.line(&format!("{} records to re-key", updates.len()));
    if dry_run {
        return Ok(RekeyOutcome {
            first_pass_deleted,
            swapped: updates.len(),
            second_pass_deleted: Vec::new(),
            dry_run,
        });
    }
    if !updates.is_empty() {
        let outcome = store.update(&updates)?;
        report_edit(&outcome, "update", progress);
    }

    // Pass 2: dedupe whatever the swap newly collided.
    let filter = scoped.and_like_prefix("SPKNumber", to_prefix);
    let records = store.search(&filter, Some(MAX_RECORDS))?;
    let second = reconcile(records);
    let second_pass_deleted = if second.delete.is_empty() {
        progress.line("no post-swap duplicates");
        Vec::new()
    } else {
        let outcome = store.delete(&second.delete)?;
        report_edit(&outcome, "delete", progress)
    };

    Ok(RekeyOutcome {
        first_pass_deleted,
        swapped: updates.len(),
        second_pass_deleted,
        dry_run,
    })
}

// ---------------------------------------------------------------------------
// Height update
// ---------------------------------------------------------------------------

/// Outcome of processing one survey file.
#[derive(Debug, Clone, PartialEq)]
pub enum FileResult {
    /// Matching records were updated to the extracted height.
    Updated {
        file: String,
        flight_id: String,
        records: usize,
    },
    /// `--dry-run` mode: the records *would* have been updated.
    WouldUpdate {
        file: String,
        flight_id: String,
        records: usize,
    },
    /// The store holds no null-height record for this flight — reported and
    /// skipped, never fatal.
    NoMatches { file: String, flight_id: String },
    /// The file could not be extracted; the batch continues.
    Skipped { file: String, reason: String },
}

/// For every survey file in `dir`, push its extracted height into the null-
/// height records of the matching flight under one SPK number.
pub fn update_heights(
    store: &mut dyn FeatureStore,
    settings: &Settings,
    dir: &Path,
    spk: &str,
    dry_run: bool,
    progress: &mut dyn ProgressSink,
) -> Result<Vec<FileResult>, WorkflowError> {
    let mut entries: Vec<PathBuf> = std::fs::read_dir(dir)
        .map_err(|e| io_err(dir, e))?
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().map(|t| t.is_file()).unwrap_or(false))
        .map(|entry| entry.path())
        .collect();
    entries.sort();
    tracing::debug!("update_heights: {} files under {}", entries.len(), dir.display());

    let mut results = Vec::new();
    for path in entries {
        let file = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let fields = match survey::extract(&path) {
            Ok(fields) => fields,
            Err(e) => {
                progress.line(&format!("skipping '{file}': {e}"));
                results.push(FileResult::Skipped {
                    file,
                    reason: e.to_string(),
                });
                continue;
            }
        };
        progress.line(&format!(
            "parsed '{file}': flight {}, height {}",
            fields.flight_id, fields.height
        ));

        let filter = WhereClause::scoped(&settings.user_id)
            .and_eq("SPKNumber", spk)
            .and_eq("FlightID", &fields.flight_id)
            .and_is_null("Height");
        let records = store.search(&filter, None)?;
        if records.is_empty() {
            progress.line(&format!(
                "no null-height records for flight {}",
                fields.flight_id
            ));
            results.push(FileResult::NoMatches {
                file,
                flight_id: fields.flight_id,
            });
            continue;
        }

        // The edit endpoint rejects updates missing any non-nullable field,
        // so each update re-states the record's full required set.
        let updates: Vec<FeatureUpdate> = records
            .iter()
            .map(|r| FeatureUpdate {
                object_id: r.object_id,
                spk_number: r.spk_number.clone(),
                key_id: r.key_id.clone(),
                created_at_ms: r.created_at_ms,
                height: Some(fields.height),
            })
            .collect();

        if dry_run {
            progress.line(&format!(
                "would set {} records to height {}",
                updates.len(),
                fields.height
            ));
            results.push(FileResult::WouldUpdate {
                file,
                flight_id: fields.flight_id,
                records: updates.len(),
            });
            continue;
        }

        let outcome = store.update(&updates)?;
        let applied = report_edit(&outcome, "update", progress);
        progress.line(&format!(
            "{} records set to height {}",
            applied.len(),
            fields.height
        ));
        results.push(FileResult::Updated {
            file,
            flight_id: fields.flight_id,
            records: applied.len(),
        });
    }
    Ok(results)
}

// ---------------------------------------------------------------------------
// Null-height report
// ---------------------------------------------------------------------------

/// Distinct SPK numbers that still have null-height records, sorted.
pub fn report_nulls(
    store: &mut dyn FeatureStore,
    settings: &Settings,
) -> Result<Vec<String>, WorkflowError> {
    let filter = WhereClause::scoped(&settings.user_id).and_is_null("Height");
    let records = store.search(&filter, Some(MAX_RECORDS))?;
    let mut spks: Vec<String> = records.into_iter().map(|r| r.spk_number).collect();
    spks.sort();
    spks.dedup();
    Ok(spks)
}

// ---------------------------------------------------------------------------
// Purge
// ---------------------------------------------------------------------------

/// Outcome of a purge run.
#[derive(Debug)]
pub struct PurgeOutcome {
    /// Ids deleted, or scheduled for deletion under `--dry-run`.
    pub deleted: Vec<ObjectId>,
    pub dry_run: bool,
}

/// Delete every record carrying one SPK number. Zero matches is a plain
/// nothing-to-do outcome.
pub fn purge(
    store: &mut dyn FeatureStore,
    settings: &Settings,
    spk: &str,
    dry_run: bool,
    progress: &mut dyn ProgressSink,
) -> Result<PurgeOutcome, WorkflowError> {
    let filter = WhereClause::scoped(&settings.user_id).and_eq("SPKNumber", spk);
    let records = store.search(&filter, None)?;
    if records.is_empty() {
        progress.line(&format!("no records for SPK '{spk}'"));
        return Ok(PurgeOutcome {
            deleted: Vec::new(),
            dry_run,
        });
    }

    let ids: Vec<ObjectId> = records.iter().map(|r| r.object_id).collect();
    progress.line(&format!("{} records for SPK '{spk}'", ids.len()));
    if dry_run {
        return Ok(PurgeOutcome {
            deleted: ids,
            dry_run,
        });
    }

    let outcome = store.delete(&ids)?;
    let deleted = report_edit(&outcome, "delete", progress);
    Ok(PurgeOutcome { deleted, dry_run })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use fieldsync_client::edit::{EditOpResult, EditOutcome};
    use fieldsync_client::{EditError, QueryError};
    use fieldsync_core::{FeatureRecord, ObjectId};

    use super::*;

    /// In-memory store. `search` returns every current record — filters are
    /// the live endpoint's concern, and these workflows are exercised with
    /// record sets already shaped like the filtered result.
    #[derive(Default)]
    struct MockStore {
        records: Vec<FeatureRecord>,
        delete_calls: Vec<Vec<ObjectId>>,
        update_calls: Vec<Vec<FeatureUpdate>>,
    }

    fn ok_results(ids: &[ObjectId]) -> Vec<EditOpResult> {
        ids.iter()
            .map(|id| EditOpResult {
                object_id: *id,
                success: true,
                error: None,
            })
            .collect()
    }

    impl FeatureStore for MockStore {
        fn search(
            &mut self,
            _filter: &WhereClause,
            _max_records: Option<u32>,
        ) -> Result<Vec<FeatureRecord>, QueryError> {
            Ok(self.records.clone())
        }

        fn delete(&mut self, ids: &[ObjectId]) -> Result<EditOutcome, EditError> {
            self.delete_calls.push(ids.to_vec());
            self.records.retain(|r| !ids.contains(&r.object_id));
            Ok(EditOutcome {
                delete_results: ok_results(ids),
                ..EditOutcome::default()
            })
        }

        fn update(&mut self, updates: &[FeatureUpdate]) -> Result<EditOutcome, EditError> {
            self.update_calls.push(updates.to_vec());
            let ids: Vec<ObjectId> = updates.iter().map(|u| u.object_id).collect();
            for update in updates {
                if let Some(record) = self
                    .records
                    .iter_mut()
                    .find(|r| r.object_id == update.object_id)
                {
                    record.spk_number = update.spk_number.clone();
                    record.key_id = update.key_id.clone();
                    record.created_at_ms = update.created_at_ms;
                    if let Some(height) = update.height {
                        record.height = Some(height);
                    }
                }
            }
            Ok(EditOutcome {
                update_results: ok_results(&ids),
                ..EditOutcome::default()
            })
        }
    }

    #[derive(Default)]
    struct Collect(Vec<String>);

    impl ProgressSink for Collect {
        fn line(&mut self, message: &str) {
            self.0.push(message.to_string());
        }
    }

    fn settings() -> Settings {
        Settings {
            version: 1,
            portal_url: "https://maps.example.com".to_string(),
            feature_layer_url:
                "https://maps.example.com/arcgis/rest/services/Survey/FeatureServer/0".to_string(),
            referer: "https://maps.example.com/Uploads/".to_string(),
            user_id: "surveyor01".to_string(),
            read_username: "surveyor01".to_string(),
            write_username: "editor01".to_string(),
            role_cookie: "AGS_ROLES".to_string(),
            token_lifetime_minutes: 60,
        }
    }

    fn record(oid: i64, flight: &str, spk: &str, key: &str, created_at_ms: i64) -> FeatureRecord {
        FeatureRecord {
            object_id: ObjectId(oid),
            spk_number: spk.to_string(),
            key_id: key.to_string(),
            flight_id: flight.to_string(),
            created_at_ms,
            height: None,
        }
    }

    #[test]
    fn dedupe_deletes_one_batch_and_keeps_newest() {
        let mut store = MockStore {
            records: vec![
                record(1, "F1", "SPK1", "K", 100),
                record(2, "F1", "SPK1", "K", 300),
                record(3, "F1", "SPK1", "K", 200),
            ],
            ..MockStore::default()
        };
        let settings = settings();
        let outcome = dedupe(&mut store, &settings, None, false, &mut Discard).expect("dedupe");

        assert_eq!(outcome.fetched, 3);
        assert_eq!(outcome.kept, 1);
        assert_eq!(outcome.deleted, vec![ObjectId(1), ObjectId(3)]);
        assert_eq!(store.delete_calls.len(), 1, "deletes travel in one batch");
        assert_eq!(store.records.len(), 1);
        assert_eq!(store.records[0].object_id, ObjectId(2));
    }

    #[test]
    fn dedupe_dry_run_issues_no_edits() {
        let mut store = MockStore {
            records: vec![
                record(1, "F1", "SPK1", "K", 100),
                record(2, "F1", "SPK1", "K", 200),
            ],
            ..MockStore::default()
        };
        let settings = settings();
        let outcome = dedupe(&mut store, &settings, None, true, &mut Discard).expect("dedupe");

        assert_eq!(outcome.deleted, vec![ObjectId(1)]);
        assert!(store.delete_calls.is_empty());
        assert_eq!(store.records.len(), 2, "dry run must not mutate");
    }

    #[test]
    fn dedupe_with_no_duplicates_reports_and_skips_edits() {
        let mut store = MockStore {
            records: vec![record(1, "F1", "SPK1", "K", 100)],
            ..MockStore::default()
        };
        let settings = settings();
        let mut progress = Collect::default();
        let outcome = dedupe(&mut store, &settings, None, false, &mut progress).expect("dedupe");

        assert!(outcome.deleted.is_empty());
        assert!(store.delete_calls.is_empty());
        assert!(progress.0.iter().any(|l| l.contains("no duplicates")));
    }

    #[test]
    fn rekey_ends_with_no_collisions_under_either_scheme() {
        // Pre-swap keys are distinct; the swap collides both onto (F1, 5001).
        let mut store = MockStore {
            records: vec![
                record(1, "F1", "L001", "5001", 100),
                record(2, "F1", "L002", "5001", 200),
            ],
            ..MockStore::default()
        };
        let settings = settings();
        let outcome =
            rekey(&mut store, &settings, "L", "5", false, &mut Discard).expect("rekey");

        assert!(outcome.first_pass_deleted.is_empty());
        assert_eq!(outcome.swapped, 2);
        assert_eq!(outcome.second_pass_deleted, vec![ObjectId(1)]);

        // Survivor is the newest record, now carrying the swapped keys.
        assert_eq!(store.records.len(), 1);
        let survivor = &store.records[0];
        assert_eq!(survivor.object_id, ObjectId(2));
        assert_eq!(survivor.spk_number, "5001");
        assert_eq!(survivor.key_id, "L002");

        // No business key collides under the current or the swapped scheme.
        let current: HashSet<_> = store.records.iter().map(|r| r.business_key()).collect();
        assert_eq!(current.len(), store.records.len());
        let swapped: HashSet<_> = store
            .records
            .iter()
            .map(|r| (r.flight_id.clone(), r.key_id.clone()))
            .collect();
        assert_eq!(swapped.len(), store.records.len());
    }

    #[test]
    fn rekey_dedupes_before_swapping() {
        let mut store = MockStore {
            records: vec![
                record(1, "F1", "L001", "5001", 100),
                record(2, "F1", "L001", "5001", 200),
            ],
            ..MockStore::default()
        };
        let settings = settings();
        let outcome =
            rekey(&mut store, &settings, "L", "5", false, &mut Discard).expect("rekey");

        assert_eq!(outcome.first_pass_deleted, vec![ObjectId(1)]);
        assert_eq!(outcome.swapped, 1);
        assert_eq!(store.update_calls.len(), 1);
        assert_eq!(store.update_calls[0].len(), 1);
        assert_eq!(store.update_calls[0][0].object_id, ObjectId(2));
    }

    #[test]
    fn rekey_dry_run_stops_before_any_edit() {
        let mut store = MockStore {
            records: vec![
                record(1, "F1", "L001", "5001", 100),
                record(2, "F1", "L001", "5001", 200),
            ],
            ..MockStore::default()
        };
        let settings = settings();
        let outcome = rekey(&mut store, &settings, "L", "5", true, &mut Discard).expect("rekey");

        assert_eq!(outcome.first_pass_deleted, vec![ObjectId(1)]);
        assert_eq!(outcome.swapped, 1);
        assert!(store.delete_calls.is_empty());
        assert!(store.update_calls.is_empty());
    }

    #[test]
    fn heights_update_carries_the_full_attribute_set() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(
            dir.path().join("SITE_20240101_R99.ext"),
            r#"<Data name="Height"><value>12.5</value></Data>"#,
        )
        .unwrap();

        let mut store = MockStore {
            records: vec![record(7, "R99", "SPK1", "K7", 555)],
            ..MockStore::default()
        };
        let settings = settings();
        let results = update_heights(
            &mut store,
            &settings,
            dir.path(),
            "SPK1",
            false,
            &mut Discard,
        )
        .expect("update_heights");

        assert_eq!(
            results,
            vec![FileResult::Updated {
                file: "SITE_20240101_R99.ext".to_string(),
                flight_id: "R99".to_string(),
                records: 1,
            }]
        );
        let update = &store.update_calls[0][0];
        assert_eq!(update.object_id, ObjectId(7));
        assert_eq!(update.spk_number, "SPK1");
        assert_eq!(update.key_id, "K7");
        assert_eq!(update.created_at_ms, 555);
        assert_eq!(update.height, Some(12.5));
        assert_eq!(store.records[0].height, Some(12.5));
    }

    #[test]
    fn heights_skips_bad_files_and_continues() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join("a_broken.ext"), "<nothing/>").unwrap();
        std::fs::write(
            dir.path().join("b_good_R1.ext"),
            r#"<Data name="Height"><value>3.0</value></Data>"#,
        )
        .unwrap();

        let mut store = MockStore {
            records: vec![record(1, "R1", "SPK1", "K", 10)],
            ..MockStore::default()
        };
        let settings = settings();
        let mut progress = Collect::default();
        let results = update_heights(
            &mut store,
            &settings,
            dir.path(),
            "SPK1",
            false,
            &mut progress,
        )
        .expect("update_heights");

        assert_eq!(results.len(), 2);
        assert!(matches!(&results[0], FileResult::Skipped { file, .. } if file == "a_broken.ext"));
        assert!(matches!(&results[1], FileResult::Updated { .. }));
        assert!(progress.0.iter().any(|l| l.contains("skipping 'a_broken.ext'")));
    }

    #[test]
    fn heights_with_no_matching_records_is_a_nonfatal_skip() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(
            dir.path().join("SITE_R5.ext"),
            r#"<Data name="Height"><value>2.0</value></Data>"#,
        )
        .unwrap();

        let mut store = MockStore::default();
        let settings = settings();
        let mut progress = Collect::default();
        let results = update_heights(
            &mut store,
            &settings,
            dir.path(),
            "SPK1",
            false,
            &mut progress,
        )
        .expect("update_heights");

        assert_eq!(
            results,
            vec![FileResult::NoMatches {
                file: "SITE_R5.ext".to_string(),
                flight_id: "R5".to_string(),
            }]
        );
        assert!(store.update_calls.is_empty());
        assert!(progress.0.iter().any(|l| l.contains("no null-height records")));
    }

    #[test]
    fn report_nulls_sorts_and_dedupes_spks() {
        let mut store = MockStore {
            records: vec![
                record(1, "F1", "SPK9", "K", 1),
                record(2, "F2", "SPK1", "K", 1),
                record(3, "F3", "SPK9", "K", 1),
            ],
            ..MockStore::default()
        };
        let settings = settings();
        let spks = report_nulls(&mut store, &settings).expect("report_nulls");
        assert_eq!(spks, vec!["SPK1".to_string(), "SPK9".to_string()]);
    }

    #[test]
    fn purge_deletes_everything_under_one_spk() {
        let mut store = MockStore {
            records: vec![
                record(1, "F1", "SPK1", "K", 1),
                record(2, "F2", "SPK1", "K", 1),
            ],
            ..MockStore::default()
        };
        let settings = settings();
        let outcome = purge(&mut store, &settings, "SPK1", false, &mut Discard).expect("purge");
        assert_eq!(outcome.deleted, vec![ObjectId(1), ObjectId(2)]);
        assert_eq!(store.delete_calls.len(), 1);
        assert!(store.records.is_empty());
    }

    #[test]
    fn purge_with_no_matches_is_nothing_to_do() {
        let mut store = MockStore::default();
        let settings = settings();
        let mut progress = Collect::default();
        let outcome = purge(&mut store, &settings, "SPK1", false, &mut progress).expect("purge");
        assert!(outcome.deleted.is_empty());
        assert!(store.delete_calls.is_empty());
        assert!(progress.0.iter().any(|l| l.contains("no records")));
    }
}
