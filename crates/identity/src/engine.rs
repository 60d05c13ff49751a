use std::cmp::Ordering;

use tracing::{debug, info, warn};

use crate::config::{SweepConfig, SweepPass};
use crate::error::SweepError;
use crate::group::{group_records, IdentityGroup};
use crate::mapping::MappingLookup;
use crate::model::{
    ContactRecord, GroupAction, GroupOutcome, Operation, RecordError, RecordRef, SweepMeta,
    SweepReport,
};
use crate::resolver::IdentityResolver;
use crate::store::ContactStore;
use crate::summary::compute_summary;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepOptions {
    pub pass: SweepPass,
    /// Decide everything, write nothing.
    pub dry_run: bool,
}

impl From<&SweepConfig> for SweepOptions {
    fn from(config: &SweepConfig) -> Self {
        Self {
            pass: config.pass,
            dry_run: config.dry_run,
        }
    }
}

/// Run one reconciliation sweep over a fresh snapshot of `store`.
///
/// Fails only when the snapshot itself cannot be read; in that case nothing
/// has been written. Per-record write failures are recorded in the report
/// and the sweep moves on.
pub fn sweep<S, M>(
    store: &mut S,
    resolver: &IdentityResolver<M>,
    options: SweepOptions,
) -> Result<SweepReport, SweepError>
where
    S: ContactStore + ?Sized,
    M: MappingLookup,
{
    let records = store.list_all().map_err(SweepError::Snapshot)?;
    info!(
        total = records.len(),
        pass = %options.pass,
        dry_run = options.dry_run,
        "contact snapshot loaded"
    );

    let groups = group_records(&records, resolver);
    let duplicate_groups = groups.iter().filter(|g| g.len() > 1).count();
    debug!(groups = groups.len(), duplicate_groups, "records grouped by canonical identity");

    let mut writer = Writer {
        store: &mut *store,
        dry_run: options.dry_run,
    };
    let outcomes: Vec<GroupOutcome> = groups
        .iter()
        .map(|group| match options.pass {
            SweepPass::Full => reconcile_group(&mut writer, group),
            SweepPass::Migrate => migrate_group(&mut writer, group),
            SweepPass::Dedupe => dedupe_group(&mut writer, group),
        })
        .collect();

    let mut summary = compute_summary(records.len(), &outcomes);
    if !options.dry_run {
        summary.final_count = match store.count() {
            Ok(n) => Some(n),
            Err(e) => {
                warn!(error = %e, "cannot count contacts after sweep");
                None
            }
        };
    }

    info!(
        migrated = summary.migrated,
        duplicates_removed = summary.duplicates_removed,
        already_clean = summary.already_clean,
        skipped = summary.skipped,
        errors = summary.errors,
        "sweep finished"
    );

    Ok(SweepReport {
        meta: SweepMeta {
            engine_version: env!("CARGO_PKG_VERSION").to_string(),
            pass: options.pass,
            dry_run: options.dry_run,
            run_at: chrono::Utc::now().to_rfc3339(),
        },
        summary,
        groups: outcomes,
    })
}

// ---------------------------------------------------------------------------
// Writes
// ---------------------------------------------------------------------------

/// Store handle that honours dry runs and turns failures into `RecordError`s.
struct Writer<'a, S: ?Sized> {
    store: &'a mut S,
    dry_run: bool,
}

impl<S: ContactStore + ?Sized> Writer<'_, S> {
    fn rewrite(&mut self, record: &ContactRecord, canonical: &str) -> Result<(), RecordError> {
        info!(id = record.id, from = %record.identity_value, to = canonical, "migrating contact");
        if self.dry_run {
            return Ok(());
        }
        let mut updated = record.clone();
        updated.identity_value = canonical.to_string();
        self.store.update(&updated).map_err(|e| {
            warn!(id = record.id, error = %e, "update failed");
            RecordError {
                record_id: record.id,
                operation: Operation::Update,
                message: e.to_string(),
            }
        })
    }

    fn remove(&mut self, record: &ContactRecord) -> Result<(), RecordError> {
        info!(id = record.id, value = %record.identity_value, "removing duplicate contact");
        if self.dry_run {
            return Ok(());
        }
        self.store.delete(record).map_err(|e| {
            warn!(id = record.id, error = %e, "delete failed");
            RecordError {
                record_id: record.id,
                operation: Operation::Delete,
                message: e.to_string(),
            }
        })
    }
}

// ---------------------------------------------------------------------------
// Keeper selection
// ---------------------------------------------------------------------------

/// Canonical records first, then newest first, then lowest id.
pub fn keeper_order(a: &ContactRecord, b: &ContactRecord) -> Ordering {
    b.is_canonical()
        .cmp(&a.is_canonical())
        .then_with(|| b.created_at.cmp(&a.created_at))
        .then_with(|| a.id.cmp(&b.id))
}

/// Members of a duplicate group, keeper first.
pub fn rank_candidates(records: &[ContactRecord]) -> Vec<&ContactRecord> {
    let mut ranked: Vec<&ContactRecord> = records.iter().collect();
    ranked.sort_by(|a, b| keeper_order(a, b));
    ranked
}

// ---------------------------------------------------------------------------
// Passes
// ---------------------------------------------------------------------------

fn outcome(group: &IdentityGroup, keeper_id: i64, action: GroupAction) -> GroupOutcome {
    GroupOutcome {
        canonical: group.canonical.clone(),
        keeper_id,
        size: group.len(),
        action,
        degraded: group.is_degraded(),
        errors: Vec::new(),
    }
}

fn reconcile_group<S: ContactStore + ?Sized>(
    writer: &mut Writer<'_, S>,
    group: &IdentityGroup,
) -> GroupOutcome {
    match group.records.as_slice() {
        [single] => migrate_single(writer, group, single),
        _ => merge_group(writer, group, true),
    }
}

fn migrate_group<S: ContactStore + ?Sized>(
    writer: &mut Writer<'_, S>,
    group: &IdentityGroup,
) -> GroupOutcome {
    match group.records.as_slice() {
        [single] if !single.is_canonical() && group.source_of(single.id).is_degraded() => {
            debug!(id = single.id, value = %single.identity_value, "leaving unmapped LID as-is");
            outcome(
                group,
                single.id,
                GroupAction::Skipped {
                    reason: "LID mapping not found".into(),
                },
            )
        }
        [single] => migrate_single(writer, group, single),
        records => {
            debug!(canonical = %group.canonical, size = records.len(), "duplicate group left for dedupe");
            let keeper_id = rank_candidates(records).first().map_or(0, |r| r.id);
            outcome(
                group,
                keeper_id,
                GroupAction::Skipped {
                    reason: "duplicate group".into(),
                },
            )
        }
    }
}

fn dedupe_group<S: ContactStore + ?Sized>(
    writer: &mut Writer<'_, S>,
    group: &IdentityGroup,
) -> GroupOutcome {
    match group.records.as_slice() {
        [single] if single.is_canonical() => outcome(group, single.id, GroupAction::AlreadyClean),
        [single] => outcome(
            group,
            single.id,
            GroupAction::Skipped {
                reason: "not canonical".into(),
            },
        ),
        _ => merge_group(writer, group, false),
    }
}

fn migrate_single<S: ContactStore + ?Sized>(
    writer: &mut Writer<'_, S>,
    group: &IdentityGroup,
    record: &ContactRecord,
) -> GroupOutcome {
    if record.is_canonical() {
        debug!(id = record.id, "already clean");
        return outcome(group, record.id, GroupAction::AlreadyClean);
    }

    let mut result = outcome(
        group,
        record.id,
        GroupAction::Migrated {
            from: record.identity_value.clone(),
            to: group.canonical.clone(),
        },
    );
    if let Err(e) = writer.rewrite(record, &group.canonical) {
        result.errors.push(e);
    }
    result
}

fn merge_group<S: ContactStore + ?Sized>(
    writer: &mut Writer<'_, S>,
    group: &IdentityGroup,
    rewrite_keeper: bool,
) -> GroupOutcome {
    let ranked = rank_candidates(&group.records);
    let Some((&keeper, losers)) = ranked.split_first() else {
        return outcome(group, 0, GroupAction::Skipped { reason: "empty group".into() });
    };
    info!(
        canonical = %group.canonical,
        keeper = keeper.id,
        duplicates = losers.len(),
        "duplicate group detected"
    );

    let mut errors = Vec::new();
    let mut removed = Vec::with_capacity(losers.len());
    for loser in losers {
        match writer.remove(loser) {
            Ok(()) => removed.push(RecordRef::from(*loser)),
            Err(e) => errors.push(e),
        }
    }

    let mut keeper_migrated = false;
    if rewrite_keeper && !keeper.is_canonical() {
        match writer.rewrite(keeper, &group.canonical) {
            Ok(()) => keeper_migrated = true,
            Err(e) => errors.push(e),
        }
    }

    let mut result = outcome(
        group,
        keeper.id,
        GroupAction::Merged {
            kept: RecordRef::from(keeper),
            removed,
            keeper_migrated,
        },
    );
    result.errors = errors;
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn record(id: i64, value: &str, minute: u32) -> ContactRecord {
        let ts = Utc.with_ymd_and_hms(2026, 1, 15, 10, minute, 0).unwrap();
        ContactRecord {
            id,
            display_name: format!("contact {id}"),
            identity_value: value.into(),
            created_at: ts,
            updated_at: ts,
        }
    }

    fn ids(ranked: &[&ContactRecord]) -> Vec<i64> {
        ranked.iter().map(|r| r.id).collect()
    }

    #[test]
    fn canonical_beats_newer() {
        let records = vec![record(1, "15551234567", 0), record(2, "555111@lid", 30)];
        assert_eq!(ids(&rank_candidates(&records)), vec![1, 2]);
    }

    #[test]
    fn newest_wins_among_equals() {
        let records = vec![
            record(1, "555111@lid", 0),
            record(2, "555111@lid", 20),
            record(3, "555111@lid", 10),
        ];
        assert_eq!(ids(&rank_candidates(&records)), vec![2, 3, 1]);
    }

    #[test]
    fn id_breaks_timestamp_ties() {
        let a = vec![record(9, "1@lid", 5), record(4, "1@lid", 5)];
        let b = vec![record(4, "1@lid", 5), record(9, "1@lid", 5)];
        assert_eq!(ids(&rank_candidates(&a)), vec![4, 9]);
        assert_eq!(ids(&rank_candidates(&b)), vec![4, 9]);
    }
}
