use crate::model::{GroupAction, GroupOutcome, SweepSummary};

/// Fold per-group outcomes into the run tally.
///
/// Each group contributes to exactly one of `already_clean`, `migrated`
/// (single record), `skipped`, or the merge counters; failed writes land in
/// `errors` instead of the bucket they would have filled.
pub fn compute_summary(total: usize, groups: &[GroupOutcome]) -> SweepSummary {
    let mut summary = SweepSummary {
        total,
        ..SweepSummary::default()
    };

    for g in groups {
        summary.errors += g.errors.len();
        if g.degraded {
            summary.degraded += 1;
        }

        match &g.action {
            GroupAction::AlreadyClean => summary.already_clean += 1,
            GroupAction::Migrated { .. } => {
                if g.errors.is_empty() {
                    summary.migrated += 1;
                }
            }
            GroupAction::Merged {
                removed,
                keeper_migrated,
                ..
            } => {
                summary.duplicates_removed += removed.len();
                if *keeper_migrated {
                    summary.migrated += 1;
                }
            }
            GroupAction::Skipped { .. } => summary.skipped += 1,
        }
    }

    summary
}
