use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::SweepPass;
use crate::jid;

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// One stored contact, as handed out by the storage backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactRecord {
    pub id: i64,
    pub display_name: String,
    /// Canonical phone number, or a network-encoded JID before convergence.
    pub identity_value: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ContactRecord {
    pub fn is_canonical(&self) -> bool {
        jid::is_canonical(&self.identity_value)
    }
}

// ---------------------------------------------------------------------------
// Per-group outcomes
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Update,
    Delete,
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Update => write!(f, "update"),
            Self::Delete => write!(f, "delete"),
        }
    }
}

/// A persistence failure attributed to one record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordError {
    pub record_id: i64,
    pub operation: Operation,
    pub message: String,
}

/// A record touched by a sweep, as it looked in the snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordRef {
    pub id: i64,
    pub identity_value: String,
    pub created_at: DateTime<Utc>,
}

impl From<&ContactRecord> for RecordRef {
    fn from(record: &ContactRecord) -> Self {
        Self {
            id: record.id,
            identity_value: record.identity_value.clone(),
            created_at: record.created_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GroupAction {
    /// Single canonical record, nothing to do.
    AlreadyClean,
    /// Single record rewritten in place.
    Migrated { from: String, to: String },
    /// Duplicates removed around a keeper.
    Merged {
        kept: RecordRef,
        removed: Vec<RecordRef>,
        keeper_migrated: bool,
    },
    /// Left untouched by a partial pass.
    Skipped { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupOutcome {
    pub canonical: String,
    pub keeper_id: i64,
    pub size: usize,
    pub action: GroupAction,
    /// At least one member resolved through a fallback.
    pub degraded: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<RecordError>,
}

// ---------------------------------------------------------------------------
// Summary + Output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SweepSummary {
    pub total: usize,
    pub migrated: usize,
    pub duplicates_removed: usize,
    pub already_clean: usize,
    pub skipped: usize,
    pub errors: usize,
    pub degraded: usize,
    /// Record count after the sweep. `None` on dry runs or when counting failed.
    pub final_count: Option<u64>,
}

impl SweepSummary {
    /// True when the sweep made no change and hit no error.
    pub fn is_clean(&self) -> bool {
        self.migrated == 0 && self.duplicates_removed == 0 && self.errors == 0
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SweepMeta {
    pub engine_version: String,
    pub pass: SweepPass,
    pub dry_run: bool,
    pub run_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SweepReport {
    pub meta: SweepMeta,
    pub summary: SweepSummary,
    pub groups: Vec<GroupOutcome>,
}

impl SweepReport {
    /// Groups that changed or failed; already-clean groups are omitted.
    pub fn changes(&self) -> impl Iterator<Item = &GroupOutcome> {
        self.groups
            .iter()
            .filter(|g| g.action != GroupAction::AlreadyClean || !g.errors.is_empty())
    }
}
