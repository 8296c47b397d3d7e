//! Structured results of a sync pass.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::EntityKind;

/// What happened to one entity kind during a pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum KindOutcome {
    /// Every fetched document was written
    Synced { written: usize },
    /// Some documents could not be mapped and were discarded
    Partial { written: usize, discarded: usize },
    /// The fetch failed; previously cached rows are untouched
    Failed { error: String },
    /// Not attempted (user-scoped kind without an active identity)
    Skipped,
}

impl KindOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, KindOutcome::Failed { .. })
    }

    pub fn written(&self) -> usize {
        match self {
            KindOutcome::Synced { written } | KindOutcome::Partial { written, .. } => *written,
            KindOutcome::Failed { .. } | KindOutcome::Skipped => 0,
        }
    }
}

/// Per-kind outcomes in the order the kinds were attempted.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SyncReport {
    pub kinds: Vec<(EntityKind, KindOutcome)>,
}

impl SyncReport {
    pub fn record(&mut self, kind: EntityKind, outcome: KindOutcome) {
        self.kinds.push((kind, outcome));
    }

    pub fn outcome(&self, kind: EntityKind) -> Option<&KindOutcome> {
        self.kinds.iter().find(|(k, _)| *k == kind).map(|(_, o)| o)
    }

    pub fn failed_kinds(&self) -> Vec<EntityKind> {
        self.kinds
            .iter()
            .filter(|(_, o)| o.is_failure())
            .map(|(k, _)| *k)
            .collect()
    }

    pub fn total_written(&self) -> usize {
        self.kinds.iter().map(|(_, o)| o.written()).sum()
    }

    pub fn total_discarded(&self) -> usize {
        self.kinds
            .iter()
            .map(|(_, o)| match o {
                KindOutcome::Partial { discarded, .. } => *discarded,
                _ => 0,
            })
            .sum()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// Another pass holds the sync lock
    AlreadyRunning,
    AutoSyncDisabled,
    Offline,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::AlreadyRunning => write!(f, "a sync is already running"),
            SkipReason::AutoSyncDisabled => write!(f, "auto-sync is disabled"),
            SkipReason::Offline => write!(f, "no network connection"),
        }
    }
}

/// Result of one `sync_from_remote` call. Never an unhandled error.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum SyncOutcome {
    /// Every attempted kind synced; the last-sync time was stamped
    Success {
        report: SyncReport,
        completed_at: DateTime<Utc>,
    },
    /// At least one kind failed; kinds that succeeded keep their new rows
    Partial { report: SyncReport },
    /// A storage or identity failure stopped the pass early
    Aborted { report: SyncReport, error: String },
    /// The pass did not start
    Skipped { reason: SkipReason },
}

impl SyncOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, SyncOutcome::Success { .. })
    }

    pub fn report(&self) -> Option<&SyncReport> {
        match self {
            SyncOutcome::Success { report, .. }
            | SyncOutcome::Partial { report }
            | SyncOutcome::Aborted { report, .. } => Some(report),
            SyncOutcome::Skipped { .. } => None,
        }
    }

    /// One-line description suitable for a status bar
    pub fn summary(&self) -> String {
        match self {
            SyncOutcome::Success { report, .. } => {
                format!("Synced {} items", report.total_written())
            }
            SyncOutcome::Partial { report } => {
                let failed: Vec<String> =
                    report.failed_kinds().iter().map(|k| k.to_string()).collect();
                format!(
                    "Sync incomplete ({} failed), will retry next time",
                    failed.join(", ")
                )
            }
            SyncOutcome::Aborted { error, .. } => format!("Sync failed: {}", error),
            SyncOutcome::Skipped { reason } => format!("Sync skipped: {}", reason),
        }
    }
}
