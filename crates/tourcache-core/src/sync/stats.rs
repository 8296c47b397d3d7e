use serde::Serialize;

use crate::models::EntityKind;
use crate::settings::LastSyncTime;

const BYTES_PER_MIB: f64 = 1024.0 * 1024.0;

/// Read-only snapshot of the offline cache.
///
/// `estimated_size_mb` is a heuristic: row counts times a fixed per-kind
/// weight (see [`EntityKind::estimated_row_bytes`]). It is a UI hint, not a
/// measurement of the database file.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[serde(rename_all = "camelCase")]
pub struct OfflineStats {
    pub spot_count: i64,
    pub event_count: i64,
    pub post_count: i64,
    /// Rows owned by the active identity, 0 without one
    pub favorite_count: i64,
    pub check_in_count: i64,
    pub last_sync_time: LastSyncTime,
    pub estimated_size_mb: f64,
}

impl OfflineStats {
    pub fn total_rows(&self) -> i64 {
        self.spot_count
            + self.event_count
            + self.post_count
            + self.favorite_count
            + self.check_in_count
    }

    pub fn is_empty(&self) -> bool {
        self.total_rows() == 0
    }
}

/// Sum of `count * weight` over the given kinds, in MiB
pub fn estimate_size_mb(counts: &[(EntityKind, i64)]) -> f64 {
    let bytes: u64 = counts
        .iter()
        .map(|(kind, count)| (*count).max(0) as u64 * kind.estimated_row_bytes())
        .sum();
    bytes as f64 / BYTES_PER_MIB
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_estimate_uses_per_kind_weights() {
        let size = estimate_size_mb(&[(EntityKind::Spots, 512), (EntityKind::Posts, 0)]);
        assert!((size - 1.0).abs() < f64::EPSILON);

        let size = estimate_size_mb(&[(EntityKind::Posts, 256), (EntityKind::Events, 0)]);
        assert!((size - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_estimate_of_nothing_is_zero() {
        assert_eq!(estimate_size_mb(&[]), 0.0);
        assert_eq!(estimate_size_mb(&[(EntityKind::Spots, -3)]), 0.0);
    }
}
