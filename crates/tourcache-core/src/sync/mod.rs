//! Sync module.
//!
//! This module provides:
//! - `SyncOrchestrator`: pulls every remote collection into the cache, tracks
//!   the last successful pass, reports stats and clears offline data
//! - `SyncOutcome` / `SyncReport`: structured per-kind results of a pass
//! - `OfflineStats`: row counts and the estimated cache size

pub mod orchestrator;
pub mod report;
pub mod stats;

pub use orchestrator::{SyncOrchestrator, SyncPhase};
pub use report::{KindOutcome, SkipReason, SyncOutcome, SyncReport};
pub use stats::{estimate_size_mb, OfflineStats};
