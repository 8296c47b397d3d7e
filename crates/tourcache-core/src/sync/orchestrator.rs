//! The sync orchestrator: refreshes the offline cache from the remote store.
//!
//! A pass walks the kinds in a fixed order (spots, events, posts, then
//! favorites and check-ins when a user is signed in). Each kind is fetched,
//! mapped and written independently:
//! - a fetch failure marks that kind failed and the pass moves on
//! - a malformed document is discarded and the rest of the batch is written
//! - a storage failure aborts the pass immediately
//!
//! The last-sync time is stamped only when every attempted kind succeeded.
//! One pass runs at a time; `clear_offline_data` waits for a running pass.

use std::sync::Arc;

use chrono::Utc;
use futures::StreamExt;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::auth::IdentityProvider;
use crate::cache::{CacheRow, CacheStore};
use crate::connectivity::ConnectivityMonitor;
use crate::error::{StorageError, StorageResult};
use crate::mapper::SyncedEntity;
use crate::models::{BlogPost, CheckIn, EntityKind, Event, Favorite, TouristSpot};
use crate::remote::RemoteStore;
use crate::settings::{LastSyncTime, SyncSettings};

use super::report::{KindOutcome, SkipReason, SyncOutcome, SyncReport};
use super::stats::{estimate_size_mb, OfflineStats};

/// Prefix of the per-kind bookkeeping keys in `offline_metadata`
const SYNC_METADATA_PREFIX: &str = "sync.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPhase {
    Idle,
    Running,
    Completed,
    Failed,
}

pub struct SyncOrchestrator {
    store: CacheStore,
    remote: Arc<dyn RemoteStore>,
    identity: Arc<dyn IdentityProvider>,
    settings: Arc<SyncSettings>,
    connectivity: Option<ConnectivityMonitor>,
    pass_lock: Mutex<()>,
    phase: watch::Sender<SyncPhase>,
}

impl SyncOrchestrator {
    pub fn new(
        store: CacheStore,
        remote: Arc<dyn RemoteStore>,
        identity: Arc<dyn IdentityProvider>,
        settings: Arc<SyncSettings>,
    ) -> Self {
        let (phase, _) = watch::channel(SyncPhase::Idle);
        Self {
            store,
            remote,
            identity,
            settings,
            connectivity: None,
            pass_lock: Mutex::new(()),
            phase,
        }
    }

    /// Gate auto-sync on this monitor
    pub fn with_connectivity(mut self, monitor: ConnectivityMonitor) -> Self {
        self.connectivity = Some(monitor);
        self
    }

    pub fn store(&self) -> &CacheStore {
        &self.store
    }

    pub fn settings(&self) -> &SyncSettings {
        &self.settings
    }

    pub fn phase(&self) -> SyncPhase {
        *self.phase.borrow()
    }

    pub fn subscribe_phase(&self) -> watch::Receiver<SyncPhase> {
        self.phase.subscribe()
    }

    // =========================================================================
    // Sync passes
    // =========================================================================

    /// Run a full pass over every kind.
    ///
    /// Returns `Skipped(AlreadyRunning)` instead of waiting if another pass
    /// holds the lock.
    pub async fn sync_from_remote(&self) -> SyncOutcome {
        let Ok(_guard) = self.pass_lock.try_lock() else {
            debug!("Sync requested while another pass is running");
            return SyncOutcome::Skipped {
                reason: SkipReason::AlreadyRunning,
            };
        };

        info!("Starting sync pass");
        self.phase.send_replace(SyncPhase::Running);

        let user_id = self.identity.current_user_id();
        let mut report = SyncReport::default();
        let result = self.run_kinds(&mut report, true, user_id.as_deref()).await;
        let outcome = self.finish_pass(report, result, true);

        self.log_outcome(&outcome);
        outcome
    }

    /// Refresh only favorites and check-ins for the active identity.
    ///
    /// Fails outright without an identity. Does not touch the last-sync time,
    /// which tracks full passes only.
    pub async fn sync_user_data(&self) -> SyncOutcome {
        let Ok(_guard) = self.pass_lock.try_lock() else {
            return SyncOutcome::Skipped {
                reason: SkipReason::AlreadyRunning,
            };
        };

        let Some(user_id) = self.identity.current_user_id() else {
            warn!("User data sync requested without an active identity");
            self.phase.send_replace(SyncPhase::Failed);
            return SyncOutcome::Aborted {
                report: SyncReport::default(),
                error: "no active identity".to_string(),
            };
        };

        info!("Starting user data sync");
        self.phase.send_replace(SyncPhase::Running);

        let mut report = SyncReport::default();
        let result = self.run_kinds(&mut report, false, Some(&user_id)).await;
        let outcome = self.finish_pass(report, result, false);

        self.log_outcome(&outcome);
        outcome
    }

    /// Run a full pass if auto-sync is enabled and the device is online.
    pub async fn sync_if_allowed(&self) -> SyncOutcome {
        if !self.settings.is_auto_sync_enabled() {
            return SyncOutcome::Skipped {
                reason: SkipReason::AutoSyncDisabled,
            };
        }
        if let Some(ref monitor) = self.connectivity {
            if !monitor.is_connected_now() {
                return SyncOutcome::Skipped {
                    reason: SkipReason::Offline,
                };
            }
        }
        self.sync_from_remote().await
    }

    /// Spawn a background task that runs [`sync_if_allowed`](Self::sync_if_allowed)
    /// each time connectivity comes back.
    ///
    /// Returns `None` without a connectivity monitor. Aborting the task drops
    /// its subscription, which unregisters the platform callback.
    pub fn spawn_auto_sync(self: &Arc<Self>) -> Option<JoinHandle<()>> {
        let monitor = self.connectivity.clone()?;
        let orchestrator = Arc::clone(self);

        Some(tokio::spawn(async move {
            let mut states = monitor.observe();
            let mut previous = None;
            while let Some(connected) = states.next().await {
                if connected && previous == Some(false) {
                    info!("Connectivity regained, running auto-sync");
                    let outcome = orchestrator.sync_if_allowed().await;
                    debug!(summary = %outcome.summary(), "Auto-sync finished");
                }
                previous = Some(connected);
            }
        }))
    }

    async fn run_kinds(
        &self,
        report: &mut SyncReport,
        include_global: bool,
        user_id: Option<&str>,
    ) -> StorageResult<()> {
        if include_global {
            self.sync_and_record::<TouristSpot>(report, None).await?;
            self.sync_and_record::<Event>(report, None).await?;
            self.sync_and_record::<BlogPost>(report, None).await?;
        }

        match user_id {
            Some(uid) => {
                self.sync_and_record::<Favorite>(report, Some(uid)).await?;
                self.sync_and_record::<CheckIn>(report, Some(uid)).await?;
            }
            None => {
                for kind in EntityKind::USER_SCOPED {
                    debug!(kind = %kind, "No active identity, skipping");
                    report.record(kind, KindOutcome::Skipped);
                }
            }
        }

        Ok(())
    }

    async fn sync_and_record<E: SyncedEntity>(
        &self,
        report: &mut SyncReport,
        user_id: Option<&str>,
    ) -> StorageResult<()> {
        let outcome = self.sync_kind::<E>(user_id).await?;
        self.record_kind(report, E::KIND, outcome).await
    }

    /// Fetch, map and write one kind.
    ///
    /// Remote failures become `KindOutcome::Failed`; storage failures are returned.
    /// For user-scoped kinds, documents without a `userId` are attributed to
    /// `user_id` and documents owned by anyone else are discarded.
    async fn sync_kind<E: SyncedEntity>(
        &self,
        user_id: Option<&str>,
    ) -> StorageResult<KindOutcome> {
        let kind = E::KIND;
        let fetched = match user_id {
            Some(uid) => self.remote.fetch_for_user(kind, uid).await,
            None => self.remote.fetch_all(kind).await,
        };

        let documents = match fetched {
            Ok(documents) => documents,
            Err(e) => {
                error!(kind = %kind, error = %e, "Fetch failed");
                return Ok(KindOutcome::Failed {
                    error: e.to_string(),
                });
            }
        };

        let synced_at = Utc::now();
        let mut rows = Vec::with_capacity(documents.len());
        let mut discarded = 0;
        for doc in documents {
            let doc = match user_id {
                Some(uid) if doc.non_empty_str_field("userId").is_none() => {
                    doc.with("userId", uid)
                }
                _ => doc,
            };
            let row = match E::from_document(&doc) {
                Ok(entity) => entity.to_cache_row_at(synced_at),
                Err(e) => {
                    warn!(kind = %kind, error = %e, "Discarding malformed document");
                    discarded += 1;
                    continue;
                }
            };
            if let (Some(uid), Some(owner)) = (user_id, row.owner()) {
                if owner != uid {
                    warn!(
                        kind = %kind,
                        id = %doc.id,
                        owner,
                        "Discarding document owned by another user"
                    );
                    discarded += 1;
                    continue;
                }
            }
            rows.push(row);
        }

        let written = self
            .store
            .table::<E::Row>()
            .insert_or_replace_batch(&rows)
            .await?;
        debug!(kind = %kind, written, discarded, "Kind synced");

        Ok(if discarded == 0 {
            KindOutcome::Synced { written }
        } else {
            KindOutcome::Partial { written, discarded }
        })
    }

    async fn record_kind(
        &self,
        report: &mut SyncReport,
        kind: EntityKind,
        outcome: KindOutcome,
    ) -> StorageResult<()> {
        let success_key = format!("{}{}.last_success", SYNC_METADATA_PREFIX, kind);
        let error_key = format!("{}{}.last_error", SYNC_METADATA_PREFIX, kind);
        match &outcome {
            KindOutcome::Synced { .. } | KindOutcome::Partial { .. } => {
                let now = Utc::now().timestamp_millis().to_string();
                self.store.set_metadata(&success_key, &now).await?;
                self.store.delete_metadata(&error_key).await?;
            }
            KindOutcome::Failed { error } => {
                self.store.set_metadata(&error_key, error).await?;
            }
            KindOutcome::Skipped => {}
        }
        report.record(kind, outcome);
        Ok(())
    }

    fn finish_pass(
        &self,
        report: SyncReport,
        result: StorageResult<()>,
        stamp_last_sync: bool,
    ) -> SyncOutcome {
        if let Err(e) = result {
            self.phase.send_replace(SyncPhase::Failed);
            return SyncOutcome::Aborted {
                report,
                error: e.to_string(),
            };
        }

        if !report.failed_kinds().is_empty() {
            self.phase.send_replace(SyncPhase::Failed);
            return SyncOutcome::Partial { report };
        }

        let completed_at = Utc::now();
        if stamp_last_sync {
            if let Err(e) = self.settings.set_last_sync_time(LastSyncTime::at(completed_at)) {
                self.phase.send_replace(SyncPhase::Failed);
                return SyncOutcome::Aborted {
                    report,
                    error: e.to_string(),
                };
            }
        }

        self.phase.send_replace(SyncPhase::Completed);
        SyncOutcome::Success {
            report,
            completed_at,
        }
    }

    fn log_outcome(&self, outcome: &SyncOutcome) {
        match outcome {
            SyncOutcome::Success { report, .. } => info!(
                written = report.total_written(),
                discarded = report.total_discarded(),
                "Sync pass complete"
            ),
            SyncOutcome::Partial { report } => warn!(
                failed = ?report.failed_kinds(),
                written = report.total_written(),
                "Sync pass incomplete"
            ),
            SyncOutcome::Aborted { error, .. } => error!(error = %error, "Sync pass aborted"),
            SyncOutcome::Skipped { reason } => debug!(reason = %reason, "Sync pass skipped"),
        }
    }

    // =========================================================================
    // Maintenance
    // =========================================================================

    /// Snapshot of row counts, last-sync time and the estimated cache size.
    pub async fn get_stats(&self) -> StorageResult<OfflineStats> {
        let spot_count = self.store.spots().count().await?;
        let event_count = self.store.events().count().await?;
        let post_count = self.store.posts().count().await?;

        let (favorite_count, check_in_count) = match self.identity.current_user_id() {
            Some(uid) => (
                self.store.favorites().count_for_user(&uid).await?,
                self.store.check_ins().count_for_user(&uid).await?,
            ),
            None => (0, 0),
        };

        let estimated_size_mb = estimate_size_mb(&[
            (EntityKind::Spots, spot_count),
            (EntityKind::Events, event_count),
            (EntityKind::Posts, post_count),
            (EntityKind::Favorites, favorite_count),
            (EntityKind::CheckIns, check_in_count),
        ]);

        Ok(OfflineStats {
            spot_count,
            event_count,
            post_count,
            favorite_count,
            check_in_count,
            last_sync_time: self.settings.last_sync_time(),
            estimated_size_mb,
        })
    }

    /// Delete every cached row (user-scoped rows only for the active identity)
    /// and reset the last-sync time to "never".
    ///
    /// Destructive and irreversible; the remote store is not touched. Waits
    /// for a running pass to finish first.
    pub async fn clear_offline_data(&self) -> Result<u64, StorageError> {
        let _guard = self.pass_lock.lock().await;
        warn!("Clearing offline data");

        let mut deleted = 0;
        deleted += self.store.spots().delete_all().await?;
        deleted += self.store.events().delete_all().await?;
        deleted += self.store.posts().delete_all().await?;

        if let Some(uid) = self.identity.current_user_id() {
            deleted += self.store.favorites().delete_all_for_user(&uid).await?;
            deleted += self.store.check_ins().delete_all_for_user(&uid).await?;
        }

        self.store.delete_metadata_prefix(SYNC_METADATA_PREFIX).await?;
        self.settings.reset_last_sync_time()?;
        self.phase.send_replace(SyncPhase::Idle);

        info!(deleted, "Offline data cleared");
        Ok(deleted)
    }
}
