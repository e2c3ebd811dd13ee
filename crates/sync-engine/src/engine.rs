// crates/sync-engine/src/engine.rs
//! Sync engine state machine and drain loop

use crate::backoff::BackoffPolicy;
use crate::config::SyncConfig;
use crate::error::{SyncError, SyncResult};
use crate::events::{SyncEvent, SyncNotifier};
use crate::queue::{FailureOutcome, SyncQueue};
use crate::remote::RemoteApply;
use crate::store::EntityStore;
use crate::types::{Operation, SyncReport, SyncStatus};
use chrono::Utc;
use rehearse_core::EntityId;
use rehearse_network::ConnectionState;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Instant;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Items processed per pass
const MAX_BATCH: usize = 256;

/// Orchestrates queue replay against the remote
///
/// One pass at a time: a trigger arriving while a pass runs is coalesced into
/// a no-op, never queued as a duplicate pass. Within a pass items replay
/// sequentially, oldest first; a transient failure holds back only that
/// item's entity while independent entities keep draining.
pub struct SyncEngine {
    config: Arc<RwLock<SyncConfig>>,
    store: EntityStore,
    queue: SyncQueue,
    remote: Arc<dyn RemoteApply>,
    notifier: Arc<dyn SyncNotifier>,
    status: Arc<Mutex<SyncStatus>>,
    pass_active: Arc<AtomicBool>,
    cancel_flag: Arc<AtomicBool>,
}

impl SyncEngine {
    /// Creates an engine over a shared store/queue pair
    pub fn new(
        config: SyncConfig,
        store: EntityStore,
        queue: SyncQueue,
        remote: Arc<dyn RemoteApply>,
        notifier: Arc<dyn SyncNotifier>,
    ) -> Self {
        store.set_quota_threshold(config.quota_threshold_percent);
        Self {
            config: Arc::new(RwLock::new(config)),
            store,
            queue,
            remote,
            notifier,
            status: Arc::new(Mutex::new(SyncStatus::Idle)),
            pass_active: Arc::new(AtomicBool::new(false)),
            cancel_flag: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Current lifecycle state
    pub fn status(&self) -> SyncStatus {
        self.status.lock().map(|s| *s).unwrap_or(SyncStatus::Error)
    }

    /// Current configuration snapshot
    pub fn config(&self) -> SyncConfig {
        self.config
            .read()
            .map(|c| c.clone())
            .unwrap_or_default()
    }

    /// Mutates configuration at runtime (settings screen collaborator).
    /// The store's quota threshold follows the updated value.
    pub fn update_config(&self, f: impl FnOnce(&mut SyncConfig)) {
        if let Ok(mut config) = self.config.write() {
            f(&mut config);
            self.store.set_quota_threshold(config.quota_threshold_percent);
        }
    }

    /// Requests cancellation of the in-flight pass, if any.
    ///
    /// Items already confirmed stay removed; the item in flight is left
    /// untouched and retried on the next pass.
    pub fn cancel(&self) {
        self.cancel_flag.store(true, Ordering::SeqCst);
    }

    /// Triggers a sync pass.
    ///
    /// Returns `Ok(None)` when a pass is already running (the trigger is
    /// coalesced). Partial progress is never reverted: items applied before a
    /// failure stay removed from the queue.
    pub async fn try_sync(&self) -> SyncResult<Option<SyncReport>> {
        if self
            .pass_active
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            log::debug!("sync already in progress, trigger coalesced");
            return Ok(None);
        }

        let result = self.run_pass().await;

        self.queue.clear_in_flight();
        self.set_status(SyncStatus::Idle);
        self.pass_active.store(false, Ordering::SeqCst);
        result.map(Some)
    }

    async fn run_pass(&self) -> SyncResult<SyncReport> {
        self.cancel_flag.store(false, Ordering::SeqCst);
        self.set_status(SyncStatus::Syncing);

        let config = self.config();
        let backoff = BackoffPolicy::new(config.retry_delay, config.max_backoff);
        let batch = self.queue.peek_batch(MAX_BATCH)?;
        let total = batch.len();

        log::info!("sync pass started, {total} item(s)");
        self.notifier.notify(SyncEvent::Started { total });

        let mut report = SyncReport::default();
        let mut held_back: HashSet<EntityId> = HashSet::new();
        let mut unauthorized = false;

        for item in batch {
            if self.cancel_flag.load(Ordering::SeqCst) {
                log::info!("sync pass cancelled after {} item(s)", report.applied);
                report.cancelled = true;
                break;
            }
            if held_back.contains(&item.entity_id) {
                continue;
            }

            log::debug!("applying {} {:?} {}", item.id, item.op, item.entity_id);
            // Shield the item from delete-collapse while the remote holds it
            self.queue.mark_in_flight(item.id)?;
            match self
                .remote
                .apply(item.op, item.entity, item.entity_id, &item.data)
                .await
            {
                Ok(ack) => {
                    self.queue.remove(item.id)?;
                    if item.op != Operation::Delete {
                        self.store
                            .mark_synced(item.entity, item.entity_id, Utc::now())
                            .await?;
                    }
                    if let Some(canonical) = ack.canonical_id {
                        log::debug!("remote assigned canonical id {canonical}");
                    }
                    report.applied += 1;
                    self.notifier.notify(SyncEvent::Progress {
                        done: report.applied,
                        total,
                        current: item.id,
                    });
                }
                Err(SyncError::Unauthorized) => {
                    log::warn!("unauthorized, aborting pass; items stay pending");
                    self.notifier.notify(SyncEvent::Failed {
                        message: "unauthorized: re-authentication required".to_string(),
                    });
                    unauthorized = true;
                    break;
                }
                Err(err @ SyncError::Conflict { .. }) => {
                    let remote_version = match &err {
                        SyncError::Conflict { remote, .. } => remote.clone(),
                        _ => None,
                    };
                    self.queue.dead_letter(item.id, &err.to_string())?;
                    report.dead_lettered += 1;
                    self.notifier.notify(SyncEvent::Conflict {
                        item,
                        remote: remote_version,
                    });
                }
                Err(err @ SyncError::Validation(_)) => {
                    self.queue.dead_letter(item.id, &err.to_string())?;
                    report.dead_lettered += 1;
                    self.notifier.notify(SyncEvent::Failed {
                        message: err.to_string(),
                    });
                }
                Err(err) => {
                    // Transient (and anything unclassified): retry with backoff
                    match self
                        .queue
                        .record_failure(item.id, &err.to_string(), config.max_retries)?
                    {
                        FailureOutcome::DeadLettered => {
                            report.dead_lettered += 1;
                            self.notifier.notify(SyncEvent::Failed {
                                message: format!("{} permanently failed: {err}", item.id),
                            });
                        }
                        FailureOutcome::Retained { retry_count } => {
                            let delay = backoff.delay_for_retry(retry_count);
                            self.queue.hold_until(item.id, Instant::now() + delay)?;
                            held_back.insert(item.entity_id);
                            report.retained += 1;
                            log::warn!(
                                "{} failed transiently (attempt {retry_count}), backing off {delay:?}",
                                item.id
                            );
                        }
                    }
                }
            }
        }

        if report.cancelled {
            log::info!("sync pass left queue consistent after cancellation");
        } else if unauthorized || !report.is_clean() {
            self.set_status(SyncStatus::Error);
            if !unauthorized {
                self.notifier.notify(SyncEvent::Failed {
                    message: format!(
                        "sync finished with {} dead-lettered, {} retained",
                        report.dead_lettered, report.retained
                    ),
                });
            }
        } else {
            self.set_status(SyncStatus::Success);
            log::info!("sync pass complete, {} applied", report.applied);
            self.notifier.notify(SyncEvent::Completed {
                applied: report.applied,
                dead_lettered: report.dead_lettered,
            });
        }

        Ok(report)
    }

    /// Spawns the auto-sync loop: a pass on connectivity regain (when
    /// `auto_sync` is set) and a periodic pass every `sync_interval` while
    /// online. Exits when the connection monitor goes away.
    pub fn start_auto(
        self: &Arc<Self>,
        mut connection: watch::Receiver<ConnectionState>,
    ) -> JoinHandle<()> {
        let engine = Arc::clone(self);
        tokio::spawn(async move {
            let mut online = connection.borrow().is_online;
            loop {
                let interval = engine.config().sync_interval;
                tokio::select! {
                    changed = connection.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        let now_online = connection.borrow().is_online;
                        let regained = now_online && !online;
                        online = now_online;
                        if regained && engine.config().auto_sync {
                            log::info!("connectivity regained, triggering sync");
                            if let Err(e) = engine.try_sync().await {
                                log::warn!("auto sync failed: {e}");
                            }
                        }
                    }
                    _ = tokio::time::sleep(interval) => {
                        if online {
                            if let Err(e) = engine.try_sync().await {
                                log::warn!("periodic sync failed: {e}");
                            }
                        }
                    }
                }
            }
        })
    }

    fn set_status(&self, status: SyncStatus) {
        if let Ok(mut s) = self.status.lock() {
            *s = status;
        }
    }
}
