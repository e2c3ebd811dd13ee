// crates/sync-engine/tests/sync_tests.rs
//! Integration tests for the offline sync subsystem

use async_trait::async_trait;
use rehearse_core::{Entity, EntityId, EntityKind, Scenario, Session};
use rehearse_network::{ConnectionMonitor, NetworkResult, ReachabilityProbe};
use rehearse_storage::{FixedQuotaProbe, MemoryBackend, QuotaGuard};
use rehearse_sync_engine::{
    ApplyAck, BroadcastNotifier, EntityStore, NullNotifier, Operation, RemoteApply, SyncConfig,
    SyncEngine, SyncError, SyncEvent, SyncQueue, SyncResult,
};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Remote double that stores the latest applied state per entity, in order
#[derive(Default)]
struct RecordingRemote {
    state: Mutex<HashMap<EntityId, Value>>,
    log: Mutex<Vec<(Operation, EntityId)>>,
}

#[async_trait]
impl RemoteApply for RecordingRemote {
    async fn apply(
        &self,
        op: Operation,
        _entity: EntityKind,
        entity_id: EntityId,
        data: &Value,
    ) -> SyncResult<ApplyAck> {
        self.log.lock().unwrap().push((op, entity_id));
        let mut state = self.state.lock().unwrap();
        match op {
            Operation::Create | Operation::Update => {
                state.insert(entity_id, data.clone());
            }
            Operation::Delete => {
                state.remove(&entity_id);
            }
        }
        Ok(ApplyAck::default())
    }
}

/// Remote double that fails transiently a fixed number of times
struct FlakyRemote {
    failures_left: AtomicU32,
}

#[async_trait]
impl RemoteApply for FlakyRemote {
    async fn apply(
        &self,
        _op: Operation,
        _entity: EntityKind,
        _entity_id: EntityId,
        _data: &Value,
    ) -> SyncResult<ApplyAck> {
        let left = self.failures_left.load(Ordering::SeqCst);
        if left > 0 {
            self.failures_left.store(left - 1, Ordering::SeqCst);
            return Err(SyncError::Transient("connection reset".to_string()));
        }
        Ok(ApplyAck::default())
    }
}

/// Remote double that parks every apply until the test releases permits,
/// keeping items in flight for a controlled window
struct GatedRemote {
    gate: Arc<tokio::sync::Semaphore>,
    state: Mutex<HashMap<EntityId, Value>>,
}

impl GatedRemote {
    fn new() -> (Arc<Self>, Arc<tokio::sync::Semaphore>) {
        let gate = Arc::new(tokio::sync::Semaphore::new(0));
        let remote = Arc::new(Self {
            gate: gate.clone(),
            state: Mutex::new(HashMap::new()),
        });
        (remote, gate)
    }
}

#[async_trait]
impl RemoteApply for GatedRemote {
    async fn apply(
        &self,
        op: Operation,
        _entity: EntityKind,
        entity_id: EntityId,
        data: &Value,
    ) -> SyncResult<ApplyAck> {
        self.gate.acquire().await.unwrap().forget();
        let mut state = self.state.lock().unwrap();
        match op {
            Operation::Create | Operation::Update => {
                state.insert(entity_id, data.clone());
            }
            Operation::Delete => {
                state.remove(&entity_id);
            }
        }
        Ok(ApplyAck::default())
    }
}

struct ConflictRemote;

#[async_trait]
impl RemoteApply for ConflictRemote {
    async fn apply(
        &self,
        _op: Operation,
        _entity: EntityKind,
        entity_id: EntityId,
        _data: &Value,
    ) -> SyncResult<ApplyAck> {
        Err(SyncError::Conflict {
            entity_id: entity_id.as_string(),
            message: "remote version is newer".to_string(),
            remote: Some(serde_json::json!({"title": "server copy"})),
        })
    }
}

fn fast_config() -> SyncConfig {
    SyncConfig {
        retry_delay: Duration::from_millis(1),
        max_backoff: Duration::from_millis(10),
        ..Default::default()
    }
}

fn build_engine(
    remote: Arc<dyn RemoteApply>,
    notifier: Arc<dyn rehearse_sync_engine::SyncNotifier>,
    config: SyncConfig,
) -> (Arc<SyncEngine>, EntityStore, SyncQueue) {
    let queue = SyncQueue::new();
    let quota = QuotaGuard::new(Arc::new(FixedQuotaProbe::new(0, 1 << 30)), 90.0);
    let store = EntityStore::new(Arc::new(MemoryBackend::new()), queue.clone(), quota);
    let engine = Arc::new(SyncEngine::new(
        config,
        store.clone(),
        queue.clone(),
        remote,
        notifier,
    ));
    (engine, store, queue)
}

#[tokio::test]
async fn test_ordering_law_per_entity() {
    let remote = Arc::new(RecordingRemote::default());
    let (engine, store, _) = build_engine(remote.clone(), Arc::new(NullNotifier), fast_config());

    let mut scenario = Scenario::new("v1".to_string());
    let id = scenario.id;
    store
        .upsert(Entity::Scenario(scenario.clone()))
        .await
        .unwrap();
    scenario.title = "v2".to_string();
    store
        .upsert(Entity::Scenario(scenario.clone()))
        .await
        .unwrap();
    scenario.title = "v3".to_string();
    store.upsert(Entity::Scenario(scenario)).await.unwrap();

    engine.try_sync().await.unwrap();

    // Replaying the queue yields the same final state as applying the
    // operations directly in creation order
    let state = remote.state.lock().unwrap();
    assert_eq!(state[&id]["title"], "v3");

    let log = remote.log.lock().unwrap();
    let ops: Vec<Operation> = log.iter().map(|(op, _)| *op).collect();
    assert_eq!(
        ops,
        vec![Operation::Create, Operation::Update, Operation::Update]
    );
}

#[tokio::test]
async fn test_idempotent_reapply() {
    // Simulates a retry after an ambiguous network failure: applying the
    // same item twice must equal applying it once
    let remote = RecordingRemote::default();
    let id = EntityId::new();
    let data = serde_json::json!({"title": "only once"});

    remote
        .apply(Operation::Update, EntityKind::Scenario, id, &data)
        .await
        .unwrap();
    let once = remote.state.lock().unwrap().clone();

    remote
        .apply(Operation::Update, EntityKind::Scenario, id, &data)
        .await
        .unwrap();
    let twice = remote.state.lock().unwrap().clone();

    assert_eq!(once, twice);
}

#[tokio::test]
async fn test_offline_create_then_update_scenario() {
    // Create then update the same scenario while offline; on reconnect with
    // an always-succeeding collaborator the remote reflects the update, the
    // queue is empty, and the entity is clean
    let remote = Arc::new(RecordingRemote::default());
    let (engine, store, queue) =
        build_engine(remote.clone(), Arc::new(NullNotifier), fast_config());

    let mut scenario = Scenario::new("S1".to_string());
    let id = scenario.id;
    store
        .upsert(Entity::Scenario(scenario.clone()))
        .await
        .unwrap();
    scenario.description = Some("score:90".to_string());
    store.upsert(Entity::Scenario(scenario)).await.unwrap();

    let report = engine.try_sync().await.unwrap().unwrap();
    assert!(report.is_clean());
    assert!(queue.is_empty());

    let state = remote.state.lock().unwrap();
    assert_eq!(state[&id]["description"], "score:90");

    let record = store.get(EntityKind::Scenario, id).await.unwrap().unwrap();
    assert!(!record.meta.is_dirty);
}

#[tokio::test]
async fn test_delete_during_in_flight_create_still_replays() {
    // A delete issued while the create is at the remote must not collapse:
    // the remote may have applied the create already
    let (remote, gate) = GatedRemote::new();
    let (engine, store, queue) =
        build_engine(remote.clone(), Arc::new(NullNotifier), fast_config());

    let scenario = Scenario::new("short lived".to_string());
    let id = scenario.id;
    store.upsert(Entity::Scenario(scenario)).await.unwrap();

    let pass = {
        let engine = Arc::clone(&engine);
        tokio::spawn(async move { engine.try_sync().await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;

    // Create is parked at the remote; the user deletes locally
    store.delete(EntityKind::Scenario, id).await.unwrap();

    gate.add_permits(10);
    pass.await.unwrap().unwrap();

    // The create reached the remote, so the delete must still be queued
    assert!(remote.state.lock().unwrap().contains_key(&id));
    assert_eq!(queue.pending_len(), 1);

    engine.try_sync().await.unwrap();
    assert!(queue.is_empty());
    assert!(!remote.state.lock().unwrap().contains_key(&id));
}

#[tokio::test]
async fn test_write_during_in_flight_apply_stays_dirty() {
    // A second upsert landing while the first is at the remote must survive
    // the confirmation of the first: the entity stays dirty until its newest
    // version has been applied
    let (remote, gate) = GatedRemote::new();
    let (engine, store, queue) =
        build_engine(remote.clone(), Arc::new(NullNotifier), fast_config());

    let mut scenario = Scenario::new("v1".to_string());
    let id = scenario.id;
    store
        .upsert(Entity::Scenario(scenario.clone()))
        .await
        .unwrap();

    let pass = {
        let engine = Arc::clone(&engine);
        tokio::spawn(async move { engine.try_sync().await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;

    scenario.title = "v2".to_string();
    store.upsert(Entity::Scenario(scenario)).await.unwrap();

    gate.add_permits(10);
    pass.await.unwrap().unwrap();

    let record = store.get(EntityKind::Scenario, id).await.unwrap().unwrap();
    assert!(record.meta.is_dirty);
    assert_eq!(queue.pending_len(), 1);

    engine.try_sync().await.unwrap();
    let record = store.get(EntityKind::Scenario, id).await.unwrap().unwrap();
    assert!(!record.meta.is_dirty);
    assert_eq!(remote.state.lock().unwrap()[&id]["title"], "v2");
}

#[tokio::test]
async fn test_retry_ceiling_dead_letters_with_event() {
    // The remote fails transiently on every attempt with max_retries = 3;
    // the third failure dead-letters the item and fires a failure event; the
    // session is no longer pending
    let remote = Arc::new(FlakyRemote {
        failures_left: AtomicU32::new(u32::MAX),
    });
    let notifier = Arc::new(BroadcastNotifier::new(64));
    let mut events = notifier.subscribe();
    let (engine, store, queue) = build_engine(remote, notifier.clone(), fast_config());

    let session = Session::new(EntityId::new());
    let id = session.id;
    store.upsert(Entity::Session(session)).await.unwrap();

    for _ in 0..3 {
        engine.try_sync().await.unwrap();
        // Wait out the per-item backoff before the next pass
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    assert!(queue.is_empty());
    let dead = queue.dead_letters().unwrap();
    assert_eq!(dead.len(), 1);
    assert_eq!(dead[0].item.entity_id, id);
    assert_eq!(dead[0].item.retry_count, 3);

    let mut saw_failure = false;
    while let Ok(event) = events.try_recv() {
        if matches!(event, SyncEvent::Failed { .. }) {
            saw_failure = true;
        }
    }
    assert!(saw_failure);
}

#[tokio::test]
async fn test_retry_count_never_exceeds_ceiling() {
    let remote = Arc::new(FlakyRemote {
        failures_left: AtomicU32::new(u32::MAX),
    });
    let (engine, store, queue) = build_engine(remote, Arc::new(NullNotifier), fast_config());

    store
        .upsert(Entity::Scenario(Scenario::new("doomed".to_string())))
        .await
        .unwrap();

    for _ in 0..10 {
        engine.try_sync().await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    let dead = queue.dead_letters().unwrap();
    assert_eq!(dead.len(), 1);
    assert_eq!(dead[0].item.retry_count, engine.config().max_retries);
}

#[tokio::test]
async fn test_transient_recovery_after_backoff() {
    // Two failures then success: the item survives its backoff windows and
    // eventually drains
    let remote = Arc::new(FlakyRemote {
        failures_left: AtomicU32::new(2),
    });
    let (engine, store, queue) = build_engine(remote, Arc::new(NullNotifier), fast_config());

    store
        .upsert(Entity::Scenario(Scenario::new("eventually".to_string())))
        .await
        .unwrap();

    for _ in 0..3 {
        engine.try_sync().await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    assert!(queue.is_empty());
    assert!(queue.dead_letters().unwrap().is_empty());
}

#[tokio::test]
async fn test_conflict_surfaces_both_versions() {
    let notifier = Arc::new(BroadcastNotifier::new(16));
    let mut events = notifier.subscribe();
    let (engine, store, queue) =
        build_engine(Arc::new(ConflictRemote), notifier.clone(), fast_config());

    let scenario = Scenario::new("local copy".to_string());
    let id = scenario.id;
    store.upsert(Entity::Scenario(scenario)).await.unwrap();

    let report = engine.try_sync().await.unwrap().unwrap();
    assert_eq!(report.dead_lettered, 1);

    // Conflict is parked, not auto-resolved in either direction
    let dead = queue.dead_letters().unwrap();
    assert_eq!(dead.len(), 1);
    let record = store.get(EntityKind::Scenario, id).await.unwrap().unwrap();
    assert!(record.meta.is_dirty);

    let mut saw_conflict = false;
    while let Ok(event) = events.try_recv() {
        if let SyncEvent::Conflict { item, remote } = event {
            assert_eq!(item.entity_id, id);
            assert_eq!(remote.unwrap()["title"], "server copy");
            saw_conflict = true;
        }
    }
    assert!(saw_conflict);
}

#[tokio::test]
async fn test_independent_entities_drain_past_failure() {
    // A transient failure on one entity must not stall the others
    struct FailOneRemote {
        poisoned: EntityId,
    }

    #[async_trait]
    impl RemoteApply for FailOneRemote {
        async fn apply(
            &self,
            _op: Operation,
            _entity: EntityKind,
            entity_id: EntityId,
            _data: &Value,
        ) -> SyncResult<ApplyAck> {
            if entity_id == self.poisoned {
                Err(SyncError::Transient("timeout".to_string()))
            } else {
                Ok(ApplyAck::default())
            }
        }
    }

    let bad = Scenario::new("bad".to_string());
    let poisoned = bad.id;
    let (engine, store, queue) = build_engine(
        Arc::new(FailOneRemote { poisoned }),
        Arc::new(NullNotifier),
        fast_config(),
    );

    store.upsert(Entity::Scenario(bad)).await.unwrap();
    store
        .upsert(Entity::Scenario(Scenario::new("good".to_string())))
        .await
        .unwrap();

    let report = engine.try_sync().await.unwrap().unwrap();
    assert_eq!(report.applied, 1);
    assert_eq!(report.retained, 1);
    assert_eq!(queue.pending_len(), 1);
}

#[tokio::test]
async fn test_auto_sync_on_connectivity_regain() {
    struct UpProbe;

    #[async_trait]
    impl ReachabilityProbe for UpProbe {
        async fn is_reachable(&self) -> bool {
            true
        }
        async fn estimate_rtt(&self) -> NetworkResult<Duration> {
            Ok(Duration::from_millis(5))
        }
    }

    let remote = Arc::new(RecordingRemote::default());
    let (engine, store, queue) =
        build_engine(remote.clone(), Arc::new(NullNotifier), fast_config());

    // Mutations land while offline
    store
        .upsert(Entity::Scenario(Scenario::new("queued offline".to_string())))
        .await
        .unwrap();
    assert_eq!(queue.pending_len(), 1);

    let monitor = ConnectionMonitor::new(Arc::new(UpProbe));
    let auto = engine.start_auto(monitor.subscribe());

    // Connectivity comes back: the engine drains without a manual trigger
    monitor.report_online(None).await;
    for _ in 0..50 {
        if queue.is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(queue.is_empty());
    assert_eq!(remote.log.lock().unwrap().len(), 1);

    auto.abort();
}

#[tokio::test]
async fn test_restart_resumes_pending_queue() {
    // Queue persisted before "shutdown" is replayed after restart
    let backend = Arc::new(MemoryBackend::new());
    let queue = SyncQueue::new();
    let quota = QuotaGuard::new(Arc::new(FixedQuotaProbe::new(0, 1 << 30)), 90.0);
    let store = EntityStore::new(backend.clone(), queue.clone(), quota.clone());

    let scenario = Scenario::new("survives restart".to_string());
    let id = scenario.id;
    store.upsert(Entity::Scenario(scenario)).await.unwrap();
    queue.save_to(backend.as_ref()).await.unwrap();

    // "Restart": fresh queue from the same backend
    let restored = SyncQueue::load_from(backend.as_ref()).await.unwrap();
    assert_eq!(restored.pending_len(), 1);

    let remote = Arc::new(RecordingRemote::default());
    let store2 = EntityStore::new(backend.clone(), restored.clone(), quota);
    let engine = Arc::new(SyncEngine::new(
        fast_config(),
        store2,
        restored.clone(),
        remote.clone(),
        Arc::new(NullNotifier),
    ));

    engine.try_sync().await.unwrap();
    assert!(restored.is_empty());
    assert!(remote.state.lock().unwrap().contains_key(&id));
}
