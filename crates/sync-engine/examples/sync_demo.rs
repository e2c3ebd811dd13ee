// crates/sync-engine/examples/sync_demo.rs
//! Demonstration of the offline sync lifecycle

use async_trait::async_trait;
use rehearse_core::{Entity, EntityId, EntityKind, Scenario, Session};
use rehearse_storage::{FixedQuotaProbe, MemoryBackend, QuotaGuard};
use rehearse_sync_engine::{
    ApplyAck, BroadcastNotifier, EntityStore, Operation, RemoteApply, SyncConfig, SyncEngine,
    SyncQueue, SyncResult,
};
use serde_json::Value;
use std::sync::Arc;

/// Remote that succeeds and prints every apply
struct PrintingRemote;

#[async_trait]
impl RemoteApply for PrintingRemote {
    async fn apply(
        &self,
        op: Operation,
        entity: EntityKind,
        entity_id: EntityId,
        _data: &Value,
    ) -> SyncResult<ApplyAck> {
        println!("  remote <- {op:?} {entity} {entity_id}");
        Ok(ApplyAck::default())
    }
}

#[tokio::main]
async fn main() {
    env_logger::init();

    println!("Rehearse Sync Engine Demo");
    println!("=========================\n");

    let queue = SyncQueue::new();
    let quota = QuotaGuard::new(Arc::new(FixedQuotaProbe::new(0, 1 << 30)), 90.0);
    let store = EntityStore::new(Arc::new(MemoryBackend::new()), queue.clone(), quota);

    let notifier = Arc::new(BroadcastNotifier::new(32));
    let mut events = notifier.subscribe();

    let engine = SyncEngine::new(
        SyncConfig::default(),
        store.clone(),
        queue.clone(),
        Arc::new(PrintingRemote),
        notifier,
    );

    // Work offline: everything commits locally and queues for later
    println!("1. Offline mutations");
    println!("--------------------");

    let scenario = Scenario::new("Conference talk dry run".to_string());
    let scenario_id = scenario.id;
    store.upsert(Entity::Scenario(scenario)).await.unwrap();
    println!("  created scenario {scenario_id}");

    let session = Session::new(scenario_id)
        .with_transcript("Good afternoon everyone...".to_string())
        .with_score(82);
    store.upsert(Entity::Session(session)).await.unwrap();
    println!("  recorded session against it");
    println!("  pending queue items: {}\n", queue.pending_len());

    // Connectivity returns: drain the queue
    println!("2. Sync pass");
    println!("------------");
    let report = engine.try_sync().await.unwrap().unwrap();
    println!(
        "  applied: {}, dead-lettered: {}\n",
        report.applied, report.dead_lettered
    );

    println!("3. Lifecycle events");
    println!("-------------------");
    while let Ok(event) = events.try_recv() {
        println!("  {event:?}");
    }

    let record = store
        .get(EntityKind::Scenario, scenario_id)
        .await
        .unwrap()
        .unwrap();
    println!(
        "\nScenario dirty: {}, synced_at: {:?}",
        record.meta.is_dirty, record.meta.synced_at
    );
}
