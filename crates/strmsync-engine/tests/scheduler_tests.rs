//! Schedule registry: exclusivity, validation ordering, firing

mod common;

use std::time::Duration;

use strmsync_core::domain::MappingId;
use strmsync_engine::scheduler::ScheduleRegistry;
use strmsync_engine::ScheduleError;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

use common::{mapping, runner, FakeLister, MemoryRecorder, MemoryStore};

const EVERY_SECOND: &str = "* * * * * *";
const YEARLY: &str = "0 0 0 1 1 *";

async fn registry(
    store: std::sync::Arc<MemoryStore>,
    recorder: std::sync::Arc<MemoryRecorder>,
) -> ScheduleRegistry {
    let runner = runner(FakeLister::with_paths(&["/m/a.mp4"]), store, recorder);
    ScheduleRegistry::new(runner, CancellationToken::new())
        .await
        .unwrap()
}

#[tokio::test]
async fn invalid_expression_keeps_prior_schedule() {
    let reg = registry(MemoryStore::new(), MemoryRecorder::new()).await;
    let id = MappingId::new(1);

    reg.add_schedule(id, "m", "0 2 * * *").await.unwrap();
    let before = reg.entry(id).await.unwrap();

    let err = reg.add_schedule(id, "m", "not-a-cron").await.unwrap_err();
    assert!(matches!(err, ScheduleError::InvalidExpression { .. }));

    let err = reg.add_schedule(id, "m", "0 99 * * *").await.unwrap_err();
    assert!(matches!(err, ScheduleError::InvalidExpression { .. }));

    assert_eq!(reg.entry(id).await, Some(before));
    assert_eq!(reg.len().await, 1);
}

#[tokio::test]
async fn double_add_leaves_one_entry_with_second_expression() {
    let reg = registry(MemoryStore::new(), MemoryRecorder::new()).await;
    let id = MappingId::new(7);

    reg.add_schedule(id, "m", "0 2 * * *").await.unwrap();
    let first = reg.entry(id).await.unwrap();
    reg.add_schedule(id, "m", "30 4 * * *").await.unwrap();
    let second = reg.entry(id).await.unwrap();

    assert_eq!(reg.len().await, 1);
    assert_eq!(second.expression, "30 4 * * *");
    assert_ne!(first.handle, second.handle);
}

#[tokio::test]
async fn concurrent_adds_leave_exactly_one_entry() {
    let reg = std::sync::Arc::new(registry(MemoryStore::new(), MemoryRecorder::new()).await);
    let id = MappingId::new(3);

    let mut tasks = Vec::new();
    for minute in 0..10 {
        let reg = reg.clone();
        tasks.push(tokio::spawn(async move {
            reg.add_schedule(id, "m", &format!("{minute} 1 * * *")).await
        }));
    }
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    assert_eq!(reg.len().await, 1);
    assert_eq!(reg.list_schedules().await.len(), 1);
}

#[tokio::test]
async fn remove_absent_schedule_is_a_no_op() {
    let reg = registry(MemoryStore::new(), MemoryRecorder::new()).await;
    reg.remove_schedule(MappingId::new(42)).await;
    assert!(reg.is_empty().await);
}

#[tokio::test]
async fn update_schedule_disables_and_clears() {
    let reg = registry(MemoryStore::new(), MemoryRecorder::new()).await;
    let id = MappingId::new(1);

    reg.update_schedule(id, "m", Some("0 2 * * *"), true).await.unwrap();
    assert_eq!(reg.len().await, 1);

    reg.update_schedule(id, "m", Some("0 2 * * *"), false).await.unwrap();
    assert!(reg.is_empty().await);

    reg.update_schedule(id, "m", Some("0 3 * * *"), true).await.unwrap();
    reg.update_schedule(id, "m", Some("   "), true).await.unwrap();
    assert!(reg.is_empty().await);

    reg.update_schedule(id, "m", None, true).await.unwrap();
    assert!(reg.is_empty().await);
}

#[tokio::test]
async fn start_registers_enabled_scheduled_mappings_and_skips_bad_ones() {
    let root = TempDir::new().unwrap();
    let store = MemoryStore::new();

    let mut good = mapping("good", "/m", &root.path().join("good"));
    good.schedule = Some("0 2 * * *".into());
    let good_id = store.insert(good);

    let mut bad = mapping("bad", "/m", &root.path().join("bad"));
    bad.schedule = Some("every tuesday".into());
    store.insert(bad);

    let mut disabled = mapping("off", "/m", &root.path().join("off"));
    disabled.schedule = Some("0 2 * * *".into());
    disabled.enabled = false;
    store.insert(disabled);

    store.insert(mapping("manual", "/m", &root.path().join("manual")));

    let reg = registry(store, MemoryRecorder::new()).await;
    let registered = reg.start().await.unwrap();

    assert_eq!(registered, 1);
    assert!(reg.entry(good_id).await.is_some());
    reg.shutdown().await.unwrap();
}

#[tokio::test]
async fn reconcile_follows_storage_edits() {
    let root = TempDir::new().unwrap();
    let store = MemoryStore::new();
    let mut spec = mapping("m", "/m", root.path());
    spec.schedule = Some("0 2 * * *".into());
    let id = store.insert(spec.clone());

    let reg = registry(store.clone(), MemoryRecorder::new()).await;
    reg.reconcile().await.unwrap();
    assert_eq!(reg.entry(id).await.unwrap().expression, "0 2 * * *");

    spec.id = id;
    spec.schedule = Some("15 3 * * *".into());
    store.insert(spec.clone());
    reg.reconcile().await.unwrap();
    assert_eq!(reg.entry(id).await.unwrap().expression, "15 3 * * *");

    spec.enabled = false;
    store.insert(spec);
    reg.reconcile().await.unwrap();
    assert!(reg.entry(id).await.is_none());
}

#[tokio::test]
async fn list_schedules_reports_next_fire() {
    let reg = registry(MemoryStore::new(), MemoryRecorder::new()).await;
    reg.start().await.unwrap();
    reg.add_schedule(MappingId::new(1), "b", "0 2 * * *").await.unwrap();
    reg.add_schedule(MappingId::new(2), "a", "0 3 * * *").await.unwrap();

    let infos = reg.list_schedules().await;
    let names: Vec<_> = infos.iter().map(|i| i.mapping_name.as_str()).collect();
    assert_eq!(names, vec!["a", "b"]);
    reg.shutdown().await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn only_the_replacement_schedule_fires() {
    let root = TempDir::new().unwrap();
    let store = MemoryStore::new();
    let id = store.insert(mapping("m", "/m", root.path()));
    let recorder = MemoryRecorder::new();

    let reg = registry(store, recorder.clone()).await;
    reg.start().await.unwrap();

    reg.add_schedule(id, "m", EVERY_SECOND).await.unwrap();
    reg.add_schedule(id, "m", YEARLY).await.unwrap();

    tokio::time::sleep(Duration::from_millis(2500)).await;
    assert_eq!(recorder.started(), 0, "revoked schedule still fired");

    reg.add_schedule(id, "m", EVERY_SECOND).await.unwrap();
    let deadline = tokio::time::Instant::now() + Duration::from_secs(10);
    let finished = || recorder.all().iter().any(|r| r.status.is_terminal());
    while !finished() && tokio::time::Instant::now() < deadline {
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    assert!(finished(), "replacement schedule never fired");
    assert!(root.path().join("a.strm").exists());

    reg.shutdown().await.unwrap();
}
