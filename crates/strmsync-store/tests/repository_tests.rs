//! Integration tests for SqliteRepository
//!
//! Each test gets a fresh in-memory database.

use std::path::PathBuf;

use chrono::{Duration, Utc};

use strmsync_core::domain::{
    ContentMode, ItemError, ItemErrorKind, MappingId, MappingSpec, RefreshMode, RunId, RunResult,
    TaskRecord, TaskStatus,
};
use strmsync_core::ports::{IMappingStore, ITaskRecorder};
use strmsync_store::{DatabasePool, SqliteRepository, StoreError};

// ============================================================================
// Test helpers
// ============================================================================

async fn setup() -> SqliteRepository {
    let pool = DatabasePool::in_memory()
        .await
        .expect("Failed to create in-memory database");
    SqliteRepository::new(pool.pool().clone())
}

fn movies() -> MappingSpec {
    MappingSpec::new(
        "movies",
        "/media/movies",
        "/srv/strm/movies",
        vec!["mp4".into(), "mkv".into()],
    )
}

// ============================================================================
// Mapping tests
// ============================================================================

#[tokio::test]
async fn test_insert_assigns_id_and_roundtrips() {
    let repo = setup().await;
    let mut spec = movies();
    spec.refresh_mode = RefreshMode::Full;
    spec.content_mode = ContentMode::ResolvedUrl;
    spec.concurrency = 4;
    spec.schedule = Some("0 3 * * *".into());

    let id = repo.save_mapping(&spec).await.unwrap();
    assert!(id.is_assigned());

    let stored = repo.get_mapping(id).await.unwrap().unwrap();
    assert_eq!(stored.id, id);
    assert_eq!(stored.name, "movies");
    assert_eq!(stored.source_root, "/media/movies");
    assert_eq!(stored.target_root, PathBuf::from("/srv/strm/movies"));
    assert_eq!(stored.extensions, vec!["mp4", "mkv"]);
    assert_eq!(stored.concurrency, 4);
    assert_eq!(stored.refresh_mode, RefreshMode::Full);
    assert_eq!(stored.content_mode, ContentMode::ResolvedUrl);
    assert_eq!(stored.schedule.as_deref(), Some("0 3 * * *"));
    assert!(stored.enabled);
}

#[tokio::test]
async fn test_blank_schedule_is_stored_as_null() {
    let repo = setup().await;
    let mut spec = movies();
    spec.schedule = Some("   ".into());

    let id = repo.save_mapping(&spec).await.unwrap();
    let stored = repo.get_mapping(id).await.unwrap().unwrap();
    assert_eq!(stored.schedule, None);
}

#[tokio::test]
async fn test_update_existing_mapping() {
    let repo = setup().await;
    let id = repo.save_mapping(&movies()).await.unwrap();

    let mut spec = repo.get_mapping(id).await.unwrap().unwrap();
    spec.enabled = false;
    spec.schedule = Some("*/5 * * * *".into());
    let same = repo.save_mapping(&spec).await.unwrap();
    assert_eq!(same, id);

    let stored = repo.get_mapping_by_name("movies").await.unwrap().unwrap();
    assert!(!stored.enabled);
    assert_eq!(stored.schedule.as_deref(), Some("*/5 * * * *"));
}

#[tokio::test]
async fn test_update_of_missing_mapping_fails() {
    let repo = setup().await;
    let mut spec = movies();
    spec.id = MappingId::new(42);

    assert!(repo.save_mapping(&spec).await.is_err());
}

#[tokio::test]
async fn test_duplicate_name_is_rejected() {
    let repo = setup().await;
    repo.save_mapping(&movies()).await.unwrap();

    let err = repo.save_mapping(&movies()).await.unwrap_err();
    assert!(matches!(
        err.downcast_ref::<StoreError>(),
        Some(StoreError::DuplicateName(name)) if name == "movies"
    ));
}

#[tokio::test]
async fn test_invalid_mapping_is_not_saved() {
    let repo = setup().await;
    let spec = MappingSpec::new("bad", "relative/path", "/srv/strm", vec!["mp4".into()]);

    assert!(repo.save_mapping(&spec).await.is_err());
    assert!(repo.list_mappings().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_list_orders_by_name_and_filters_enabled() {
    let repo = setup().await;
    for name in ["tv", "anime", "movies"] {
        let mut spec = movies();
        spec.name = name.into();
        spec.enabled = name != "anime";
        repo.save_mapping(&spec).await.unwrap();
    }

    let all: Vec<String> = repo
        .list_mappings()
        .await
        .unwrap()
        .into_iter()
        .map(|m| m.name)
        .collect();
    assert_eq!(all, vec!["anime", "movies", "tv"]);

    let enabled: Vec<String> = repo
        .list_enabled_mappings()
        .await
        .unwrap()
        .into_iter()
        .map(|m| m.name)
        .collect();
    assert_eq!(enabled, vec!["movies", "tv"]);
}

#[tokio::test]
async fn test_delete_mapping() {
    let repo = setup().await;
    let id = repo.save_mapping(&movies()).await.unwrap();

    assert!(repo.delete_mapping(id).await.unwrap());
    assert!(!repo.delete_mapping(id).await.unwrap());
    assert!(repo.get_mapping(id).await.unwrap().is_none());
    assert!(repo.get_mapping_by_name("movies").await.unwrap().is_none());
}

// ============================================================================
// Task tests
// ============================================================================

#[tokio::test]
async fn test_task_lifecycle() {
    let repo = setup().await;
    let run_id = RunId::new();
    let mut record = TaskRecord::started(run_id, "movies", RefreshMode::Incremental);
    repo.start_task(&record).await.unwrap();

    let running = repo.get_task(&run_id).await.unwrap().unwrap();
    assert_eq!(running.status, TaskStatus::Running);
    assert!(running.completed_at.is_none());

    let result = RunResult {
        files_created: 3,
        files_skipped: 2,
        files_deleted: 0,
        errors: vec![ItemError::new(
            "/media/movies/x.mp4",
            ItemErrorKind::Resolve,
            "timeout",
        )],
        duration_ms: 12,
    };
    record.complete(&result);
    repo.finish_task(&record).await.unwrap();

    let done = repo.get_task(&run_id).await.unwrap().unwrap();
    assert_eq!(done.status, TaskStatus::Completed);
    assert_eq!(done.files_created, 3);
    assert_eq!(done.files_skipped, 2);
    assert_eq!(done.errors.len(), 1);
    assert!(done.errors[0].contains("/media/movies/x.mp4"));
    assert!(done.completed_at.is_some());
}

#[tokio::test]
async fn test_failed_task_keeps_reason() {
    let repo = setup().await;
    let mut record = TaskRecord::started(RunId::new(), "tv", RefreshMode::Full);
    repo.start_task(&record).await.unwrap();
    record.fail("listing /tv failed");
    repo.finish_task(&record).await.unwrap();

    let stored = repo.get_task(&record.run_id).await.unwrap().unwrap();
    assert_eq!(stored.status, TaskStatus::Failed("listing /tv failed".into()));
    assert_eq!(stored.mode, RefreshMode::Full);
}

#[tokio::test]
async fn test_duplicate_start_is_rejected() {
    let repo = setup().await;
    let record = TaskRecord::started(RunId::new(), "movies", RefreshMode::Incremental);
    repo.start_task(&record).await.unwrap();
    assert!(repo.start_task(&record).await.is_err());
}

#[tokio::test]
async fn test_unknown_task_is_none() {
    let repo = setup().await;
    assert!(repo.get_task(&RunId::new()).await.unwrap().is_none());
}

#[tokio::test]
async fn test_list_tasks_newest_first_with_limit() {
    let repo = setup().await;
    let base = Utc::now() - Duration::hours(1);
    let mut ids = Vec::new();
    for i in 0..5 {
        let mut record = TaskRecord::started(RunId::new(), "movies", RefreshMode::Incremental);
        record.started_at = base + Duration::minutes(i);
        repo.start_task(&record).await.unwrap();
        ids.push(record.run_id);
    }

    let listed = repo.list_tasks(3).await.unwrap();
    let got: Vec<RunId> = listed.iter().map(|r| r.run_id).collect();
    assert_eq!(got, vec![ids[4], ids[3], ids[2]]);
}

#[tokio::test]
async fn test_list_tasks_for_mapping_and_prune() {
    let repo = setup().await;
    let base = Utc::now() - Duration::hours(1);
    for (i, name) in ["movies", "tv", "movies", "tv"].iter().enumerate() {
        let mut record = TaskRecord::started(RunId::new(), *name, RefreshMode::Incremental);
        record.started_at = base + Duration::minutes(i as i64);
        repo.start_task(&record).await.unwrap();
    }

    let tv = repo.list_tasks_for("tv", 10).await.unwrap();
    assert_eq!(tv.len(), 2);
    assert!(tv.iter().all(|r| r.mapping_name == "tv"));

    let pruned = repo.prune_tasks(1).await.unwrap();
    assert_eq!(pruned, 3);
    let left = repo.list_tasks(10).await.unwrap();
    assert_eq!(left.len(), 1);
    assert_eq!(left[0].mapping_name, "tv");
}
