//! SQLite implementation of IMappingStore and ITaskRecorder
//!
//! ## Type Mapping
//!
//! | Domain Type        | SQL Type | Strategy                                   |
//! |--------------------|----------|--------------------------------------------|
//! | MappingId          | INTEGER  | rowid                                      |
//! | RunId              | TEXT     | UUID string via `Display` / `FromStr`      |
//! | extensions         | TEXT     | comma-separated                            |
//! | RefreshMode        | TEXT     | snake_case via `as_str()` / `FromStr`      |
//! | ContentMode        | TEXT     | snake_case via `as_str()` / `FromStr`      |
//! | TaskStatus         | TEXT x2  | `state` + nullable `reason`                |
//! | task errors        | TEXT     | serde_json array of strings                |
//! | DateTime<Utc>      | TEXT     | RFC 3339, microseconds, `Z` suffix         |

use std::path::PathBuf;
use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use strmsync_core::domain::{
    parse_extensions, ContentMode, MappingId, MappingSpec, RefreshMode, RunId, TaskRecord,
    TaskStatus,
};
use strmsync_core::ports::{IMappingStore, ITaskRecorder};

use crate::StoreError;

/// SQLite-backed mapping store and task recorder
#[derive(Clone)]
pub struct SqliteRepository {
    pool: SqlitePool,
}

impl SqliteRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Deletes all but the newest `keep` task records; returns how many went
    pub async fn prune_tasks(&self, keep: u32) -> Result<u64, StoreError> {
        let result = sqlx::query(
            "DELETE FROM tasks WHERE run_id NOT IN \
             (SELECT run_id FROM tasks ORDER BY started_at DESC, rowid DESC LIMIT ?)",
        )
        .bind(i64::from(keep))
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    /// Task records of one mapping, newest first
    pub async fn list_tasks_for(
        &self,
        mapping_name: &str,
        limit: u32,
    ) -> Result<Vec<TaskRecord>, StoreError> {
        let rows = sqlx::query(
            "SELECT * FROM tasks WHERE mapping_name = ? \
             ORDER BY started_at DESC, rowid DESC LIMIT ?",
        )
        .bind(mapping_name)
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(task_from_row).collect()
    }

    async fn fetch_mappings(&self, enabled_only: bool) -> Result<Vec<MappingSpec>, StoreError> {
        let sql = if enabled_only {
            "SELECT * FROM mappings WHERE enabled = 1 ORDER BY name"
        } else {
            "SELECT * FROM mappings ORDER BY name"
        };
        let rows = sqlx::query(sql).fetch_all(&self.pool).await?;
        rows.iter().map(mapping_from_row).collect()
    }

    async fn insert_mapping(&self, spec: &MappingSpec) -> Result<MappingId, StoreError> {
        let now = timestamp(&Utc::now());
        let result = sqlx::query(
            "INSERT INTO mappings \
             (name, source_root, target_root, extensions, concurrency, refresh_mode, \
              content_mode, schedule, enabled, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&spec.name)
        .bind(&spec.source_root)
        .bind(spec.target_root.to_string_lossy().into_owned())
        .bind(spec.extensions_csv())
        .bind(spec.concurrency)
        .bind(spec.refresh_mode.as_str())
        .bind(spec.content_mode.as_str())
        .bind(spec.schedule_expression())
        .bind(spec.enabled)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await
        .map_err(|e| classify_write_error(e, &spec.name))?;

        let id = MappingId::new(result.last_insert_rowid());
        tracing::debug!(mapping_id = %id, name = %spec.name, "Inserted mapping");
        Ok(id)
    }

    async fn update_mapping(&self, spec: &MappingSpec) -> Result<MappingId, StoreError> {
        let result = sqlx::query(
            "UPDATE mappings SET \
             name = ?, source_root = ?, target_root = ?, extensions = ?, concurrency = ?, \
             refresh_mode = ?, content_mode = ?, schedule = ?, enabled = ?, updated_at = ? \
             WHERE id = ?",
        )
        .bind(&spec.name)
        .bind(&spec.source_root)
        .bind(spec.target_root.to_string_lossy().into_owned())
        .bind(spec.extensions_csv())
        .bind(spec.concurrency)
        .bind(spec.refresh_mode.as_str())
        .bind(spec.content_mode.as_str())
        .bind(spec.schedule_expression())
        .bind(spec.enabled)
        .bind(timestamp(&Utc::now()))
        .bind(spec.id.get())
        .execute(&self.pool)
        .await
        .map_err(|e| classify_write_error(e, &spec.name))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::QueryFailed(format!(
                "mapping {} does not exist",
                spec.id
            )));
        }
        tracing::debug!(mapping_id = %spec.id, name = %spec.name, "Updated mapping");
        Ok(spec.id)
    }

    async fn write_task(&self, verb: &str, record: &TaskRecord) -> Result<(), StoreError> {
        let errors = serde_json::to_string(&record.errors)
            .map_err(|e| StoreError::SerializationError(e.to_string()))?;
        let sql = format!(
            "{verb} INTO tasks \
             (run_id, mapping_name, mode, state, reason, files_created, files_skipped, \
              files_deleted, errors, started_at, completed_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
        );

        sqlx::query(&sql)
            .bind(record.run_id.to_string())
            .bind(&record.mapping_name)
            .bind(record.mode.as_str())
            .bind(record.status.as_str())
            .bind(record.status.reason())
            .bind(i64::from(record.files_created))
            .bind(i64::from(record.files_skipped))
            .bind(i64::from(record.files_deleted))
            .bind(&errors)
            .bind(timestamp(&record.started_at))
            .bind(record.completed_at.as_ref().map(timestamp))
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

// ============================================================================
// Conversion helpers
// ============================================================================

/// Fixed-width RFC 3339 so stored timestamps sort lexically
fn timestamp(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(s: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StoreError::SerializationError(format!("Invalid timestamp '{s}': {e}")))
}

fn count(row: &SqliteRow, column: &str) -> Result<u32, StoreError> {
    let value: i64 = row.try_get(column)?;
    u32::try_from(value)
        .map_err(|_| StoreError::SerializationError(format!("{column} out of range: {value}")))
}

fn classify_write_error(e: sqlx::Error, name: &str) -> StoreError {
    match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            StoreError::DuplicateName(name.to_string())
        }
        _ => StoreError::from(e),
    }
}

fn mapping_from_row(row: &SqliteRow) -> Result<MappingSpec, StoreError> {
    let refresh_mode: String = row.try_get("refresh_mode")?;
    let content_mode: String = row.try_get("content_mode")?;
    let extensions: String = row.try_get("extensions")?;
    let target_root: String = row.try_get("target_root")?;

    Ok(MappingSpec {
        id: MappingId::new(row.try_get("id")?),
        name: row.try_get("name")?,
        source_root: row.try_get("source_root")?,
        target_root: PathBuf::from(target_root),
        extensions: parse_extensions(&extensions),
        concurrency: row.try_get("concurrency")?,
        refresh_mode: RefreshMode::from_str(&refresh_mode)
            .map_err(|e| StoreError::SerializationError(e.to_string()))?,
        content_mode: ContentMode::from_str(&content_mode)
            .map_err(|e| StoreError::SerializationError(e.to_string()))?,
        schedule: row.try_get("schedule")?,
        enabled: row.try_get("enabled")?,
    })
}

fn task_from_row(row: &SqliteRow) -> Result<TaskRecord, StoreError> {
    let run_id: String = row.try_get("run_id")?;
    let mode: String = row.try_get("mode")?;
    let state: String = row.try_get("state")?;
    let errors: String = row.try_get("errors")?;
    let started_at: String = row.try_get("started_at")?;
    let completed_at: Option<String> = row.try_get("completed_at")?;

    Ok(TaskRecord {
        run_id: RunId::from_str(&run_id)
            .map_err(|e| StoreError::SerializationError(e.to_string()))?,
        mapping_name: row.try_get("mapping_name")?,
        mode: RefreshMode::from_str(&mode)
            .map_err(|e| StoreError::SerializationError(e.to_string()))?,
        status: TaskStatus::from_parts(&state, row.try_get("reason")?)
            .map_err(|e| StoreError::SerializationError(e.to_string()))?,
        files_created: count(row, "files_created")?,
        files_skipped: count(row, "files_skipped")?,
        files_deleted: count(row, "files_deleted")?,
        errors: serde_json::from_str(&errors)
            .map_err(|e| StoreError::SerializationError(format!("Invalid errors JSON: {e}")))?,
        started_at: parse_timestamp(&started_at)?,
        completed_at: completed_at.as_deref().map(parse_timestamp).transpose()?,
    })
}

// ============================================================================
// IMappingStore
// ============================================================================

#[async_trait::async_trait]
impl IMappingStore for SqliteRepository {
    async fn list_mappings(&self) -> anyhow::Result<Vec<MappingSpec>> {
        Ok(self.fetch_mappings(false).await?)
    }

    async fn list_enabled_mappings(&self) -> anyhow::Result<Vec<MappingSpec>> {
        Ok(self.fetch_mappings(true).await?)
    }

    async fn get_mapping(&self, id: MappingId) -> anyhow::Result<Option<MappingSpec>> {
        let row = sqlx::query("SELECT * FROM mappings WHERE id = ?")
            .bind(id.get())
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(mapping_from_row).transpose()?)
    }

    async fn get_mapping_by_name(&self, name: &str) -> anyhow::Result<Option<MappingSpec>> {
        let row = sqlx::query("SELECT * FROM mappings WHERE name = ?")
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(mapping_from_row).transpose()?)
    }

    async fn save_mapping(&self, spec: &MappingSpec) -> anyhow::Result<MappingId> {
        spec.validate()?;
        let id = if spec.id.is_assigned() {
            self.update_mapping(spec).await?
        } else {
            self.insert_mapping(spec).await?
        };
        Ok(id)
    }

    async fn delete_mapping(&self, id: MappingId) -> anyhow::Result<bool> {
        let result = sqlx::query("DELETE FROM mappings WHERE id = ?")
            .bind(id.get())
            .execute(&self.pool)
            .await?;
        let removed = result.rows_affected() > 0;
        tracing::debug!(mapping_id = %id, removed, "Deleted mapping");
        Ok(removed)
    }
}

// ============================================================================
// ITaskRecorder
// ============================================================================

#[async_trait::async_trait]
impl ITaskRecorder for SqliteRepository {
    async fn start_task(&self, record: &TaskRecord) -> anyhow::Result<()> {
        self.write_task("INSERT", record).await?;
        tracing::trace!(run_id = %record.run_id, "Recorded task start");
        Ok(())
    }

    async fn finish_task(&self, record: &TaskRecord) -> anyhow::Result<()> {
        self.write_task("INSERT OR REPLACE", record).await?;
        tracing::trace!(run_id = %record.run_id, status = %record.status, "Recorded task outcome");
        Ok(())
    }

    async fn get_task(&self, run_id: &RunId) -> anyhow::Result<Option<TaskRecord>> {
        let row = sqlx::query("SELECT * FROM tasks WHERE run_id = ?")
            .bind(run_id.to_string())
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(task_from_row).transpose()?)
    }

    async fn list_tasks(&self, limit: u32) -> anyhow::Result<Vec<TaskRecord>> {
        let rows = sqlx::query("SELECT * FROM tasks ORDER BY started_at DESC, rowid DESC LIMIT ?")
            .bind(i64::from(limit))
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.iter().map(task_from_row).collect::<Result<Vec<_>, _>>()?)
    }
}
