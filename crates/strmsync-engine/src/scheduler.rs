//! Per-mapping cron scheduling
//!
//! The [`ScheduleRegistry`] owns one shared [`JobScheduler`] clock and a
//! table mapping each [`MappingId`] to the job currently registered for it.
//!
//! ## Guarantees
//!
//! - At most one job exists per mapping. Every table mutation happens under
//!   the write half of a single lock, including the revoke-then-install
//!   sequence of a replacement.
//! - An invalid expression is rejected before the lock is taken, so a failed
//!   replacement never revokes the schedule already in place.
//! - A firing job resolves its mapping by name at fire time and runs in its
//!   own task; a slow run never delays other mappings.
//!
//! Expressions have five fields (minute granularity, seconds fixed at `0`)
//! or six (leading seconds field) and are evaluated in local time.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Local};
use strmsync_core::domain::MappingId;
use tokio::sync::RwLock;
use tokio_cron_scheduler::{Job, JobScheduler};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::runner::MappingRunner;
use crate::ScheduleError;

/// One registered schedule
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleEntry {
    pub mapping_id: MappingId,
    pub mapping_name: String,
    /// Expression as supplied (trimmed), before normalization
    pub expression: String,
    /// Job id inside the shared clock
    pub handle: Uuid,
}

/// Diagnostic view of a schedule
#[derive(Debug, Clone)]
pub struct ScheduleInfo {
    pub mapping_id: MappingId,
    pub mapping_name: String,
    pub expression: String,
    pub next_fire: Option<DateTime<Local>>,
}

/// Normalizes a 5- or 6-field cron expression to the 6-field form
///
/// ```
/// use strmsync_engine::scheduler::normalize_expression;
///
/// assert_eq!(normalize_expression("0 2 * * *").unwrap(), "0 0 2 * * *");
/// assert_eq!(normalize_expression("*/5 * * * * *").unwrap(), "*/5 * * * * *");
/// assert!(normalize_expression("not-a-cron").is_err());
/// ```
pub fn normalize_expression(expression: &str) -> Result<String, ScheduleError> {
    let fields: Vec<&str> = expression.split_whitespace().collect();
    match fields.len() {
        5 => Ok(format!("0 {}", fields.join(" "))),
        6 => Ok(fields.join(" ")),
        n => Err(ScheduleError::InvalidExpression {
            expression: expression.to_string(),
            reason: format!("expected 5 or 6 fields, found {n}"),
        }),
    }
}

/// Checks that `expression` is accepted by the clock without registering it
///
/// Returns the normalized 6-field form.
pub fn validate_expression(expression: &str) -> Result<String, ScheduleError> {
    let normalized = normalize_expression(expression)?;
    Job::new_async_tz(normalized.as_str(), Local, |_uuid, _clock| Box::pin(async {}))
        .map_err(|e| invalid(expression, e))?;
    Ok(normalized)
}

fn invalid(expression: &str, e: impl std::fmt::Display) -> ScheduleError {
    ScheduleError::InvalidExpression {
        expression: expression.to_string(),
        reason: e.to_string(),
    }
}

/// Registry of cron schedules, one per mapping
pub struct ScheduleRegistry {
    clock: JobScheduler,
    entries: RwLock<HashMap<MappingId, ScheduleEntry>>,
    runner: Arc<MappingRunner>,
    shutdown: CancellationToken,
}

impl ScheduleRegistry {
    /// Creates a registry with a fresh, not yet started clock
    pub async fn new(
        runner: Arc<MappingRunner>,
        shutdown: CancellationToken,
    ) -> Result<Self, ScheduleError> {
        let clock = JobScheduler::new()
            .await
            .map_err(|e| ScheduleError::Clock(e.to_string()))?;
        Ok(Self {
            clock,
            entries: RwLock::new(HashMap::new()),
            runner,
            shutdown,
        })
    }

    /// Registers every enabled mapping that has a schedule, then starts the clock
    ///
    /// A mapping whose schedule cannot be registered is logged and skipped.
    /// Returns the number of schedules registered.
    pub async fn start(&self) -> Result<usize, ScheduleError> {
        let mappings = self
            .runner
            .store()
            .list_mappings()
            .await
            .map_err(ScheduleError::Store)?;

        for mapping in mappings.iter().filter(|m| m.wants_schedule()) {
            let expression = mapping.schedule_expression().unwrap_or_default();
            if let Err(e) = self
                .add_schedule(mapping.id, &mapping.name, expression)
                .await
            {
                warn!(mapping = %mapping.name, error = %e, "Skipping schedule");
            }
        }

        self.clock
            .start()
            .await
            .map_err(|e| ScheduleError::Clock(e.to_string()))?;

        let registered = self.len().await;
        info!(schedules = registered, "Scheduler started");
        Ok(registered)
    }

    /// Installs `expression` for mapping `id`, replacing any previous schedule
    pub async fn add_schedule(
        &self,
        id: MappingId,
        name: &str,
        expression: &str,
    ) -> Result<(), ScheduleError> {
        let expression = expression.trim();
        let normalized = normalize_expression(expression)?;
        let job = self.build_job(&normalized, name).map_err(|e| invalid(expression, e))?;

        let mut entries = self.entries.write().await;
        if let Some(old) = entries.remove(&id) {
            if let Err(e) = self.clock.remove(&old.handle).await {
                warn!(mapping = %old.mapping_name, error = %e, "Failed to revoke previous schedule");
            }
        }

        let handle = self.clock.add(job).await.map_err(|e| {
            error!(mapping = %name, error = %e, "Failed to install schedule");
            ScheduleError::Clock(e.to_string())
        })?;

        entries.insert(
            id,
            ScheduleEntry {
                mapping_id: id,
                mapping_name: name.to_string(),
                expression: expression.to_string(),
                handle,
            },
        );
        info!(mapping = %name, mapping_id = %id, expression, "Schedule installed");
        Ok(())
    }

    /// Applies a mapping's current schedule settings
    ///
    /// Disabled mappings and blank expressions remove the schedule;
    /// anything else installs it.
    pub async fn update_schedule(
        &self,
        id: MappingId,
        name: &str,
        expression: Option<&str>,
        enabled: bool,
    ) -> Result<(), ScheduleError> {
        match expression.map(str::trim).filter(|e| !e.is_empty()) {
            Some(expression) if enabled => self.add_schedule(id, name, expression).await,
            _ => {
                self.remove_schedule(id).await;
                Ok(())
            }
        }
    }

    /// Removes the schedule of mapping `id`; absent schedules are ignored
    pub async fn remove_schedule(&self, id: MappingId) {
        let mut entries = self.entries.write().await;
        let Some(old) = entries.remove(&id) else {
            return;
        };
        if let Err(e) = self.clock.remove(&old.handle).await {
            warn!(mapping = %old.mapping_name, error = %e, "Failed to revoke schedule");
        }
        info!(mapping = %old.mapping_name, mapping_id = %id, "Schedule removed");
    }

    /// Brings the table in line with the mappings currently in storage
    ///
    /// Schedules of deleted, disabled or unscheduled mappings are removed;
    /// new or changed ones are installed. Per-mapping failures are logged.
    pub async fn reconcile(&self) -> Result<(), ScheduleError> {
        let mappings = self
            .runner
            .store()
            .list_mappings()
            .await
            .map_err(ScheduleError::Store)?;
        let current = self.snapshot().await;

        let wanted: HashMap<MappingId, (&str, &str)> = mappings
            .iter()
            .filter(|m| m.wants_schedule())
            .filter_map(|m| {
                m.schedule_expression()
                    .map(|expr| (m.id, (m.name.as_str(), expr)))
            })
            .collect();

        for entry in &current {
            if !wanted.contains_key(&entry.mapping_id) {
                self.remove_schedule(entry.mapping_id).await;
            }
        }

        for (id, (name, expression)) in &wanted {
            let unchanged = current.iter().any(|e| {
                e.mapping_id == *id && e.mapping_name == *name && e.expression == *expression
            });
            if unchanged {
                continue;
            }
            if let Err(e) = self.add_schedule(*id, name, expression).await {
                warn!(mapping = %name, error = %e, "Skipping schedule");
            }
        }

        debug!(schedules = self.len().await, "Schedules reconciled");
        Ok(())
    }

    /// Current schedules with their next fire times
    ///
    /// The table lock is only held while copying entries; next fire times
    /// are computed afterwards.
    pub async fn list_schedules(&self) -> Vec<ScheduleInfo> {
        let entries = self.snapshot().await;
        let mut clock = self.clock.clone();

        let mut infos = Vec::with_capacity(entries.len());
        for entry in entries {
            let next_fire = match clock.next_tick_for_job(entry.handle).await {
                Ok(next) => next.map(|t| t.with_timezone(&Local)),
                Err(e) => {
                    debug!(mapping = %entry.mapping_name, error = %e, "No next tick");
                    None
                }
            };
            infos.push(ScheduleInfo {
                mapping_id: entry.mapping_id,
                mapping_name: entry.mapping_name,
                expression: entry.expression,
                next_fire,
            });
        }
        infos.sort_by(|a, b| a.mapping_name.cmp(&b.mapping_name));
        infos
    }

    /// The schedule registered for mapping `id`, if any
    pub async fn entry(&self, id: MappingId) -> Option<ScheduleEntry> {
        self.entries.read().await.get(&id).cloned()
    }

    /// Number of registered schedules
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Cancels in-flight scheduled runs and stops the clock
    pub async fn shutdown(&self) -> Result<(), ScheduleError> {
        self.shutdown.cancel();
        let mut clock = self.clock.clone();
        clock
            .shutdown()
            .await
            .map_err(|e| ScheduleError::Clock(e.to_string()))?;
        info!("Scheduler stopped");
        Ok(())
    }

    async fn snapshot(&self) -> Vec<ScheduleEntry> {
        self.entries.read().await.values().cloned().collect()
    }

    fn build_job(
        &self,
        normalized: &str,
        name: &str,
    ) -> Result<Job, tokio_cron_scheduler::JobSchedulerError> {
        let runner = Arc::clone(&self.runner);
        let shutdown = self.shutdown.clone();
        let name = name.to_string();

        Job::new_async_tz(normalized, Local, move |_uuid, _clock| {
            let runner = Arc::clone(&runner);
            let cancel = shutdown.child_token();
            let name = name.clone();
            Box::pin(async move {
                tokio::spawn(fire(runner, cancel, name));
            })
        })
    }
}

async fn fire(runner: Arc<MappingRunner>, cancel: CancellationToken, name: String) {
    info!(mapping = %name, "Scheduled run firing");
    match runner.run_by_name(&cancel, &name).await {
        Ok(report) => debug!(
            mapping = %name,
            run_id = %report.run_id.short(),
            created = report.result.files_created,
            "Scheduled run finished"
        ),
        Err(e) if e.is_cancelled() => warn!(mapping = %name, "Scheduled run cancelled"),
        Err(e) => error!(mapping = %name, error = %e, "Scheduled run failed"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn five_fields_gain_zero_seconds() {
        assert_eq!(normalize_expression("*/15 * * * *").unwrap(), "0 */15 * * * *");
    }

    #[test]
    fn extra_whitespace_is_collapsed() {
        assert_eq!(normalize_expression("  0  2 * *   * ").unwrap(), "0 0 2 * * *");
    }

    #[test]
    fn wrong_field_counts_are_rejected() {
        for expr in ["", "not-a-cron", "* * * *", "0 0 0 1 1 * 2030 extra"] {
            assert!(
                matches!(
                    normalize_expression(expr),
                    Err(ScheduleError::InvalidExpression { .. })
                ),
                "accepted {expr:?}"
            );
        }
    }

    #[test]
    fn validate_rejects_bad_grammar() {
        assert!(validate_expression("99 * * * *").is_err());
        assert!(validate_expression("0 2 * * *").is_ok());
    }
}
