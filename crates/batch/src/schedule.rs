//! Named triggers for batch jobs.
//!
//! Schedule entries are data: a cron expression or a one-shot instant plus a
//! stored batch request template. The manager evaluates due entries against a
//! time window, takes an advisory per-name lock while triggering so the same
//! schedule never runs concurrently, and disables one-shot entries after they
//! fire.

use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use cron::Schedule as CronSchedule;
use dashmap::DashMap;
use tracing::{info, warn};

use entities::{ScheduleEntry, ScheduleSpec};
use store::ScheduleStore;

use crate::coordinator::BatchCoordinator;
use crate::types::{BatchError, BatchRequest};

/// Advisory lock held for the duration of one trigger.
struct TriggerLock<'a> {
    locks: &'a DashMap<String, ()>,
    name: String,
}

impl Drop for TriggerLock<'_> {
    fn drop(&mut self) {
        self.locks.remove(&self.name);
    }
}

/// CRUD and execution over schedule entries.
pub struct ScheduleManager {
    store: Arc<dyn ScheduleStore>,
    coordinator: BatchCoordinator,
    locks: DashMap<String, ()>,
}

impl ScheduleManager {
    pub fn new(store: Arc<dyn ScheduleStore>, coordinator: BatchCoordinator) -> Self {
        Self {
            store,
            coordinator,
            locks: DashMap::new(),
        }
    }

    /// Validate an entry: parseable trigger spec and a template that
    /// deserializes into a batch request.
    pub fn validate(entry: &ScheduleEntry) -> Result<(), BatchError> {
        if entry.name.trim().is_empty() {
            return Err(BatchError::InvalidSchedule("name must not be empty".into()));
        }
        if let ScheduleSpec::Cron { expression } = &entry.spec {
            CronSchedule::from_str(expression).map_err(|e| {
                BatchError::InvalidSchedule(format!("bad cron expression {expression:?}: {e}"))
            })?;
        }
        let request: BatchRequest = serde_json::from_value(entry.template.clone())
            .map_err(|e| BatchError::InvalidSchedule(format!("bad template: {e}")))?;
        request.validate()
    }

    pub async fn upsert(&self, entry: ScheduleEntry) -> Result<(), BatchError> {
        Self::validate(&entry)?;
        self.store.upsert(&entry).await?;
        Ok(())
    }

    pub async fn get(&self, name: &str) -> Result<Option<ScheduleEntry>, BatchError> {
        Ok(self.store.get(name).await?)
    }

    pub async fn list(&self) -> Result<Vec<ScheduleEntry>, BatchError> {
        Ok(self.store.list().await?)
    }

    pub async fn delete(&self, name: &str) -> Result<bool, BatchError> {
        Ok(self.store.delete(name).await?)
    }

    /// Should this entry fire within `(start, end]`? Cron entries fire when
    /// an occurrence lands in the window (measured from the later of the
    /// window start and the last firing); one-shot entries fire once their
    /// instant has passed, including catch-up after downtime.
    pub fn due_between(
        entry: &ScheduleEntry,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> bool {
        if !entry.enabled {
            return false;
        }
        match &entry.spec {
            ScheduleSpec::OneShot { at } => entry.last_fired_at.is_none() && *at <= end,
            ScheduleSpec::Cron { expression } => {
                let Ok(schedule) = CronSchedule::from_str(expression) else {
                    return false;
                };
                let reference = entry.last_fired_at.map_or(start, |fired| fired.max(start));
                schedule
                    .after(&reference)
                    .next()
                    .is_some_and(|occurrence| occurrence <= end)
            }
        }
    }

    /// Fire one schedule now. Concurrent triggers of the same name are
    /// rejected with [`BatchError::ScheduleBusy`].
    pub async fn trigger(&self, name: &str) -> Result<String, BatchError> {
        if self.locks.insert(name.to_string(), ()).is_some() {
            return Err(BatchError::ScheduleBusy(name.to_string()));
        }
        let _lock = TriggerLock {
            locks: &self.locks,
            name: name.to_string(),
        };

        let mut entry = self
            .store
            .get(name)
            .await?
            .ok_or_else(|| BatchError::InvalidSchedule(format!("no such schedule: {name}")))?;
        if !entry.enabled {
            return Err(BatchError::InvalidSchedule(format!(
                "schedule {name} is disabled"
            )));
        }

        let request: BatchRequest = serde_json::from_value(entry.template.clone())
            .map_err(|e| BatchError::InvalidSchedule(format!("bad template: {e}")))?;
        let job_id = self.coordinator.submit(request).await?;

        entry.last_fired_at = Some(Utc::now());
        if matches!(entry.spec, ScheduleSpec::OneShot { .. }) {
            entry.enabled = false;
        }
        self.store.upsert(&entry).await?;

        info!(schedule = name, job_id = %job_id, "schedule triggered");
        Ok(job_id)
    }

    /// Trigger every entry due in the window. Returns per-entry outcomes.
    pub async fn run_due(
        &self,
        window_start: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Vec<(String, Result<String, BatchError>)> {
        let entries = match self.list().await {
            Ok(entries) => entries,
            Err(err) => {
                warn!(error = %err, "schedule listing failed");
                return Vec::new();
            }
        };

        let mut outcomes = Vec::new();
        for entry in entries {
            if Self::due_between(&entry, window_start, now) {
                let result = self.trigger(&entry.name).await;
                if let Err(err) = &result {
                    warn!(schedule = %entry.name, error = %err, "scheduled trigger failed");
                }
                outcomes.push((entry.name, result));
            }
        }
        outcomes
    }

    /// Tick loop driving recurring execution.
    pub async fn run_loop(&self, tick: Duration, shutdown: Arc<AtomicBool>) {
        let mut window_start = Utc::now();
        while !shutdown.load(Ordering::Relaxed) {
            tokio::time::sleep(tick).await;
            let now = Utc::now();
            self.run_due(window_start, now).await;
            window_start = now;
        }
    }
}
