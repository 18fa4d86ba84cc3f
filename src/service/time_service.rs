// service/time_service.rs
use std::sync::Arc;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
    db::{db::StoreError, timedb::TimeEntryExt},
    models::timemodel::*,
    service::error::ServiceError,
};

const MAX_NOTES_LEN: usize = 1000;

/// Billable timers. At most one active entry per contractor; the store's
/// partial unique index is what actually guarantees it under concurrency.
#[derive(Clone)]
pub struct TimeEntryService {
    store: Arc<dyn TimeEntryExt>,
}

impl std::fmt::Debug for TimeEntryService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimeEntryService").finish()
    }
}

fn validate_notes(notes: &Option<String>) -> Result<(), ServiceError> {
    match notes {
        Some(n) if n.chars().count() > MAX_NOTES_LEN => Err(ServiceError::Validation(format!(
            "notes must be at most {} characters",
            MAX_NOTES_LEN
        ))),
        _ => Ok(()),
    }
}

fn validate_window(from: Option<DateTime<Utc>>, to: Option<DateTime<Utc>>) -> Result<(), ServiceError> {
    match (from, to) {
        (Some(f), Some(t)) if f > t => Err(ServiceError::Validation(
            "`from` must not be after `to`".to_string(),
        )),
        _ => Ok(()),
    }
}

fn already_completed(entry_id: Uuid) -> ServiceError {
    ServiceError::InvalidState(format!("time entry {} is already completed", entry_id))
}

impl TimeEntryService {
    pub fn new(store: Arc<dyn TimeEntryExt>) -> Self {
        Self { store }
    }

    /// Starts a timer, completing any timer the contractor already has running.
    pub async fn start_timer(
        &self,
        contractor_id: Uuid,
        job_id: Uuid,
        notes: Option<String>,
    ) -> Result<TimeEntry, ServiceError> {
        validate_notes(&notes)?;

        let started = self
            .store
            .start_time_entry(contractor_id, job_id, notes, Utc::now())
            .await
            .map_err(|e| match e {
                StoreError::UniqueViolation { .. } => ServiceError::Conflict(format!(
                    "another timer was started concurrently for contractor {}",
                    contractor_id
                )),
                other => other.into(),
            })?;

        if let Some(previous) = &started.auto_stopped {
            tracing::info!(
                contractor_id = %contractor_id,
                entry_id = %previous.id,
                duration_minutes = previous.duration_minutes,
                "auto-stopped running timer"
            );
        }
        if started.clock_skew {
            tracing::warn!(
                contractor_id = %contractor_id,
                "previous timer started in the future; duration clamped to 0"
            );
        }

        Ok(started.entry)
    }

    pub async fn stop_timer(
        &self,
        contractor_id: Uuid,
        entry_id: Uuid,
    ) -> Result<TimeEntry, ServiceError> {
        let entry = self
            .store
            .get_time_entry(entry_id)
            .await?
            .ok_or(ServiceError::TimeEntryNotFound(entry_id))?;

        if entry.contractor_id != contractor_id {
            return Err(ServiceError::Forbidden(contractor_id, entry_id));
        }
        if !entry.is_active() {
            return Err(already_completed(entry_id));
        }

        let completion = complete_at(entry.start_time, Utc::now());
        if completion.clamped {
            tracing::warn!(
                entry_id = %entry_id,
                start_time = %entry.start_time,
                "timer stopped before its start time; duration clamped to 0"
            );
        }

        // a concurrent stop may have won between the read and this write
        self.store
            .complete_time_entry(entry_id, completion.end_time, completion.duration_minutes)
            .await?
            .ok_or_else(|| already_completed(entry_id))
    }

    pub async fn record_manual(
        &self,
        contractor_id: Uuid,
        job_id: Uuid,
        date: DateTime<Utc>,
        duration_minutes: i32,
        notes: Option<String>,
    ) -> Result<TimeEntry, ServiceError> {
        if duration_minutes <= 0 {
            return Err(ServiceError::Validation(
                "duration_minutes must be greater than 0".to_string(),
            ));
        }
        if duration_minutes > MAX_MANUAL_MINUTES {
            return Err(ServiceError::Validation(format!(
                "duration_minutes must be at most {}",
                MAX_MANUAL_MINUTES
            )));
        }
        validate_notes(&notes)?;

        let entry = self
            .store
            .insert_manual_time_entry(contractor_id, job_id, date, duration_minutes, notes)
            .await?;

        tracing::info!(contractor_id = %contractor_id, entry_id = %entry.id, "manual time entry recorded");
        Ok(entry)
    }

    pub async fn get_active(&self, contractor_id: Uuid) -> Result<Option<TimeEntry>, ServiceError> {
        Ok(self.store.get_active_time_entry(contractor_id).await?)
    }

    pub async fn list(
        &self,
        contractor_id: Uuid,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> Result<Vec<TimeEntry>, ServiceError> {
        validate_window(from, to)?;
        Ok(self.store.list_time_entries(contractor_id, from, to).await?)
    }

    pub async fn completed_for_job(
        &self,
        contractor_id: Uuid,
        job_id: Uuid,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> Result<Vec<TimeEntry>, ServiceError> {
        validate_window(from, to)?;
        Ok(self
            .store
            .list_completed_time_entries_for_job(contractor_id, job_id, from, to)
            .await?)
    }
}
