// db/timedb.rs
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::db::{DBClient, StoreError};
use crate::models::timemodel::*;

/// Result of starting a timer: the new active row plus whatever it replaced.
#[derive(Debug, Clone)]
pub struct StartedTimeEntry {
    pub entry: TimeEntry,
    pub auto_stopped: Option<TimeEntry>,
    /// The replaced timer started after `now`; its duration was clamped to 0.
    pub clock_skew: bool,
}

#[async_trait]
pub trait TimeEntryExt: Send + Sync {
    /// Completes the contractor's active entry (if any) at `now` and inserts a
    /// new active one starting at `now`, as a single unit of work.
    async fn start_time_entry(
        &self,
        contractor_id: Uuid,
        job_id: Uuid,
        notes: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<StartedTimeEntry, StoreError>;

    async fn get_time_entry(&self, entry_id: Uuid) -> Result<Option<TimeEntry>, StoreError>;

    /// Completes the entry only if it is still active. `None` when it was not.
    async fn complete_time_entry(
        &self,
        entry_id: Uuid,
        end_time: DateTime<Utc>,
        duration_minutes: i32,
    ) -> Result<Option<TimeEntry>, StoreError>;

    async fn insert_manual_time_entry(
        &self,
        contractor_id: Uuid,
        job_id: Uuid,
        start_time: DateTime<Utc>,
        duration_minutes: i32,
        notes: Option<String>,
    ) -> Result<TimeEntry, StoreError>;

    async fn get_active_time_entry(
        &self,
        contractor_id: Uuid,
    ) -> Result<Option<TimeEntry>, StoreError>;

    /// Newest first, optionally bounded on `start_time`.
    async fn list_time_entries(
        &self,
        contractor_id: Uuid,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> Result<Vec<TimeEntry>, StoreError>;

    /// Completed entries for one job, oldest first.
    async fn list_completed_time_entries_for_job(
        &self,
        contractor_id: Uuid,
        job_id: Uuid,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> Result<Vec<TimeEntry>, StoreError>;
}

#[async_trait]
impl TimeEntryExt for DBClient {
    async fn start_time_entry(
        &self,
        contractor_id: Uuid,
        job_id: Uuid,
        notes: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<StartedTimeEntry, StoreError> {
        let mut tx = self.pool.begin().await?;

        // 1) lock the running timer so a concurrent stop/start waits on us
        let running = sqlx::query_as::<_, TimeEntry>(
            r#"
            SELECT id, contractor_id, job_id, start_time, end_time, status,
            duration_minutes, notes, is_manual, created_at
            FROM time_entries
            WHERE contractor_id = $1 AND status = 'active'::time_entry_status
            FOR UPDATE
            "#
        )
        .bind(contractor_id)
        .fetch_optional(&mut *tx)
        .await?;

        // 2) close it with the real elapsed time; bail out (rolling back) on failure
        let mut clock_skew = false;
        let auto_stopped = match running {
            Some(previous) => {
                let completion = complete_at(previous.start_time, now);
                clock_skew = completion.clamped;

                let stopped = sqlx::query_as::<_, TimeEntry>(
                    r#"
                    UPDATE time_entries
                    SET status = 'completed'::time_entry_status, end_time = $2, duration_minutes = $3
                    WHERE id = $1 AND status = 'active'::time_entry_status
                    RETURNING id, contractor_id, job_id, start_time, end_time, status,
                    duration_minutes, notes, is_manual, created_at
                    "#
                )
                .bind(previous.id)
                .bind(completion.end_time)
                .bind(completion.duration_minutes)
                .fetch_one(&mut *tx)
                .await?;
                Some(stopped)
            }
            None => None,
        };

        // 3) insert the new timer; a racing start trips time_entries_one_active_per_contractor
        let entry = sqlx::query_as::<_, TimeEntry>(
            r#"
            INSERT INTO time_entries
            (contractor_id, job_id, start_time, status, duration_minutes, notes, is_manual)
            VALUES ($1, $2, $3, 'active'::time_entry_status, 0, $4, FALSE)
            RETURNING id, contractor_id, job_id, start_time, end_time, status,
            duration_minutes, notes, is_manual, created_at
            "#
        )
        .bind(contractor_id)
        .bind(job_id)
        .bind(now)
        .bind(notes)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(StartedTimeEntry { entry, auto_stopped, clock_skew })
    }

    async fn get_time_entry(&self, entry_id: Uuid) -> Result<Option<TimeEntry>, StoreError> {
        let entry = sqlx::query_as::<_, TimeEntry>(
            r#"
            SELECT id, contractor_id, job_id, start_time, end_time, status,
            duration_minutes, notes, is_manual, created_at
            FROM time_entries
            WHERE id = $1
            "#
        )
        .bind(entry_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(entry)
    }

    async fn complete_time_entry(
        &self,
        entry_id: Uuid,
        end_time: DateTime<Utc>,
        duration_minutes: i32,
    ) -> Result<Option<TimeEntry>, StoreError> {
        let entry = sqlx::query_as::<_, TimeEntry>(
            r#"
            UPDATE time_entries
            SET status = 'completed'::time_entry_status, end_time = $2, duration_minutes = $3
            WHERE id = $1 AND status = 'active'::time_entry_status
            RETURNING id, contractor_id, job_id, start_time, end_time, status,
            duration_minutes, notes, is_manual, created_at
            "#
        )
        .bind(entry_id)
        .bind(end_time)
        .bind(duration_minutes)
        .fetch_optional(&self.pool)
        .await?;

        Ok(entry)
    }

    async fn insert_manual_time_entry(
        &self,
        contractor_id: Uuid,
        job_id: Uuid,
        start_time: DateTime<Utc>,
        duration_minutes: i32,
        notes: Option<String>,
    ) -> Result<TimeEntry, StoreError> {
        let entry = sqlx::query_as::<_, TimeEntry>(
            r#"
            INSERT INTO time_entries
            (contractor_id, job_id, start_time, end_time, status, duration_minutes, notes, is_manual)
            VALUES ($1, $2, $3, $4, 'completed'::time_entry_status, $5, $6, TRUE)
            RETURNING id, contractor_id, job_id, start_time, end_time, status,
            duration_minutes, notes, is_manual, created_at
            "#
        )
        .bind(contractor_id)
        .bind(job_id)
        .bind(start_time)
        .bind(manual_end_time(start_time, duration_minutes))
        .bind(duration_minutes)
        .bind(notes)
        .fetch_one(&self.pool)
        .await?;

        Ok(entry)
    }

    async fn get_active_time_entry(
        &self,
        contractor_id: Uuid,
    ) -> Result<Option<TimeEntry>, StoreError> {
        let entry = sqlx::query_as::<_, TimeEntry>(
            r#"
            SELECT id, contractor_id, job_id, start_time, end_time, status,
            duration_minutes, notes, is_manual, created_at
            FROM time_entries
            WHERE contractor_id = $1 AND status = 'active'::time_entry_status
            "#
        )
        .bind(contractor_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(entry)
    }

    async fn list_time_entries(
        &self,
        contractor_id: Uuid,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> Result<Vec<TimeEntry>, StoreError> {
        let entries = sqlx::query_as::<_, TimeEntry>(
            r#"
            SELECT id, contractor_id, job_id, start_time, end_time, status,
            duration_minutes, notes, is_manual, created_at
            FROM time_entries
            WHERE contractor_id = $1
              AND ($2::timestamptz IS NULL OR start_time >= $2)
              AND ($3::timestamptz IS NULL OR start_time <= $3)
            ORDER BY start_time DESC, created_at DESC
            "#
        )
        .bind(contractor_id)
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }

    async fn list_completed_time_entries_for_job(
        &self,
        contractor_id: Uuid,
        job_id: Uuid,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> Result<Vec<TimeEntry>, StoreError> {
        let entries = sqlx::query_as::<_, TimeEntry>(
            r#"
            SELECT id, contractor_id, job_id, start_time, end_time, status,
            duration_minutes, notes, is_manual, created_at
            FROM time_entries
            WHERE contractor_id = $1 AND job_id = $2
              AND status = 'completed'::time_entry_status
              AND ($3::timestamptz IS NULL OR start_time >= $3)
              AND ($4::timestamptz IS NULL OR start_time <= $4)
            ORDER BY start_time ASC
            "#
        )
        .bind(contractor_id)
        .bind(job_id)
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }
}
