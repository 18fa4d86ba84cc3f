use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Manual entries longer than a day are rejected.
pub const MAX_MANUAL_MINUTES: i32 = 24 * 60;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "time_entry_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TimeEntryStatus {
    Active,
    Completed,
}

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone, PartialEq)]
pub struct TimeEntry {
    pub id: Uuid,
    pub contractor_id: Uuid,
    pub job_id: Uuid,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>, // NULL while the timer runs
    pub status: TimeEntryStatus,
    pub duration_minutes: i32,
    pub notes: Option<String>,
    pub is_manual: bool,
    pub created_at: DateTime<Utc>,
}

impl TimeEntry {
    pub fn is_active(&self) -> bool {
        self.status == TimeEntryStatus::Active
    }
}

/// Whole minutes between two instants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ElapsedMinutes {
    pub minutes: i32,
    /// Set when `end` was before `start` and the result was forced to zero.
    pub clamped: bool,
}

/// Rounds `end - start` to the nearest minute, half up. Negative spans clamp to 0.
pub fn elapsed_minutes(start: DateTime<Utc>, end: DateTime<Utc>) -> ElapsedMinutes {
    let millis = (end - start).num_milliseconds();
    if millis < 0 {
        return ElapsedMinutes { minutes: 0, clamped: true };
    }

    let minutes = (millis + 30_000) / 60_000;
    ElapsedMinutes {
        minutes: i32::try_from(minutes).unwrap_or(i32::MAX),
        clamped: false,
    }
}

/// How an active entry is closed at `now`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Completion {
    pub end_time: DateTime<Utc>,
    pub duration_minutes: i32,
    pub clamped: bool,
}

/// Closes an entry started at `start`. When the clock went backwards the entry
/// ends at its own start with zero minutes, so `end_time >= start_time` holds.
pub fn complete_at(start: DateTime<Utc>, now: DateTime<Utc>) -> Completion {
    let elapsed = elapsed_minutes(start, now);
    Completion {
        end_time: if elapsed.clamped { start } else { now },
        duration_minutes: elapsed.minutes,
        clamped: elapsed.clamped,
    }
}

pub fn manual_end_time(start: DateTime<Utc>, duration_minutes: i32) -> DateTime<Utc> {
    start + Duration::minutes(i64::from(duration_minutes))
}
