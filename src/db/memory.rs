// db/memory.rs
//! In-process store used by the unit tests. It enforces the same uniqueness
//! and conditional-update rules as the SQL schema.
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::{BigDecimal, Json};
use uuid::Uuid;

use super::{
    db::StoreError,
    engagementdb::{EngagementExt, FundOutcome},
    invoicedb::InvoiceExt,
    notificationdb::{Notification, NotificationExt},
    pointsdb::PointsExt,
    timedb::{StartedTimeEntry, TimeEntryExt},
};
use crate::models::{engagementmodel::*, invoicemodel::*, pointsmodel::*, timemodel::*};

#[derive(Default)]
struct MemoryState {
    time_entries: Vec<TimeEntry>,
    engagements: Vec<Engagement>,
    reviews: Vec<EngagementReview>,
    invoices: Vec<Invoice>,
    line_items: Vec<InvoiceLineItem>,
    profiles: Vec<PointsProfile>,
    notifications: Vec<Notification>,
}

#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
    /// Number of upcoming profile reads that report "absent" regardless of state.
    pub stale_profile_reads: AtomicUsize,
    pub fail_auto_stop: AtomicBool,
    /// Next timer insert loses to a concurrent start, as the partial unique index reports it.
    pub race_active_insert: AtomicBool,
    /// Next first-fund insert loses to a concurrent fund of the same job.
    pub race_fund_insert: AtomicBool,
    pub fail_line_items: AtomicBool,
    pub fail_notifications: AtomicBool,
    pub notification_attempts: AtomicUsize,
}

fn unique(constraint: &str) -> StoreError {
    StoreError::UniqueViolation { constraint: constraint.to_string() }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn time_entries(&self) -> Vec<TimeEntry> {
        self.lock().time_entries.clone()
    }

    pub fn profile_count(&self, user_id: Uuid) -> usize {
        self.lock().profiles.iter().filter(|p| p.user_id == user_id).count()
    }

    pub fn invoice_count(&self) -> usize {
        self.lock().invoices.len()
    }

    pub fn line_item_count(&self) -> usize {
        self.lock().line_items.len()
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.lock().notifications.clone()
    }
}

#[async_trait]
impl TimeEntryExt for MemoryStore {
    async fn start_time_entry(
        &self,
        contractor_id: Uuid,
        job_id: Uuid,
        notes: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<StartedTimeEntry, StoreError> {
        let mut state = self.lock();

        let running = state
            .time_entries
            .iter()
            .position(|e| e.contractor_id == contractor_id && e.is_active());

        if self.race_active_insert.swap(false, Ordering::SeqCst) {
            // the transaction rolls back as a whole, nothing is written
            return Err(unique("time_entries_one_active_per_contractor"));
        }

        let mut clock_skew = false;
        let mut auto_stopped = None;
        if let Some(index) = running {
            if self.fail_auto_stop.load(Ordering::SeqCst) {
                return Err(StoreError::Unavailable("auto-stop write failed".to_string()));
            }
            let previous = &mut state.time_entries[index];
            let completion = complete_at(previous.start_time, now);
            previous.status = TimeEntryStatus::Completed;
            previous.end_time = Some(completion.end_time);
            previous.duration_minutes = completion.duration_minutes;
            clock_skew = completion.clamped;
            auto_stopped = Some(previous.clone());
        }

        let entry = TimeEntry {
            id: Uuid::new_v4(),
            contractor_id,
            job_id,
            start_time: now,
            end_time: None,
            status: TimeEntryStatus::Active,
            duration_minutes: 0,
            notes,
            is_manual: false,
            created_at: now,
        };
        state.time_entries.push(entry.clone());

        Ok(StartedTimeEntry { entry, auto_stopped, clock_skew })
    }

    async fn get_time_entry(&self, entry_id: Uuid) -> Result<Option<TimeEntry>, StoreError> {
        Ok(self.lock().time_entries.iter().find(|e| e.id == entry_id).cloned())
    }

    async fn complete_time_entry(
        &self,
        entry_id: Uuid,
        end_time: DateTime<Utc>,
        duration_minutes: i32,
    ) -> Result<Option<TimeEntry>, StoreError> {
        let mut state = self.lock();
        let entry = state
            .time_entries
            .iter_mut()
            .find(|e| e.id == entry_id && e.is_active());

        Ok(entry.map(|e| {
            e.status = TimeEntryStatus::Completed;
            e.end_time = Some(end_time);
            e.duration_minutes = duration_minutes;
            e.clone()
        }))
    }

    async fn insert_manual_time_entry(
        &self,
        contractor_id: Uuid,
        job_id: Uuid,
        start_time: DateTime<Utc>,
        duration_minutes: i32,
        notes: Option<String>,
    ) -> Result<TimeEntry, StoreError> {
        let entry = TimeEntry {
            id: Uuid::new_v4(),
            contractor_id,
            job_id,
            start_time,
            end_time: Some(manual_end_time(start_time, duration_minutes)),
            status: TimeEntryStatus::Completed,
            duration_minutes,
            notes,
            is_manual: true,
            created_at: Utc::now(),
        };
        self.lock().time_entries.push(entry.clone());
        Ok(entry)
    }

    async fn get_active_time_entry(
        &self,
        contractor_id: Uuid,
    ) -> Result<Option<TimeEntry>, StoreError> {
        Ok(self
            .lock()
            .time_entries
            .iter()
            .find(|e| e.contractor_id == contractor_id && e.is_active())
            .cloned())
    }

    async fn list_time_entries(
        &self,
        contractor_id: Uuid,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> Result<Vec<TimeEntry>, StoreError> {
        let mut entries: Vec<TimeEntry> = self
            .lock()
            .time_entries
            .iter()
            .filter(|e| e.contractor_id == contractor_id)
            .filter(|e| from.map_or(true, |f| e.start_time >= f))
            .filter(|e| to.map_or(true, |t| e.start_time <= t))
            .cloned()
            .collect();
        entries.sort_by(|a, b| b.start_time.cmp(&a.start_time));
        Ok(entries)
    }

    async fn list_completed_time_entries_for_job(
        &self,
        contractor_id: Uuid,
        job_id: Uuid,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> Result<Vec<TimeEntry>, StoreError> {
        let mut entries: Vec<TimeEntry> = self
            .list_time_entries(contractor_id, from, to)
            .await?
            .into_iter()
            .filter(|e| e.job_id == job_id && !e.is_active())
            .collect();
        entries.reverse();
        Ok(entries)
    }
}

#[async_trait]
impl EngagementExt for MemoryStore {
    async fn insert_engagement(
        &self,
        job_id: Uuid,
        employer_id: Uuid,
        developer_id: Uuid,
        amount: BigDecimal,
    ) -> Result<Engagement, StoreError> {
        let mut state = self.lock();
        if state.engagements.iter().any(|e| e.job_id == job_id) {
            return Err(unique("engagements_job_id_key"));
        }
        let now = Utc::now();
        let engagement = Engagement {
            id: Uuid::new_v4(),
            job_id,
            employer_id,
            developer_id,
            payment_status: EngagementPaymentStatus::Unfunded,
            amount,
            fee_amount: None,
            net_payout: None,
            created_at: now,
            funded_at: None,
            released_at: None,
            updated_at: now,
        };
        state.engagements.push(engagement.clone());
        Ok(engagement)
    }

    async fn fund_engagement(
        &self,
        job_id: Uuid,
        employer_id: Uuid,
        developer_id: Uuid,
        amount: BigDecimal,
        now: DateTime<Utc>,
    ) -> Result<FundOutcome, StoreError> {
        let mut state = self.lock();
        let Some(index) = state.engagements.iter().position(|e| e.job_id == job_id) else {
            if self.race_fund_insert.swap(false, Ordering::SeqCst) {
                return Err(unique("engagements_job_id_key"));
            }
            let engagement = Engagement {
                id: Uuid::new_v4(),
                job_id,
                employer_id,
                developer_id,
                payment_status: EngagementPaymentStatus::Funded,
                amount,
                fee_amount: None,
                net_payout: None,
                created_at: now,
                funded_at: Some(now),
                released_at: None,
                updated_at: now,
            };
            state.engagements.push(engagement.clone());
            return Ok(FundOutcome::Funded(engagement));
        };

        let existing = &mut state.engagements[index];
        if existing.payment_status != EngagementPaymentStatus::Unfunded {
            return Ok(FundOutcome::AlreadyFunded(existing.clone()));
        }
        if existing.employer_id != employer_id || existing.developer_id != developer_id {
            return Ok(FundOutcome::PartyMismatch(existing.clone()));
        }
        existing.payment_status = EngagementPaymentStatus::Funded;
        existing.amount = amount;
        existing.funded_at = Some(now);
        existing.updated_at = now;
        Ok(FundOutcome::Funded(existing.clone()))
    }

    async fn get_engagement(&self, engagement_id: Uuid) -> Result<Option<Engagement>, StoreError> {
        Ok(self.lock().engagements.iter().find(|e| e.id == engagement_id).cloned())
    }

    async fn release_engagement(
        &self,
        engagement_id: Uuid,
        fee_amount: BigDecimal,
        net_payout: BigDecimal,
        now: DateTime<Utc>,
    ) -> Result<Option<Engagement>, StoreError> {
        let mut state = self.lock();
        let engagement = state.engagements.iter_mut().find(|e| {
            e.id == engagement_id && e.payment_status == EngagementPaymentStatus::Funded
        });

        Ok(engagement.map(|e| {
            e.payment_status = EngagementPaymentStatus::Released;
            e.fee_amount = Some(fee_amount);
            e.net_payout = Some(net_payout);
            e.released_at = Some(now);
            e.updated_at = now;
            e.clone()
        }))
    }

    async fn list_engagements_for_user(&self, user_id: Uuid) -> Result<Vec<Engagement>, StoreError> {
        let mut engagements: Vec<Engagement> = self
            .lock()
            .engagements
            .iter()
            .filter(|e| e.is_party(user_id))
            .cloned()
            .collect();
        engagements.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(engagements)
    }

    async fn insert_engagement_review(
        &self,
        engagement_id: Uuid,
        reviewer_id: Uuid,
        reviewee_id: Uuid,
        rating: i32,
        comment: String,
    ) -> Result<EngagementReview, StoreError> {
        let mut state = self.lock();
        if state
            .reviews
            .iter()
            .any(|r| r.engagement_id == engagement_id && r.reviewer_id == reviewer_id)
        {
            return Err(unique("engagement_reviews_engagement_id_reviewer_id_key"));
        }
        let review = EngagementReview {
            id: Uuid::new_v4(),
            engagement_id,
            reviewer_id,
            reviewee_id,
            rating,
            comment,
            created_at: Utc::now(),
        };
        state.reviews.push(review.clone());
        Ok(review)
    }

    async fn list_engagement_reviews(
        &self,
        engagement_id: Uuid,
    ) -> Result<Vec<EngagementReview>, StoreError> {
        Ok(self
            .lock()
            .reviews
            .iter()
            .filter(|r| r.engagement_id == engagement_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl InvoiceExt for MemoryStore {
    async fn insert_invoice(
        &self,
        header: &NewInvoice,
        line_items: &[NewLineItem],
    ) -> Result<InvoiceWithItems, StoreError> {
        let now = Utc::now();
        let invoice = Invoice {
            id: Uuid::new_v4(),
            contractor_id: header.contractor_id,
            business_id: header.business_id,
            job_id: header.job_id,
            status: InvoiceStatus::Draft,
            total_amount: header.total_amount.clone(),
            notes: header.notes.clone(),
            created_at: now,
            updated_at: now,
        };

        // staged like a transaction: nothing is visible unless every row is written
        let mut staged = Vec::with_capacity(line_items.len());
        for (position, item) in line_items.iter().enumerate() {
            if self.fail_line_items.load(Ordering::SeqCst) && position > 0 {
                return Err(StoreError::Database("line item insert failed".to_string()));
            }
            staged.push(InvoiceLineItem {
                id: Uuid::new_v4(),
                invoice_id: invoice.id,
                position: position as i32,
                description: item.description.clone(),
                quantity: item.quantity.clone(),
                rate: item.rate.clone(),
                amount: item.amount.clone(),
            });
        }

        let mut state = self.lock();
        state.invoices.push(invoice.clone());
        state.line_items.extend(staged.iter().cloned());
        Ok(InvoiceWithItems { invoice, line_items: staged })
    }

    async fn get_invoice(&self, invoice_id: Uuid) -> Result<Option<Invoice>, StoreError> {
        Ok(self.lock().invoices.iter().find(|i| i.id == invoice_id).cloned())
    }

    async fn get_invoice_line_items(
        &self,
        invoice_id: Uuid,
    ) -> Result<Vec<InvoiceLineItem>, StoreError> {
        let mut items: Vec<InvoiceLineItem> = self
            .lock()
            .line_items
            .iter()
            .filter(|i| i.invoice_id == invoice_id)
            .cloned()
            .collect();
        items.sort_by_key(|i| i.position);
        Ok(items)
    }

    async fn update_invoice_status(
        &self,
        invoice_id: Uuid,
        from: InvoiceStatus,
        to: InvoiceStatus,
    ) -> Result<Option<Invoice>, StoreError> {
        let mut state = self.lock();
        let invoice = state
            .invoices
            .iter_mut()
            .find(|i| i.id == invoice_id && i.status == from);

        Ok(invoice.map(|i| {
            i.status = to;
            i.updated_at = Utc::now();
            i.clone()
        }))
    }

    async fn list_invoices_for_user(&self, user_id: Uuid) -> Result<Vec<Invoice>, StoreError> {
        let mut invoices: Vec<Invoice> = self
            .lock()
            .invoices
            .iter()
            .filter(|i| i.contractor_id == user_id || i.business_id == user_id)
            .cloned()
            .collect();
        invoices.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(invoices)
    }
}

#[async_trait]
impl PointsExt for MemoryStore {
    async fn find_points_profile(&self, user_id: Uuid) -> Result<Option<PointsProfile>, StoreError> {
        let stale = self
            .stale_profile_reads
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if stale {
            // let the other racers catch up before reporting "absent"
            tokio::task::yield_now().await;
            return Ok(None);
        }
        Ok(self.lock().profiles.iter().find(|p| p.user_id == user_id).cloned())
    }

    async fn insert_points_profile(&self, user_id: Uuid) -> Result<PointsProfile, StoreError> {
        let mut state = self.lock();
        if state.profiles.iter().any(|p| p.user_id == user_id) {
            return Err(unique("points_profiles_user_id_key"));
        }
        let now = Utc::now();
        let profile = PointsProfile {
            id: Uuid::new_v4(),
            user_id,
            total_points: 0,
            badges_earned: Json(Vec::new()),
            created_at: now,
            updated_at: now,
        };
        state.profiles.push(profile.clone());
        Ok(profile)
    }

    async fn append_badge(
        &self,
        user_id: Uuid,
        badge: &EarnedBadge,
        points: i32,
    ) -> Result<Option<PointsProfile>, StoreError> {
        let mut state = self.lock();
        let profile = state
            .profiles
            .iter_mut()
            .find(|p| p.user_id == user_id && !p.has_badge(&badge.slug));

        Ok(profile.map(|p| {
            p.badges_earned.0.push(badge.clone());
            p.total_points += points;
            p.updated_at = Utc::now();
            p.clone()
        }))
    }

    async fn add_points(&self, user_id: Uuid, points: i32) -> Result<Option<PointsProfile>, StoreError> {
        let mut state = self.lock();
        let profile = state.profiles.iter_mut().find(|p| p.user_id == user_id);

        Ok(profile.map(|p| {
            p.total_points += points;
            p.updated_at = Utc::now();
            p.clone()
        }))
    }
}

#[async_trait]
impl NotificationExt for MemoryStore {
    async fn store_notification(&self, notification: &Notification) -> Result<(), StoreError> {
        self.notification_attempts.fetch_add(1, Ordering::SeqCst);
        if self.fail_notifications.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("notification sink down".to_string()));
        }
        self.lock().notifications.push(notification.clone());
        Ok(())
    }
}
