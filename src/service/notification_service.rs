// service/notification_service.rs
use std::sync::Arc;
use std::time::Duration;

use crate::{
    db::notificationdb::{Notification, NotificationExt},
    models::{engagementmodel::*, invoicemodel::*},
    utils::decimal::to_money,
};
use sqlx::types::BigDecimal;
use uuid::Uuid;

fn optional_money(value: &Option<BigDecimal>) -> String {
    value
        .as_ref()
        .map(|v| to_money(v).to_string())
        .unwrap_or_else(|| "pending".to_string())
}

/// Non-critical side effect: user-facing alerts.
///
/// Every `notify_*` call retries a bounded number of times, then logs and
/// drops the notification. None of them return an error, so a sink outage can
/// never make a committed ledger write look failed.
#[derive(Clone)]
pub struct NotificationService {
    sink: Arc<dyn NotificationExt>,
    max_attempts: u32,
    retry_delay: Duration,
}

impl std::fmt::Debug for NotificationService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationService")
            .field("max_attempts", &self.max_attempts)
            .field("retry_delay", &self.retry_delay)
            .finish()
    }
}

impl NotificationService {
    pub fn new(sink: Arc<dyn NotificationExt>, max_attempts: u32, retry_delay: Duration) -> Self {
        Self {
            sink,
            max_attempts: max_attempts.max(1),
            retry_delay,
        }
    }

    /// Returns whether the notification was delivered.
    pub async fn notify_best_effort(&self, notification: Notification) -> bool {
        for attempt in 1..=self.max_attempts {
            match self.sink.store_notification(&notification).await {
                Ok(()) => return true,
                Err(e) => {
                    tracing::warn!(
                        user_id = %notification.user_id,
                        kind = %notification.r#type,
                        attempt,
                        error = %e,
                        "notification delivery failed"
                    );
                    if attempt < self.max_attempts {
                        tokio::time::sleep(self.retry_delay).await;
                    }
                }
            }
        }

        tracing::error!(
            user_id = %notification.user_id,
            kind = %notification.r#type,
            attempts = self.max_attempts,
            "notification dropped"
        );
        false
    }

    pub async fn notify_engagement_funded(&self, engagement: &Engagement) {
        self.notify_best_effort(Notification {
            user_id: engagement.developer_id,
            title: "Engagement funded".to_string(),
            body: format!(
                "{} is now held in escrow for your engagement",
                to_money(&engagement.amount)
            ),
            r#type: "engagement_funded".to_string(),
            link: Some(format!("/engagements/{}", engagement.id)),
        })
        .await;
    }

    pub async fn notify_payment_released(&self, engagement: &Engagement) {
        self.notify_best_effort(Notification {
            user_id: engagement.developer_id,
            title: "Payment released".to_string(),
            body: format!(
                "Payment of {} released (platform fee {})",
                optional_money(&engagement.net_payout),
                optional_money(&engagement.fee_amount)
            ),
            r#type: "payment_released".to_string(),
            link: Some(format!("/engagements/{}", engagement.id)),
        })
        .await;
    }

    pub async fn notify_review_received(&self, review: &EngagementReview) {
        self.notify_best_effort(Notification {
            user_id: review.reviewee_id,
            title: "New review".to_string(),
            body: format!("You received a {}-star review", review.rating),
            r#type: "review_received".to_string(),
            link: Some(format!("/engagements/{}/reviews", review.engagement_id)),
        })
        .await;
    }

    pub async fn notify_invoice_created(&self, invoice: &Invoice) {
        self.notify_best_effort(Notification {
            user_id: invoice.business_id,
            title: "New invoice".to_string(),
            body: format!(
                "You have a new invoice for {}",
                to_money(&invoice.total_amount)
            ),
            r#type: "invoice_created".to_string(),
            link: Some(format!("/invoices/{}", invoice.id)),
        })
        .await;
    }

    pub async fn notify_invoice_status(&self, invoice: &Invoice) {
        // whoever did not make the change hears about it
        let recipient = match invoice.status {
            InvoiceStatus::Paid => invoice.contractor_id,
            _ => invoice.business_id,
        };

        self.notify_best_effort(Notification {
            user_id: recipient,
            title: "Invoice updated".to_string(),
            body: format!("Invoice is now {}", invoice.status.to_str()),
            r#type: "invoice_status".to_string(),
            link: Some(format!("/invoices/{}", invoice.id)),
        })
        .await;
    }

    pub async fn notify_badge_awarded(&self, user_id: Uuid, badge_slug: &str, points: i32) {
        self.notify_best_effort(Notification {
            user_id,
            title: "Badge earned".to_string(),
            body: format!("You earned the {} badge (+{} points)", badge_slug, points),
            r#type: "badge_awarded".to_string(),
            link: Some("/points".to_string()),
        })
        .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory::MemoryStore;
    use std::sync::atomic::Ordering;

    fn sample(user_id: Uuid) -> Notification {
        Notification {
            user_id,
            title: "t".to_string(),
            body: "b".to_string(),
            r#type: "test".to_string(),
            link: None,
        }
    }

    #[tokio::test]
    async fn test_delivers_on_first_attempt() {
        let store = Arc::new(MemoryStore::new());
        let service = NotificationService::new(store.clone(), 3, Duration::from_millis(1));

        assert!(service.notify_best_effort(sample(Uuid::new_v4())).await);
        assert_eq!(store.notification_attempts.load(Ordering::SeqCst), 1);
        assert_eq!(store.notifications().len(), 1);
    }

    #[tokio::test]
    async fn test_gives_up_after_bounded_retries() {
        let store = Arc::new(MemoryStore::new());
        store.fail_notifications.store(true, Ordering::SeqCst);
        let service = NotificationService::new(store.clone(), 3, Duration::from_millis(1));

        assert!(!service.notify_best_effort(sample(Uuid::new_v4())).await);
        assert_eq!(store.notification_attempts.load(Ordering::SeqCst), 3);
        assert!(store.notifications().is_empty());
    }

    #[tokio::test]
    async fn test_money_is_formatted_exactly() {
        use chrono::Utc;
        use std::str::FromStr;

        let store = Arc::new(MemoryStore::new());
        let service = NotificationService::new(store.clone(), 1, Duration::from_millis(1));
        let now = Utc::now();
        let engagement = Engagement {
            id: Uuid::new_v4(),
            job_id: Uuid::new_v4(),
            employer_id: Uuid::new_v4(),
            developer_id: Uuid::new_v4(),
            payment_status: EngagementPaymentStatus::Released,
            amount: BigDecimal::from_str("12345678901234567.89").unwrap(),
            fee_amount: Some(BigDecimal::from_str("308641972530864.20").unwrap()),
            net_payout: Some(BigDecimal::from_str("12037036928703703.69").unwrap()),
            created_at: now,
            funded_at: Some(now),
            released_at: Some(now),
            updated_at: now,
        };

        service.notify_engagement_funded(&engagement).await;
        service.notify_payment_released(&engagement).await;

        let sent = store.notifications();
        assert!(sent[0].body.contains("12345678901234567.89"));
        assert!(sent[1].body.contains("12037036928703703.69"));
        assert!(sent[1].body.contains("308641972530864.20"));
    }

    #[tokio::test]
    async fn test_zero_attempts_still_tries_once() {
        let store = Arc::new(MemoryStore::new());
        let service = NotificationService::new(store.clone(), 0, Duration::from_millis(1));

        assert!(service.notify_best_effort(sample(Uuid::new_v4())).await);
        assert_eq!(store.notification_attempts.load(Ordering::SeqCst), 1);
    }
}
