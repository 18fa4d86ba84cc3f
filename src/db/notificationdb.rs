// db/notificationdb.rs
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::db::{DBClient, StoreError};

/// A user-facing alert handed to the notification sink.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Notification {
    pub user_id: Uuid,
    pub title: String,
    pub body: String,
    pub r#type: String,
    pub link: Option<String>,
}

/// Where notifications are delivered. Delivery is best effort.
#[async_trait]
pub trait NotificationExt: Send + Sync {
    async fn store_notification(&self, notification: &Notification) -> Result<(), StoreError>;
}

#[async_trait]
impl NotificationExt for DBClient {
    async fn store_notification(&self, notification: &Notification) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO notifications
            (user_id, type, title, message, link, created_at)
            VALUES ($1, $2, $3, $4, $5, NOW())
            "#
        )
        .bind(notification.user_id)
        .bind(&notification.r#type)
        .bind(&notification.title)
        .bind(&notification.body)
        .bind(&notification.link)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
