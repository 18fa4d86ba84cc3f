// service/points_service.rs
use std::sync::Arc;
use chrono::Utc;
use uuid::Uuid;

use crate::{
    db::{db::StoreError, pointsdb::PointsExt},
    models::pointsmodel::*,
    service::{error::ServiceError, notification_service::NotificationService},
};

/// Per-user points and badges. Profiles are created on first touch.
#[derive(Clone)]
pub struct PointsService {
    store: Arc<dyn PointsExt>,
    notification_service: Arc<NotificationService>,
}

impl std::fmt::Debug for PointsService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PointsService").finish()
    }
}

impl PointsService {
    pub fn new(store: Arc<dyn PointsExt>, notification_service: Arc<NotificationService>) -> Self {
        Self {
            store,
            notification_service,
        }
    }

    /// Optimistic create with a single fallback read.
    ///
    /// Read; if absent, insert an empty profile; if the insert loses to a
    /// concurrent caller (unique violation on `user_id`), read again and use
    /// the winner's row. Any other failure, or a missing row after losing the
    /// race, is returned as an error.
    pub async fn get_or_create_profile(&self, user_id: Uuid) -> Result<PointsProfile, ServiceError> {
        if let Some(profile) = self.store.find_points_profile(user_id).await? {
            return Ok(profile);
        }

        match self.store.insert_points_profile(user_id).await {
            Ok(profile) => {
                tracing::debug!(user_id = %user_id, "points profile created");
                Ok(profile)
            }
            Err(StoreError::UniqueViolation { constraint }) => {
                tracing::debug!(
                    user_id = %user_id,
                    constraint = %constraint,
                    "points profile created concurrently, re-reading"
                );
                self.store
                    .find_points_profile(user_id)
                    .await?
                    .ok_or_else(|| {
                        ServiceError::Database(format!(
                            "points profile for {} missing after concurrent create",
                            user_id
                        ))
                    })
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Awards `badge_slug` once. Repeat awards return the profile unchanged.
    pub async fn award_badge(
        &self,
        user_id: Uuid,
        badge_slug: &str,
        points_delta: i32,
    ) -> Result<PointsProfile, ServiceError> {
        let badge_slug = badge_slug.trim();
        if badge_slug.is_empty() {
            return Err(ServiceError::Validation("badge slug is required".to_string()));
        }
        if points_delta < 0 {
            return Err(ServiceError::Validation(
                "points delta must not be negative".to_string(),
            ));
        }

        let profile = self.get_or_create_profile(user_id).await?;
        if profile.has_badge(badge_slug) {
            tracing::debug!(user_id = %user_id, badge = badge_slug, "badge already held");
            return Ok(profile);
        }

        let badge = EarnedBadge {
            slug: badge_slug.to_string(),
            earned_at: Utc::now(),
        };

        match self.store.append_badge(user_id, &badge, points_delta).await? {
            Some(updated) => {
                tracing::info!(
                    user_id = %user_id,
                    badge = badge_slug,
                    points = points_delta,
                    total_points = updated.total_points,
                    "badge awarded"
                );
                self.notification_service
                    .notify_badge_awarded(user_id, badge_slug, points_delta)
                    .await;
                Ok(updated)
            }
            // a concurrent award got there first
            None => self.get_or_create_profile(user_id).await,
        }
    }

    /// Awards a badge from the catalog at its catalog value.
    pub async fn award_catalog_badge(
        &self,
        user_id: Uuid,
        badge_slug: &str,
    ) -> Result<PointsProfile, ServiceError> {
        let definition = find_badge(badge_slug.trim())
            .ok_or_else(|| ServiceError::Validation(format!("unknown badge '{}'", badge_slug)))?;

        self.award_badge(user_id, definition.slug, definition.points).await
    }

    pub async fn add_points(&self, user_id: Uuid, points: i32) -> Result<PointsProfile, ServiceError> {
        if points <= 0 {
            return Err(ServiceError::Validation("points must be greater than 0".to_string()));
        }

        self.get_or_create_profile(user_id).await?;
        self.store
            .add_points(user_id, points)
            .await?
            .ok_or_else(|| ServiceError::Database(format!("points profile for {} missing", user_id)))
    }
}
