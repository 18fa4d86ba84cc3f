// db/pointsdb.rs
use async_trait::async_trait;
use sqlx::types::Json;
use uuid::Uuid;

use super::db::{DBClient, StoreError};
use crate::models::pointsmodel::*;

#[async_trait]
pub trait PointsExt: Send + Sync {
    async fn find_points_profile(&self, user_id: Uuid) -> Result<Option<PointsProfile>, StoreError>;

    /// Inserts an empty profile. Fails with `UniqueViolation` if one already exists.
    async fn insert_points_profile(&self, user_id: Uuid) -> Result<PointsProfile, StoreError>;

    /// Appends `badge` and adds `points` in one write, unless the user already
    /// holds a badge with the same slug. `None` when nothing was written.
    async fn append_badge(
        &self,
        user_id: Uuid,
        badge: &EarnedBadge,
        points: i32,
    ) -> Result<Option<PointsProfile>, StoreError>;

    async fn add_points(&self, user_id: Uuid, points: i32) -> Result<Option<PointsProfile>, StoreError>;
}

#[async_trait]
impl PointsExt for DBClient {
    async fn find_points_profile(&self, user_id: Uuid) -> Result<Option<PointsProfile>, StoreError> {
        let profile = sqlx::query_as::<_, PointsProfile>(
            r#"
            SELECT id, user_id, total_points, badges_earned, created_at, updated_at
            FROM points_profiles
            WHERE user_id = $1
            "#
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(profile)
    }

    async fn insert_points_profile(&self, user_id: Uuid) -> Result<PointsProfile, StoreError> {
        let profile = sqlx::query_as::<_, PointsProfile>(
            r#"
            INSERT INTO points_profiles (user_id, total_points, badges_earned)
            VALUES ($1, 0, '[]'::jsonb)
            RETURNING id, user_id, total_points, badges_earned, created_at, updated_at
            "#
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(profile)
    }

    async fn append_badge(
        &self,
        user_id: Uuid,
        badge: &EarnedBadge,
        points: i32,
    ) -> Result<Option<PointsProfile>, StoreError> {
        let profile = sqlx::query_as::<_, PointsProfile>(
            r#"
            UPDATE points_profiles
            SET badges_earned = badges_earned || $2,
                total_points = total_points + $3,
                updated_at = NOW()
            WHERE user_id = $1 AND NOT (badges_earned @> $4)
            RETURNING id, user_id, total_points, badges_earned, created_at, updated_at
            "#
        )
        .bind(user_id)
        .bind(Json(vec![badge.clone()]))
        .bind(points)
        .bind(serde_json::json!([{ "slug": badge.slug }]))
        .fetch_optional(&self.pool)
        .await?;

        Ok(profile)
    }

    async fn add_points(&self, user_id: Uuid, points: i32) -> Result<Option<PointsProfile>, StoreError> {
        let profile = sqlx::query_as::<_, PointsProfile>(
            r#"
            UPDATE points_profiles
            SET total_points = total_points + $2, updated_at = NOW()
            WHERE user_id = $1
            RETURNING id, user_id, total_points, badges_earned, created_at, updated_at
            "#
        )
        .bind(user_id)
        .bind(points)
        .fetch_optional(&self.pool)
        .await?;

        Ok(profile)
    }
}
