// db/engagementdb.rs
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::BigDecimal;
use uuid::Uuid;

use super::db::{DBClient, StoreError};
use crate::models::engagementmodel::*;

#[derive(Debug, Clone)]
pub enum FundOutcome {
    /// Newly inserted as funded, or an unfunded row was activated.
    Funded(Engagement),
    /// The job already has a funded or released engagement; nothing changed.
    AlreadyFunded(Engagement),
    /// The job's unfunded engagement belongs to different parties; nothing changed.
    PartyMismatch(Engagement),
}

#[async_trait]
pub trait EngagementExt: Send + Sync {
    async fn insert_engagement(
        &self,
        job_id: Uuid,
        employer_id: Uuid,
        developer_id: Uuid,
        amount: BigDecimal,
    ) -> Result<Engagement, StoreError>;

    async fn fund_engagement(
        &self,
        job_id: Uuid,
        employer_id: Uuid,
        developer_id: Uuid,
        amount: BigDecimal,
        now: DateTime<Utc>,
    ) -> Result<FundOutcome, StoreError>;

    async fn get_engagement(&self, engagement_id: Uuid) -> Result<Option<Engagement>, StoreError>;

    /// Moves a funded engagement to released. `None` if it was not funded.
    async fn release_engagement(
        &self,
        engagement_id: Uuid,
        fee_amount: BigDecimal,
        net_payout: BigDecimal,
        now: DateTime<Utc>,
    ) -> Result<Option<Engagement>, StoreError>;

    async fn list_engagements_for_user(&self, user_id: Uuid) -> Result<Vec<Engagement>, StoreError>;

    async fn insert_engagement_review(
        &self,
        engagement_id: Uuid,
        reviewer_id: Uuid,
        reviewee_id: Uuid,
        rating: i32,
        comment: String,
    ) -> Result<EngagementReview, StoreError>;

    async fn list_engagement_reviews(
        &self,
        engagement_id: Uuid,
    ) -> Result<Vec<EngagementReview>, StoreError>;
}

#[async_trait]
impl EngagementExt for DBClient {
    async fn insert_engagement(
        &self,
        job_id: Uuid,
        employer_id: Uuid,
        developer_id: Uuid,
        amount: BigDecimal,
    ) -> Result<Engagement, StoreError> {
        let engagement = sqlx::query_as::<_, Engagement>(
            r#"
            INSERT INTO engagements
            (job_id, employer_id, developer_id, payment_status, amount)
            VALUES ($1, $2, $3, 'unfunded'::engagement_payment_status, $4)
            RETURNING id, job_id, employer_id, developer_id, payment_status, amount,
            fee_amount, net_payout, created_at, funded_at, released_at, updated_at
            "#
        )
        .bind(job_id)
        .bind(employer_id)
        .bind(developer_id)
        .bind(amount)
        .fetch_one(&self.pool)
        .await?;

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
        let mut tx = self.pool.begin().await?;

        let existing = sqlx::query_as::<_, Engagement>(
            r#"
            SELECT id, job_id, employer_id, developer_id, payment_status, amount,
            fee_amount, net_payout, created_at, funded_at, released_at, updated_at
            FROM engagements
            WHERE job_id = $1
            FOR UPDATE
            "#
        )
        .bind(job_id)
        .fetch_optional(&mut *tx)
        .await?;

        let funded = match existing {
            Some(engagement) if engagement.payment_status != EngagementPaymentStatus::Unfunded => {
                return Ok(FundOutcome::AlreadyFunded(engagement));
            }
            Some(engagement)
                if engagement.employer_id != employer_id
                    || engagement.developer_id != developer_id =>
            {
                return Ok(FundOutcome::PartyMismatch(engagement));
            }
            Some(engagement) => {
                sqlx::query_as::<_, Engagement>(
                    r#"
                    UPDATE engagements
                    SET payment_status = 'funded'::engagement_payment_status,
                        amount = $2, funded_at = $3, updated_at = $3
                    WHERE id = $1 AND payment_status = 'unfunded'::engagement_payment_status
                    RETURNING id, job_id, employer_id, developer_id, payment_status, amount,
                    fee_amount, net_payout, created_at, funded_at, released_at, updated_at
                    "#
                )
                .bind(engagement.id)
                .bind(amount)
                .bind(now)
                .fetch_one(&mut *tx)
                .await?
            }
            None => {
                // engagements_job_id_key rejects a concurrent first fund for the same job
                sqlx::query_as::<_, Engagement>(
                    r#"
                    INSERT INTO engagements
                    (job_id, employer_id, developer_id, payment_status, amount, funded_at)
                    VALUES ($1, $2, $3, 'funded'::engagement_payment_status, $4, $5)
                    RETURNING id, job_id, employer_id, developer_id, payment_status, amount,
                    fee_amount, net_payout, created_at, funded_at, released_at, updated_at
                    "#
                )
                .bind(job_id)
                .bind(employer_id)
                .bind(developer_id)
                .bind(amount)
                .bind(now)
                .fetch_one(&mut *tx)
                .await?
            }
        };

        tx.commit().await?;
        Ok(FundOutcome::Funded(funded))
    }

    async fn get_engagement(&self, engagement_id: Uuid) -> Result<Option<Engagement>, StoreError> {
        let engagement = sqlx::query_as::<_, Engagement>(
            r#"
            SELECT id, job_id, employer_id, developer_id, payment_status, amount,
            fee_amount, net_payout, created_at, funded_at, released_at, updated_at
            FROM engagements
            WHERE id = $1
            "#
        )
        .bind(engagement_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(engagement)
    }

    async fn release_engagement(
        &self,
        engagement_id: Uuid,
        fee_amount: BigDecimal,
        net_payout: BigDecimal,
        now: DateTime<Utc>,
    ) -> Result<Option<Engagement>, StoreError> {
        let engagement = sqlx::query_as::<_, Engagement>(
            r#"
            UPDATE engagements
            SET payment_status = 'released'::engagement_payment_status,
                fee_amount = $2, net_payout = $3, released_at = $4, updated_at = $4
            WHERE id = $1 AND payment_status = 'funded'::engagement_payment_status
            RETURNING id, job_id, employer_id, developer_id, payment_status, amount,
            fee_amount, net_payout, created_at, funded_at, released_at, updated_at
            "#
        )
        .bind(engagement_id)
        .bind(fee_amount)
        .bind(net_payout)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;

        Ok(engagement)
    }

    async fn list_engagements_for_user(&self, user_id: Uuid) -> Result<Vec<Engagement>, StoreError> {
        let engagements = sqlx::query_as::<_, Engagement>(
            r#"
            SELECT id, job_id, employer_id, developer_id, payment_status, amount,
            fee_amount, net_payout, created_at, funded_at, released_at, updated_at
            FROM engagements
            WHERE employer_id = $1 OR developer_id = $1
            ORDER BY created_at DESC
            "#
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

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
        let review = sqlx::query_as::<_, EngagementReview>(
            r#"
            INSERT INTO engagement_reviews
            (engagement_id, reviewer_id, reviewee_id, rating, comment)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, engagement_id, reviewer_id, reviewee_id, rating, comment, created_at
            "#
        )
        .bind(engagement_id)
        .bind(reviewer_id)
        .bind(reviewee_id)
        .bind(rating)
        .bind(comment)
        .fetch_one(&self.pool)
        .await?;

        Ok(review)
    }

    async fn list_engagement_reviews(
        &self,
        engagement_id: Uuid,
    ) -> Result<Vec<EngagementReview>, StoreError> {
        let reviews = sqlx::query_as::<_, EngagementReview>(
            r#"
            SELECT id, engagement_id, reviewer_id, reviewee_id, rating, comment, created_at
            FROM engagement_reviews
            WHERE engagement_id = $1
            ORDER BY created_at ASC
            "#
        )
        .bind(engagement_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(reviews)
    }
}
