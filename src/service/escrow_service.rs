// service/escrow_service.rs
use std::sync::Arc;
use chrono::Utc;
use sqlx::types::BigDecimal;
use uuid::Uuid;

use crate::{
    db::{
        db::StoreError,
        engagementdb::{EngagementExt, FundOutcome},
    },
    models::engagementmodel::*,
    service::{error::ServiceError, notification_service::NotificationService},
    utils::decimal::{is_positive, net_payout, platform_fee, to_money},
};

pub const MIN_RATING: i32 = 1;
pub const MAX_RATING: i32 = 5;
const MAX_COMMENT_LEN: usize = 2000;

/// Escrow lifecycle of an engagement: unfunded -> funded -> released.
#[derive(Clone)]
pub struct EscrowService {
    store: Arc<dyn EngagementExt>,
    notification_service: Arc<NotificationService>,
}

impl std::fmt::Debug for EscrowService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EscrowService").finish()
    }
}

fn validate_parties(employer_id: Uuid, developer_id: Uuid) -> Result<(), ServiceError> {
    if employer_id == developer_id {
        return Err(ServiceError::Validation(
            "employer and developer must be different users".to_string(),
        ));
    }
    Ok(())
}

fn validate_amount(amount: &BigDecimal) -> Result<BigDecimal, ServiceError> {
    if !is_positive(amount) {
        return Err(ServiceError::Validation("amount must be greater than 0".to_string()));
    }
    Ok(to_money(amount))
}

impl EscrowService {
    pub fn new(store: Arc<dyn EngagementExt>, notification_service: Arc<NotificationService>) -> Self {
        Self {
            store,
            notification_service,
        }
    }

    /// Records an engagement for a job before any money moves.
    pub async fn open(
        &self,
        job_id: Uuid,
        employer_id: Uuid,
        developer_id: Uuid,
        amount: BigDecimal,
    ) -> Result<Engagement, ServiceError> {
        validate_parties(employer_id, developer_id)?;
        let amount = validate_amount(&amount)?;

        self.store
            .insert_engagement(job_id, employer_id, developer_id, amount)
            .await
            .map_err(|e| match e {
                StoreError::UniqueViolation { .. } => ServiceError::Conflict(format!(
                    "job {} already has an engagement",
                    job_id
                )),
                other => other.into(),
            })
    }

    /// Moves the job's engagement into escrow. Not re-enterable: a job whose
    /// engagement is already funded or released fails with `AlreadyFunded`.
    pub async fn fund(
        &self,
        job_id: Uuid,
        employer_id: Uuid,
        developer_id: Uuid,
        amount: BigDecimal,
    ) -> Result<Engagement, ServiceError> {
        validate_parties(employer_id, developer_id)?;
        let amount = validate_amount(&amount)?;

        let outcome = self
            .store
            .fund_engagement(job_id, employer_id, developer_id, amount, Utc::now())
            .await
            .map_err(|e| match e {
                // lost a first-fund race against another request for the same job
                StoreError::UniqueViolation { .. } => ServiceError::AlreadyFunded(job_id),
                other => other.into(),
            })?;

        let engagement = match outcome {
            FundOutcome::Funded(engagement) => engagement,
            FundOutcome::AlreadyFunded(_) => return Err(ServiceError::AlreadyFunded(job_id)),
            FundOutcome::PartyMismatch(existing) => {
                return Err(ServiceError::Validation(format!(
                    "job {} is engaged between different parties (engagement {})",
                    job_id, existing.id
                )))
            }
        };

        tracing::info!(
            engagement_id = %engagement.id,
            job_id = %job_id,
            amount = %engagement.amount,
            "engagement funded"
        );
        self.notification_service.notify_engagement_funded(&engagement).await;

        Ok(engagement)
    }

    /// Releases escrowed funds to the developer, fixing the platform fee and
    /// net payout. Only the employer may release.
    pub async fn release(
        &self,
        engagement_id: Uuid,
        caller_id: Uuid,
    ) -> Result<Engagement, ServiceError> {
        let engagement = self.get_engagement(engagement_id).await?;

        if caller_id != engagement.employer_id {
            return Err(ServiceError::Forbidden(caller_id, engagement_id));
        }
        if !engagement
            .payment_status
            .can_transition_to(EngagementPaymentStatus::Released)
        {
            return Err(ServiceError::InvalidTransition {
                engagement_id,
                from: engagement.payment_status,
                to: EngagementPaymentStatus::Released,
            });
        }

        let fee = platform_fee(&engagement.amount);
        let net = net_payout(&engagement.amount, &fee);

        let released = match self
            .store
            .release_engagement(engagement_id, fee, net, Utc::now())
            .await?
        {
            Some(released) => released,
            None => {
                // someone else moved it first; report what it is now
                let current = self.get_engagement(engagement_id).await?;
                return Err(ServiceError::InvalidTransition {
                    engagement_id,
                    from: current.payment_status,
                    to: EngagementPaymentStatus::Released,
                });
            }
        };

        tracing::info!(
            engagement_id = %engagement_id,
            fee_amount = ?released.fee_amount,
            net_payout = ?released.net_payout,
            "escrow released"
        );
        self.notification_service.notify_payment_released(&released).await;

        Ok(released)
    }

    /// One rating per party per engagement, only after release.
    pub async fn rate(
        &self,
        engagement_id: Uuid,
        reviewer_id: Uuid,
        reviewee_id: Uuid,
        rating: i32,
        comment: String,
    ) -> Result<EngagementReview, ServiceError> {
        if !(MIN_RATING..=MAX_RATING).contains(&rating) {
            return Err(ServiceError::Validation(format!(
                "rating must be between {} and {}",
                MIN_RATING, MAX_RATING
            )));
        }
        if comment.chars().count() > MAX_COMMENT_LEN {
            return Err(ServiceError::Validation(format!(
                "comment must be at most {} characters",
                MAX_COMMENT_LEN
            )));
        }

        let engagement = self.get_engagement(engagement_id).await?;

        let counterparty = engagement
            .counterparty(reviewer_id)
            .ok_or(ServiceError::Forbidden(reviewer_id, engagement_id))?;
        if counterparty != reviewee_id {
            return Err(ServiceError::Validation(
                "reviewee must be the other party of the engagement".to_string(),
            ));
        }
        if engagement.payment_status != EngagementPaymentStatus::Released {
            return Err(ServiceError::InvalidState(format!(
                "engagement {} must be released before it can be rated",
                engagement_id
            )));
        }

        let review = self
            .store
            .insert_engagement_review(engagement_id, reviewer_id, reviewee_id, rating, comment)
            .await
            .map_err(|e| match e {
                StoreError::UniqueViolation { .. } => ServiceError::AlreadyRated {
                    engagement_id,
                    reviewer_id,
                },
                other => other.into(),
            })?;

        tracing::info!(engagement_id = %engagement_id, reviewer_id = %reviewer_id, rating, "engagement rated");
        self.notification_service.notify_review_received(&review).await;

        Ok(review)
    }

    pub async fn get_engagement(&self, engagement_id: Uuid) -> Result<Engagement, ServiceError> {
        self.store
            .get_engagement(engagement_id)
            .await?
            .ok_or(ServiceError::EngagementNotFound(engagement_id))
    }

    /// Reads restricted to the two parties.
    pub async fn get_for_party(
        &self,
        engagement_id: Uuid,
        caller_id: Uuid,
    ) -> Result<Engagement, ServiceError> {
        let engagement = self.get_engagement(engagement_id).await?;
        if !engagement.is_party(caller_id) {
            return Err(ServiceError::Forbidden(caller_id, engagement_id));
        }
        Ok(engagement)
    }

    pub async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Engagement>, ServiceError> {
        Ok(self.store.list_engagements_for_user(user_id).await?)
    }

    pub async fn list_reviews(
        &self,
        engagement_id: Uuid,
        caller_id: Uuid,
    ) -> Result<Vec<EngagementReview>, ServiceError> {
        self.get_for_party(engagement_id, caller_id).await?;
        Ok(self.store.list_engagement_reviews(engagement_id).await?)
    }
}
