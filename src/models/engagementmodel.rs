use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::BigDecimal;
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "engagement_payment_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum EngagementPaymentStatus {
    Unfunded,
    Funded,
    Released,
}

impl EngagementPaymentStatus {
    /// Payment status only moves forward, one step at a time.
    pub fn can_transition_to(&self, to: EngagementPaymentStatus) -> bool {
        matches!(
            (self, to),
            (EngagementPaymentStatus::Unfunded, EngagementPaymentStatus::Funded)
                | (EngagementPaymentStatus::Funded, EngagementPaymentStatus::Released)
        )
    }
}

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone, PartialEq)]
pub struct Engagement {
    pub id: Uuid,
    pub job_id: Uuid,
    pub employer_id: Uuid,
    pub developer_id: Uuid,
    pub payment_status: EngagementPaymentStatus,
    pub amount: BigDecimal,
    pub fee_amount: Option<BigDecimal>,  // set once, on release
    pub net_payout: Option<BigDecimal>,  // set once, on release
    pub created_at: DateTime<Utc>,
    pub funded_at: Option<DateTime<Utc>>,
    pub released_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl Engagement {
    pub fn is_party(&self, user_id: Uuid) -> bool {
        user_id == self.employer_id || user_id == self.developer_id
    }

    /// The other side of the engagement, if `user_id` is one of the two parties.
    pub fn counterparty(&self, user_id: Uuid) -> Option<Uuid> {
        if user_id == self.employer_id {
            Some(self.developer_id)
        } else if user_id == self.developer_id {
            Some(self.employer_id)
        } else {
            None
        }
    }
}

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone, PartialEq)]
pub struct EngagementReview {
    pub id: Uuid,
    pub engagement_id: Uuid,
    pub reviewer_id: Uuid,
    pub reviewee_id: Uuid,
    pub rating: i32,
    pub comment: String,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use EngagementPaymentStatus::*;

    #[test]
    fn test_transitions_are_forward_only() {
        assert!(Unfunded.can_transition_to(Funded));
        assert!(Funded.can_transition_to(Released));

        assert!(!Unfunded.can_transition_to(Released));
        assert!(!Released.can_transition_to(Released));
        assert!(!Released.can_transition_to(Funded));
        assert!(!Funded.can_transition_to(Unfunded));
        assert!(!Funded.can_transition_to(Funded));
    }
}
