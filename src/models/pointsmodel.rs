use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct EarnedBadge {
    pub slug: String,
    pub earned_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone, PartialEq)]
pub struct PointsProfile {
    pub id: Uuid,
    pub user_id: Uuid,
    pub total_points: i32,
    pub badges_earned: Json<Vec<EarnedBadge>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PointsProfile {
    pub fn has_badge(&self, slug: &str) -> bool {
        self.badges_earned.iter().any(|badge| badge.slug == slug)
    }
}

#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq)]
pub struct BadgeDefinition {
    pub slug: &'static str,
    pub name: &'static str,
    pub points: i32,
}

pub const BADGE_CATALOG: &[BadgeDefinition] = &[
    BadgeDefinition { slug: "first_application", name: "First Application", points: 50 },
    BadgeDefinition { slug: "first_hire", name: "First Hire", points: 50 },
    BadgeDefinition { slug: "first_payout", name: "First Payout", points: 100 },
    BadgeDefinition { slug: "first_invoice", name: "First Invoice", points: 25 },
    BadgeDefinition { slug: "five_star", name: "Five Star Review", points: 75 },
];

pub fn find_badge(slug: &str) -> Option<&'static BadgeDefinition> {
    BADGE_CATALOG.iter().find(|badge| badge.slug == slug)
}
