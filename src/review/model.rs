//! Review models

use serde::{Deserialize, Serialize};
use sqlx::types::chrono::{DateTime, Utc};
use std::fmt;
use uuid::Uuid;
use validator::Validate;

use crate::order::ItemType;

#[derive(Debug, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq)]
#[sqlx(type_name = "review_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ReviewStatus {
    Pending,
    Approved,
    Rejected,
    Flagged,
}

impl ReviewStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReviewStatus::Pending => "pending",
            ReviewStatus::Approved => "approved",
            ReviewStatus::Rejected => "rejected",
            ReviewStatus::Flagged => "flagged",
        }
    }
}

impl fmt::Display for ReviewStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
pub struct Review {
    pub id: Uuid,
    /// Products, courses and workshops can all be reviewed
    pub target_type: ItemType,
    pub target_id: Uuid,
    pub author_id: Uuid,
    pub rating: i16,
    pub title: Option<String>,
    pub comment: String,
    pub status: ReviewStatus,
    /// Author has a delivered order containing the target
    pub verified_purchase: bool,
    pub moderated_by: Option<Uuid>,
    pub moderated_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateReviewRequest {
    pub target_type: ItemType,
    pub target_id: Uuid,
    #[validate(range(min = 1, max = 5))]
    pub rating: i16,
    #[validate(length(max = 120))]
    pub title: Option<String>,
    #[validate(length(min = 1, max = 5000))]
    pub comment: String,
}

#[derive(Debug, Deserialize)]
pub struct ModerateReviewRequest {
    pub status: ReviewStatus,
}

#[derive(Debug, Deserialize)]
pub struct ListReviewsQuery {
    pub target_type: Option<ItemType>,
    pub target_id: Option<Uuid>,
    /// Honoured for admins only; everyone else sees approved reviews
    pub status: Option<ReviewStatus>,
    pub page: Option<i32>,
    pub limit: Option<i32>,
}
