//! Review moderation rules
//!
//! Reviews start pending. Moderators may move a review between approved,
//! rejected and flagged in any order but never back to pending.

use sqlx::types::chrono::{DateTime, Utc};
use uuid::Uuid;

use super::model::{CreateReviewRequest, Review, ReviewStatus};
use crate::workflow::{plan_transition, require_text, Lifecycle, Step, WorkflowError};

impl Lifecycle for ReviewStatus {
    const ENTITY: &'static str = "review";

    fn allows(self, next: Self) -> bool {
        next != ReviewStatus::Pending
    }

    fn is_terminal(self) -> bool {
        false
    }
}

pub struct ReviewModerationWorkflow;

impl ReviewModerationWorkflow {
    pub fn create(
        author_id: Uuid,
        request: &CreateReviewRequest,
        verified_purchase: bool,
        now: DateTime<Utc>,
    ) -> Result<Review, WorkflowError> {
        if !(1..=5).contains(&request.rating) {
            return Err(WorkflowError::Validation(
                "rating must be between 1 and 5".to_string(),
            ));
        }
        let comment = require_text("comment", &request.comment)?;
        let title = request
            .title
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string);

        Ok(Review {
            id: Uuid::new_v4(),
            target_type: request.target_type,
            target_id: request.target_id,
            author_id,
            rating: request.rating,
            title,
            comment,
            status: ReviewStatus::Pending,
            verified_purchase,
            moderated_by: None,
            moderated_at: None,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn moderate(
        review: &mut Review,
        status: ReviewStatus,
        moderator_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Step, WorkflowError> {
        let step = plan_transition(review.status, status)?;
        if step == Step::Advance {
            review.status = status;
            review.moderated_by = Some(moderator_id);
            review.moderated_at = Some(now);
            review.updated_at = now;
        }
        Ok(step)
    }
}
