//! Review service layer

use chrono::Utc;
use serde_json::json;
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use super::model::{CreateReviewRequest, ListReviewsQuery, Review, ReviewStatus};
use super::workflow::ReviewModerationWorkflow;
use crate::error::ApiError;
use crate::middleware::AuthenticatedUser;
use crate::models::{PaginatedResponse, PaginationParams};
use crate::order::ItemType;
use crate::websocket::{WorkflowEvent, WsState};
use crate::workflow::{record_transition, settle_lost_race, AuditEntry, Lifecycle, Step};

#[derive(Clone)]
pub struct ReviewService {
    db_pool: PgPool,
    events: WsState,
}

impl ReviewService {
    pub fn new(db_pool: PgPool, events: WsState) -> Self {
        Self { db_pool, events }
    }

    pub async fn create(
        &self,
        author: &AuthenticatedUser,
        request: CreateReviewRequest,
    ) -> Result<Review, ApiError> {
        request.validate()?;

        let verified = self
            .has_delivered_purchase(author.user_id, request.target_type, request.target_id)
            .await?;
        let review = ReviewModerationWorkflow::create(author.user_id, &request, verified, Utc::now())?;

        let mut tx = self.db_pool.begin().await?;
        let review = sqlx::query_as::<_, Review>(
            r#"
            INSERT INTO reviews (
                id, target_type, target_id, author_id, rating, title, comment, status,
                verified_purchase, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING *
            "#,
        )
        .bind(review.id)
        .bind(review.target_type)
        .bind(review.target_id)
        .bind(review.author_id)
        .bind(review.rating)
        .bind(&review.title)
        .bind(&review.comment)
        .bind(review.status)
        .bind(review.verified_purchase)
        .bind(review.created_at)
        .bind(review.updated_at)
        .fetch_one(&mut *tx)
        .await?;

        record_transition(
            &mut tx,
            AuditEntry {
                entity_type: ReviewStatus::ENTITY,
                entity_id: review.id,
                from_status: None,
                to_status: review.status.as_str(),
                actor_id: Some(author.user_id),
                note: None,
            },
        )
        .await?;
        tx.commit().await?;

        tracing::info!(
            review_id = %review.id,
            target_id = %review.target_id,
            rating = review.rating,
            verified_purchase = review.verified_purchase,
            "Review submitted"
        );
        self.events.publish(WorkflowEvent::Created {
            entity: ReviewStatus::ENTITY,
            entity_id: review.id,
            status: review.status.to_string(),
        });

        Ok(review)
    }

    /// Public listing shows approved reviews only; admins may filter by any status
    pub async fn list(
        &self,
        query: ListReviewsQuery,
        viewer_is_admin: bool,
    ) -> Result<PaginatedResponse<Review>, ApiError> {
        let status = if viewer_is_admin {
            query.status
        } else {
            Some(ReviewStatus::Approved)
        };
        let page = PaginationParams {
            page: query.page,
            limit: query.limit,
        };
        let (page_no, limit) = page.resolve();

        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM reviews
            WHERE ($1::review_status IS NULL OR status = $1)
              AND ($2::item_type IS NULL OR target_type = $2)
              AND ($3::uuid IS NULL OR target_id = $3)
            "#,
        )
        .bind(status)
        .bind(query.target_type)
        .bind(query.target_id)
        .fetch_one(&self.db_pool)
        .await?;

        let data = sqlx::query_as::<_, Review>(
            r#"
            SELECT * FROM reviews
            WHERE ($1::review_status IS NULL OR status = $1)
              AND ($2::item_type IS NULL OR target_type = $2)
              AND ($3::uuid IS NULL OR target_id = $3)
            ORDER BY created_at DESC
            LIMIT $4 OFFSET $5
            "#,
        )
        .bind(status)
        .bind(query.target_type)
        .bind(query.target_id)
        .bind(limit as i64)
        .bind(page.offset())
        .fetch_all(&self.db_pool)
        .await?;

        Ok(PaginatedResponse {
            data,
            total,
            page: page_no,
            limit,
        })
    }

    pub async fn moderate(
        &self,
        id: Uuid,
        status: ReviewStatus,
        admin: &AuthenticatedUser,
    ) -> Result<Review, ApiError> {
        admin.require_admin()?;

        let mut review = self.find(id).await?;
        let from = review.status;
        if ReviewModerationWorkflow::moderate(&mut review, status, admin.user_id, Utc::now())?
            == Step::Unchanged
        {
            return Ok(review);
        }

        let mut tx = self.db_pool.begin().await?;
        let updated = sqlx::query_as::<_, Review>(
            r#"
            UPDATE reviews
            SET status = $1, moderated_by = $2, moderated_at = $3, updated_at = $4
            WHERE id = $5 AND status = $6
            RETURNING *
            "#,
        )
        .bind(review.status)
        .bind(review.moderated_by)
        .bind(review.moderated_at)
        .bind(review.updated_at)
        .bind(id)
        .bind(from)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(updated) = updated else {
            tx.rollback().await?;
            let current = self.find(id).await?;
            settle_lost_race(current.status, status, id)?;
            return Ok(current);
        };

        record_transition(
            &mut tx,
            AuditEntry {
                entity_type: ReviewStatus::ENTITY,
                entity_id: id,
                from_status: Some(from.as_str()),
                to_status: updated.status.as_str(),
                actor_id: Some(admin.user_id),
                note: None,
            },
        )
        .await?;
        tx.commit().await?;

        tracing::info!(review_id = %id, from = %from, to = %updated.status, "Review moderated");
        self.events.publish(WorkflowEvent::status_changed(
            ReviewStatus::ENTITY,
            id,
            from,
            updated.status,
        ));

        Ok(updated)
    }

    /// Remove a review outright; the audit trail keeps a `deleted` entry
    pub async fn delete(&self, id: Uuid, admin: &AuthenticatedUser) -> Result<(), ApiError> {
        admin.require_admin()?;

        let mut tx = self.db_pool.begin().await?;
        let deleted: Option<ReviewStatus> =
            sqlx::query_scalar("DELETE FROM reviews WHERE id = $1 RETURNING status")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;
        let Some(last_status) = deleted else {
            return Err(ApiError::NotFound(format!("Review {} not found", id)));
        };

        record_transition(
            &mut tx,
            AuditEntry {
                entity_type: ReviewStatus::ENTITY,
                entity_id: id,
                from_status: Some(last_status.as_str()),
                to_status: "deleted",
                actor_id: Some(admin.user_id),
                note: None,
            },
        )
        .await?;
        tx.commit().await?;

        tracing::info!(review_id = %id, "Review deleted");
        Ok(())
    }

    async fn has_delivered_purchase(
        &self,
        buyer_id: Uuid,
        target_type: ItemType,
        target_id: Uuid,
    ) -> Result<bool, ApiError> {
        let needle = Json(json!([{ "item_type": target_type, "reference_id": target_id }]));
        let found: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM orders
                WHERE buyer_id = $1 AND status = 'delivered' AND items @> $2
            )
            "#,
        )
        .bind(buyer_id)
        .bind(needle)
        .fetch_one(&self.db_pool)
        .await?;
        Ok(found)
    }

    async fn find(&self, id: Uuid) -> Result<Review, ApiError> {
        sqlx::query_as::<_, Review>("SELECT * FROM reviews WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.db_pool)
            .await?
            .ok_or_else(|| ApiError::NotFound(format!("Review {} not found", id)))
    }
}
