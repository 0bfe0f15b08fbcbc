//! Return request service layer

use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use super::model::{
    DecideReturnRequest, ListReturnsQuery, ReturnRequest, ReturnStatus, SubmitReturnRequest,
};
use super::workflow::ReturnRequestWorkflow;
use crate::error::ApiError;
use crate::middleware::AuthenticatedUser;
use crate::models::{PaginatedResponse, PaginationParams};
use crate::order::Order;
use crate::websocket::{WorkflowEvent, WsState};
use crate::workflow::{record_transition, settle_lost_race, AuditEntry, Lifecycle, Step, WorkflowError};

#[derive(Clone)]
pub struct ReturnService {
    db_pool: PgPool,
    events: WsState,
}

impl ReturnService {
    pub fn new(db_pool: PgPool, events: WsState) -> Self {
        Self { db_pool, events }
    }

    pub async fn submit(
        &self,
        buyer: &AuthenticatedUser,
        request: SubmitReturnRequest,
    ) -> Result<ReturnRequest, ApiError> {
        let order = sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE id = $1 AND buyer_id = $2")
            .bind(request.order_id)
            .bind(buyer.user_id)
            .fetch_optional(&self.db_pool)
            .await?;

        let existing = sqlx::query_as::<_, ReturnRequest>(
            "SELECT * FROM return_requests WHERE order_id = $1 AND item_id = $2",
        )
        .bind(request.order_id)
        .bind(request.item_id)
        .fetch_all(&self.db_pool)
        .await?;

        let draft = ReturnRequestWorkflow::submit(
            order.as_ref(),
            &existing,
            buyer.user_id,
            &request,
            Utc::now(),
        )?;

        let mut tx = self.db_pool.begin().await?;
        let inserted = sqlx::query_as::<_, ReturnRequest>(
            r#"
            INSERT INTO return_requests (
                id, order_id, item_id, buyer_id, request_type, reason, description, evidence,
                status, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING *
            "#,
        )
        .bind(draft.id)
        .bind(draft.order_id)
        .bind(draft.item_id)
        .bind(draft.buyer_id)
        .bind(draft.request_type)
        .bind(draft.reason)
        .bind(&draft.description)
        .bind(&draft.evidence)
        .bind(draft.status)
        .bind(draft.created_at)
        .bind(draft.updated_at)
        .fetch_one(&mut *tx)
        .await;

        let created = match inserted {
            Ok(created) => created,
            // another open claim for the item slipped in after our read
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                return Err(WorkflowError::NotEligible(
                    "a return request for this item is already open".to_string(),
                )
                .into());
            }
            Err(e) => return Err(e.into()),
        };

        record_transition(
            &mut tx,
            AuditEntry {
                entity_type: ReturnStatus::ENTITY,
                entity_id: created.id,
                from_status: None,
                to_status: created.status.as_str(),
                actor_id: Some(buyer.user_id),
                note: None,
            },
        )
        .await?;
        tx.commit().await?;

        tracing::info!(
            return_id = %created.id,
            order_id = %created.order_id,
            item_id = %created.item_id,
            reason = ?created.reason,
            "Return request submitted"
        );
        self.events.publish(WorkflowEvent::Created {
            entity: ReturnStatus::ENTITY,
            entity_id: created.id,
            status: created.status.to_string(),
        });

        Ok(created)
    }

    /// Admin decision on a pending request
    pub async fn decide(
        &self,
        id: Uuid,
        decision: DecideReturnRequest,
        admin: &AuthenticatedUser,
    ) -> Result<ReturnRequest, ApiError> {
        admin.require_admin()?;

        let mut request = self.find(id).await?;
        let from = request.status;
        if ReturnRequestWorkflow::decide(&mut request, &decision, admin.user_id, Utc::now())?
            == Step::Unchanged
        {
            return Ok(request);
        }

        let mut tx = self.db_pool.begin().await?;
        let updated = sqlx::query_as::<_, ReturnRequest>(
            r#"
            UPDATE return_requests
            SET status = $1, admin_note = $2, decided_by = $3, decided_at = $4, updated_at = $5
            WHERE id = $6 AND status = $7
            RETURNING *
            "#,
        )
        .bind(request.status)
        .bind(&request.admin_note)
        .bind(request.decided_by)
        .bind(request.decided_at)
        .bind(request.updated_at)
        .bind(id)
        .bind(from)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(updated) = updated else {
            tx.rollback().await?;
            let current = self.find(id).await?;
            settle_lost_race(current.status, decision.status, id)?;
            return Ok(current);
        };

        record_transition(
            &mut tx,
            AuditEntry {
                entity_type: ReturnStatus::ENTITY,
                entity_id: id,
                from_status: Some(from.as_str()),
                to_status: updated.status.as_str(),
                actor_id: Some(admin.user_id),
                note: updated.admin_note.as_deref(),
            },
        )
        .await?;
        tx.commit().await?;

        tracing::info!(return_id = %id, decision = %updated.status, "Return request decided");
        self.events.publish(WorkflowEvent::status_changed(
            ReturnStatus::ENTITY,
            id,
            from,
            updated.status,
        ));

        Ok(updated)
    }

    pub async fn get(&self, id: Uuid, actor: &AuthenticatedUser) -> Result<ReturnRequest, ApiError> {
        let request = self.find(id).await?;
        if !(actor.is_admin() || request.buyer_id == actor.user_id) {
            return Err(ApiError::Forbidden("Not your return request".to_string()));
        }
        Ok(request)
    }

    /// Buyers see their own requests, admins see all
    pub async fn list(
        &self,
        query: ListReturnsQuery,
        actor: &AuthenticatedUser,
    ) -> Result<PaginatedResponse<ReturnRequest>, ApiError> {
        let buyer_id = (!actor.is_admin()).then_some(actor.user_id);
        let page = PaginationParams {
            page: query.page,
            limit: query.limit,
        };
        let (page_no, limit) = page.resolve();

        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM return_requests
            WHERE ($1::return_status IS NULL OR status = $1)
              AND ($2::uuid IS NULL OR buyer_id = $2)
            "#,
        )
        .bind(query.status)
        .bind(buyer_id)
        .fetch_one(&self.db_pool)
        .await?;

        let data = sqlx::query_as::<_, ReturnRequest>(
            r#"
            SELECT * FROM return_requests
            WHERE ($1::return_status IS NULL OR status = $1)
              AND ($2::uuid IS NULL OR buyer_id = $2)
            ORDER BY created_at DESC
            LIMIT $3 OFFSET $4
            "#,
        )
        .bind(query.status)
        .bind(buyer_id)
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

    async fn find(&self, id: Uuid) -> Result<ReturnRequest, ApiError> {
        sqlx::query_as::<_, ReturnRequest>("SELECT * FROM return_requests WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.db_pool)
            .await?
            .ok_or_else(|| ApiError::NotFound(format!("Return request {} not found", id)))
    }
}
