//! Order service layer - placement, lookup and status changes

use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use super::machine::OrderStatusMachine;
use super::model::{
    CreateOrderRequest, ListOrdersQuery, Order, OrderStatus, UpdateOrderStatusRequest,
};
use crate::auth::Role;
use crate::error::ApiError;
use crate::middleware::AuthenticatedUser;
use crate::models::{PaginatedResponse, PaginationParams};
use crate::websocket::{WorkflowEvent, WsState};
use crate::workflow::{record_transition, settle_lost_race, AuditEntry, Lifecycle, Step};

#[derive(Clone)]
pub struct OrderService {
    db_pool: PgPool,
    events: WsState,
}

impl OrderService {
    pub fn new(db_pool: PgPool, events: WsState) -> Self {
        Self { db_pool, events }
    }

    pub async fn place_order(
        &self,
        buyer: &AuthenticatedUser,
        request: CreateOrderRequest,
    ) -> Result<Order, ApiError> {
        let order = request.into_order(buyer.user_id, Utc::now())?;

        let mut tx = self.db_pool.begin().await?;
        let order = sqlx::query_as::<_, Order>(
            r#"
            INSERT INTO orders (
                id, order_number, buyer_id, studio_id, items, status, payment_status,
                shipping_address, tracking, tracking_history, subtotal, tax, discount, total,
                version, delivered_at, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18)
            RETURNING *
            "#,
        )
        .bind(order.id)
        .bind(&order.order_number)
        .bind(order.buyer_id)
        .bind(order.studio_id)
        .bind(&order.items)
        .bind(order.status)
        .bind(order.payment_status)
        .bind(&order.shipping_address)
        .bind(&order.tracking)
        .bind(&order.tracking_history)
        .bind(order.subtotal)
        .bind(order.tax)
        .bind(order.discount)
        .bind(order.total)
        .bind(order.version)
        .bind(order.delivered_at)
        .bind(order.created_at)
        .bind(order.updated_at)
        .fetch_one(&mut *tx)
        .await?;

        record_transition(
            &mut tx,
            AuditEntry {
                entity_type: OrderStatus::ENTITY,
                entity_id: order.id,
                from_status: None,
                to_status: order.status.as_str(),
                actor_id: Some(buyer.user_id),
                note: None,
            },
        )
        .await?;
        tx.commit().await?;

        tracing::info!(
            order_id = %order.id,
            order_number = %order.order_number,
            total = %order.total,
            "Order placed"
        );
        self.events.publish(WorkflowEvent::Created {
            entity: OrderStatus::ENTITY,
            entity_id: order.id,
            status: order.status.to_string(),
        });

        Ok(order)
    }

    /// Fetch an order visible to `actor`
    pub async fn get_order(&self, id: Uuid, actor: &AuthenticatedUser) -> Result<Order, ApiError> {
        let order = self.find(id).await?;
        if !can_view(&order, actor) {
            return Err(ApiError::Forbidden("Not a party to this order".to_string()));
        }
        Ok(order)
    }

    /// Buyers see their orders, studios their studio's, admins everything
    pub async fn list_orders(
        &self,
        query: ListOrdersQuery,
        actor: &AuthenticatedUser,
    ) -> Result<PaginatedResponse<Order>, ApiError> {
        let (buyer_id, studio_id) = match actor.role {
            Role::Admin => (query.buyer_id, query.studio_id),
            Role::Buyer => (Some(actor.user_id), query.studio_id),
            Role::Studio => {
                let studio = actor
                    .studio_id
                    .ok_or_else(|| ApiError::Forbidden("Studio account without a studio".to_string()))?;
                (query.buyer_id, Some(studio))
            }
        };
        let page = PaginationParams {
            page: query.page,
            limit: query.limit,
        };
        let (page_no, limit) = page.resolve();

        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM orders
            WHERE ($1::order_status IS NULL OR status = $1)
              AND ($2::uuid IS NULL OR buyer_id = $2)
              AND ($3::uuid IS NULL OR studio_id = $3)
            "#,
        )
        .bind(query.status)
        .bind(buyer_id)
        .bind(studio_id)
        .fetch_one(&self.db_pool)
        .await?;

        let orders = sqlx::query_as::<_, Order>(
            r#"
            SELECT * FROM orders
            WHERE ($1::order_status IS NULL OR status = $1)
              AND ($2::uuid IS NULL OR buyer_id = $2)
              AND ($3::uuid IS NULL OR studio_id = $3)
            ORDER BY created_at DESC
            LIMIT $4 OFFSET $5
            "#,
        )
        .bind(query.status)
        .bind(buyer_id)
        .bind(studio_id)
        .bind(limit as i64)
        .bind(page.offset())
        .fetch_all(&self.db_pool)
        .await?;

        Ok(PaginatedResponse {
            data: orders,
            total,
            page: page_no,
            limit,
        })
    }

    /// Move an order along its lifecycle.
    ///
    /// Only admins and the studio that sold the order may do this. The status
    /// change, the appended history entry and the audit row are written in one
    /// transaction, guarded by the status and version that were read.
    pub async fn update_status(
        &self,
        id: Uuid,
        change: UpdateOrderStatusRequest,
        actor: &AuthenticatedUser,
    ) -> Result<Order, ApiError> {
        let mut order = self.find(id).await?;
        if !(actor.is_admin() || actor.owns_studio(order.studio_id)) {
            return Err(ApiError::Forbidden(
                "Only the selling studio or an admin can update this order".to_string(),
            ));
        }

        let from = order.status;
        let read_version = order.version;
        if OrderStatusMachine::transition(&mut order, &change, Utc::now())? == Step::Unchanged {
            return Ok(order);
        }

        let mut tx = self.db_pool.begin().await?;
        let updated = sqlx::query_as::<_, Order>(
            r#"
            UPDATE orders
            SET status = $1, payment_status = $2, tracking = $3, tracking_history = $4,
                delivered_at = $5, updated_at = $6, version = version + 1
            WHERE id = $7 AND status = $8 AND version = $9
            RETURNING *
            "#,
        )
        .bind(order.status)
        .bind(order.payment_status)
        .bind(&order.tracking)
        .bind(&order.tracking_history)
        .bind(order.delivered_at)
        .bind(order.updated_at)
        .bind(id)
        .bind(from)
        .bind(read_version)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(updated) = updated else {
            tx.rollback().await?;
            // lost the race; fine if the winner made the same move
            let current = self.find(id).await?;
            settle_lost_race(current.status, change.status, id)?;
            return Ok(current);
        };

        let note = updated.tracking_history.last().map(|e| e.message.as_str());
        record_transition(
            &mut tx,
            AuditEntry {
                entity_type: OrderStatus::ENTITY,
                entity_id: id,
                from_status: Some(from.as_str()),
                to_status: updated.status.as_str(),
                actor_id: Some(actor.user_id),
                note,
            },
        )
        .await?;
        tx.commit().await?;

        tracing::info!(order_id = %id, from = %from, to = %updated.status, "Order status updated");
        self.events.publish(WorkflowEvent::status_changed(
            OrderStatus::ENTITY,
            id,
            from,
            updated.status,
        ));

        Ok(updated)
    }

    async fn find(&self, id: Uuid) -> Result<Order, ApiError> {
        sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.db_pool)
            .await?
            .ok_or_else(|| ApiError::NotFound(format!("Order {} not found", id)))
    }
}

fn can_view(order: &Order, actor: &AuthenticatedUser) -> bool {
    actor.is_admin() || order.buyer_id == actor.user_id || actor.owns_studio(order.studio_id)
}
