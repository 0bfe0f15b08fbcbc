//! Support ticket service layer

use chrono::Utc;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use super::model::{
    ChangeTicketStatusRequest, CreateTicketRequest, ListTicketsQuery, SupportTicket,
    SupportTicketRow, TicketReply, TicketStatus,
};
use super::workflow::SupportTicketWorkflow;
use crate::error::ApiError;
use crate::middleware::AuthenticatedUser;
use crate::models::{PaginatedResponse, PaginationParams};
use crate::websocket::{WorkflowEvent, WsState};
use crate::workflow::{record_transition, settle_lost_race, AuditEntry, Lifecycle, Step};

#[derive(Clone)]
pub struct SupportService {
    db_pool: PgPool,
    events: WsState,
}

impl SupportService {
    pub fn new(db_pool: PgPool, events: WsState) -> Self {
        Self { db_pool, events }
    }

    pub async fn create_ticket(
        &self,
        user: &AuthenticatedUser,
        request: CreateTicketRequest,
    ) -> Result<SupportTicket, ApiError> {
        let ticket = SupportTicketWorkflow::create(user.user_id, &request, Utc::now())?;

        let mut tx = self.db_pool.begin().await?;
        sqlx::query(
            r#"
            INSERT INTO support_tickets (
                id, ticket_number, user_id, subject, description, category, priority, status,
                created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(ticket.id)
        .bind(&ticket.ticket_number)
        .bind(ticket.user_id)
        .bind(&ticket.subject)
        .bind(&ticket.description)
        .bind(ticket.category)
        .bind(ticket.priority)
        .bind(ticket.status)
        .bind(ticket.created_at)
        .bind(ticket.updated_at)
        .execute(&mut *tx)
        .await?;

        record_transition(
            &mut tx,
            AuditEntry {
                entity_type: TicketStatus::ENTITY,
                entity_id: ticket.id,
                from_status: None,
                to_status: ticket.status.as_str(),
                actor_id: Some(user.user_id),
                note: None,
            },
        )
        .await?;
        tx.commit().await?;

        tracing::info!(
            ticket_id = %ticket.id,
            ticket_number = %ticket.ticket_number,
            category = ?ticket.category,
            priority = ?ticket.priority,
            "Support ticket opened"
        );
        self.events.publish(WorkflowEvent::Created {
            entity: TicketStatus::ENTITY,
            entity_id: ticket.id,
            status: ticket.status.to_string(),
        });

        Ok(ticket)
    }

    /// Ticket with its replies; owner or admin only
    pub async fn get_ticket(
        &self,
        id: Uuid,
        actor: &AuthenticatedUser,
    ) -> Result<SupportTicket, ApiError> {
        let mut conn = self.db_pool.acquire().await?;
        let ticket = load_ticket(&mut conn, id, false).await?;
        ensure_party(&ticket, actor)?;
        Ok(ticket)
    }

    /// Own tickets, or every ticket for admins
    pub async fn list_tickets(
        &self,
        query: ListTicketsQuery,
        actor: &AuthenticatedUser,
    ) -> Result<PaginatedResponse<SupportTicket>, ApiError> {
        let user_id = (!actor.is_admin()).then_some(actor.user_id);
        let page = PaginationParams {
            page: query.page,
            limit: query.limit,
        };
        let (page_no, limit) = page.resolve();

        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM support_tickets
            WHERE ($1::ticket_status IS NULL OR status = $1)
              AND ($2::ticket_priority IS NULL OR priority = $2)
              AND ($3::uuid IS NULL OR user_id = $3)
            "#,
        )
        .bind(query.status)
        .bind(query.priority)
        .bind(user_id)
        .fetch_one(&self.db_pool)
        .await?;

        let rows = sqlx::query_as::<_, SupportTicketRow>(
            r#"
            SELECT * FROM support_tickets
            WHERE ($1::ticket_status IS NULL OR status = $1)
              AND ($2::ticket_priority IS NULL OR priority = $2)
              AND ($3::uuid IS NULL OR user_id = $3)
            ORDER BY created_at DESC
            LIMIT $4 OFFSET $5
            "#,
        )
        .bind(query.status)
        .bind(query.priority)
        .bind(user_id)
        .bind(limit as i64)
        .bind(page.offset())
        .fetch_all(&self.db_pool)
        .await?;

        // list view carries no replies
        let data = rows
            .into_iter()
            .map(|row| SupportTicket::from_row(row, Vec::new()))
            .collect();

        Ok(PaginatedResponse {
            data,
            total,
            page: page_no,
            limit,
        })
    }

    /// Post a reply as the ticket owner or as staff.
    ///
    /// The ticket row is locked while the reply is written so a concurrent
    /// close cannot slip in between the check and the insert.
    pub async fn reply(
        &self,
        id: Uuid,
        message: &str,
        actor: &AuthenticatedUser,
    ) -> Result<TicketReply, ApiError> {
        let mut tx = self.db_pool.begin().await?;
        let mut ticket = load_ticket(&mut tx, id, true).await?;
        ensure_party(&ticket, actor)?;

        let is_staff = actor.is_admin();
        let reply =
            SupportTicketWorkflow::reply(&mut ticket, actor.user_id, message, is_staff, Utc::now())?;

        sqlx::query(
            r#"
            INSERT INTO ticket_replies (id, ticket_id, author_id, message, is_staff, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(reply.id)
        .bind(reply.ticket_id)
        .bind(reply.author_id)
        .bind(&reply.message)
        .bind(reply.is_staff)
        .bind(reply.created_at)
        .execute(&mut *tx)
        .await?;

        sqlx::query("UPDATE support_tickets SET updated_at = $1 WHERE id = $2")
            .bind(ticket.updated_at)
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        tracing::info!(ticket_id = %id, reply_id = %reply.id, is_staff, "Ticket reply posted");
        self.events.publish(WorkflowEvent::TicketReplied {
            entity_id: id,
            reply_id: reply.id,
            is_staff,
        });

        Ok(reply)
    }

    /// Staff-only status change
    pub async fn change_status(
        &self,
        id: Uuid,
        request: ChangeTicketStatusRequest,
        admin: &AuthenticatedUser,
    ) -> Result<SupportTicket, ApiError> {
        admin.require_admin()?;

        let mut conn = self.db_pool.acquire().await?;
        let mut ticket = load_ticket(&mut conn, id, false).await?;
        drop(conn);

        let from = ticket.status;
        if SupportTicketWorkflow::change_status(&mut ticket, request.status, Utc::now())?
            == Step::Unchanged
        {
            return Ok(ticket);
        }

        let mut tx = self.db_pool.begin().await?;
        let updated = sqlx::query(
            "UPDATE support_tickets SET status = $1, updated_at = $2 WHERE id = $3 AND status = $4",
        )
        .bind(ticket.status)
        .bind(ticket.updated_at)
        .bind(id)
        .bind(from)
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            tx.rollback().await?;
            let mut conn = self.db_pool.acquire().await?;
            let current = load_ticket(&mut conn, id, false).await?;
            settle_lost_race(current.status, request.status, id)?;
            return Ok(current);
        }

        let note = request.note.as_deref().map(str::trim).filter(|n| !n.is_empty());
        record_transition(
            &mut tx,
            AuditEntry {
                entity_type: TicketStatus::ENTITY,
                entity_id: id,
                from_status: Some(from.as_str()),
                to_status: ticket.status.as_str(),
                actor_id: Some(admin.user_id),
                note,
            },
        )
        .await?;
        tx.commit().await?;

        tracing::info!(ticket_id = %id, from = %from, to = %ticket.status, "Ticket status changed");
        self.events.publish(WorkflowEvent::status_changed(
            TicketStatus::ENTITY,
            id,
            from,
            ticket.status,
        ));

        Ok(ticket)
    }
}

async fn load_ticket(
    conn: &mut PgConnection,
    id: Uuid,
    for_update: bool,
) -> Result<SupportTicket, ApiError> {
    let sql = if for_update {
        "SELECT * FROM support_tickets WHERE id = $1 FOR UPDATE"
    } else {
        "SELECT * FROM support_tickets WHERE id = $1"
    };
    let row = sqlx::query_as::<_, SupportTicketRow>(sql)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Ticket {} not found", id)))?;

    let replies = sqlx::query_as::<_, TicketReply>(
        "SELECT * FROM ticket_replies WHERE ticket_id = $1 ORDER BY created_at ASC",
    )
    .bind(id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(SupportTicket::from_row(row, replies))
}

fn ensure_party(ticket: &SupportTicket, actor: &AuthenticatedUser) -> Result<(), ApiError> {
    if actor.is_admin() || ticket.user_id == actor.user_id {
        Ok(())
    } else {
        Err(ApiError::Forbidden("Not your ticket".to_string()))
    }
}
