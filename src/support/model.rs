//! Support ticket models

use serde::{Deserialize, Serialize};
use sqlx::types::chrono::{DateTime, Utc};
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq, Default)]
#[sqlx(type_name = "ticket_category", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TicketCategory {
    Payment,
    Order,
    Shipping,
    Account,
    Course,
    Workshop,
    Technical,
    #[default]
    Other,
}

#[derive(Debug, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq, Default)]
#[sqlx(type_name = "ticket_priority", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TicketPriority {
    Low,
    #[default]
    Medium,
    High,
    Urgent,
}

#[derive(Debug, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq)]
#[sqlx(type_name = "ticket_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
    Open,
    InProgress,
    WaitingCustomer,
    Resolved,
    Closed,
}

impl TicketStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TicketStatus::Open => "open",
            TicketStatus::InProgress => "in_progress",
            TicketStatus::WaitingCustomer => "waiting_customer",
            TicketStatus::Resolved => "resolved",
            TicketStatus::Closed => "closed",
        }
    }
}

impl fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone, PartialEq)]
pub struct TicketReply {
    pub id: Uuid,
    pub ticket_id: Uuid,
    pub author_id: Uuid,
    pub message: String,
    pub is_staff: bool,
    pub created_at: DateTime<Utc>,
}

/// `support_tickets` row; replies live in their own table
#[derive(Debug, sqlx::FromRow, Clone)]
pub struct SupportTicketRow {
    pub id: Uuid,
    pub ticket_number: String,
    pub user_id: Uuid,
    pub subject: String,
    pub description: String,
    pub category: TicketCategory,
    pub priority: TicketPriority,
    pub status: TicketStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SupportTicket {
    pub id: Uuid,
    pub ticket_number: String,
    pub user_id: Uuid,
    pub subject: String,
    pub description: String,
    pub category: TicketCategory,
    pub priority: TicketPriority,
    pub status: TicketStatus,
    /// Oldest first
    pub replies: Vec<TicketReply>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SupportTicket {
    pub fn from_row(row: SupportTicketRow, replies: Vec<TicketReply>) -> Self {
        Self {
            id: row.id,
            ticket_number: row.ticket_number,
            user_id: row.user_id,
            subject: row.subject,
            description: row.description,
            category: row.category,
            priority: row.priority,
            status: row.status,
            replies,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct CreateTicketRequest {
    pub subject: String,
    pub description: String,
    pub category: Option<TicketCategory>,
    pub priority: Option<TicketPriority>,
}

#[derive(Debug, Deserialize)]
pub struct ReplyRequest {
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct ChangeTicketStatusRequest {
    pub status: TicketStatus,
    pub note: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ListTicketsQuery {
    pub status: Option<TicketStatus>,
    pub priority: Option<TicketPriority>,
    pub page: Option<i32>,
    pub limit: Option<i32>,
}
