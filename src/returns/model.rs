//! Return request models

use serde::{Deserialize, Serialize};
use sqlx::types::chrono::{DateTime, Utc};
use sqlx::types::Json;
use std::fmt;
use uuid::Uuid;

/// Most evidence files a buyer may attach
pub const MAX_EVIDENCE: usize = 5;

#[derive(Debug, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq)]
#[sqlx(type_name = "return_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ReturnType {
    Return,
    Refund,
}

#[derive(Debug, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq)]
#[sqlx(type_name = "return_reason", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ReturnReason {
    Damaged,
    Defective,
    WrongItem,
    NotAsDescribed,
    MissingParts,
    ChangedMind,
    Other,
}

#[derive(Debug, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq)]
#[sqlx(type_name = "return_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ReturnStatus {
    Pending,
    Approved,
    Rejected,
}

impl ReturnStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReturnStatus::Pending => "pending",
            ReturnStatus::Approved => "approved",
            ReturnStatus::Rejected => "rejected",
        }
    }
}

impl fmt::Display for ReturnStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EvidenceKind {
    Image,
    Video,
}

/// Photo or video backing a return claim
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Evidence {
    pub kind: EvidenceKind,
    pub url: String,
}

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
pub struct ReturnRequest {
    pub id: Uuid,
    pub order_id: Uuid,
    pub item_id: Uuid,
    pub buyer_id: Uuid,
    pub request_type: ReturnType,
    pub reason: ReturnReason,
    pub description: String,
    pub evidence: Json<Vec<Evidence>>,
    pub status: ReturnStatus,
    pub admin_note: Option<String>,
    pub decided_by: Option<Uuid>,
    pub decided_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ReturnRequest {
    /// Whether this request still blocks a new one for the same item
    pub fn is_open_claim(&self) -> bool {
        self.status != ReturnStatus::Rejected
    }
}

/// Request DTO for POST /api/returns
#[derive(Debug, Deserialize, Clone)]
pub struct SubmitReturnRequest {
    pub order_id: Uuid,
    pub item_id: Uuid,
    pub request_type: ReturnType,
    pub reason: ReturnReason,
    pub description: String,
    #[serde(default)]
    pub evidence: Vec<Evidence>,
}

/// Request DTO for PATCH /api/returns/:id
#[derive(Debug, Deserialize, Clone)]
pub struct DecideReturnRequest {
    pub status: ReturnStatus,
    pub note: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ListReturnsQuery {
    pub status: Option<ReturnStatus>,
    pub page: Option<i32>,
    pub limit: Option<i32>,
}
