//! KYC models

use serde::{Deserialize, Serialize};
use sqlx::types::chrono::{DateTime, Utc};
use sqlx::types::Json;
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq)]
#[sqlx(type_name = "kyc_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum KycStatus {
    Pending,
    Approved,
    Rejected,
}

impl KycStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            KycStatus::Pending => "pending",
            KycStatus::Approved => "approved",
            KycStatus::Rejected => "rejected",
        }
    }
}

impl fmt::Display for KycStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum KycDocumentType {
    IdCard,
    Passport,
    DriversLicense,
    ProofOfAddress,
    BusinessRegistration,
    TaxCertificate,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct KycDocument {
    pub doc_type: KycDocumentType,
    pub url: String,
    pub verified: bool,
}

/// One verification record per user
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
pub struct KycRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub status: KycStatus,
    pub documents: Json<Vec<KycDocument>>,
    pub submitted_at: DateTime<Utc>,
    pub verified_at: Option<DateTime<Utc>>,
    pub rejection_reason: Option<String>,
    pub decided_by: Option<Uuid>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct NewKycDocument {
    pub doc_type: KycDocumentType,
    pub url: String,
}

/// Request DTO for POST /api/kyc
#[derive(Debug, Deserialize, Clone)]
pub struct SubmitKycRequest {
    pub documents: Vec<NewKycDocument>,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum KycAction {
    Approve,
    Reject,
}

/// Request DTO for POST /api/kyc/:user_id/decision
#[derive(Debug, Deserialize, Clone)]
pub struct KycDecisionRequest {
    pub action: KycAction,
    pub reason: Option<String>,
}

impl KycDecisionRequest {
    pub fn target_status(&self) -> KycStatus {
        match self.action {
            KycAction::Approve => KycStatus::Approved,
            KycAction::Reject => KycStatus::Rejected,
        }
    }
}
