//! KYC verification rules
//!
//! A studio submits documents once; an admin approves or rejects the pending
//! record and that decision is final.

use sqlx::types::chrono::{DateTime, Utc};
use sqlx::types::Json;
use uuid::Uuid;

use super::model::{KycAction, KycDecisionRequest, KycDocument, KycRecord, KycStatus, SubmitKycRequest};
use crate::workflow::{require_text, Lifecycle, WorkflowError};

impl Lifecycle for KycStatus {
    const ENTITY: &'static str = "kyc";

    fn allows(self, next: Self) -> bool {
        matches!(
            (self, next),
            (KycStatus::Pending, KycStatus::Approved | KycStatus::Rejected)
        )
    }

    fn is_terminal(self) -> bool {
        !matches!(self, KycStatus::Pending)
    }
}

pub struct KycVerificationWorkflow;

impl KycVerificationWorkflow {
    pub fn submit(
        user_id: Uuid,
        request: &SubmitKycRequest,
        now: DateTime<Utc>,
    ) -> Result<KycRecord, WorkflowError> {
        if request.documents.is_empty() {
            return Err(WorkflowError::Validation(
                "at least one document is required".to_string(),
            ));
        }
        let documents = request
            .documents
            .iter()
            .map(|d| {
                Ok(KycDocument {
                    doc_type: d.doc_type,
                    url: require_text("document url", &d.url)?,
                    verified: false,
                })
            })
            .collect::<Result<Vec<_>, WorkflowError>>()?;

        Ok(KycRecord {
            id: Uuid::new_v4(),
            user_id,
            status: KycStatus::Pending,
            documents: Json(documents),
            submitted_at: now,
            verified_at: None,
            rejection_reason: None,
            decided_by: None,
            updated_at: now,
        })
    }

    /// Apply an admin decision to a pending record.
    ///
    /// Unlike the other workflows, repeating a decision is not a no-op: any
    /// decision on a decided record fails with `AlreadyDecided`.
    pub fn decide(
        record: &mut KycRecord,
        decision: &KycDecisionRequest,
        admin_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<(), WorkflowError> {
        let target = match decision.action {
            KycAction::Approve => KycStatus::Approved,
            KycAction::Reject => KycStatus::Rejected,
        };
        if !record.status.allows(target) {
            return Err(WorkflowError::AlreadyDecided(format!(
                "verification for user {} is already {}",
                record.user_id, record.status
            )));
        }

        match decision.action {
            KycAction::Approve => {
                record.status = KycStatus::Approved;
                record.verified_at = Some(now);
                record.rejection_reason = None;
                for doc in record.documents.iter_mut() {
                    doc.verified = true;
                }
            }
            KycAction::Reject => {
                let reason = decision
                    .reason
                    .as_deref()
                    .map(str::trim)
                    .filter(|r| !r.is_empty())
                    .ok_or(WorkflowError::ReasonRequired)?;
                record.status = KycStatus::Rejected;
                record.rejection_reason = Some(reason.to_string());
            }
        }
        record.decided_by = Some(admin_id);
        record.updated_at = now;
        Ok(())
    }
}
