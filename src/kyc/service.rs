//! KYC service layer

use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use super::model::{KycDecisionRequest, KycRecord, KycStatus, SubmitKycRequest};
use super::workflow::KycVerificationWorkflow;
use crate::auth::Role;
use crate::error::ApiError;
use crate::middleware::AuthenticatedUser;
use crate::websocket::{WorkflowEvent, WsState};
use crate::workflow::{record_transition, AuditEntry, Lifecycle, WorkflowError};

#[derive(Clone)]
pub struct KycService {
    db_pool: PgPool,
    events: WsState,
}

impl KycService {
    pub fn new(db_pool: PgPool, events: WsState) -> Self {
        Self { db_pool, events }
    }

    /// Studio onboarding: one submission per user
    pub async fn submit(
        &self,
        user: &AuthenticatedUser,
        request: SubmitKycRequest,
    ) -> Result<KycRecord, ApiError> {
        if user.role != Role::Studio {
            return Err(ApiError::Forbidden(
                "Only studio accounts go through verification".to_string(),
            ));
        }
        if let Some(existing) = self.find(user.user_id).await? {
            return Err(already_submitted(&existing));
        }

        let record = KycVerificationWorkflow::submit(user.user_id, &request, Utc::now())?;

        let mut tx = self.db_pool.begin().await?;
        let inserted = sqlx::query_as::<_, KycRecord>(
            r#"
            INSERT INTO kyc_records (id, user_id, status, documents, submitted_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(record.id)
        .bind(record.user_id)
        .bind(record.status)
        .bind(&record.documents)
        .bind(record.submitted_at)
        .bind(record.updated_at)
        .fetch_one(&mut *tx)
        .await;

        let record = match inserted {
            Ok(record) => record,
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                return Err(ApiError::Conflict(
                    "Verification already submitted".to_string(),
                ));
            }
            Err(e) => return Err(e.into()),
        };

        record_transition(
            &mut tx,
            AuditEntry {
                entity_type: KycStatus::ENTITY,
                entity_id: record.id,
                from_status: None,
                to_status: record.status.as_str(),
                actor_id: Some(user.user_id),
                note: None,
            },
        )
        .await?;
        tx.commit().await?;

        tracing::info!(
            user_id = %record.user_id,
            documents = record.documents.len(),
            "KYC documents submitted"
        );
        self.events.publish(WorkflowEvent::Created {
            entity: KycStatus::ENTITY,
            entity_id: record.id,
            status: record.status.to_string(),
        });

        Ok(record)
    }

    /// The subject or an admin may read a record
    pub async fn get(&self, user_id: Uuid, actor: &AuthenticatedUser) -> Result<KycRecord, ApiError> {
        if !(actor.is_admin() || actor.user_id == user_id) {
            return Err(ApiError::Forbidden(
                "Cannot view another user's verification".to_string(),
            ));
        }
        self.find(user_id)
            .await?
            .ok_or_else(|| ApiError::NotFound(format!("No verification for user {}", user_id)))
    }

    pub async fn decide(
        &self,
        user_id: Uuid,
        decision: KycDecisionRequest,
        admin: &AuthenticatedUser,
    ) -> Result<KycRecord, ApiError> {
        admin.require_admin()?;

        let mut record = self
            .find(user_id)
            .await?
            .ok_or_else(|| ApiError::NotFound(format!("No verification for user {}", user_id)))?;
        let from = record.status;
        KycVerificationWorkflow::decide(&mut record, &decision, admin.user_id, Utc::now())?;

        let mut tx = self.db_pool.begin().await?;
        let updated = sqlx::query_as::<_, KycRecord>(
            r#"
            UPDATE kyc_records
            SET status = $1, documents = $2, verified_at = $3, rejection_reason = $4,
                decided_by = $5, updated_at = $6
            WHERE user_id = $7 AND status = $8
            RETURNING *
            "#,
        )
        .bind(record.status)
        .bind(&record.documents)
        .bind(record.verified_at)
        .bind(&record.rejection_reason)
        .bind(record.decided_by)
        .bind(record.updated_at)
        .bind(user_id)
        .bind(from)
        .fetch_optional(&mut *tx)
        .await?;

        // a concurrent decision got there first
        let Some(updated) = updated else {
            tx.rollback().await?;
            return Err(WorkflowError::AlreadyDecided(format!(
                "verification for user {} was decided concurrently",
                user_id
            ))
            .into());
        };

        record_transition(
            &mut tx,
            AuditEntry {
                entity_type: KycStatus::ENTITY,
                entity_id: updated.id,
                from_status: Some(from.as_str()),
                to_status: updated.status.as_str(),
                actor_id: Some(admin.user_id),
                note: updated.rejection_reason.as_deref(),
            },
        )
        .await?;
        tx.commit().await?;

        tracing::info!(user_id = %user_id, decision = %updated.status, "KYC decided");
        self.events.publish(WorkflowEvent::status_changed(
            KycStatus::ENTITY,
            updated.id,
            from,
            updated.status,
        ));

        Ok(updated)
    }

    async fn find(&self, user_id: Uuid) -> Result<Option<KycRecord>, ApiError> {
        Ok(
            sqlx::query_as::<_, KycRecord>("SELECT * FROM kyc_records WHERE user_id = $1")
                .bind(user_id)
                .fetch_optional(&self.db_pool)
                .await?,
        )
    }
}

fn already_submitted(existing: &KycRecord) -> ApiError {
    if existing.status.is_terminal() {
        WorkflowError::AlreadyDecided(format!("verification is already {}", existing.status)).into()
    } else {
        ApiError::Conflict("Verification is already pending review".to_string())
    }
}
