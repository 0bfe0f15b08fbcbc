//! Audit trail of applied status transitions
//!
//! Rows are written on the same connection (normally an open transaction) as
//! the status change they describe, so a transition and its audit row commit
//! or roll back together.

use serde::{Deserialize, Serialize};
use sqlx::types::chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

/// Persisted audit row
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, Clone)]
pub struct AuditLog {
    pub id: Uuid,
    pub entity_type: String,
    pub entity_id: Uuid,
    pub from_status: Option<String>,
    pub to_status: String,
    pub actor_id: Option<Uuid>,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A transition about to be recorded. `from_status` is `None` on creation.
#[derive(Debug, Clone, Copy)]
pub struct AuditEntry<'a> {
    pub entity_type: &'static str,
    pub entity_id: Uuid,
    pub from_status: Option<&'a str>,
    pub to_status: &'a str,
    pub actor_id: Option<Uuid>,
    pub note: Option<&'a str>,
}

pub async fn record_transition(
    conn: &mut PgConnection,
    entry: AuditEntry<'_>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO audit_logs (id, entity_type, entity_id, from_status, to_status, actor_id, note, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, NOW())
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(entry.entity_type)
    .bind(entry.entity_id)
    .bind(entry.from_status)
    .bind(entry.to_status)
    .bind(entry.actor_id)
    .bind(entry.note)
    .execute(conn)
    .await?;

    tracing::info!(
        entity = entry.entity_type,
        entity_id = %entry.entity_id,
        from = ?entry.from_status,
        to = entry.to_status,
        actor = ?entry.actor_id,
        "Status transition recorded"
    );

    Ok(())
}

/// Full trail for one entity, oldest first
pub async fn list_audit_trail(
    pool: &PgPool,
    entity_type: &str,
    entity_id: Uuid,
) -> Result<Vec<AuditLog>, sqlx::Error> {
    sqlx::query_as::<_, AuditLog>(
        r#"
        SELECT * FROM audit_logs
        WHERE entity_type = $1 AND entity_id = $2
        ORDER BY created_at ASC
        "#,
    )
    .bind(entity_type)
    .bind(entity_id)
    .fetch_all(pool)
    .await
}
