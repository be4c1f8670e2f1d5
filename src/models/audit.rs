use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use sqlx::PgPool;

use crate::errors::AppError;

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct AuditEntry {
    pub id: i64,
    pub user_id: i64,
    pub action: String,
    pub target_type: String,
    pub target_id: i64,
    pub details: Value,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewAuditEntry {
    pub user_id: i64,
    pub action: String,
    pub target_type: String,
    pub target_id: i64,
    pub details: Value,
}

pub async fn insert(pool: &PgPool, entry: &NewAuditEntry) -> Result<(), AppError> {
    sqlx::query(
        "INSERT INTO audit_log (user_id, action, target_type, target_id, details) \
         VALUES ($1, $2, $3, $4, $5)",
    )
    .bind(entry.user_id)
    .bind(&entry.action)
    .bind(&entry.target_type)
    .bind(entry.target_id)
    .bind(&entry.details)
    .execute(pool)
    .await?;
    Ok(())
}

/// Most recent entries first.
pub async fn find_recent(pool: &PgPool, limit: i64, offset: i64) -> Result<Vec<AuditEntry>, AppError> {
    let rows = sqlx::query_as::<_, AuditEntry>(
        "SELECT id, user_id, action, target_type, target_id, details, created_at \
         FROM audit_log ORDER BY created_at DESC, id DESC LIMIT $1 OFFSET $2",
    )
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}
