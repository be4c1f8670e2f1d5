use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::errors::AppError;
use super::types::*;

const INCIDENT_COLUMNS: &str = "id, ambulance_id, title, description, severity, status, \
     reported_by, resolved_by, created_at, resolved_at";

pub async fn find_all(pool: &PgPool, filter: IncidentFilter) -> Result<Vec<Incident>, AppError> {
    let rows = sqlx::query_as::<_, Incident>(&format!(
        "SELECT {INCIDENT_COLUMNS} FROM incidents \
         WHERE ($1::BIGINT IS NULL OR ambulance_id = $1) \
           AND (NOT $2 OR status = 'open') \
         ORDER BY created_at DESC, id DESC"
    ))
    .bind(filter.ambulance_id)
    .bind(filter.open_only)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

pub async fn find_by_id(pool: &PgPool, id: i64) -> Result<Option<Incident>, AppError> {
    let row = sqlx::query_as::<_, Incident>(&format!(
        "SELECT {INCIDENT_COLUMNS} FROM incidents WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

pub async fn create(
    pool: &PgPool,
    ambulance_id: i64,
    input: &IncidentInput,
    reported_by: i64,
) -> Result<Incident, AppError> {
    let row = sqlx::query_as::<_, Incident>(&format!(
        "INSERT INTO incidents (ambulance_id, title, description, severity, reported_by) \
         VALUES ($1, $2, $3, $4, NULLIF($5, 0)) RETURNING {INCIDENT_COLUMNS}"
    ))
    .bind(ambulance_id)
    .bind(input.title.trim())
    .bind(input.description.trim())
    .bind(input.severity.unwrap_or(IncidentSeverity::Medium))
    .bind(reported_by)
    .fetch_one(pool)
    .await
    .map_err(|e| match e {
        sqlx::Error::Database(db) if db.is_foreign_key_violation() => AppError::NotFound,
        other => AppError::from(other),
    })?;
    Ok(row)
}

/// Mark an open incident resolved. Already-resolved incidents are returned unchanged.
pub async fn resolve(
    pool: &PgPool,
    id: i64,
    resolved_by: i64,
    at: DateTime<Utc>,
) -> Result<Option<Incident>, AppError> {
    let updated = sqlx::query_as::<_, Incident>(&format!(
        "UPDATE incidents SET status = 'resolved', resolved_by = NULLIF($2, 0), resolved_at = $3 \
         WHERE id = $1 AND status = 'open' RETURNING {INCIDENT_COLUMNS}"
    ))
    .bind(id)
    .bind(resolved_by)
    .bind(at)
    .fetch_optional(pool)
    .await?;

    match updated {
        Some(incident) => Ok(Some(incident)),
        None => find_by_id(pool, id).await,
    }
}
