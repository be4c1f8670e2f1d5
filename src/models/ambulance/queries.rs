use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::errors::AppError;
use crate::workflow::StepKey;
use super::types::*;

const AMBULANCE_COLUMNS: &str = "id, name, plate, model, year, \
     daily_check_completed, daily_check_at, \
     mechanical_review_completed, mechanical_review_at, \
     cleaning_completed, cleaning_at, \
     inventory_completed, inventory_at, \
     last_known_kilometers, last_check_in_by_user_id, last_check_in_date, \
     created_at, updated_at";

pub async fn find_all(pool: &PgPool) -> Result<Vec<Ambulance>, AppError> {
    let rows = sqlx::query_as::<_, Ambulance>(&format!(
        "SELECT {AMBULANCE_COLUMNS} FROM ambulances ORDER BY name, id"
    ))
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

pub async fn find_by_id(pool: &PgPool, id: i64) -> Result<Option<Ambulance>, AppError> {
    let row = sqlx::query_as::<_, Ambulance>(&format!(
        "SELECT {AMBULANCE_COLUMNS} FROM ambulances WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

pub async fn exists(pool: &PgPool, id: i64) -> Result<bool, AppError> {
    let (found,): (bool,) = sqlx::query_as("SELECT EXISTS(SELECT 1 FROM ambulances WHERE id = $1)")
        .bind(id)
        .fetch_one(pool)
        .await?;
    Ok(found)
}

pub async fn create(pool: &PgPool, input: &AmbulanceInput) -> Result<Ambulance, AppError> {
    let row = sqlx::query_as::<_, Ambulance>(&format!(
        "INSERT INTO ambulances (name, plate, model, year) VALUES ($1, $2, $3, $4) \
         RETURNING {AMBULANCE_COLUMNS}"
    ))
    .bind(input.name.trim())
    .bind(input.plate.trim())
    .bind(input.model.trim())
    .bind(input.year)
    .fetch_one(pool)
    .await
    .map_err(map_unique_plate)?;
    Ok(row)
}

pub async fn update(pool: &PgPool, id: i64, input: &AmbulanceInput) -> Result<Option<Ambulance>, AppError> {
    let row = sqlx::query_as::<_, Ambulance>(&format!(
        "UPDATE ambulances SET name = $2, plate = $3, model = $4, year = $5, updated_at = NOW() \
         WHERE id = $1 RETURNING {AMBULANCE_COLUMNS}"
    ))
    .bind(id)
    .bind(input.name.trim())
    .bind(input.plate.trim())
    .bind(input.model.trim())
    .bind(input.year)
    .fetch_optional(pool)
    .await
    .map_err(map_unique_plate)?;
    Ok(row)
}

/// Delete an ambulance; its local materials and incidents cascade.
pub async fn delete(pool: &PgPool, id: i64) -> Result<bool, AppError> {
    let result = sqlx::query("DELETE FROM ambulances WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Set `step`'s flag only if every earlier flag is already set and the step
/// itself is not yet complete. The check and the write happen in one
/// statement, so concurrent callers cannot both pass the guard.
///
/// Returns `None` when the guard rejected the write.
pub async fn complete_step_guarded(
    pool: &PgPool,
    id: i64,
    step: StepKey,
    at: DateTime<Utc>,
) -> Result<Option<Ambulance>, AppError> {
    let prerequisites: String = step
        .prerequisites()
        .iter()
        .map(|p| format!(" AND {}", p.column()))
        .collect();

    let sql = format!(
        "UPDATE ambulances SET {flag} = TRUE, {stamp} = $2, updated_at = $2 \
         WHERE id = $1 AND NOT {flag}{prerequisites} \
         RETURNING {AMBULANCE_COLUMNS}",
        flag = step.column(),
        stamp = step.timestamp_column(),
    );

    let row = sqlx::query_as::<_, Ambulance>(&sql)
        .bind(id)
        .bind(at)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

pub async fn reset_flags(pool: &PgPool, id: i64) -> Result<Option<Ambulance>, AppError> {
    let row = sqlx::query_as::<_, Ambulance>(&format!(
        "UPDATE ambulances SET daily_check_completed = FALSE, mechanical_review_completed = FALSE, \
         cleaning_completed = FALSE, inventory_completed = FALSE, updated_at = NOW() \
         WHERE id = $1 RETURNING {AMBULANCE_COLUMNS}"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

/// Start a new operational cycle: clear the flags and record who checked in.
/// `None` when the row is missing or the reading is negative or below the stored one.
pub async fn record_check_in(
    pool: &PgPool,
    id: i64,
    user_id: i64,
    kilometers: i64,
    at: DateTime<Utc>,
) -> Result<Option<Ambulance>, AppError> {
    let row = sqlx::query_as::<_, Ambulance>(&format!(
        "UPDATE ambulances SET daily_check_completed = FALSE, mechanical_review_completed = FALSE, \
         cleaning_completed = FALSE, inventory_completed = FALSE, \
         last_known_kilometers = $2, last_check_in_by_user_id = NULLIF($3, 0), \
         last_check_in_date = $4, updated_at = $4 \
         WHERE id = $1 AND $2 >= 0 \
         AND (last_known_kilometers IS NULL OR last_known_kilometers <= $2) \
         RETURNING {AMBULANCE_COLUMNS}"
    ))
    .bind(id)
    .bind(kilometers)
    .bind(user_id)
    .bind(at)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

fn map_unique_plate(e: sqlx::Error) -> AppError {
    if let sqlx::Error::Database(db) = &e {
        if db.is_unique_violation() {
            return AppError::Conflict("An ambulance with this plate already exists".to_string());
        }
    }
    AppError::from(e)
}
