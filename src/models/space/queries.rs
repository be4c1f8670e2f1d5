use sqlx::PgPool;

use crate::errors::AppError;
use super::types::*;

pub async fn find_all(pool: &PgPool) -> Result<Vec<Space>, AppError> {
    let rows = sqlx::query_as::<_, Space>(
        "SELECT id, name, created_at, updated_at FROM spaces ORDER BY name, id",
    )
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

pub async fn find_by_id(pool: &PgPool, id: i64) -> Result<Option<Space>, AppError> {
    let row = sqlx::query_as::<_, Space>(
        "SELECT id, name, created_at, updated_at FROM spaces WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

pub async fn create(pool: &PgPool, name: &str) -> Result<Space, AppError> {
    let row = sqlx::query_as::<_, Space>(
        "INSERT INTO spaces (name) VALUES ($1) RETURNING id, name, created_at, updated_at",
    )
    .bind(name.trim())
    .fetch_one(pool)
    .await
    .map_err(map_unique_name)?;
    Ok(row)
}

pub async fn rename(pool: &PgPool, id: i64, name: &str) -> Result<Option<Space>, AppError> {
    let row = sqlx::query_as::<_, Space>(
        "UPDATE spaces SET name = $2, updated_at = NOW() WHERE id = $1 \
         RETURNING id, name, created_at, updated_at",
    )
    .bind(id)
    .bind(name.trim())
    .fetch_optional(pool)
    .await
    .map_err(map_unique_name)?;
    Ok(row)
}

/// Delete a space that no material references.
///
/// The reference check and the delete share one transaction; the
/// `ON DELETE RESTRICT` foreign key backs it up.
pub async fn delete(pool: &PgPool, id: i64) -> Result<bool, AppError> {
    let mut tx = pool.begin().await?;

    let (in_use,): (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM ampulario_materials WHERE space_id = $1",
    )
    .bind(id)
    .fetch_one(&mut *tx)
    .await?;
    if in_use > 0 {
        return Err(AppError::Conflict(format!(
            "Space still holds {in_use} material(s); move or delete them first"
        )));
    }

    let result = sqlx::query("DELETE FROM spaces WHERE id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await
        .map_err(map_restricted_delete)?;

    tx.commit().await?;
    Ok(result.rows_affected() > 0)
}

fn map_restricted_delete(e: sqlx::Error) -> AppError {
    if let sqlx::Error::Database(db) = &e {
        if db.is_foreign_key_violation() {
            return AppError::Conflict("Space is still referenced by materials".to_string());
        }
    }
    AppError::from(e)
}

fn map_unique_name(e: sqlx::Error) -> AppError {
    if let sqlx::Error::Database(db) = &e {
        if db.is_unique_violation() {
            return AppError::Conflict("A space with this name already exists".to_string());
        }
    }
    AppError::from(e)
}
