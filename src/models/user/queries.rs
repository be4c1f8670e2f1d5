use sqlx::PgPool;

use crate::errors::AppError;
use super::types::*;

const USER_COLUMNS: &str = "id, username, password_hash, display_name, role, is_active, created_at";

pub async fn find_by_username(pool: &PgPool, username: &str) -> Result<Option<User>, AppError> {
    let row = sqlx::query_as::<_, User>(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE username = $1 AND is_active"
    ))
    .bind(username)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

pub async fn find_by_id(pool: &PgPool, id: i64) -> Result<Option<User>, AppError> {
    let row = sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

pub async fn find_all(pool: &PgPool) -> Result<Vec<User>, AppError> {
    let rows = sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users ORDER BY username"))
        .fetch_all(pool)
        .await?;
    Ok(rows)
}

pub async fn count(pool: &PgPool) -> Result<i64, AppError> {
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
        .fetch_one(pool)
        .await?;
    Ok(count)
}

pub async fn create(pool: &PgPool, new_user: &NewUser) -> Result<User, AppError> {
    let row = sqlx::query_as::<_, User>(&format!(
        "INSERT INTO users (username, password_hash, display_name, role) \
         VALUES ($1, $2, $3, $4) RETURNING {USER_COLUMNS}"
    ))
    .bind(new_user.username.trim())
    .bind(&new_user.password_hash)
    .bind(new_user.display_name.trim())
    .bind(new_user.role)
    .fetch_one(pool)
    .await
    .map_err(|e| match e {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            AppError::Conflict("Username already taken".to_string())
        }
        other => AppError::from(other),
    })?;
    Ok(row)
}
