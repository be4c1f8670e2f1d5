use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

use crate::errors::AppError;
use crate::models::user::{NewUser, UserRole};
use crate::store::UserStore;

pub async fn init_pool(database_url: &str, max_connections: u32) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await
}

pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await?;
    log::info!("Database migrations complete");
    Ok(())
}

/// Create the initial `admin` account on an empty user table.
/// Returns whether a user was created.
pub async fn seed_admin<S>(store: &S, password_hash: &str) -> Result<bool, AppError>
where
    S: UserStore + ?Sized,
{
    if store.count_users().await? > 0 {
        return Ok(false);
    }
    store
        .create_user(&NewUser {
            username: "admin".to_string(),
            password_hash: password_hash.to_string(),
            display_name: "Administrator".to_string(),
            role: UserRole::Admin,
        })
        .await?;
    log::info!("Seeded default admin user");
    Ok(true)
}
