use actix_session::Session;
use actix_web::{HttpResponse, web};

use crate::auth::session::{require_permission, require_user_id};
use crate::auth::{password, validate};
use crate::errors::AppError;
use crate::models::user::{ApiUserRequest, NewUser, UserDisplay};
use crate::store::FleetStore;

/// GET /api/v1/users
pub async fn list(
    store: web::Data<dyn FleetStore>,
    session: Session,
) -> Result<HttpResponse, AppError> {
    require_permission(&session, "users.manage")?;
    let users: Vec<UserDisplay> = store
        .list_users()
        .await?
        .into_iter()
        .map(UserDisplay::from)
        .collect();
    Ok(HttpResponse::Ok().json(users))
}

/// POST /api/v1/users - Create new user
pub async fn create(
    store: web::Data<dyn FleetStore>,
    session: Session,
    body: web::Json<ApiUserRequest>,
) -> Result<HttpResponse, AppError> {
    require_permission(&session, "users.manage")?;
    let actor = require_user_id(&session)?;

    let mut errors = Vec::new();
    errors.extend(validate::validate_username(&body.username));
    errors.extend(validate::validate_password(&body.password));
    errors.extend(validate::validate_optional(&body.display_name, "Display name", 100));
    validate::into_result(errors)?;

    let display_name = match body.display_name.trim() {
        "" => body.username.trim().to_string(),
        name => name.to_string(),
    };
    let new_user = NewUser {
        username: body.username.trim().to_string(),
        password_hash: password::hash_password(&body.password)?,
        display_name,
        role: body.role,
    };
    let user = store.create_user(&new_user).await?;

    let details = serde_json::json!({
        "username": user.username,
        "role": user.role,
        "summary": format!("Created user '{}' as {}", user.username, user.role.label()),
    });
    crate::audit::log(store.get_ref(), actor, "user.created", "user", user.id, details).await;

    Ok(HttpResponse::Created().json(UserDisplay::from(user)))
}
