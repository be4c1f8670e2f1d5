use actix_session::Session;
use actix_web::{HttpResponse, web};

use crate::auth::session::{require_permission, require_user_id};
use crate::auth::validate;
use crate::errors::AppError;
use crate::models::space::SpaceInput;
use crate::store::FleetStore;

/// GET /api/v1/spaces
pub async fn list(
    store: web::Data<dyn FleetStore>,
    session: Session,
) -> Result<HttpResponse, AppError> {
    require_permission(&session, "fleet.view")?;
    Ok(HttpResponse::Ok().json(store.list_spaces().await?))
}

/// POST /api/v1/spaces
pub async fn create(
    store: web::Data<dyn FleetStore>,
    session: Session,
    body: web::Json<SpaceInput>,
) -> Result<HttpResponse, AppError> {
    require_permission(&session, "stock.manage")?;
    let user_id = require_user_id(&session)?;
    validate::into_result(body.validate())?;

    let space = store.create_space(&body.name).await?;

    let details = serde_json::json!({ "summary": format!("Created space '{}'", space.name) });
    crate::audit::log(store.get_ref(), user_id, "space.created", "space", space.id, details).await;

    Ok(HttpResponse::Created().json(space))
}

/// PUT /api/v1/spaces/{id}
pub async fn update(
    store: web::Data<dyn FleetStore>,
    session: Session,
    path: web::Path<i64>,
    body: web::Json<SpaceInput>,
) -> Result<HttpResponse, AppError> {
    require_permission(&session, "stock.manage")?;
    let user_id = require_user_id(&session)?;
    let id = path.into_inner();
    validate::into_result(body.validate())?;

    let space = store.rename_space(id, &body.name).await?;

    let details = serde_json::json!({ "summary": format!("Renamed space to '{}'", space.name) });
    crate::audit::log(store.get_ref(), user_id, "space.updated", "space", id, details).await;

    Ok(HttpResponse::Ok().json(space))
}

/// DELETE /api/v1/spaces/{id} - 409 while materials are stored in it
pub async fn delete(
    store: web::Data<dyn FleetStore>,
    session: Session,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    require_permission(&session, "stock.manage")?;
    let user_id = require_user_id(&session)?;
    let id = path.into_inner();

    let space = store.get_space(id).await?;
    store.delete_space(id).await?;

    let details = serde_json::json!({ "summary": format!("Deleted space '{}'", space.name) });
    crate::audit::log(store.get_ref(), user_id, "space.deleted", "space", id, details).await;

    Ok(HttpResponse::NoContent().finish())
}
