use actix_session::Session;
use actix_web::{HttpResponse, web};
use chrono::Utc;

use crate::auth::session::{require_permission, require_user_id};
use crate::auth::validate;
use crate::errors::AppError;
use crate::models::ambulance::{AmbulanceInput, CheckInInput};
use crate::store::FleetStore;
use crate::workflow;

/// GET /api/v1/ambulances
pub async fn list(
    store: web::Data<dyn FleetStore>,
    session: Session,
) -> Result<HttpResponse, AppError> {
    require_permission(&session, "fleet.view")?;
    let ambulances = store.list_ambulances().await?;
    Ok(HttpResponse::Ok().json(ambulances))
}

/// GET /api/v1/ambulances/{id}
pub async fn read(
    store: web::Data<dyn FleetStore>,
    session: Session,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    require_permission(&session, "fleet.view")?;
    let ambulance = store.get_ambulance(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ambulance))
}

/// POST /api/v1/ambulances
pub async fn create(
    store: web::Data<dyn FleetStore>,
    session: Session,
    body: web::Json<AmbulanceInput>,
) -> Result<HttpResponse, AppError> {
    require_permission(&session, "fleet.manage")?;
    let user_id = require_user_id(&session)?;
    validate::into_result(body.validate())?;

    let ambulance = store.create_ambulance(&body).await?;

    let details = serde_json::json!({
        "name": ambulance.name,
        "plate": ambulance.plate,
        "summary": format!("Registered ambulance {} ({})", ambulance.name, ambulance.plate),
    });
    crate::audit::log(store.get_ref(), user_id, "ambulance.created", "ambulance", ambulance.id, details).await;

    Ok(HttpResponse::Created().json(ambulance))
}

/// PUT /api/v1/ambulances/{id}
pub async fn update(
    store: web::Data<dyn FleetStore>,
    session: Session,
    path: web::Path<i64>,
    body: web::Json<AmbulanceInput>,
) -> Result<HttpResponse, AppError> {
    require_permission(&session, "fleet.manage")?;
    let user_id = require_user_id(&session)?;
    let id = path.into_inner();
    validate::into_result(body.validate())?;

    let ambulance = store.update_ambulance(id, &body).await?;

    let details = serde_json::json!({
        "name": ambulance.name,
        "plate": ambulance.plate,
        "summary": format!("Updated ambulance {}", ambulance.name),
    });
    crate::audit::log(store.get_ref(), user_id, "ambulance.updated", "ambulance", id, details).await;

    Ok(HttpResponse::Ok().json(ambulance))
}

/// DELETE /api/v1/ambulances/{id} - its materials and incidents go with it
pub async fn delete(
    store: web::Data<dyn FleetStore>,
    session: Session,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    require_permission(&session, "fleet.manage")?;
    let user_id = require_user_id(&session)?;
    let id = path.into_inner();

    let ambulance = store.get_ambulance(id).await?;
    store.delete_ambulance(id).await?;

    let details = serde_json::json!({
        "summary": format!("Deleted ambulance {} ({})", ambulance.name, ambulance.plate),
    });
    crate::audit::log(store.get_ref(), user_id, "ambulance.deleted", "ambulance", id, details).await;

    Ok(HttpResponse::NoContent().finish())
}

/// POST /api/v1/ambulances/{id}/check-in - records the odometer and starts a new cycle
pub async fn check_in(
    store: web::Data<dyn FleetStore>,
    session: Session,
    path: web::Path<i64>,
    body: web::Json<CheckInInput>,
) -> Result<HttpResponse, AppError> {
    require_permission(&session, "workflow.perform")?;
    let user_id = require_user_id(&session)?;
    let id = path.into_inner();

    let ambulance = workflow::check_in(store.get_ref(), id, user_id, body.kilometers, Utc::now()).await?;

    let details = serde_json::json!({
        "kilometers": body.kilometers,
        "summary": format!("Checked in {} at {} km", ambulance.name, body.kilometers),
    });
    crate::audit::log(store.get_ref(), user_id, "ambulance.checked_in", "ambulance", id, details).await;

    Ok(HttpResponse::Ok().json(ambulance))
}
