use actix_session::Session;
use actix_web::{HttpResponse, web};
use chrono::Utc;
use serde::Deserialize;

use crate::auth::session::{require_permission, require_user_id};
use crate::auth::validate;
use crate::errors::AppError;
use crate::models::incident::{IncidentFilter, IncidentInput};
use crate::store::FleetStore;

#[derive(Deserialize)]
pub struct IncidentQuery {
    #[serde(default)]
    pub open_only: bool,
}

/// GET /api/v1/ambulances/{id}/incidents?open_only=true
pub async fn list(
    store: web::Data<dyn FleetStore>,
    session: Session,
    path: web::Path<i64>,
    query: web::Query<IncidentQuery>,
) -> Result<HttpResponse, AppError> {
    require_permission(&session, "fleet.view")?;
    let id = path.into_inner();
    store.get_ambulance(id).await?;

    let incidents = store
        .list_incidents(IncidentFilter { ambulance_id: Some(id), open_only: query.open_only })
        .await?;
    Ok(HttpResponse::Ok().json(incidents))
}

/// POST /api/v1/ambulances/{id}/incidents
pub async fn create(
    store: web::Data<dyn FleetStore>,
    session: Session,
    path: web::Path<i64>,
    body: web::Json<IncidentInput>,
) -> Result<HttpResponse, AppError> {
    require_permission(&session, "incidents.manage")?;
    let user_id = require_user_id(&session)?;
    let id = path.into_inner();
    validate::into_result(body.validate())?;

    let incident = store.create_incident(id, &body, user_id).await?;

    let details = serde_json::json!({
        "ambulance_id": id,
        "severity": incident.severity,
        "summary": format!("Reported incident '{}'", incident.title),
    });
    crate::audit::log(store.get_ref(), user_id, "incident.created", "incident", incident.id, details).await;

    Ok(HttpResponse::Created().json(incident))
}

/// POST /api/v1/incidents/{id}/resolve - resolving twice is a no-op
pub async fn resolve(
    store: web::Data<dyn FleetStore>,
    session: Session,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    require_permission(&session, "incidents.manage")?;
    let user_id = require_user_id(&session)?;
    let id = path.into_inner();

    let incident = store.resolve_incident(id, user_id, Utc::now()).await?;

    let details = serde_json::json!({ "summary": format!("Resolved incident '{}'", incident.title) });
    crate::audit::log(store.get_ref(), user_id, "incident.resolved", "incident", id, details).await;

    Ok(HttpResponse::Ok().json(incident))
}
