use actix_session::Session;
use actix_web::{HttpResponse, web};
use chrono::Utc;
use serde::Deserialize;

use crate::alerts::{self, AlertScope, Severity};
use crate::auth::session::require_permission;
use crate::errors::AppError;
use crate::store::FleetStore;

#[derive(Deserialize)]
pub struct AlertQuery {
    pub ambulance_id: Option<i64>,
    pub space_id: Option<i64>,
    pub severity: Option<String>,
}

/// GET /api/v1/alerts?ambulance_id=&space_id=&severity=
///
/// Alerts are recomputed on every call, most urgent first.
pub async fn list(
    store: web::Data<dyn FleetStore>,
    session: Session,
    query: web::Query<AlertQuery>,
) -> Result<HttpResponse, AppError> {
    require_permission(&session, "fleet.view")?;

    let severity = query
        .severity
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .map(str::parse::<Severity>)
        .transpose()
        .map_err(AppError::InvalidInput)?;

    let scope = AlertScope {
        ambulance_id: query.ambulance_id,
        space_id: query.space_id,
    };
    let mut list = alerts::compute_alerts(store.get_ref(), scope, alerts::local_today(), Utc::now()).await?;
    if let Some(severity) = severity {
        list.retain(|a| a.severity == severity);
    }

    Ok(HttpResponse::Ok().json(list))
}
