use actix_session::Session;
use actix_web::{HttpResponse, web};
use chrono::Utc;

use crate::alerts::local_today;
use crate::auth::session::require_permission;
use crate::errors::AppError;
use crate::reports;
use crate::store::FleetStore;

/// GET /api/v1/reports/fleet
pub async fn fleet(
    store: web::Data<dyn FleetStore>,
    session: Session,
) -> Result<HttpResponse, AppError> {
    require_permission(&session, "fleet.view")?;
    let report = reports::fleet_report(store.get_ref(), local_today(), Utc::now()).await?;
    Ok(HttpResponse::Ok().json(report))
}
