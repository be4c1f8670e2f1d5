use actix_session::Session;
use actix_web::{HttpResponse, web};
use serde::{Deserialize, Serialize};

use crate::auth::session::require_permission;
use crate::errors::AppError;
use crate::models::audit::AuditEntry;
use crate::store::FleetStore;

#[derive(Deserialize)]
pub struct AuditQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

#[derive(Serialize)]
pub struct AuditPage {
    pub items: Vec<AuditEntry>,
    pub page: i64,
    pub per_page: i64,
}

/// GET /api/v1/audit - newest first; `page` from 1, `per_page` capped at 100
pub async fn list(
    store: web::Data<dyn FleetStore>,
    session: Session,
    query: web::Query<AuditQuery>,
) -> Result<HttpResponse, AppError> {
    require_permission(&session, "audit.view")?;

    let page = query.page.unwrap_or(1).max(1);
    let per_page = query.per_page.unwrap_or(25).clamp(1, 100);
    let items = store.list_audit(per_page, (page - 1) * per_page).await?;

    Ok(HttpResponse::Ok().json(AuditPage { items, page, per_page }))
}
