use actix_session::Session;
use actix_web::{HttpResponse, web};

use crate::auth::session::{require_permission, require_user_id};
use crate::errors::AppError;
use crate::models::material::{
    AmbulanceMaterialInput, CentralMaterialInput, Material, MaterialDraft, MaterialFilter,
    MaterialKind, MaterialRef, QuantityAdjustment,
};
use crate::store::FleetStore;

fn audit_target(kind: MaterialKind) -> &'static str {
    match kind {
        MaterialKind::Ambulance => "ambulance_material",
        MaterialKind::Central => "ampulario_material",
    }
}

async fn created(
    store: &dyn FleetStore,
    user_id: i64,
    draft: MaterialDraft,
) -> Result<HttpResponse, AppError> {
    let material = store.create_material(&draft).await?;
    let details = serde_json::json!({
        "name": material.name,
        "quantity": material.quantity,
        "summary": format!("Added {} x '{}'", material.quantity, material.name),
    });
    crate::audit::log(store, user_id, "material.created", audit_target(material.kind()), material.id, details).await;
    Ok(HttpResponse::Created().json(material))
}

async fn replaced(
    store: &dyn FleetStore,
    user_id: i64,
    id: i64,
    draft: MaterialDraft,
) -> Result<HttpResponse, AppError> {
    let material = store.update_material(id, &draft).await?;
    let details = serde_json::json!({
        "name": material.name,
        "quantity": material.quantity,
        "summary": format!("Updated '{}'", material.name),
    });
    crate::audit::log(store, user_id, "material.updated", audit_target(material.kind()), id, details).await;
    Ok(HttpResponse::Ok().json(material))
}

async fn adjusted(
    store: &dyn FleetStore,
    user_id: i64,
    material: MaterialRef,
    delta: i64,
) -> Result<HttpResponse, AppError> {
    let updated = store.adjust_quantity(material, delta).await?;
    let details = serde_json::json!({
        "delta": delta,
        "quantity": updated.quantity,
        "summary": format!("Adjusted '{}' by {:+} to {}", updated.name, delta, updated.quantity),
    });
    crate::audit::log(store, user_id, "material.adjusted", audit_target(material.kind), material.id, details).await;
    Ok(HttpResponse::Ok().json(updated))
}

async fn deleted(
    store: &dyn FleetStore,
    user_id: i64,
    material: MaterialRef,
) -> Result<HttpResponse, AppError> {
    let existing = store.get_material(material).await?;
    store.delete_material(material).await?;
    let details = serde_json::json!({ "summary": format!("Removed '{}'", existing.name) });
    crate::audit::log(store, user_id, "material.deleted", audit_target(material.kind), material.id, details).await;
    Ok(HttpResponse::NoContent().finish())
}

fn json(materials: Vec<Material>) -> HttpResponse {
    HttpResponse::Ok().json(materials)
}

// ---------------------------------------------------------------------------
// Ambulance stock
// ---------------------------------------------------------------------------

/// GET /api/v1/ambulances/{id}/materials
pub async fn list_for_ambulance(
    store: web::Data<dyn FleetStore>,
    session: Session,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    require_permission(&session, "fleet.view")?;
    let id = path.into_inner();
    store.get_ambulance(id).await?;
    Ok(json(store.list_materials(MaterialFilter::Ambulance(Some(id))).await?))
}

/// POST /api/v1/ambulances/{id}/materials
pub async fn create_for_ambulance(
    store: web::Data<dyn FleetStore>,
    session: Session,
    path: web::Path<i64>,
    body: web::Json<AmbulanceMaterialInput>,
) -> Result<HttpResponse, AppError> {
    require_permission(&session, "stock.manage")?;
    let user_id = require_user_id(&session)?;
    let id = path.into_inner();
    let mut input = body.into_inner();
    input.ambulance_id = Some(id);
    created(store.get_ref(), user_id, input.into_draft(id)?).await
}

/// PUT /api/v1/ambulance-materials/{id} - `ambulance_id` in the body moves it
pub async fn update_ambulance_material(
    store: web::Data<dyn FleetStore>,
    session: Session,
    path: web::Path<i64>,
    body: web::Json<AmbulanceMaterialInput>,
) -> Result<HttpResponse, AppError> {
    require_permission(&session, "stock.manage")?;
    let user_id = require_user_id(&session)?;
    let id = path.into_inner();
    let current = store
        .get_material(MaterialRef { kind: MaterialKind::Ambulance, id })
        .await?;
    let draft = body.into_inner().into_draft(current.ambulance_id().unwrap_or_default())?;
    replaced(store.get_ref(), user_id, id, draft).await
}

/// DELETE /api/v1/ambulance-materials/{id}
pub async fn delete_ambulance_material(
    store: web::Data<dyn FleetStore>,
    session: Session,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    require_permission(&session, "stock.manage")?;
    let user_id = require_user_id(&session)?;
    let material = MaterialRef { kind: MaterialKind::Ambulance, id: path.into_inner() };
    deleted(store.get_ref(), user_id, material).await
}

/// POST /api/v1/ambulance-materials/{id}/adjust - body `{"delta": -2}`
pub async fn adjust_ambulance_material(
    store: web::Data<dyn FleetStore>,
    session: Session,
    path: web::Path<i64>,
    body: web::Json<QuantityAdjustment>,
) -> Result<HttpResponse, AppError> {
    require_permission(&session, "stock.manage")?;
    let user_id = require_user_id(&session)?;
    let material = MaterialRef { kind: MaterialKind::Ambulance, id: path.into_inner() };
    adjusted(store.get_ref(), user_id, material, body.delta).await
}

// ---------------------------------------------------------------------------
// Central stock (ampulario)
// ---------------------------------------------------------------------------

/// GET /api/v1/ampulario
pub async fn list_central(
    store: web::Data<dyn FleetStore>,
    session: Session,
) -> Result<HttpResponse, AppError> {
    require_permission(&session, "fleet.view")?;
    Ok(json(store.list_materials(MaterialFilter::Central(None)).await?))
}

/// GET /api/v1/spaces/{id}/materials
pub async fn list_for_space(
    store: web::Data<dyn FleetStore>,
    session: Session,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    require_permission(&session, "fleet.view")?;
    let id = path.into_inner();
    store.get_space(id).await?;
    Ok(json(store.list_materials(MaterialFilter::Central(Some(id))).await?))
}

/// POST /api/v1/spaces/{id}/materials
pub async fn create_for_space(
    store: web::Data<dyn FleetStore>,
    session: Session,
    path: web::Path<i64>,
    body: web::Json<CentralMaterialInput>,
) -> Result<HttpResponse, AppError> {
    require_permission(&session, "stock.manage")?;
    let user_id = require_user_id(&session)?;
    let id = path.into_inner();
    let mut input = body.into_inner();
    input.space_id = Some(id);
    created(store.get_ref(), user_id, input.into_draft(id)?).await
}

/// PUT /api/v1/ampulario/{id} - `space_id` in the body moves it
pub async fn update_central_material(
    store: web::Data<dyn FleetStore>,
    session: Session,
    path: web::Path<i64>,
    body: web::Json<CentralMaterialInput>,
) -> Result<HttpResponse, AppError> {
    require_permission(&session, "stock.manage")?;
    let user_id = require_user_id(&session)?;
    let id = path.into_inner();
    let current = store
        .get_material(MaterialRef { kind: MaterialKind::Central, id })
        .await?;
    let draft = body.into_inner().into_draft(current.space_id().unwrap_or_default())?;
    replaced(store.get_ref(), user_id, id, draft).await
}

/// DELETE /api/v1/ampulario/{id}
pub async fn delete_central_material(
    store: web::Data<dyn FleetStore>,
    session: Session,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    require_permission(&session, "stock.manage")?;
    let user_id = require_user_id(&session)?;
    let material = MaterialRef { kind: MaterialKind::Central, id: path.into_inner() };
    deleted(store.get_ref(), user_id, material).await
}

/// POST /api/v1/ampulario/{id}/adjust
pub async fn adjust_central_material(
    store: web::Data<dyn FleetStore>,
    session: Session,
    path: web::Path<i64>,
    body: web::Json<QuantityAdjustment>,
) -> Result<HttpResponse, AppError> {
    require_permission(&session, "stock.manage")?;
    let user_id = require_user_id(&session)?;
    let material = MaterialRef { kind: MaterialKind::Central, id: path.into_inner() };
    adjusted(store.get_ref(), user_id, material, body.delta).await
}
