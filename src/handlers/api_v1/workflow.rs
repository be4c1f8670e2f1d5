use actix_session::Session;
use actix_web::{HttpResponse, web};
use chrono::Utc;
use serde::Serialize;

use crate::auth::session::{require_permission, require_user_id};
use crate::errors::AppError;
use crate::models::ambulance::Ambulance;
use crate::store::FleetStore;
use crate::workflow::{self, StepKey, WorkflowProgress};

#[derive(Serialize)]
pub struct CompletionResponse {
    pub ambulance: Ambulance,
    /// `false` when the step was already complete.
    pub applied: bool,
    pub next_step: Option<StepKey>,
}

/// GET /api/v1/ambulances/{id}/workflow
pub async fn progress(
    store: web::Data<dyn FleetStore>,
    session: Session,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    require_permission(&session, "fleet.view")?;
    let ambulance = store.get_ambulance(path.into_inner()).await?;
    let progress: WorkflowProgress = workflow::progress(&ambulance);
    Ok(HttpResponse::Ok().json(progress))
}

/// POST /api/v1/ambulances/{id}/workflow/{step}
///
/// `step` accepts `daily_check`, `daily-check`, `dailyCheckCompleted`, ...
/// Out-of-order requests fail with 422 and name the next allowed step.
pub async fn complete(
    store: web::Data<dyn FleetStore>,
    session: Session,
    path: web::Path<(i64, String)>,
) -> Result<HttpResponse, AppError> {
    require_permission(&session, "workflow.perform")?;
    let user_id = require_user_id(&session)?;
    let (id, raw_step) = path.into_inner();
    let step: StepKey = raw_step.parse().map_err(AppError::InvalidInput)?;

    let done = workflow::complete_step(store.get_ref(), id, step, Utc::now()).await?;

    if done.applied {
        let details = serde_json::json!({
            "step": step.as_str(),
            "summary": format!("Completed {} for {}", step.descriptor().name, done.ambulance.name),
        });
        crate::audit::log(store.get_ref(), user_id, "workflow.step_completed", "ambulance", id, details).await;
    }

    let next_step = workflow::next_allowed_step(&done.ambulance).map(|s| s.key);
    Ok(HttpResponse::Ok().json(CompletionResponse {
        ambulance: done.ambulance,
        applied: done.applied,
        next_step,
    }))
}

/// POST /api/v1/ambulances/{id}/workflow/reset
pub async fn reset(
    store: web::Data<dyn FleetStore>,
    session: Session,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    require_permission(&session, "workflow.perform")?;
    let user_id = require_user_id(&session)?;
    let id = path.into_inner();

    let ambulance = workflow::reset_cycle(store.get_ref(), id).await?;

    let details = serde_json::json!({ "summary": format!("Reset workflow cycle for {}", ambulance.name) });
    crate::audit::log(store.get_ref(), user_id, "workflow.reset", "ambulance", id, details).await;

    Ok(HttpResponse::Ok().json(ambulance))
}
