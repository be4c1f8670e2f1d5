use actix_session::Session;
use actix_web::{HttpResponse, web};
use chrono::Utc;
use serde::Deserialize;

use crate::auth::csrf;
use crate::auth::session::{require_permission, require_user_id, set_flash};
use crate::errors::{AppError, render};
use crate::handlers::auth_handlers::CsrfOnly;
use crate::models::ambulance::Ambulance;
use crate::store::FleetStore;
use crate::templates_structs::{PageContext, WorkflowOverviewTemplate, WorkflowStepTemplate};
use crate::workflow::{self, StepKey};

#[derive(Deserialize)]
pub struct CheckInForm {
    pub kilometers: i64,
    pub csrf_token: String,
}

fn see_other(location: String) -> HttpResponse {
    HttpResponse::SeeOther()
        .insert_header(("Location", location))
        .finish()
}

/// Where to send the user after a step: the next open step, or the overview
/// once the cycle is done.
fn next_location(ambulance: &Ambulance) -> String {
    match workflow::next_allowed_step(ambulance) {
        Some(step) => format!("/ambulances/{}/workflow/{}", ambulance.id, step.path),
        None => format!("/ambulances/{}/workflow", ambulance.id),
    }
}

fn parse_step(raw: &str) -> Result<StepKey, AppError> {
    raw.parse::<StepKey>().map_err(|_| AppError::NotFound)
}

/// GET /ambulances/{id}/workflow
pub async fn overview(
    store: web::Data<dyn FleetStore>,
    session: Session,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    require_permission(&session, "fleet.view")?;
    let store = store.get_ref();
    let ambulance = store.get_ambulance(path.into_inner()).await?;
    let ctx = PageContext::build(&session, store, "/ambulances").await?;

    render(WorkflowOverviewTemplate {
        ctx,
        progress: workflow::progress(&ambulance),
        ambulance,
    })
}

/// GET /ambulances/{id}/workflow/{step}
///
/// Steps ahead of the next allowed one redirect there; completed steps open
/// read-only.
pub async fn step_page(
    store: web::Data<dyn FleetStore>,
    session: Session,
    path: web::Path<(i64, String)>,
) -> Result<HttpResponse, AppError> {
    require_permission(&session, "fleet.view")?;
    let (id, raw_step) = path.into_inner();
    let key = parse_step(&raw_step)?;
    let store = store.get_ref();
    let ambulance = store.get_ambulance(id).await?;

    if !workflow::is_step_accessible(&ambulance, key) {
        if let Some(next) = workflow::next_allowed_step(&ambulance) {
            set_flash(&session, format!("Complete '{}' first", next.name));
        }
        return Ok(see_other(next_location(&ambulance)));
    }

    let progress = workflow::progress(&ambulance);
    let step = progress
        .steps
        .iter()
        .find(|s| s.key == key)
        .cloned()
        .ok_or(AppError::NotFound)?;
    let ctx = PageContext::build(&session, store, "/ambulances").await?;

    render(WorkflowStepTemplate {
        ctx,
        read_only: step.completed,
        step,
        progress,
        ambulance,
    })
}

/// POST /ambulances/{id}/workflow/{step}
pub async fn complete(
    store: web::Data<dyn FleetStore>,
    session: Session,
    path: web::Path<(i64, String)>,
    form: web::Form<CsrfOnly>,
) -> Result<HttpResponse, AppError> {
    require_permission(&session, "workflow.perform")?;
    csrf::validate_csrf(&session, &form.csrf_token)?;
    let (id, raw_step) = path.into_inner();
    let key = parse_step(&raw_step)?;
    let user_id = require_user_id(&session)?;
    let store = store.get_ref();

    match workflow::complete_step(store, id, key, Utc::now()).await {
        Ok(done) => {
            if done.applied {
                let details = serde_json::json!({
                    "step": key.as_str(),
                    "summary": format!("Completed {} for {}", key.descriptor().name, done.ambulance.name),
                });
                crate::audit::log(store, user_id, "workflow.step_completed", "ambulance", id, details).await;
                set_flash(&session, format!("{} completed", key.descriptor().name));
            }
            Ok(see_other(next_location(&done.ambulance)))
        }
        Err(AppError::StepOutOfOrder { next, .. }) => {
            let message = match next {
                Some(next) => format!(
                    "'{}' is not available yet. Complete '{}' first.",
                    key.descriptor().name,
                    next.descriptor().name
                ),
                None => format!("'{}' is not available.", key.descriptor().name),
            };
            set_flash(&session, message);
            let ambulance = store.get_ambulance(id).await?;
            Ok(see_other(next_location(&ambulance)))
        }
        Err(e) => Err(e),
    }
}

/// POST /ambulances/{id}/check-in
pub async fn check_in(
    store: web::Data<dyn FleetStore>,
    session: Session,
    path: web::Path<i64>,
    form: web::Form<CheckInForm>,
) -> Result<HttpResponse, AppError> {
    require_permission(&session, "workflow.perform")?;
    csrf::validate_csrf(&session, &form.csrf_token)?;
    let id = path.into_inner();
    let user_id = require_user_id(&session)?;
    let store = store.get_ref();

    match workflow::check_in(store, id, user_id, form.kilometers, Utc::now()).await {
        Ok(ambulance) => {
            let details = serde_json::json!({
                "kilometers": form.kilometers,
                "summary": format!("Checked in {} at {} km", ambulance.name, form.kilometers),
            });
            crate::audit::log(store, user_id, "ambulance.checked_in", "ambulance", id, details).await;
            set_flash(&session, "Check-in recorded; a new cycle has started");
            Ok(see_other(next_location(&ambulance)))
        }
        Err(AppError::InvalidInput(msg)) => {
            set_flash(&session, msg);
            Ok(see_other(format!("/ambulances/{id}/workflow")))
        }
        Err(e) => Err(e),
    }
}
