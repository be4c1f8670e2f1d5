use actix_session::Session;
use actix_web::{HttpResponse, web};
use chrono::{Local, Timelike, Utc};

use crate::alerts::{self, AlertScope};
use crate::auth::session::require_permission;
use crate::errors::{AppError, render};
use crate::models::incident::IncidentFilter;
use crate::store::FleetStore;
use crate::templates_structs::{DashboardTemplate, FleetRow, PageContext};
use crate::workflow;

fn time_greeting(name: &str) -> String {
    let period = match Local::now().hour() {
        5..=11 => "Good morning",
        12..=16 => "Good afternoon",
        _ => "Good evening",
    };
    format!("{}, {}", period, name)
}

pub async fn index(
    store: web::Data<dyn FleetStore>,
    session: Session,
) -> Result<HttpResponse, AppError> {
    require_permission(&session, "fleet.view")?;
    let store = store.get_ref();
    let alerts = alerts::compute_alerts(store, AlertScope::default(), alerts::local_today(), Utc::now()).await?;
    let alert_counts = alerts::count_by_severity(&alerts);
    let ctx = PageContext::with_badge(&session, "/dashboard", alert_counts.high)?;

    let fleet = store
        .list_ambulances()
        .await?
        .into_iter()
        .map(|ambulance| {
            let next = workflow::next_allowed_step(&ambulance);
            FleetRow {
                progress: workflow::progress(&ambulance),
                next_step_name: next.map(|s| s.name.to_string()).unwrap_or_default(),
                next_step_path: next.map(|s| s.path.to_string()).unwrap_or_default(),
                ambulance,
            }
        })
        .collect();

    let open_incidents = store
        .list_incidents(IncidentFilter { ambulance_id: None, open_only: true })
        .await?
        .len();

    let tmpl = DashboardTemplate {
        greeting: time_greeting(&ctx.display_name),
        ctx,
        alerts,
        alert_counts,
        fleet,
        open_incidents,
    };
    render(tmpl)
}
