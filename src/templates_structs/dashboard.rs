use askama::Template;

use crate::alerts::{Alert, SeverityCounts};
use crate::models::ambulance::Ambulance;
use crate::workflow::WorkflowProgress;
use super::PageContext;

/// One row of the fleet status table.
pub struct FleetRow {
    pub ambulance: Ambulance,
    pub progress: WorkflowProgress,
    pub next_step_name: String,
    pub next_step_path: String,
}

#[derive(Template)]
#[template(path = "dashboard.html")]
pub struct DashboardTemplate {
    pub ctx: PageContext,
    pub greeting: String,
    pub alerts: Vec<Alert>,
    pub alert_counts: SeverityCounts,
    pub fleet: Vec<FleetRow>,
    pub open_incidents: usize,
}
