use askama::Template;

use crate::models::ambulance::Ambulance;
use crate::workflow::{StepStatus, WorkflowProgress};
use super::PageContext;

#[derive(Template)]
#[template(path = "workflow/overview.html")]
pub struct WorkflowOverviewTemplate {
    pub ctx: PageContext,
    pub ambulance: Ambulance,
    pub progress: WorkflowProgress,
}

#[derive(Template)]
#[template(path = "workflow/step.html")]
pub struct WorkflowStepTemplate {
    pub ctx: PageContext,
    pub ambulance: Ambulance,
    pub progress: WorkflowProgress,
    pub step: StepStatus,
    /// The step is already done; the page is shown for reference only.
    pub read_only: bool,
}
