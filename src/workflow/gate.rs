//! Pure step-gating rules over an ambulance's completion flags.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::errors::AppError;
use crate::models::ambulance::Ambulance;
use super::steps::{StepKey, WORKFLOW_STEPS, WorkflowStep};

/// First step whose flag is still false, or `None` once the cycle is done.
pub fn next_allowed_step(ambulance: &Ambulance) -> Option<&'static WorkflowStep> {
    WORKFLOW_STEPS.iter().find(|step| !ambulance.is_complete(step.key))
}

/// Completed steps may be revisited read-only; otherwise only the next step is open.
pub fn is_step_accessible(ambulance: &Ambulance, step: StepKey) -> bool {
    ambulance.is_complete(step)
        || next_allowed_step(ambulance).is_some_and(|next| next.key == step)
}

/// Fails with `StepOutOfOrder` when any step before `step` is incomplete.
pub fn ensure_in_order(ambulance: &Ambulance, step: StepKey) -> Result<(), AppError> {
    if step.prerequisites().iter().all(|p| ambulance.is_complete(*p)) {
        Ok(())
    } else {
        Err(out_of_order(ambulance, step))
    }
}

pub fn out_of_order(ambulance: &Ambulance, requested: StepKey) -> AppError {
    AppError::StepOutOfOrder {
        requested,
        next: next_allowed_step(ambulance).map(|s| s.key),
    }
}

/// Per-step view used by the API and the workflow pages.
#[derive(Debug, Clone, Serialize)]
pub struct StepStatus {
    pub key: StepKey,
    pub name: &'static str,
    pub path: &'static str,
    pub completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
    pub accessible: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct WorkflowProgress {
    pub ambulance_id: i64,
    pub steps: Vec<StepStatus>,
    pub next_step: Option<StepKey>,
    pub completed_count: usize,
    pub is_complete: bool,
}

pub fn progress(ambulance: &Ambulance) -> WorkflowProgress {
    let steps: Vec<StepStatus> = WORKFLOW_STEPS
        .iter()
        .map(|step| {
            let completed = ambulance.is_complete(step.key);
            StepStatus {
                key: step.key,
                name: step.name,
                path: step.path,
                completed,
                // A completed step's timestamp from a previous cycle is not shown.
                completed_at: if completed { ambulance.completed_at(step.key) } else { None },
                accessible: is_step_accessible(ambulance, step.key),
            }
        })
        .collect();
    let next_step = next_allowed_step(ambulance).map(|s| s.key);
    WorkflowProgress {
        ambulance_id: ambulance.id,
        completed_count: ambulance.completed_count(),
        is_complete: next_step.is_none(),
        next_step,
        steps,
    }
}
