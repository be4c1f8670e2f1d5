//! Operational-cycle workflow: the four ordered steps every ambulance goes
//! through between check-ins, and the gate that keeps them in order.

pub mod gate;
pub mod steps;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::errors::AppError;
use crate::models::ambulance::Ambulance;
use crate::store::AmbulanceStore;

pub use gate::{
    WorkflowProgress, StepStatus, ensure_in_order, is_step_accessible, next_allowed_step, progress,
};
pub use steps::{StepKey, WORKFLOW_STEPS, WorkflowStep};

/// Result of a completion request.
#[derive(Debug, Clone, Serialize)]
pub struct StepCompletion {
    pub ambulance: Ambulance,
    /// `false` when the step had already been completed and nothing changed.
    pub applied: bool,
}

/// Next step for the ambulance with `id`, or `None` once its cycle is done.
pub async fn next_step_for<S>(store: &S, id: i64) -> Result<Option<StepKey>, AppError>
where
    S: AmbulanceStore + ?Sized,
{
    let ambulance = store.get_ambulance(id).await?;
    Ok(next_allowed_step(&ambulance).map(|s| s.key))
}

/// Mark `step` complete.
///
/// Completing an already-completed step is a no-op. Completing a step whose
/// predecessors are not all done fails with `StepOutOfOrder` and leaves
/// every flag untouched. The final write is a guarded compare-and-set, so
/// two racing requests cannot push the ambulance past a missing step.
pub async fn complete_step<S>(
    store: &S,
    id: i64,
    step: StepKey,
    now: DateTime<Utc>,
) -> Result<StepCompletion, AppError>
where
    S: AmbulanceStore + ?Sized,
{
    let ambulance = store.get_ambulance(id).await?;
    if ambulance.is_complete(step) {
        return Ok(StepCompletion { ambulance, applied: false });
    }
    ensure_in_order(&ambulance, step)?;

    if let Some(updated) = store.complete_step_guarded(id, step, now).await? {
        log::info!("Ambulance {id}: step '{}' completed", step.as_str());
        return Ok(StepCompletion { ambulance: updated, applied: true });
    }

    // Lost a race: someone else completed it or reset the cycle in between.
    let current = store.get_ambulance(id).await?;
    if current.is_complete(step) {
        Ok(StepCompletion { ambulance: current, applied: false })
    } else {
        Err(gate::out_of_order(&current, step))
    }
}

/// Clear all four flags so a new cycle can begin.
pub async fn reset_cycle<S>(store: &S, id: i64) -> Result<Ambulance, AppError>
where
    S: AmbulanceStore + ?Sized,
{
    let ambulance = store.reset_flags(id).await?;
    log::info!("Ambulance {id}: workflow cycle reset");
    Ok(ambulance)
}

/// Record a check-in: validates the odometer reading and starts a new cycle.
pub async fn check_in<S>(
    store: &S,
    id: i64,
    user_id: i64,
    kilometers: i64,
    now: DateTime<Utc>,
) -> Result<Ambulance, AppError>
where
    S: AmbulanceStore + ?Sized,
{
    let updated = store.record_check_in(id, user_id, kilometers, now).await?;
    log::info!("Ambulance {id}: checked in at {kilometers} km by user {user_id}");
    Ok(updated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ambulance::AmbulanceInput;
    use crate::store::MemoryStore;

    async fn setup() -> (MemoryStore, i64) {
        let store = MemoryStore::new();
        let amb = store
            .create_ambulance(&AmbulanceInput {
                name: "SVB-01".into(),
                plate: "0001-AAA".into(),
                model: String::new(),
                year: 2021,
            })
            .await
            .unwrap();
        (store, amb.id)
    }

    #[tokio::test]
    async fn repeat_completion_is_not_applied() {
        let (store, id) = setup().await;
        let first = complete_step(&store, id, StepKey::DailyCheck, Utc::now()).await.unwrap();
        assert!(first.applied);
        let again = complete_step(&store, id, StepKey::DailyCheck, Utc::now()).await.unwrap();
        assert!(!again.applied);
        assert_eq!(again.ambulance.daily_check_at, first.ambulance.daily_check_at);
    }

    #[tokio::test]
    async fn check_in_rejects_lower_odometer() {
        let (store, id) = setup().await;
        check_in(&store, id, 1, 1_000, Utc::now()).await.unwrap();
        assert!(matches!(
            check_in(&store, id, 1, 999, Utc::now()).await,
            Err(AppError::InvalidInput(_))
        ));
        assert!(matches!(
            check_in(&store, id, 1, -5, Utc::now()).await,
            Err(AppError::InvalidInput(_))
        ));
    }
}
