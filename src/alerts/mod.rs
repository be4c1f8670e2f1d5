//! Alert engine: derives expiry, low-stock and pending-workflow alerts from
//! the current ambulance and material snapshots on every request.

pub mod generators;
pub mod types;

use chrono::{DateTime, NaiveDate, Utc};

use crate::errors::AppError;
use crate::models::material::MaterialFilter;
use crate::store::{AmbulanceStore, MaterialStore, SpaceStore};

pub use generators::{AMBULANCE_EXPIRY_WARNING_DAYS, CENTRAL_EXPIRY_WARNING_DAYS, generate};
pub use types::{Alert, AlertScope, AlertType, Severity, SeverityCounts};

/// Calendar date used for expiry arithmetic, in the server's local timezone.
pub fn local_today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

/// Compute the alert list for `scope`.
///
/// * no scope: every material and every ambulance
/// * `ambulance_id`: that ambulance's materials and its pending steps
/// * `space_id`: the materials stored in that space
/// * both: the union of the two
///
/// An unknown ambulance or space is `NotFound`.
pub async fn compute_alerts<S>(
    store: &S,
    scope: AlertScope,
    today: NaiveDate,
    now: DateTime<Utc>,
) -> Result<Vec<Alert>, AppError>
where
    S: AmbulanceStore + MaterialStore + SpaceStore + ?Sized,
{
    let (materials, ambulances) = match (scope.ambulance_id, scope.space_id) {
        (None, None) => (
            store.list_materials(MaterialFilter::All).await?,
            store.list_ambulances().await?,
        ),
        (ambulance_id, space_id) => {
            let mut materials = Vec::new();
            let mut ambulances = Vec::new();
            if let Some(id) = ambulance_id {
                ambulances.push(store.get_ambulance(id).await?);
                materials.extend(store.list_materials(MaterialFilter::Ambulance(Some(id))).await?);
            }
            if let Some(id) = space_id {
                store.get_space(id).await?;
                materials.extend(store.list_materials(MaterialFilter::Central(Some(id))).await?);
            }
            (materials, ambulances)
        }
    };

    let alerts = generate(&ambulances, &materials, today, now);
    log::debug!(
        "Computed {} alert(s) from {} material(s) and {} ambulance(s)",
        alerts.len(),
        materials.len(),
        ambulances.len()
    );
    Ok(alerts)
}

pub fn count_by_severity(alerts: &[Alert]) -> SeverityCounts {
    alerts.iter().fold(SeverityCounts::default(), |mut counts, alert| {
        match alert.severity {
            Severity::High => counts.high += 1,
            Severity::Medium => counts.medium += 1,
            Severity::Low => counts.low += 1,
        }
        counts
    })
}
