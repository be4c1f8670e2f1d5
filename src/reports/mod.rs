//! Fleet status report: workflow progress, open incidents and alert load per
//! ambulance.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use crate::alerts::{self, Alert, SeverityCounts};
use crate::errors::AppError;
use crate::models::incident::IncidentFilter;
use crate::models::material::MaterialFilter;
use crate::store::FleetStore;
use crate::workflow::{self, StepKey};

#[derive(Debug, Clone, Serialize)]
pub struct AmbulanceReport {
    pub ambulance_id: i64,
    pub name: String,
    pub plate: String,
    pub completed_steps: usize,
    pub next_step: Option<StepKey>,
    pub open_incidents: usize,
    pub alerts: SeverityCounts,
    pub last_known_kilometers: Option<i64>,
    pub last_check_in_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FleetTotals {
    pub ambulances: usize,
    pub cycles_complete: usize,
    pub open_incidents: usize,
    pub alerts: SeverityCounts,
}

#[derive(Debug, Clone, Serialize)]
pub struct FleetReport {
    pub generated_at: DateTime<Utc>,
    pub ambulances: Vec<AmbulanceReport>,
    pub totals: FleetTotals,
}

pub async fn fleet_report<S>(store: &S, today: NaiveDate, now: DateTime<Utc>) -> Result<FleetReport, AppError>
where
    S: FleetStore + ?Sized,
{
    let ambulances = store.list_ambulances().await?;
    let materials = store.list_materials(MaterialFilter::All).await?;
    let open = store
        .list_incidents(IncidentFilter { ambulance_id: None, open_only: true })
        .await?;
    let all_alerts = alerts::generate(&ambulances, &materials, today, now);

    let mut open_by_ambulance: HashMap<i64, usize> = HashMap::new();
    for incident in &open {
        *open_by_ambulance.entry(incident.ambulance_id).or_default() += 1;
    }
    let mut alerts_by_ambulance: HashMap<i64, Vec<Alert>> = HashMap::new();
    for alert in &all_alerts {
        if let Some(id) = alert.ambulance_id {
            alerts_by_ambulance.entry(id).or_default().push(alert.clone());
        }
    }

    let rows: Vec<AmbulanceReport> = ambulances
        .iter()
        .map(|a| AmbulanceReport {
            ambulance_id: a.id,
            name: a.name.clone(),
            plate: a.plate.clone(),
            completed_steps: a.completed_count(),
            next_step: workflow::next_allowed_step(a).map(|s| s.key),
            open_incidents: open_by_ambulance.get(&a.id).copied().unwrap_or(0),
            alerts: alerts_by_ambulance
                .get(&a.id)
                .map(|list| alerts::count_by_severity(list))
                .unwrap_or_default(),
            last_known_kilometers: a.last_known_kilometers,
            last_check_in_date: a.last_check_in_date,
        })
        .collect();

    let totals = FleetTotals {
        ambulances: rows.len(),
        cycles_complete: rows.iter().filter(|r| r.next_step.is_none()).count(),
        open_incidents: open.len(),
        alerts: alerts::count_by_severity(&all_alerts),
    };

    Ok(FleetReport { generated_at: now, ambulances: rows, totals })
}
