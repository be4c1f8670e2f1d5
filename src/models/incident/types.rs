use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "incident_severity", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum IncidentSeverity {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "incident_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum IncidentStatus {
    Open,
    Resolved,
}

/// A problem reported against an ambulance (breakdown, damage, missing kit...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Incident {
    pub id: i64,
    pub ambulance_id: i64,
    pub title: String,
    pub description: String,
    pub severity: IncidentSeverity,
    pub status: IncidentStatus,
    pub reported_by: Option<i64>,
    pub resolved_by: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IncidentInput {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub severity: Option<IncidentSeverity>,
}

impl IncidentInput {
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        errors.extend(crate::auth::validate::validate_required(&self.title, "Title", 200));
        errors.extend(crate::auth::validate::validate_optional(&self.description, "Description", 4000));
        errors
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IncidentFilter {
    pub ambulance_id: Option<i64>,
    pub open_only: bool,
}

impl IncidentFilter {
    pub fn matches(&self, incident: &Incident) -> bool {
        self.ambulance_id.is_none_or(|id| incident.ambulance_id == id)
            && (!self.open_only || incident.status == IncidentStatus::Open)
    }
}
