use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertType {
    ReviewPending,
    ExpiringSoon,
    ExpiredMaterial,
    AmpularioExpiringSoon,
    AmpularioExpiredMaterial,
    CleaningPending,
    DailyCheckPending,
    LowStockAmbulance,
    LowStockCentral,
}

impl AlertType {
    pub fn as_str(self) -> &'static str {
        match self {
            AlertType::ReviewPending => "review_pending",
            AlertType::ExpiringSoon => "expiring_soon",
            AlertType::ExpiredMaterial => "expired_material",
            AlertType::AmpularioExpiringSoon => "ampulario_expiring_soon",
            AlertType::AmpularioExpiredMaterial => "ampulario_expired_material",
            AlertType::CleaningPending => "cleaning_pending",
            AlertType::DailyCheckPending => "daily_check_pending",
            AlertType::LowStockAmbulance => "low_stock_ambulance",
            AlertType::LowStockCentral => "low_stock_central",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    High,
    Medium,
    Low,
}

impl Severity {
    /// Sort rank; lower is more urgent.
    pub fn rank(self) -> u8 {
        match self {
            Severity::High => 0,
            Severity::Medium => 1,
            Severity::Low => 2,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Severity::High => "high",
            Severity::Medium => "medium",
            Severity::Low => "low",
        }
    }
}

impl std::str::FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "high" => Ok(Severity::High),
            "medium" => Ok(Severity::Medium),
            "low" => Ok(Severity::Low),
            other => Err(format!("Unknown severity '{other}'")),
        }
    }
}

/// A computed, never-persisted alert.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Alert {
    /// `"{type}-{source id}"`; stable across recomputation.
    pub id: String,
    #[serde(rename = "type")]
    pub alert_type: AlertType,
    pub message: String,
    pub ambulance_id: Option<i64>,
    pub material_id: Option<i64>,
    pub space_id: Option<i64>,
    pub severity: Severity,
    pub created_at: DateTime<Utc>,
}

impl Alert {
    pub fn new(alert_type: AlertType, source_id: i64, severity: Severity, message: String, at: DateTime<Utc>) -> Self {
        Alert {
            id: format!("{}-{}", alert_type.as_str(), source_id),
            alert_type,
            message,
            ambulance_id: None,
            material_id: None,
            space_id: None,
            severity,
            created_at: at,
        }
    }
}

/// Narrows an alert scan. Both `None` means the whole fleet and every space.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct AlertScope {
    pub ambulance_id: Option<i64>,
    pub space_id: Option<i64>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SeverityCounts {
    pub high: usize,
    pub medium: usize,
    pub low: usize,
}

impl SeverityCounts {
    pub fn total(&self) -> usize {
        self.high + self.medium + self.low
    }
}
