//! Alert generators. Each one inspects a single record and emits at most one
//! alert per condition, so a pass never produces duplicate ids.

use chrono::{DateTime, NaiveDate, Utc};

use crate::models::ambulance::Ambulance;
use crate::models::material::{Material, MaterialKind};
use super::types::{Alert, AlertType, Severity};

/// Days of notice before an ambulance-carried material expires.
pub const AMBULANCE_EXPIRY_WARNING_DAYS: i64 = 7;
/// Days of notice before a centrally stored material expires.
pub const CENTRAL_EXPIRY_WARNING_DAYS: i64 = 3;

/// Whole calendar days from `today` to `date`; negative once it has passed.
pub fn days_until(date: NaiveDate, today: NaiveDate) -> i64 {
    (date - today).num_days()
}

fn attach_material(mut alert: Alert, material: &Material) -> Alert {
    alert.material_id = Some(material.id);
    alert.ambulance_id = material.ambulance_id();
    alert.space_id = material.space_id();
    alert
}

/// Expired or expiring-soon alert for one material, if any.
pub fn expiry_alert(material: &Material, today: NaiveDate, now: DateTime<Utc>) -> Option<Alert> {
    let expiry = material.expiry_date?;
    let days = days_until(expiry, today);

    let (expired, expiring, threshold) = match material.kind() {
        MaterialKind::Ambulance => (
            AlertType::ExpiredMaterial,
            AlertType::ExpiringSoon,
            AMBULANCE_EXPIRY_WARNING_DAYS,
        ),
        MaterialKind::Central => (
            AlertType::AmpularioExpiredMaterial,
            AlertType::AmpularioExpiringSoon,
            CENTRAL_EXPIRY_WARNING_DAYS,
        ),
    };

    let alert = if days < 0 {
        Alert::new(
            expired,
            material.id,
            Severity::High,
            format!("'{}' expired on {} ({} day(s) ago)", material.name, expiry, -days),
            now,
        )
    } else if days <= threshold {
        let when = match days {
            0 => "today".to_string(),
            1 => "tomorrow".to_string(),
            n => format!("in {n} days"),
        };
        Alert::new(
            expiring,
            material.id,
            Severity::Medium,
            format!("'{}' expires {} ({})", material.name, when, expiry),
            now,
        )
    } else {
        return None;
    };
    Some(attach_material(alert, material))
}

/// Low-stock alert when the quantity has fallen to the configured minimum.
pub fn low_stock_alert(material: &Material, now: DateTime<Utc>) -> Option<Alert> {
    let min = material.min_stock_level?;
    if material.quantity > min {
        return None;
    }
    let alert_type = match material.kind() {
        MaterialKind::Ambulance => AlertType::LowStockAmbulance,
        MaterialKind::Central => AlertType::LowStockCentral,
    };
    let severity = if material.quantity == 0 && min > 0 {
        Severity::High
    } else {
        Severity::Medium
    };
    let alert = Alert::new(
        alert_type,
        material.id,
        severity,
        format!(
            "Low stock of '{}': {} left (minimum {})",
            material.name, material.quantity, min
        ),
        now,
    );
    Some(attach_material(alert, material))
}

/// Pending daily check, mechanical review and cleaning. The three are
/// independent of each other and of the gate's current position.
pub fn workflow_alerts(ambulance: &Ambulance, now: DateTime<Utc>) -> Vec<Alert> {
    let pending = [
        (
            !ambulance.daily_check_completed,
            AlertType::DailyCheckPending,
            Severity::Medium,
            "daily check",
        ),
        (
            !ambulance.mechanical_review_completed,
            AlertType::ReviewPending,
            Severity::Medium,
            "mechanical review",
        ),
        (
            !ambulance.cleaning_completed,
            AlertType::CleaningPending,
            Severity::Low,
            "cleaning",
        ),
    ];

    pending
        .into_iter()
        .filter(|(is_pending, ..)| *is_pending)
        .map(|(_, alert_type, severity, what)| {
            let mut alert = Alert::new(
                alert_type,
                ambulance.id,
                severity,
                format!("{} ({}): {} pending", ambulance.name, ambulance.plate, what),
                now,
            );
            alert.ambulance_id = Some(ambulance.id);
            alert
        })
        .collect()
}

/// Run every generator and order the result most urgent first.
///
/// The sort is stable, so alerts of equal severity keep generation order:
/// expiry alerts, then low-stock alerts (both in material order), then
/// ambulance workflow alerts.
pub fn generate(
    ambulances: &[Ambulance],
    materials: &[Material],
    today: NaiveDate,
    now: DateTime<Utc>,
) -> Vec<Alert> {
    let mut alerts: Vec<Alert> = materials
        .iter()
        .filter_map(|m| expiry_alert(m, today, now))
        .collect();
    alerts.extend(materials.iter().filter_map(|m| low_stock_alert(m, now)));
    alerts.extend(ambulances.iter().flat_map(|a| workflow_alerts(a, now)));

    alerts.sort_by_key(|a| a.severity.rank());
    alerts
}
