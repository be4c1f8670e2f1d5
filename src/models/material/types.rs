use chrono::{DateTime, Local, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "material_category", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum MaterialCategory {
    Consumable,
    NonConsumable,
}

/// Administration route of a central (ampulario) medication.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "administration_route")]
pub enum AdministrationRoute {
    #[sqlx(rename = "IV/IM")]
    #[serde(rename = "IV/IM")]
    IvIm,
    Nebulizador,
    Oral,
}

impl AdministrationRoute {
    pub fn as_str(self) -> &'static str {
        match self {
            AdministrationRoute::IvIm => "IV/IM",
            AdministrationRoute::Nebulizador => "Nebulizador",
            AdministrationRoute::Oral => "Oral",
        }
    }
}

/// Which of the two stock sources a material belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaterialKind {
    /// Carried on an ambulance.
    Ambulance,
    /// Stored centrally in a space (the "ampulario").
    Central,
}

/// Owner-specific part of a material.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MaterialOwner {
    Ambulance {
        ambulance_id: i64,
        category: MaterialCategory,
        location: Option<String>,
    },
    Central {
        space_id: i64,
        dose: String,
        unit: String,
        route: AdministrationRoute,
    },
}

impl MaterialOwner {
    pub fn kind(&self) -> MaterialKind {
        match self {
            MaterialOwner::Ambulance { .. } => MaterialKind::Ambulance,
            MaterialOwner::Central { .. } => MaterialKind::Central,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Material {
    pub id: i64,
    pub name: String,
    pub quantity: i64,
    pub expiry_date: Option<NaiveDate>,
    pub min_stock_level: Option<i64>,
    #[serde(flatten)]
    pub owner: MaterialOwner,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Material {
    pub fn kind(&self) -> MaterialKind {
        self.owner.kind()
    }

    pub fn ambulance_id(&self) -> Option<i64> {
        match &self.owner {
            MaterialOwner::Ambulance { ambulance_id, .. } => Some(*ambulance_id),
            MaterialOwner::Central { .. } => None,
        }
    }

    pub fn space_id(&self) -> Option<i64> {
        match &self.owner {
            MaterialOwner::Central { space_id, .. } => Some(*space_id),
            MaterialOwner::Ambulance { .. } => None,
        }
    }

    pub fn reference(&self) -> MaterialRef {
        MaterialRef { kind: self.kind(), id: self.id }
    }

    /// Quantity after applying `delta`, or `InvalidInput` when it would drop
    /// below zero or leave the `i64` range.
    pub fn adjusted_quantity(&self, delta: i64) -> Result<i64, AppError> {
        match self.quantity.checked_add(delta) {
            Some(quantity) if quantity >= 0 => Ok(quantity),
            Some(_) => Err(AppError::InvalidInput(format!(
                "Cannot remove {} unit(s) of '{}': only {} in stock",
                delta.unsigned_abs(),
                self.name,
                self.quantity
            ))),
            None => Err(AppError::InvalidInput(format!(
                "Adjusting '{}' by {delta} is out of range",
                self.name
            ))),
        }
    }
}

/// Identifies a material row; ids are only unique within a kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MaterialRef {
    pub kind: MaterialKind,
    pub id: i64,
}

/// Which materials to load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaterialFilter {
    All,
    /// Ambulance materials, optionally of one ambulance.
    Ambulance(Option<i64>),
    /// Central materials, optionally of one space.
    Central(Option<i64>),
}

impl MaterialFilter {
    pub fn includes_kind(&self, kind: MaterialKind) -> bool {
        match (self, kind) {
            (MaterialFilter::All, _) => true,
            (MaterialFilter::Ambulance(_), MaterialKind::Ambulance) => true,
            (MaterialFilter::Central(_), MaterialKind::Central) => true,
            _ => false,
        }
    }

    pub fn matches(&self, material: &Material) -> bool {
        match self {
            MaterialFilter::All => true,
            MaterialFilter::Ambulance(None) => material.kind() == MaterialKind::Ambulance,
            MaterialFilter::Ambulance(Some(id)) => material.ambulance_id() == Some(*id),
            MaterialFilter::Central(None) => material.kind() == MaterialKind::Central,
            MaterialFilter::Central(Some(id)) => material.space_id() == Some(*id),
        }
    }
}

/// A validated material ready to be written.
#[derive(Debug, Clone, PartialEq)]
pub struct MaterialDraft {
    pub name: String,
    pub quantity: i64,
    pub expiry_date: Option<NaiveDate>,
    pub min_stock_level: Option<i64>,
    pub owner: MaterialOwner,
}

/// JSON body for creating or replacing an ambulance material.
#[derive(Debug, Clone, Deserialize)]
pub struct AmbulanceMaterialInput {
    pub name: String,
    pub quantity: i64,
    pub expiry_date: Option<String>,
    pub min_stock_level: Option<i64>,
    pub category: Option<MaterialCategory>,
    pub location: Option<String>,
    /// Moves the material to another ambulance on update.
    pub ambulance_id: Option<i64>,
}

/// JSON body for creating or replacing a central material.
#[derive(Debug, Clone, Deserialize)]
pub struct CentralMaterialInput {
    pub name: String,
    #[serde(default)]
    pub dose: String,
    #[serde(default)]
    pub unit: String,
    pub route: AdministrationRoute,
    pub quantity: i64,
    pub expiry_date: Option<String>,
    pub min_stock_level: Option<i64>,
    /// Moves the material to another space on update.
    pub space_id: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct QuantityAdjustment {
    pub delta: i64,
}

impl AmbulanceMaterialInput {
    pub fn into_draft(self, ambulance_id: i64) -> Result<MaterialDraft, AppError> {
        let mut errors = common_errors(&self.name, self.quantity, self.min_stock_level);
        errors.extend(crate::auth::validate::validate_optional(
            self.location.as_deref().unwrap_or(""),
            "Location",
            100,
        ));
        let expiry_date = parse_optional_date(self.expiry_date.as_deref(), &mut errors);
        crate::auth::validate::into_result(errors)?;
        Ok(MaterialDraft {
            name: self.name.trim().to_string(),
            quantity: self.quantity,
            expiry_date,
            min_stock_level: self.min_stock_level,
            owner: MaterialOwner::Ambulance {
                ambulance_id: self.ambulance_id.unwrap_or(ambulance_id),
                category: self.category.unwrap_or(MaterialCategory::Consumable),
                location: self
                    .location
                    .map(|l| l.trim().to_string())
                    .filter(|l| !l.is_empty()),
            },
        })
    }
}

impl CentralMaterialInput {
    pub fn into_draft(self, space_id: i64) -> Result<MaterialDraft, AppError> {
        let mut errors = common_errors(&self.name, self.quantity, self.min_stock_level);
        errors.extend(crate::auth::validate::validate_optional(&self.dose, "Dose", 50));
        errors.extend(crate::auth::validate::validate_optional(&self.unit, "Unit", 20));
        let expiry_date = parse_optional_date(self.expiry_date.as_deref(), &mut errors);
        crate::auth::validate::into_result(errors)?;
        Ok(MaterialDraft {
            name: self.name.trim().to_string(),
            quantity: self.quantity,
            expiry_date,
            min_stock_level: self.min_stock_level,
            owner: MaterialOwner::Central {
                space_id: self.space_id.unwrap_or(space_id),
                dose: self.dose.trim().to_string(),
                unit: self.unit.trim().to_string(),
                route: self.route,
            },
        })
    }
}

fn common_errors(name: &str, quantity: i64, min_stock_level: Option<i64>) -> Vec<String> {
    let mut errors = Vec::new();
    errors.extend(crate::auth::validate::validate_required(name, "Name", 150));
    if quantity < 0 {
        errors.push("Quantity cannot be negative".to_string());
    }
    if min_stock_level.is_some_and(|m| m < 0) {
        errors.push("Minimum stock level cannot be negative".to_string());
    }
    errors
}

fn parse_optional_date(raw: Option<&str>, errors: &mut Vec<String>) -> Option<NaiveDate> {
    let raw = raw.map(str::trim).filter(|s| !s.is_empty())?;
    match parse_expiry_date(raw) {
        Ok(date) => Some(date),
        Err(e) => {
            errors.push(e);
            None
        }
    }
}

/// Parse an expiry date given either as `YYYY-MM-DD` or as an RFC 3339
/// date-time. Date-times with an offset land on the server's local calendar
/// date, the same clock `alerts::local_today` reads.
pub fn parse_expiry_date(raw: &str) -> Result<NaiveDate, String> {
    parse_expiry_date_in(raw, &Local)
}

fn parse_expiry_date_in<Tz: TimeZone>(raw: &str, tz: &Tz) -> Result<NaiveDate, String> {
    let raw = raw.trim();
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Ok(date);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(tz).date_naive());
    }
    if let Ok(dt) = chrono::NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S") {
        return Ok(dt.date());
    }
    Err(format!("Expiry date '{raw}' is not a valid date (expected YYYY-MM-DD)"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_and_datetime_dates() {
        let expected = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
        assert_eq!(parse_expiry_date("2026-03-01"), Ok(expected));
        assert_eq!(parse_expiry_date("2026-03-01T00:15:00"), Ok(expected));
        assert!(parse_expiry_date("2026-02-30").is_err());
        assert!(parse_expiry_date("01/03/2026").is_err());
    }

    #[test]
    fn offset_datetimes_use_the_local_calendar_date() {
        let madrid = chrono::FixedOffset::east_opt(3600).unwrap();
        let utc_minus_5 = "2026-03-01T23:30:00-05:00";
        assert_eq!(
            parse_expiry_date_in(utc_minus_5, &madrid),
            Ok(NaiveDate::from_ymd_opt(2026, 3, 2).unwrap())
        );
        assert_eq!(
            parse_expiry_date_in(utc_minus_5, &Utc),
            Ok(NaiveDate::from_ymd_opt(2026, 3, 2).unwrap())
        );
        let west = chrono::FixedOffset::west_opt(8 * 3600).unwrap();
        assert_eq!(
            parse_expiry_date_in(utc_minus_5, &west),
            Ok(NaiveDate::from_ymd_opt(2026, 3, 1).unwrap())
        );

        let local = DateTime::parse_from_rfc3339(utc_minus_5)
            .unwrap()
            .with_timezone(&Local)
            .date_naive();
        assert_eq!(parse_expiry_date(utc_minus_5), Ok(local));
    }

    #[test]
    fn negative_quantity_is_rejected() {
        let input = AmbulanceMaterialInput {
            name: "Gauze".into(),
            quantity: -1,
            expiry_date: None,
            min_stock_level: Some(-2),
            category: None,
            location: None,
            ambulance_id: None,
        };
        match input.into_draft(1) {
            Err(AppError::InvalidInput(msg)) => {
                assert!(msg.contains("Quantity"));
                assert!(msg.contains("Minimum stock"));
            }
            other => panic!("expected InvalidInput, got {other:?}"),
        }
    }

    #[test]
    fn central_draft_keeps_route_and_space() {
        let input = CentralMaterialInput {
            name: " Adrenalina ".into(),
            dose: "1mg".into(),
            unit: "ampolla".into(),
            route: AdministrationRoute::IvIm,
            quantity: 10,
            expiry_date: Some("2027-01-31".into()),
            min_stock_level: Some(4),
            space_id: None,
        };
        let draft = input.into_draft(7).expect("valid");
        assert_eq!(draft.name, "Adrenalina");
        assert_eq!(draft.owner.kind(), MaterialKind::Central);
        match draft.owner {
            MaterialOwner::Central { space_id, route, .. } => {
                assert_eq!(space_id, 7);
                assert_eq!(route, AdministrationRoute::IvIm);
            }
            _ => unreachable!(),
        }
    }

    #[test]
    fn filter_matches_owner() {
        let m = Material {
            id: 1,
            name: "Gauze".into(),
            quantity: 3,
            expiry_date: None,
            min_stock_level: None,
            owner: MaterialOwner::Ambulance {
                ambulance_id: 4,
                category: MaterialCategory::Consumable,
                location: None,
            },
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        assert!(MaterialFilter::All.matches(&m));
        assert!(MaterialFilter::Ambulance(Some(4)).matches(&m));
        assert!(!MaterialFilter::Ambulance(Some(5)).matches(&m));
        assert!(!MaterialFilter::Central(None).matches(&m));
    }
}
