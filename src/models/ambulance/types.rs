use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::workflow::StepKey;

/// An ambulance together with its operational-cycle state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Ambulance {
    pub id: i64,
    pub name: String,
    pub plate: String,
    pub model: String,
    pub year: i32,
    pub daily_check_completed: bool,
    pub daily_check_at: Option<DateTime<Utc>>,
    pub mechanical_review_completed: bool,
    pub mechanical_review_at: Option<DateTime<Utc>>,
    pub cleaning_completed: bool,
    pub cleaning_at: Option<DateTime<Utc>>,
    pub inventory_completed: bool,
    pub inventory_at: Option<DateTime<Utc>>,
    pub last_known_kilometers: Option<i64>,
    pub last_check_in_by_user_id: Option<i64>,
    pub last_check_in_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Ambulance {
    /// `InvalidInput` when `kilometers` is negative or below the last reading.
    pub fn check_odometer(&self, kilometers: i64) -> Result<(), AppError> {
        if kilometers < 0 {
            return Err(AppError::InvalidInput("Kilometers cannot be negative".to_string()));
        }
        match self.last_known_kilometers {
            Some(last) if kilometers < last => Err(AppError::InvalidInput(format!(
                "Kilometers ({kilometers}) cannot be lower than the last recorded value ({last})"
            ))),
            _ => Ok(()),
        }
    }

    pub fn is_complete(&self, step: StepKey) -> bool {
        match step {
            StepKey::DailyCheck => self.daily_check_completed,
            StepKey::MechanicalReview => self.mechanical_review_completed,
            StepKey::Cleaning => self.cleaning_completed,
            StepKey::Inventory => self.inventory_completed,
        }
    }

    pub fn completed_at(&self, step: StepKey) -> Option<DateTime<Utc>> {
        match step {
            StepKey::DailyCheck => self.daily_check_at,
            StepKey::MechanicalReview => self.mechanical_review_at,
            StepKey::Cleaning => self.cleaning_at,
            StepKey::Inventory => self.inventory_at,
        }
    }

    pub fn mark_complete(&mut self, step: StepKey, at: DateTime<Utc>) {
        let (flag, stamp) = match step {
            StepKey::DailyCheck => (&mut self.daily_check_completed, &mut self.daily_check_at),
            StepKey::MechanicalReview => {
                (&mut self.mechanical_review_completed, &mut self.mechanical_review_at)
            }
            StepKey::Cleaning => (&mut self.cleaning_completed, &mut self.cleaning_at),
            StepKey::Inventory => (&mut self.inventory_completed, &mut self.inventory_at),
        };
        *flag = true;
        *stamp = Some(at);
        self.updated_at = at;
    }

    /// Clear the four completion flags. Timestamps are kept as history.
    pub fn clear_workflow(&mut self) {
        self.daily_check_completed = false;
        self.mechanical_review_completed = false;
        self.cleaning_completed = false;
        self.inventory_completed = false;
    }

    pub fn completed_count(&self) -> usize {
        StepKey::all().iter().filter(|s| self.is_complete(**s)).count()
    }
}

/// Create/update payload for the descriptive attributes.
#[derive(Debug, Clone, Deserialize)]
pub struct AmbulanceInput {
    pub name: String,
    pub plate: String,
    #[serde(default)]
    pub model: String,
    pub year: i32,
}

impl AmbulanceInput {
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        errors.extend(crate::auth::validate::validate_required(&self.name, "Name", 100));
        errors.extend(crate::auth::validate::validate_required(&self.plate, "Plate", 20));
        errors.extend(crate::auth::validate::validate_optional(&self.model, "Model", 100));
        if !(1950..=2100).contains(&self.year) {
            errors.push("Year must be between 1950 and 2100".to_string());
        }
        errors
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CheckInInput {
    pub kilometers: i64,
}
