use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// The four daily tasks, in the order they must be performed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKey {
    DailyCheck,
    MechanicalReview,
    Cleaning,
    Inventory,
}

static STEP_ORDER: [StepKey; 4] = [
    StepKey::DailyCheck,
    StepKey::MechanicalReview,
    StepKey::Cleaning,
    StepKey::Inventory,
];

/// Static descriptor of one workflow step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WorkflowStep {
    pub key: StepKey,
    pub name: &'static str,
    /// Path segment under `/ambulances/{id}/workflow/`.
    pub path: &'static str,
    /// Ambulance flag this step reads and writes.
    pub flag: &'static str,
}

pub static WORKFLOW_STEPS: [WorkflowStep; 4] = [
    WorkflowStep {
        key: StepKey::DailyCheck,
        name: "Daily check",
        path: "daily-check",
        flag: "dailyCheckCompleted",
    },
    WorkflowStep {
        key: StepKey::MechanicalReview,
        name: "Mechanical review",
        path: "mechanical-review",
        flag: "mechanicalReviewCompleted",
    },
    WorkflowStep {
        key: StepKey::Cleaning,
        name: "Cleaning",
        path: "cleaning",
        flag: "cleaningCompleted",
    },
    WorkflowStep {
        key: StepKey::Inventory,
        name: "Inventory",
        path: "inventory",
        flag: "inventoryCompleted",
    },
];

impl StepKey {
    pub fn all() -> &'static [StepKey] {
        &STEP_ORDER
    }

    pub fn position(self) -> usize {
        match self {
            StepKey::DailyCheck => 0,
            StepKey::MechanicalReview => 1,
            StepKey::Cleaning => 2,
            StepKey::Inventory => 3,
        }
    }

    /// Steps that must already be complete before this one.
    pub fn prerequisites(self) -> &'static [StepKey] {
        &STEP_ORDER[..self.position()]
    }

    pub fn descriptor(self) -> &'static WorkflowStep {
        &WORKFLOW_STEPS[self.position()]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            StepKey::DailyCheck => "daily_check",
            StepKey::MechanicalReview => "mechanical_review",
            StepKey::Cleaning => "cleaning",
            StepKey::Inventory => "inventory",
        }
    }

    /// Boolean column on `ambulances`.
    pub fn column(self) -> &'static str {
        match self {
            StepKey::DailyCheck => "daily_check_completed",
            StepKey::MechanicalReview => "mechanical_review_completed",
            StepKey::Cleaning => "cleaning_completed",
            StepKey::Inventory => "inventory_completed",
        }
    }

    /// Last-performed timestamp column on `ambulances`.
    pub fn timestamp_column(self) -> &'static str {
        match self {
            StepKey::DailyCheck => "daily_check_at",
            StepKey::MechanicalReview => "mechanical_review_at",
            StepKey::Cleaning => "cleaning_at",
            StepKey::Inventory => "inventory_at",
        }
    }
}

impl FromStr for StepKey {
    type Err = String;

    /// Accepts the snake_case key, the URL path segment or the flag name.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        WORKFLOW_STEPS
            .iter()
            .find(|step| {
                step.key.as_str() == s
                    || step.path == s
                    || step.flag == s
                    || step.key.column() == s
            })
            .map(|step| step.key)
            .ok_or_else(|| format!("Unknown workflow step '{s}'"))
    }
}
