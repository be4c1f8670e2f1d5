use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A physical storage location for central (ampulario) stock.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Space {
    pub id: i64,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SpaceInput {
    pub name: String,
}

impl SpaceInput {
    pub fn validate(&self) -> Vec<String> {
        crate::auth::validate::validate_required(&self.name, "Name", 100)
            .into_iter()
            .collect()
    }
}
