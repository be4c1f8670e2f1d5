use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Admin,
    Technician,
    Viewer,
}

/// Every permission code known to the application.
pub const ALL_PERMISSIONS: &[&str] = &[
    "fleet.view",
    "fleet.manage",
    "workflow.perform",
    "stock.manage",
    "incidents.manage",
    "audit.view",
    "users.manage",
];

impl UserRole {
    pub fn permissions(self) -> &'static [&'static str] {
        match self {
            UserRole::Admin => ALL_PERMISSIONS,
            UserRole::Technician => &[
                "fleet.view",
                "workflow.perform",
                "stock.manage",
                "incidents.manage",
            ],
            UserRole::Viewer => &["fleet.view"],
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            UserRole::Admin => "Administrator",
            UserRole::Technician => "Technician",
            UserRole::Viewer => "Viewer",
        }
    }
}

/// User row including the password hash. Never serialized.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub password_hash: String,
    pub display_name: String,
    pub role: UserRole,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// User as exposed through the API.
#[derive(Debug, Clone, Serialize)]
pub struct UserDisplay {
    pub id: i64,
    pub username: String,
    pub display_name: String,
    pub role: UserRole,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserDisplay {
    fn from(u: User) -> Self {
        UserDisplay {
            id: u.id,
            username: u.username,
            display_name: u.display_name,
            role: u.role,
            is_active: u.is_active,
            created_at: u.created_at,
        }
    }
}

pub struct NewUser {
    pub username: String,
    pub password_hash: String,
    pub display_name: String,
    pub role: UserRole,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiUserRequest {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub display_name: String,
    pub role: UserRole,
}
