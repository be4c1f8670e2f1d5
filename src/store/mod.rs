//! Persistence contracts used by the workflow gate, the alert engine and the
//! HTTP handlers.
//!
//! `PgStore` backs them with PostgreSQL; `MemoryStore` keeps everything in
//! process and is what the test suite runs against.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::errors::AppError;
use crate::models::ambulance::{Ambulance, AmbulanceInput};
use crate::models::audit::{AuditEntry, NewAuditEntry};
use crate::models::incident::{Incident, IncidentFilter, IncidentInput};
use crate::models::material::{Material, MaterialDraft, MaterialFilter, MaterialRef};
use crate::models::space::Space;
use crate::models::user::{NewUser, User};
use crate::workflow::StepKey;

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[async_trait]
pub trait AmbulanceStore: Send + Sync {
    async fn list_ambulances(&self) -> Result<Vec<Ambulance>, AppError>;
    /// `NotFound` when absent.
    async fn get_ambulance(&self, id: i64) -> Result<Ambulance, AppError>;
    async fn create_ambulance(&self, input: &AmbulanceInput) -> Result<Ambulance, AppError>;
    async fn update_ambulance(&self, id: i64, input: &AmbulanceInput) -> Result<Ambulance, AppError>;
    async fn delete_ambulance(&self, id: i64) -> Result<(), AppError>;
    /// Atomically set `step`'s flag iff every earlier flag is set and `step`
    /// is not complete yet. `Ok(None)` when that guard fails.
    async fn complete_step_guarded(
        &self,
        id: i64,
        step: StepKey,
        at: DateTime<Utc>,
    ) -> Result<Option<Ambulance>, AppError>;
    async fn reset_flags(&self, id: i64) -> Result<Ambulance, AppError>;
    /// Clear the flags and store the reading in one step. `InvalidInput` when
    /// `kilometers` is negative or below the stored reading.
    async fn record_check_in(
        &self,
        id: i64,
        user_id: i64,
        kilometers: i64,
        at: DateTime<Utc>,
    ) -> Result<Ambulance, AppError>;
}

#[async_trait]
pub trait MaterialStore: Send + Sync {
    async fn list_materials(&self, filter: MaterialFilter) -> Result<Vec<Material>, AppError>;
    async fn get_material(&self, material: MaterialRef) -> Result<Material, AppError>;
    /// `NotFound` when the owning ambulance or space does not exist.
    async fn create_material(&self, draft: &MaterialDraft) -> Result<Material, AppError>;
    async fn update_material(&self, id: i64, draft: &MaterialDraft) -> Result<Material, AppError>;
    /// Add `delta` to the quantity; `InvalidInput` if the result would be negative
    /// or overflow, leaving the row untouched.
    async fn adjust_quantity(&self, material: MaterialRef, delta: i64) -> Result<Material, AppError>;
    async fn delete_material(&self, material: MaterialRef) -> Result<(), AppError>;
}

#[async_trait]
pub trait SpaceStore: Send + Sync {
    async fn list_spaces(&self) -> Result<Vec<Space>, AppError>;
    async fn get_space(&self, id: i64) -> Result<Space, AppError>;
    async fn create_space(&self, name: &str) -> Result<Space, AppError>;
    async fn rename_space(&self, id: i64, name: &str) -> Result<Space, AppError>;
    /// `Conflict` while any material is still stored in the space.
    async fn delete_space(&self, id: i64) -> Result<(), AppError>;
}

#[async_trait]
pub trait IncidentStore: Send + Sync {
    async fn list_incidents(&self, filter: IncidentFilter) -> Result<Vec<Incident>, AppError>;
    async fn create_incident(
        &self,
        ambulance_id: i64,
        input: &IncidentInput,
        reported_by: i64,
    ) -> Result<Incident, AppError>;
    async fn resolve_incident(
        &self,
        id: i64,
        resolved_by: i64,
        at: DateTime<Utc>,
    ) -> Result<Incident, AppError>;
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, AppError>;
    async fn find_user_by_id(&self, id: i64) -> Result<Option<User>, AppError>;
    async fn list_users(&self) -> Result<Vec<User>, AppError>;
    async fn count_users(&self) -> Result<i64, AppError>;
    async fn create_user(&self, new_user: &NewUser) -> Result<User, AppError>;
}

#[async_trait]
pub trait AuditStore: Send + Sync {
    async fn record_audit(&self, entry: &NewAuditEntry) -> Result<(), AppError>;
    async fn list_audit(&self, limit: i64, offset: i64) -> Result<Vec<AuditEntry>, AppError>;
}

/// Everything the application needs from persistence.
pub trait FleetStore:
    AmbulanceStore + MaterialStore + SpaceStore + IncidentStore + UserStore + AuditStore
{
}

impl<T> FleetStore for T where
    T: AmbulanceStore + MaterialStore + SpaceStore + IncidentStore + UserStore + AuditStore
{
}
