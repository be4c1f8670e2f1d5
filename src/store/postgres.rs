use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::errors::AppError;
use crate::models::ambulance::{self, Ambulance, AmbulanceInput};
use crate::models::audit::{self, AuditEntry, NewAuditEntry};
use crate::models::incident::{self, Incident, IncidentFilter, IncidentInput};
use crate::models::material::{self, Material, MaterialDraft, MaterialFilter, MaterialRef};
use crate::models::space::{self, Space};
use crate::models::user::{self, NewUser, User};
use crate::workflow::StepKey;
use super::{AmbulanceStore, AuditStore, IncidentStore, MaterialStore, SpaceStore, UserStore};

/// PostgreSQL-backed store; a thin adapter over the `models::*` query functions.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl AmbulanceStore for PgStore {
    async fn list_ambulances(&self) -> Result<Vec<Ambulance>, AppError> {
        ambulance::find_all(&self.pool).await
    }

    async fn get_ambulance(&self, id: i64) -> Result<Ambulance, AppError> {
        ambulance::find_by_id(&self.pool, id).await?.ok_or(AppError::NotFound)
    }

    async fn create_ambulance(&self, input: &AmbulanceInput) -> Result<Ambulance, AppError> {
        ambulance::create(&self.pool, input).await
    }

    async fn update_ambulance(&self, id: i64, input: &AmbulanceInput) -> Result<Ambulance, AppError> {
        ambulance::update(&self.pool, id, input).await?.ok_or(AppError::NotFound)
    }

    async fn delete_ambulance(&self, id: i64) -> Result<(), AppError> {
        if ambulance::delete(&self.pool, id).await? {
            Ok(())
        } else {
            Err(AppError::NotFound)
        }
    }

    async fn complete_step_guarded(
        &self,
        id: i64,
        step: StepKey,
        at: DateTime<Utc>,
    ) -> Result<Option<Ambulance>, AppError> {
        match ambulance::complete_step_guarded(&self.pool, id, step, at).await? {
            Some(updated) => Ok(Some(updated)),
            None if ambulance::exists(&self.pool, id).await? => Ok(None),
            None => Err(AppError::NotFound),
        }
    }

    async fn reset_flags(&self, id: i64) -> Result<Ambulance, AppError> {
        ambulance::reset_flags(&self.pool, id).await?.ok_or(AppError::NotFound)
    }

    async fn record_check_in(
        &self,
        id: i64,
        user_id: i64,
        kilometers: i64,
        at: DateTime<Utc>,
    ) -> Result<Ambulance, AppError> {
        if let Some(updated) = ambulance::record_check_in(&self.pool, id, user_id, kilometers, at).await? {
            return Ok(updated);
        }
        // Missing row or a reading below the stored one.
        let current = self.get_ambulance(id).await?;
        current.check_odometer(kilometers)?;
        Err(AppError::Conflict(
            "Odometer changed during the check-in, try again".to_string(),
        ))
    }
}

#[async_trait]
impl MaterialStore for PgStore {
    async fn list_materials(&self, filter: MaterialFilter) -> Result<Vec<Material>, AppError> {
        material::find_all(&self.pool, filter).await
    }

    async fn get_material(&self, material: MaterialRef) -> Result<Material, AppError> {
        material::find_by_ref(&self.pool, material).await?.ok_or(AppError::NotFound)
    }

    async fn create_material(&self, draft: &MaterialDraft) -> Result<Material, AppError> {
        material::create(&self.pool, draft).await
    }

    async fn update_material(&self, id: i64, draft: &MaterialDraft) -> Result<Material, AppError> {
        material::update(&self.pool, id, draft).await?.ok_or(AppError::NotFound)
    }

    async fn adjust_quantity(&self, material: MaterialRef, delta: i64) -> Result<Material, AppError> {
        if let Some(adjusted) = material::adjust_quantity(&self.pool, material, delta).await? {
            return Ok(adjusted);
        }
        // Either the row is gone or the guard refused the new quantity.
        let current = self.get_material(material).await?;
        match current.adjusted_quantity(delta) {
            Err(e) => Err(e),
            Ok(_) => Err(AppError::Conflict(format!(
                "Stock of '{}' changed during the adjustment, try again",
                current.name
            ))),
        }
    }

    async fn delete_material(&self, material: MaterialRef) -> Result<(), AppError> {
        if material::delete(&self.pool, material).await? {
            Ok(())
        } else {
            Err(AppError::NotFound)
        }
    }
}

#[async_trait]
impl SpaceStore for PgStore {
    async fn list_spaces(&self) -> Result<Vec<Space>, AppError> {
        space::find_all(&self.pool).await
    }

    async fn get_space(&self, id: i64) -> Result<Space, AppError> {
        space::find_by_id(&self.pool, id).await?.ok_or(AppError::NotFound)
    }

    async fn create_space(&self, name: &str) -> Result<Space, AppError> {
        space::create(&self.pool, name).await
    }

    async fn rename_space(&self, id: i64, name: &str) -> Result<Space, AppError> {
        space::rename(&self.pool, id, name).await?.ok_or(AppError::NotFound)
    }

    async fn delete_space(&self, id: i64) -> Result<(), AppError> {
        if space::delete(&self.pool, id).await? {
            Ok(())
        } else {
            Err(AppError::NotFound)
        }
    }
}

#[async_trait]
impl IncidentStore for PgStore {
    async fn list_incidents(&self, filter: IncidentFilter) -> Result<Vec<Incident>, AppError> {
        incident::find_all(&self.pool, filter).await
    }

    async fn create_incident(
        &self,
        ambulance_id: i64,
        input: &IncidentInput,
        reported_by: i64,
    ) -> Result<Incident, AppError> {
        incident::create(&self.pool, ambulance_id, input, reported_by).await
    }

    async fn resolve_incident(
        &self,
        id: i64,
        resolved_by: i64,
        at: DateTime<Utc>,
    ) -> Result<Incident, AppError> {
        incident::resolve(&self.pool, id, resolved_by, at)
            .await?
            .ok_or(AppError::NotFound)
    }
}

#[async_trait]
impl UserStore for PgStore {
    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        user::find_by_username(&self.pool, username).await
    }

    async fn find_user_by_id(&self, id: i64) -> Result<Option<User>, AppError> {
        user::find_by_id(&self.pool, id).await
    }

    async fn list_users(&self) -> Result<Vec<User>, AppError> {
        user::find_all(&self.pool).await
    }

    async fn count_users(&self) -> Result<i64, AppError> {
        user::count(&self.pool).await
    }

    async fn create_user(&self, new_user: &NewUser) -> Result<User, AppError> {
        user::create(&self.pool, new_user).await
    }
}

#[async_trait]
impl AuditStore for PgStore {
    async fn record_audit(&self, entry: &NewAuditEntry) -> Result<(), AppError> {
        audit::insert(&self.pool, entry).await
    }

    async fn list_audit(&self, limit: i64, offset: i64) -> Result<Vec<AuditEntry>, AppError> {
        audit::find_recent(&self.pool, limit, offset).await
    }
}
