use chrono::{DateTime, NaiveDate, Utc};
use sqlx::PgPool;

use crate::errors::AppError;
use super::types::*;

#[derive(sqlx::FromRow)]
struct AmbulanceMaterialRow {
    id: i64,
    ambulance_id: i64,
    name: String,
    category: MaterialCategory,
    quantity: i64,
    expiry_date: Option<NaiveDate>,
    min_stock_level: Option<i64>,
    location: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<AmbulanceMaterialRow> for Material {
    fn from(row: AmbulanceMaterialRow) -> Self {
        Material {
            id: row.id,
            name: row.name,
            quantity: row.quantity,
            expiry_date: row.expiry_date,
            min_stock_level: row.min_stock_level,
            owner: MaterialOwner::Ambulance {
                ambulance_id: row.ambulance_id,
                category: row.category,
                location: row.location,
            },
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct CentralMaterialRow {
    id: i64,
    space_id: i64,
    name: String,
    dose: String,
    unit: String,
    route: AdministrationRoute,
    quantity: i64,
    expiry_date: Option<NaiveDate>,
    min_stock_level: Option<i64>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<CentralMaterialRow> for Material {
    fn from(row: CentralMaterialRow) -> Self {
        Material {
            id: row.id,
            name: row.name,
            quantity: row.quantity,
            expiry_date: row.expiry_date,
            min_stock_level: row.min_stock_level,
            owner: MaterialOwner::Central {
                space_id: row.space_id,
                dose: row.dose,
                unit: row.unit,
                route: row.route,
            },
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

const AMBULANCE_MATERIAL_COLUMNS: &str = "id, ambulance_id, name, category, quantity, \
     expiry_date, min_stock_level, location, created_at, updated_at";

const CENTRAL_MATERIAL_COLUMNS: &str = "id, space_id, name, dose, unit, route, quantity, \
     expiry_date, min_stock_level, created_at, updated_at";

/// Load materials of either or both kinds. Ambulance materials come first.
pub async fn find_all(pool: &PgPool, filter: MaterialFilter) -> Result<Vec<Material>, AppError> {
    let mut materials = Vec::new();

    if filter.includes_kind(MaterialKind::Ambulance) {
        let owner = match filter {
            MaterialFilter::Ambulance(id) => id,
            _ => None,
        };
        let rows = sqlx::query_as::<_, AmbulanceMaterialRow>(&format!(
            "SELECT {AMBULANCE_MATERIAL_COLUMNS} FROM ambulance_materials \
             WHERE ($1::BIGINT IS NULL OR ambulance_id = $1) \
             ORDER BY ambulance_id, name, id"
        ))
        .bind(owner)
        .fetch_all(pool)
        .await?;
        materials.extend(rows.into_iter().map(Material::from));
    }

    if filter.includes_kind(MaterialKind::Central) {
        let owner = match filter {
            MaterialFilter::Central(id) => id,
            _ => None,
        };
        let rows = sqlx::query_as::<_, CentralMaterialRow>(&format!(
            "SELECT {CENTRAL_MATERIAL_COLUMNS} FROM ampulario_materials \
             WHERE ($1::BIGINT IS NULL OR space_id = $1) \
             ORDER BY space_id, name, id"
        ))
        .bind(owner)
        .fetch_all(pool)
        .await?;
        materials.extend(rows.into_iter().map(Material::from));
    }

    Ok(materials)
}

pub async fn find_by_ref(pool: &PgPool, material: MaterialRef) -> Result<Option<Material>, AppError> {
    let found = match material.kind {
        MaterialKind::Ambulance => sqlx::query_as::<_, AmbulanceMaterialRow>(&format!(
            "SELECT {AMBULANCE_MATERIAL_COLUMNS} FROM ambulance_materials WHERE id = $1"
        ))
        .bind(material.id)
        .fetch_optional(pool)
        .await?
        .map(Material::from),
        MaterialKind::Central => sqlx::query_as::<_, CentralMaterialRow>(&format!(
            "SELECT {CENTRAL_MATERIAL_COLUMNS} FROM ampulario_materials WHERE id = $1"
        ))
        .bind(material.id)
        .fetch_optional(pool)
        .await?
        .map(Material::from),
    };
    Ok(found)
}

/// Insert a material. The owner row must exist (foreign key).
pub async fn create(pool: &PgPool, draft: &MaterialDraft) -> Result<Material, AppError> {
    let created: Material = match &draft.owner {
        MaterialOwner::Ambulance { ambulance_id, category, location } => {
            sqlx::query_as::<_, AmbulanceMaterialRow>(&format!(
                "INSERT INTO ambulance_materials \
                 (ambulance_id, name, category, quantity, expiry_date, min_stock_level, location) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING {AMBULANCE_MATERIAL_COLUMNS}"
            ))
            .bind(ambulance_id)
            .bind(&draft.name)
            .bind(category)
            .bind(draft.quantity)
            .bind(draft.expiry_date)
            .bind(draft.min_stock_level)
            .bind(location)
            .fetch_one(pool)
            .await
            .map_err(map_missing_owner)?
            .into()
        }
        MaterialOwner::Central { space_id, dose, unit, route } => {
            sqlx::query_as::<_, CentralMaterialRow>(&format!(
                "INSERT INTO ampulario_materials \
                 (space_id, name, dose, unit, route, quantity, expiry_date, min_stock_level) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING {CENTRAL_MATERIAL_COLUMNS}"
            ))
            .bind(space_id)
            .bind(&draft.name)
            .bind(dose)
            .bind(unit)
            .bind(route)
            .bind(draft.quantity)
            .bind(draft.expiry_date)
            .bind(draft.min_stock_level)
            .fetch_one(pool)
            .await
            .map_err(map_missing_owner)?
            .into()
        }
    };
    Ok(created)
}

/// Replace a material's fields. `None` when the row does not exist.
pub async fn update(pool: &PgPool, id: i64, draft: &MaterialDraft) -> Result<Option<Material>, AppError> {
    let updated = match &draft.owner {
        MaterialOwner::Ambulance { ambulance_id, category, location } => {
            sqlx::query_as::<_, AmbulanceMaterialRow>(&format!(
                "UPDATE ambulance_materials SET ambulance_id = $2, name = $3, category = $4, \
                 quantity = $5, expiry_date = $6, min_stock_level = $7, location = $8, \
                 updated_at = NOW() WHERE id = $1 RETURNING {AMBULANCE_MATERIAL_COLUMNS}"
            ))
            .bind(id)
            .bind(ambulance_id)
            .bind(&draft.name)
            .bind(category)
            .bind(draft.quantity)
            .bind(draft.expiry_date)
            .bind(draft.min_stock_level)
            .bind(location)
            .fetch_optional(pool)
            .await
            .map_err(map_missing_owner)?
            .map(Material::from)
        }
        MaterialOwner::Central { space_id, dose, unit, route } => {
            sqlx::query_as::<_, CentralMaterialRow>(&format!(
                "UPDATE ampulario_materials SET space_id = $2, name = $3, dose = $4, unit = $5, \
                 route = $6, quantity = $7, expiry_date = $8, min_stock_level = $9, \
                 updated_at = NOW() WHERE id = $1 RETURNING {CENTRAL_MATERIAL_COLUMNS}"
            ))
            .bind(id)
            .bind(space_id)
            .bind(&draft.name)
            .bind(dose)
            .bind(unit)
            .bind(route)
            .bind(draft.quantity)
            .bind(draft.expiry_date)
            .bind(draft.min_stock_level)
            .fetch_optional(pool)
            .await
            .map_err(map_missing_owner)?
            .map(Material::from)
        }
    };
    Ok(updated)
}

/// Add `delta` to the quantity unless the result would go negative.
/// `None` when the row is missing or the guard rejected the change.
pub async fn adjust_quantity(pool: &PgPool, material: MaterialRef, delta: i64) -> Result<Option<Material>, AppError> {
    let adjusted = match material.kind {
        MaterialKind::Ambulance => sqlx::query_as::<_, AmbulanceMaterialRow>(&format!(
            "UPDATE ambulance_materials SET quantity = quantity + $2, updated_at = NOW() \
             WHERE id = $1 AND quantity + $2 >= 0 RETURNING {AMBULANCE_MATERIAL_COLUMNS}"
        ))
        .bind(material.id)
        .bind(delta)
        .fetch_optional(pool)
        .await
        .map_err(map_out_of_range)?
        .map(Material::from),
        MaterialKind::Central => sqlx::query_as::<_, CentralMaterialRow>(&format!(
            "UPDATE ampulario_materials SET quantity = quantity + $2, updated_at = NOW() \
             WHERE id = $1 AND quantity + $2 >= 0 RETURNING {CENTRAL_MATERIAL_COLUMNS}"
        ))
        .bind(material.id)
        .bind(delta)
        .fetch_optional(pool)
        .await
        .map_err(map_out_of_range)?
        .map(Material::from),
    };
    Ok(adjusted)
}

// BIGINT overflow (SQLSTATE 22003) is bad input, not a server fault.
fn map_out_of_range(e: sqlx::Error) -> AppError {
    if let sqlx::Error::Database(db) = &e {
        if db.code().as_deref() == Some("22003") {
            return AppError::InvalidInput("Quantity adjustment is out of range".to_string());
        }
    }
    AppError::from(e)
}

pub async fn delete(pool: &PgPool, material: MaterialRef) -> Result<bool, AppError> {
    let sql = match material.kind {
        MaterialKind::Ambulance => "DELETE FROM ambulance_materials WHERE id = $1",
        MaterialKind::Central => "DELETE FROM ampulario_materials WHERE id = $1",
    };
    let result = sqlx::query(sql).bind(material.id).execute(pool).await?;
    Ok(result.rows_affected() > 0)
}

fn map_missing_owner(e: sqlx::Error) -> AppError {
    if let sqlx::Error::Database(db) = &e {
        if db.is_foreign_key_violation() {
            return AppError::NotFound;
        }
    }
    AppError::from(e)
}
