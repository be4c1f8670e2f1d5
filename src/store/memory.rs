use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::errors::AppError;
use crate::models::ambulance::{Ambulance, AmbulanceInput};
use crate::models::audit::{AuditEntry, NewAuditEntry};
use crate::models::incident::{
    Incident, IncidentFilter, IncidentInput, IncidentSeverity, IncidentStatus,
};
use crate::models::material::{
    Material, MaterialDraft, MaterialFilter, MaterialKind, MaterialOwner, MaterialRef,
};
use crate::models::space::Space;
use crate::models::user::{NewUser, User};
use crate::workflow::StepKey;
use super::{AmbulanceStore, AuditStore, IncidentStore, MaterialStore, SpaceStore, UserStore};

#[derive(Default)]
struct Tables {
    ambulances: BTreeMap<i64, Ambulance>,
    ambulance_materials: BTreeMap<i64, Material>,
    central_materials: BTreeMap<i64, Material>,
    spaces: BTreeMap<i64, Space>,
    incidents: BTreeMap<i64, Incident>,
    users: BTreeMap<i64, User>,
    audit: Vec<AuditEntry>,
    seq: Sequences,
}

#[derive(Default)]
struct Sequences {
    ambulance: i64,
    ambulance_material: i64,
    central_material: i64,
    space: i64,
    incident: i64,
    user: i64,
    audit: i64,
}

fn next(counter: &mut i64) -> i64 {
    *counter += 1;
    *counter
}

impl Tables {
    fn materials(&self, kind: MaterialKind) -> &BTreeMap<i64, Material> {
        match kind {
            MaterialKind::Ambulance => &self.ambulance_materials,
            MaterialKind::Central => &self.central_materials,
        }
    }

    fn materials_mut(&mut self, kind: MaterialKind) -> &mut BTreeMap<i64, Material> {
        match kind {
            MaterialKind::Ambulance => &mut self.ambulance_materials,
            MaterialKind::Central => &mut self.central_materials,
        }
    }

    fn owner_exists(&self, owner: &MaterialOwner) -> bool {
        match owner {
            MaterialOwner::Ambulance { ambulance_id, .. } => self.ambulances.contains_key(ambulance_id),
            MaterialOwner::Central { space_id, .. } => self.spaces.contains_key(space_id),
        }
    }

    fn plate_taken(&self, plate: &str, except: Option<i64>) -> bool {
        self.ambulances
            .values()
            .any(|a| a.plate == plate && Some(a.id) != except)
    }

    fn space_name_taken(&self, name: &str, except: Option<i64>) -> bool {
        self.spaces
            .values()
            .any(|s| s.name == name && Some(s.id) != except)
    }
}

/// In-process store with the same observable behavior as [`super::PgStore`].
///
/// One mutex guards every table, so each trait call is atomic the way a
/// single SQL statement is.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn with<R>(&self, f: impl FnOnce(&mut Tables) -> R) -> R {
        let mut guard = self.tables.lock().unwrap_or_else(|e| e.into_inner());
        f(&mut guard)
    }
}

fn sort_by_name<T>(items: &mut [T], key: impl Fn(&T) -> (&str, i64)) {
    items.sort_by(|a, b| key(a).cmp(&key(b)));
}

#[async_trait]
impl AmbulanceStore for MemoryStore {
    async fn list_ambulances(&self) -> Result<Vec<Ambulance>, AppError> {
        let mut rows: Vec<Ambulance> = self.with(|t| t.ambulances.values().cloned().collect());
        sort_by_name(&mut rows, |a| (a.name.as_str(), a.id));
        Ok(rows)
    }

    async fn get_ambulance(&self, id: i64) -> Result<Ambulance, AppError> {
        self.with(|t| t.ambulances.get(&id).cloned())
            .ok_or(AppError::NotFound)
    }

    async fn create_ambulance(&self, input: &AmbulanceInput) -> Result<Ambulance, AppError> {
        self.with(|t| {
            let plate = input.plate.trim();
            if t.plate_taken(plate, None) {
                return Err(AppError::Conflict(
                    "An ambulance with this plate already exists".to_string(),
                ));
            }
            let now = Utc::now();
            let ambulance = Ambulance {
                id: next(&mut t.seq.ambulance),
                name: input.name.trim().to_string(),
                plate: plate.to_string(),
                model: input.model.trim().to_string(),
                year: input.year,
                daily_check_completed: false,
                daily_check_at: None,
                mechanical_review_completed: false,
                mechanical_review_at: None,
                cleaning_completed: false,
                cleaning_at: None,
                inventory_completed: false,
                inventory_at: None,
                last_known_kilometers: None,
                last_check_in_by_user_id: None,
                last_check_in_date: None,
                created_at: now,
                updated_at: now,
            };
            t.ambulances.insert(ambulance.id, ambulance.clone());
            Ok(ambulance)
        })
    }

    async fn update_ambulance(&self, id: i64, input: &AmbulanceInput) -> Result<Ambulance, AppError> {
        self.with(|t| {
            let plate = input.plate.trim();
            if t.plate_taken(plate, Some(id)) {
                return Err(AppError::Conflict(
                    "An ambulance with this plate already exists".to_string(),
                ));
            }
            let ambulance = t.ambulances.get_mut(&id).ok_or(AppError::NotFound)?;
            ambulance.name = input.name.trim().to_string();
            ambulance.plate = plate.to_string();
            ambulance.model = input.model.trim().to_string();
            ambulance.year = input.year;
            ambulance.updated_at = Utc::now();
            Ok(ambulance.clone())
        })
    }

    async fn delete_ambulance(&self, id: i64) -> Result<(), AppError> {
        self.with(|t| {
            t.ambulances.remove(&id).ok_or(AppError::NotFound)?;
            t.ambulance_materials.retain(|_, m| m.ambulance_id() != Some(id));
            t.incidents.retain(|_, i| i.ambulance_id != id);
            Ok(())
        })
    }

    async fn complete_step_guarded(
        &self,
        id: i64,
        step: StepKey,
        at: DateTime<Utc>,
    ) -> Result<Option<Ambulance>, AppError> {
        self.with(|t| {
            let ambulance = t.ambulances.get_mut(&id).ok_or(AppError::NotFound)?;
            let ready = step.prerequisites().iter().all(|p| ambulance.is_complete(*p));
            if !ready || ambulance.is_complete(step) {
                return Ok(None);
            }
            ambulance.mark_complete(step, at);
            Ok(Some(ambulance.clone()))
        })
    }

    async fn reset_flags(&self, id: i64) -> Result<Ambulance, AppError> {
        self.with(|t| {
            let ambulance = t.ambulances.get_mut(&id).ok_or(AppError::NotFound)?;
            ambulance.clear_workflow();
            ambulance.updated_at = Utc::now();
            Ok(ambulance.clone())
        })
    }

    async fn record_check_in(
        &self,
        id: i64,
        user_id: i64,
        kilometers: i64,
        at: DateTime<Utc>,
    ) -> Result<Ambulance, AppError> {
        self.with(|t| {
            let ambulance = t.ambulances.get_mut(&id).ok_or(AppError::NotFound)?;
            ambulance.check_odometer(kilometers)?;
            ambulance.clear_workflow();
            ambulance.last_known_kilometers = Some(kilometers);
            ambulance.last_check_in_by_user_id = (user_id != 0).then_some(user_id);
            ambulance.last_check_in_date = Some(at);
            ambulance.updated_at = at;
            Ok(ambulance.clone())
        })
    }
}

#[async_trait]
impl MaterialStore for MemoryStore {
    async fn list_materials(&self, filter: MaterialFilter) -> Result<Vec<Material>, AppError> {
        let (mut local, mut central): (Vec<Material>, Vec<Material>) = self.with(|t| {
            let pick = |table: &BTreeMap<i64, Material>| -> Vec<Material> {
                table.values().filter(|m| filter.matches(m)).cloned().collect()
            };
            (pick(&t.ambulance_materials), pick(&t.central_materials))
        });
        local.sort_by(|a, b| {
            (a.ambulance_id(), a.name.as_str(), a.id).cmp(&(b.ambulance_id(), b.name.as_str(), b.id))
        });
        central.sort_by(|a, b| {
            (a.space_id(), a.name.as_str(), a.id).cmp(&(b.space_id(), b.name.as_str(), b.id))
        });
        local.extend(central);
        Ok(local)
    }

    async fn get_material(&self, material: MaterialRef) -> Result<Material, AppError> {
        self.with(|t| t.materials(material.kind).get(&material.id).cloned())
            .ok_or(AppError::NotFound)
    }

    async fn create_material(&self, draft: &MaterialDraft) -> Result<Material, AppError> {
        self.with(|t| {
            if !t.owner_exists(&draft.owner) {
                return Err(AppError::NotFound);
            }
            let kind = draft.owner.kind();
            let id = match kind {
                MaterialKind::Ambulance => next(&mut t.seq.ambulance_material),
                MaterialKind::Central => next(&mut t.seq.central_material),
            };
            let now = Utc::now();
            let material = Material {
                id,
                name: draft.name.clone(),
                quantity: draft.quantity,
                expiry_date: draft.expiry_date,
                min_stock_level: draft.min_stock_level,
                owner: draft.owner.clone(),
                created_at: now,
                updated_at: now,
            };
            t.materials_mut(kind).insert(id, material.clone());
            Ok(material)
        })
    }

    async fn update_material(&self, id: i64, draft: &MaterialDraft) -> Result<Material, AppError> {
        self.with(|t| {
            let kind = draft.owner.kind();
            if !t.materials(kind).contains_key(&id) {
                return Err(AppError::NotFound);
            }
            if !t.owner_exists(&draft.owner) {
                return Err(AppError::NotFound);
            }
            let material = t.materials_mut(kind).get_mut(&id).ok_or(AppError::NotFound)?;
            material.name = draft.name.clone();
            material.quantity = draft.quantity;
            material.expiry_date = draft.expiry_date;
            material.min_stock_level = draft.min_stock_level;
            material.owner = draft.owner.clone();
            material.updated_at = Utc::now();
            Ok(material.clone())
        })
    }

    async fn adjust_quantity(&self, material: MaterialRef, delta: i64) -> Result<Material, AppError> {
        self.with(|t| {
            let row = t
                .materials_mut(material.kind)
                .get_mut(&material.id)
                .ok_or(AppError::NotFound)?;
            row.quantity = row.adjusted_quantity(delta)?;
            row.updated_at = Utc::now();
            Ok(row.clone())
        })
    }

    async fn delete_material(&self, material: MaterialRef) -> Result<(), AppError> {
        self.with(|t| {
            t.materials_mut(material.kind)
                .remove(&material.id)
                .map(|_| ())
                .ok_or(AppError::NotFound)
        })
    }
}

#[async_trait]
impl SpaceStore for MemoryStore {
    async fn list_spaces(&self) -> Result<Vec<Space>, AppError> {
        let mut rows: Vec<Space> = self.with(|t| t.spaces.values().cloned().collect());
        sort_by_name(&mut rows, |s| (s.name.as_str(), s.id));
        Ok(rows)
    }

    async fn get_space(&self, id: i64) -> Result<Space, AppError> {
        self.with(|t| t.spaces.get(&id).cloned()).ok_or(AppError::NotFound)
    }

    async fn create_space(&self, name: &str) -> Result<Space, AppError> {
        self.with(|t| {
            let name = name.trim();
            if t.space_name_taken(name, None) {
                return Err(AppError::Conflict("A space with this name already exists".to_string()));
            }
            let now = Utc::now();
            let space = Space {
                id: next(&mut t.seq.space),
                name: name.to_string(),
                created_at: now,
                updated_at: now,
            };
            t.spaces.insert(space.id, space.clone());
            Ok(space)
        })
    }

    async fn rename_space(&self, id: i64, name: &str) -> Result<Space, AppError> {
        self.with(|t| {
            let name = name.trim();
            if t.space_name_taken(name, Some(id)) {
                return Err(AppError::Conflict("A space with this name already exists".to_string()));
            }
            let space = t.spaces.get_mut(&id).ok_or(AppError::NotFound)?;
            space.name = name.to_string();
            space.updated_at = Utc::now();
            Ok(space.clone())
        })
    }

    async fn delete_space(&self, id: i64) -> Result<(), AppError> {
        self.with(|t| {
            if !t.spaces.contains_key(&id) {
                return Err(AppError::NotFound);
            }
            let in_use = t
                .central_materials
                .values()
                .filter(|m| m.space_id() == Some(id))
                .count();
            if in_use > 0 {
                return Err(AppError::Conflict(format!(
                    "Space still holds {in_use} material(s); move or delete them first"
                )));
            }
            t.spaces.remove(&id);
            Ok(())
        })
    }
}

#[async_trait]
impl IncidentStore for MemoryStore {
    async fn list_incidents(&self, filter: IncidentFilter) -> Result<Vec<Incident>, AppError> {
        let mut rows: Vec<Incident> = self.with(|t| {
            t.incidents
                .values()
                .filter(|i| filter.matches(i))
                .cloned()
                .collect()
        });
        rows.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
        Ok(rows)
    }

    async fn create_incident(
        &self,
        ambulance_id: i64,
        input: &IncidentInput,
        reported_by: i64,
    ) -> Result<Incident, AppError> {
        self.with(|t| {
            if !t.ambulances.contains_key(&ambulance_id) {
                return Err(AppError::NotFound);
            }
            let incident = Incident {
                id: next(&mut t.seq.incident),
                ambulance_id,
                title: input.title.trim().to_string(),
                description: input.description.trim().to_string(),
                severity: input.severity.unwrap_or(IncidentSeverity::Medium),
                status: IncidentStatus::Open,
                reported_by: (reported_by != 0).then_some(reported_by),
                resolved_by: None,
                created_at: Utc::now(),
                resolved_at: None,
            };
            t.incidents.insert(incident.id, incident.clone());
            Ok(incident)
        })
    }

    async fn resolve_incident(
        &self,
        id: i64,
        resolved_by: i64,
        at: DateTime<Utc>,
    ) -> Result<Incident, AppError> {
        self.with(|t| {
            let incident = t.incidents.get_mut(&id).ok_or(AppError::NotFound)?;
            if incident.status == IncidentStatus::Open {
                incident.status = IncidentStatus::Resolved;
                incident.resolved_by = (resolved_by != 0).then_some(resolved_by);
                incident.resolved_at = Some(at);
            }
            Ok(incident.clone())
        })
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        Ok(self.with(|t| {
            t.users
                .values()
                .find(|u| u.username == username && u.is_active)
                .cloned()
        }))
    }

    async fn find_user_by_id(&self, id: i64) -> Result<Option<User>, AppError> {
        Ok(self.with(|t| t.users.get(&id).cloned()))
    }

    async fn list_users(&self) -> Result<Vec<User>, AppError> {
        let mut rows: Vec<User> = self.with(|t| t.users.values().cloned().collect());
        rows.sort_by(|a, b| a.username.cmp(&b.username));
        Ok(rows)
    }

    async fn count_users(&self) -> Result<i64, AppError> {
        Ok(self.with(|t| t.users.len() as i64))
    }

    async fn create_user(&self, new_user: &NewUser) -> Result<User, AppError> {
        self.with(|t| {
            let username = new_user.username.trim();
            if t.users.values().any(|u| u.username == username) {
                return Err(AppError::Conflict("Username already taken".to_string()));
            }
            let user = User {
                id: next(&mut t.seq.user),
                username: username.to_string(),
                password_hash: new_user.password_hash.clone(),
                display_name: new_user.display_name.trim().to_string(),
                role: new_user.role,
                is_active: true,
                created_at: Utc::now(),
            };
            t.users.insert(user.id, user.clone());
            Ok(user)
        })
    }
}

#[async_trait]
impl AuditStore for MemoryStore {
    async fn record_audit(&self, entry: &NewAuditEntry) -> Result<(), AppError> {
        self.with(|t| {
            let row = AuditEntry {
                id: next(&mut t.seq.audit),
                user_id: entry.user_id,
                action: entry.action.clone(),
                target_type: entry.target_type.clone(),
                target_id: entry.target_id,
                details: entry.details.clone(),
                created_at: Utc::now(),
            };
            t.audit.push(row);
        });
        Ok(())
    }

    async fn list_audit(&self, limit: i64, offset: i64) -> Result<Vec<AuditEntry>, AppError> {
        let limit = usize::try_from(limit.max(0)).unwrap_or(usize::MAX);
        let offset = usize::try_from(offset.max(0)).unwrap_or(0);
        Ok(self.with(|t| {
            t.audit
                .iter()
                .rev()
                .skip(offset)
                .take(limit)
                .cloned()
                .collect()
        }))
    }
}
