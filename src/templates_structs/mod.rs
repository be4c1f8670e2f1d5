// Askama template contexts, grouped by page area.

use actix_session::Session;

use crate::alerts::{self, Severity};
use crate::auth::csrf;
use crate::auth::session::{Permissions, get_display_name, get_permissions, get_username, take_flash};
use crate::errors::AppError;
use crate::store::FleetStore;

pub const APP_NAME: &str = "AmbuFleet";

/// Common context shared by all authenticated pages.
/// Templates access these as `ctx.username`, `ctx.flash`, etc.
pub struct PageContext {
    pub username: String,
    pub display_name: String,
    pub avatar_initial: String,
    pub permissions: Permissions,
    pub flash: Option<String>,
    pub app_name: String,
    pub csrf_token: String,
    pub current_path: String,
    /// High-severity alerts across the fleet, shown as a header badge.
    pub urgent_alert_count: usize,
}

impl PageContext {
    /// Context for any page; computes the fleet-wide alert badge.
    pub async fn build<S>(session: &Session, store: &S, current_path: &str) -> Result<Self, AppError>
    where
        S: FleetStore + ?Sized,
    {
        let urgent_alert_count = match alerts::compute_alerts(
            store,
            alerts::AlertScope::default(),
            alerts::local_today(),
            chrono::Utc::now(),
        )
        .await
        {
            Ok(list) => list.iter().filter(|a| a.severity == Severity::High).count(),
            Err(e) => {
                log::warn!("Could not compute alert badge: {e}");
                0
            }
        };
        Self::with_badge(session, current_path, urgent_alert_count)
    }

    /// Context for pages that already hold the fleet-wide alert list.
    pub fn with_badge(
        session: &Session,
        current_path: &str,
        urgent_alert_count: usize,
    ) -> Result<Self, AppError> {
        let username = get_username(session)?;
        let permissions = get_permissions(session)?;
        let display_name = get_display_name(session)
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| username.clone());
        let flash = take_flash(session);
        let csrf_token = csrf::get_or_create_token(session);
        let avatar_initial = display_name.chars().next().unwrap_or('?').to_uppercase().to_string();

        Ok(Self {
            username,
            display_name,
            avatar_initial,
            permissions,
            flash,
            app_name: APP_NAME.to_string(),
            csrf_token,
            current_path: current_path.to_string(),
            urgent_alert_count,
        })
    }

    pub fn is_active(&self, prefix: &str) -> bool {
        self.current_path.starts_with(prefix)
    }
}

mod common;
mod dashboard;
mod workflow;

pub use common::*;
pub use dashboard::*;
pub use workflow::*;
