use actix_session::Session;

use crate::errors::AppError;
use crate::models::user::User;

/// Permission codes of the signed-in user; `has()` is callable from templates.
#[derive(Debug, Clone, Default)]
pub struct Permissions(pub Vec<String>);

impl Permissions {
    pub fn has(&self, code: &str) -> bool {
        self.0.iter().any(|p| p == code)
    }

    pub fn from_csv(csv: &str) -> Self {
        let codes = csv
            .split(',')
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect();
        Permissions(codes)
    }

    pub fn to_csv(&self) -> String {
        self.0.join(",")
    }
}

/// Store the authenticated user in the session. The session is renewed
/// first so a pre-login cookie cannot be reused.
pub fn establish(session: &Session, user: &User) -> Result<(), AppError> {
    session.renew();
    let permissions = Permissions(user.role.permissions().iter().map(|p| p.to_string()).collect());
    put(session, "user_id", &user.id)?;
    put(session, "username", &user.username)?;
    put(session, "display_name", &user.display_name)?;
    put(session, "role", user.role.label())?;
    put(session, "permissions", &permissions.to_csv())?;
    Ok(())
}

fn put<T: serde::Serialize + ?Sized>(session: &Session, key: &str, value: &T) -> Result<(), AppError> {
    session
        .insert(key, value)
        .map_err(|e| AppError::Session(format!("Failed to store '{key}': {e}")))
}

pub fn get_user_id(session: &Session) -> Option<i64> {
    session.get::<i64>("user_id").unwrap_or(None)
}

/// Signed-in user id or a `Session` error (401).
pub fn require_user_id(session: &Session) -> Result<i64, AppError> {
    get_user_id(session).ok_or_else(|| AppError::Session("Not signed in".to_string()))
}

fn required<T: serde::de::DeserializeOwned>(session: &Session, key: &str) -> Result<T, AppError> {
    match session.get::<T>(key) {
        Ok(Some(value)) => Ok(value),
        Ok(None) => Err(AppError::Session(format!("No {key} in session"))),
        Err(e) => Err(AppError::Session(format!("Unreadable {key}: {e}"))),
    }
}

pub fn get_username(session: &Session) -> Result<String, AppError> {
    required(session, "username")
}

pub fn get_display_name(session: &Session) -> Option<String> {
    session.get::<String>("display_name").unwrap_or(None)
}

pub fn get_permissions(session: &Session) -> Result<Permissions, AppError> {
    required::<String>(session, "permissions").map(|csv| Permissions::from_csv(&csv))
}

pub fn set_flash(session: &Session, message: impl Into<String>) {
    let _ = session.insert("flash", message.into());
}

pub fn take_flash(session: &Session) -> Option<String> {
    let flash = session.get::<String>("flash").unwrap_or(None);
    if flash.is_some() {
        session.remove("flash");
    }
    flash
}

/// `PermissionDenied` (403) unless the signed-in role grants `code`.
pub fn require_permission(session: &Session, code: &str) -> Result<(), AppError> {
    if get_permissions(session)?.has(code) {
        Ok(())
    } else {
        Err(AppError::PermissionDenied(code.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn csv_round_trip_skips_blanks() {
        let p = Permissions::from_csv("fleet.view, ,workflow.perform,");
        assert!(p.has("fleet.view"));
        assert!(p.has("workflow.perform"));
        assert!(!p.has("users.manage"));
        assert_eq!(p.to_csv(), "fleet.view,workflow.perform");
    }
}
