use serde_json::Value;

use crate::models::audit::NewAuditEntry;
use crate::store::AuditStore;

/// Record an audit entry. Failures are logged and never abort the caller's
/// action.
pub async fn log<S>(
    store: &S,
    user_id: i64,
    action: &str,
    target_type: &str,
    target_id: i64,
    details: Value,
) where
    S: AuditStore + ?Sized,
{
    let entry = NewAuditEntry {
        user_id,
        action: action.to_string(),
        target_type: target_type.to_string(),
        target_id,
        details,
    };
    if let Err(e) = store.record_audit(&entry).await {
        log::error!("Failed to write audit entry '{}' for {} {}: {}", action, target_type, target_id, e);
    }
}
