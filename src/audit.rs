use chrono::Utc;
use serde_json::Value;
use uuid::Uuid;

use crate::{error::AppResult, models::AuditEntry, store::DynStore};

pub async fn log_audit(
    store: &DynStore,
    user_id: Option<Uuid>,
    action: &str,
    resource: Option<&str>,
    metadata: Option<Value>,
) -> AppResult<()> {
    let entry = AuditEntry {
        id: Uuid::new_v4(),
        user_id,
        action: action.to_string(),
        resource: resource.map(str::to_string),
        metadata,
        created_at: Utc::now(),
    };
    store.record_audit(entry).await
}
