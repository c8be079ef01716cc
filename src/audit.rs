use serde_json::Value;
use uuid::Uuid;

use crate::{error::AppResult, state::AppState, store::AuditEntry};

pub async fn log_audit(
    state: &AppState,
    actor_id: Option<Uuid>,
    action: &str,
    resource: Option<&str>,
    metadata: Option<Value>,
) -> AppResult<()> {
    state
        .audit
        .record(AuditEntry {
            actor_id,
            action: action.to_string(),
            resource: resource.map(str::to_string),
            metadata,
        })
        .await
}
