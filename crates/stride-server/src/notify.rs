use serde_json::Value;
use tracing::info;
use uuid::Uuid;

/// Fire-and-forget notification sink, invoked after successful lifecycle
/// transitions. Push/websocket delivery hangs off this seam; nothing in the
/// engine depends on it, and a dropped notification never fails a request.
pub fn notify(user_id: Uuid, event: &str, payload: Value) {
    info!(user = %user_id, event, %payload, "notification dispatched");
}
