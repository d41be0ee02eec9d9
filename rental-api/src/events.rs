use rental_core::events::publish_json;
use serde::Serialize;
use uuid::Uuid;

use crate::state::AppState;

/// Publishes after the write has been committed. A failed publish is logged
/// and does not fail the request.
pub(crate) async fn publish<E>(state: &AppState, topic: &str, key: Uuid, event: &E)
where
    E: Serialize + Sync,
{
    if let Err(e) = publish_json(state.events.as_ref(), topic, &key.to_string(), event).await {
        tracing::warn!(topic, %key, "Failed to publish event: {}", e);
    }
}
