use async_trait::async_trait;
use serde::Serialize;

use crate::{CoreError, CoreResult};

/// Sink for domain events. Publishing happens after the write it describes
/// has been committed.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, topic: &str, key: &str, payload: &str) -> CoreResult<()>;
}

/// Serializes `event` and hands it to `publisher`.
pub async fn publish_json<E>(publisher: &dyn EventPublisher, topic: &str, key: &str, event: &E) -> CoreResult<()>
where
    E: Serialize + Sync,
{
    let payload = serde_json::to_string(event).map_err(CoreError::backend)?;
    publisher.publish(topic, key, &payload).await
}
