// Publisher - marshal to JSON and send through the outbound transport

use crate::error::Result;
use crate::port::OutboundTransport;
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

pub struct Publisher {
    transport: Arc<dyn OutboundTransport>,
}

impl Publisher {
    pub fn new(transport: Arc<dyn OutboundTransport>) -> Self {
        Self { transport }
    }

    /// Publish `value` as JSON to a topic. The topic name is used as subject.
    pub async fn publish<T>(&self, topic_name: &str, value: &T) -> Result<()>
    where
        T: Serialize + ?Sized,
    {
        let body = serde_json::to_string(value)?;
        let topic_id = self.transport.resolve_topic(topic_name).await?;
        self.transport.publish(&topic_id, topic_name, &body).await?;

        info!(topic = %topic_name, bytes = body.len(), "Published message");
        Ok(())
    }

    /// Send `value` as JSON directly to a queue
    pub async fn send_message<T>(&self, queue_name: &str, value: &T) -> Result<()>
    where
        T: Serialize + ?Sized,
    {
        let body = serde_json::to_string(value)?;
        let queue_id = self.transport.resolve_queue(queue_name).await?;
        self.transport.send_message(&queue_id, &body).await?;

        info!(queue = %queue_name, bytes = body.len(), "Sent message");
        Ok(())
    }
}
