use serde_json::Value;
use tokio::sync::broadcast;

/// High-throughput event publisher for pipeline lifecycle events
#[derive(Debug, Clone)]
pub struct EventPublisher {
    sender: broadcast::Sender<PublishedEvent>,
}

/// Event that has been published
#[derive(Debug, Clone)]
pub struct PublishedEvent {
    pub name: String,
    pub context: Value,
    pub published_at: chrono::DateTime<chrono::Utc>,
}

impl EventPublisher {
    /// Create a new event publisher with the specified channel capacity
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event with the given name and context
    pub fn publish(&self, event_name: impl Into<String>, context: Value) {
        let event = PublishedEvent {
            name: event_name.into(),
            context,
            published_at: chrono::Utc::now(),
        };

        // For broadcast channels, send() returns an error if there are no
        // subscribers. Publishing without listeners is acceptable here.
        let _ = self.sender.send(event);
    }

    /// Subscribe to events
    pub fn subscribe(&self) -> broadcast::Receiver<PublishedEvent> {
        self.sender.subscribe()
    }

    /// Get the number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

/// Error types for event publishing
#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("Event channel is closed")]
    ChannelClosed,
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Default for EventPublisher {
    fn default() -> Self {
        Self::new(crate::constants::DEFAULT_EVENT_CHANNEL_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn publish_reaches_subscriber() {
        let publisher = EventPublisher::new(16);
        let mut rx = publisher.subscribe();

        publisher.publish("pipeline.status_changed", serde_json::json!({"status": "ready"}));

        let event = rx.recv().await.expect("event delivered");
        assert_eq!(event.name, "pipeline.status_changed");
        assert_eq!(event.context["status"], "ready");
    }

    #[tokio::test]
    async fn publish_without_subscribers_is_ok() {
        let publisher = EventPublisher::new(4);
        publisher.publish("pipeline.execution_completed", serde_json::json!({}));
        assert_eq!(publisher.subscriber_count(), 0);
    }
}
