//! Shared fixtures for integration tests

use hubkit_client::{InMemoryHub, Toolbox};
use hubkit_core::StreamConfig;
use std::sync::Arc;

/// An in-process hub with a toolbox already connected to it.
pub struct TestHub {
    pub hub: InMemoryHub,
    pub toolbox: Toolbox,
}

impl TestHub {
    /// Host `partitions` partitions for `stream` and connect a toolbox.
    pub async fn start(stream: &str, partitions: usize) -> Self {
        let hub = InMemoryHub::new(stream, partitions);
        let toolbox = Toolbox::new(Arc::new(hub.clone()));
        toolbox.connect_with(hub.connection()).await;
        Self { hub, toolbox }
    }

    /// Stream configuration addressing this hub for `consumer_group`.
    pub fn stream_config(&self, consumer_group: &str) -> StreamConfig {
        StreamConfig::new()
            .with_stream_name(self.hub.stream_name().to_string())
            .with_consumer_group(consumer_group.to_string())
    }
}

/// Test payload generation.
pub mod test_data {
    use hubkit_core::DeviceTelemetry;

    /// `count` JSON-encoded telemetry payloads
    pub fn telemetry_events(count: usize) -> Vec<String> {
        (0..count)
            .map(|_| serde_json::to_string(&DeviceTelemetry::random()).expect("serialize telemetry"))
            .collect()
    }

    /// `count` numbered plain-text payloads
    pub fn numbered_events(count: usize) -> Vec<String> {
        (0..count).map(|i| format!("event-{i}")).collect()
    }
}
