use serde::{Deserialize, Serialize};

/// Settings for the outbound publishing channel to an event hub.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// Hub endpoint (host:port)
    pub endpoint: String,

    /// Stream to publish into
    pub stream_name: String,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            endpoint: "127.0.0.1:5672".to_string(),
            stream_name: "events".to_string(),
        }
    }
}

impl ConnectionConfig {
    /// Create a new connection configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the hub endpoint
    pub fn with_endpoint(mut self, endpoint: String) -> Self {
        self.endpoint = endpoint;
        self
    }

    /// Set the stream name
    pub fn with_stream_name(mut self, stream_name: String) -> Self {
        self.stream_name = stream_name;
        self
    }
}

/// Settings identifying a stream for a consuming subscription.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamConfig {
    /// Hub endpoint (host:port)
    pub endpoint: String,

    /// Stream to read from
    pub stream_name: String,

    /// Consumer group the subscription reads for
    pub consumer_group: String,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            endpoint: "127.0.0.1:5672".to_string(),
            stream_name: "events".to_string(),
            consumer_group: "default".to_string(),
        }
    }
}

impl StreamConfig {
    /// Create a new stream configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the hub endpoint
    pub fn with_endpoint(mut self, endpoint: String) -> Self {
        self.endpoint = endpoint;
        self
    }

    /// Set the stream name
    pub fn with_stream_name(mut self, stream_name: String) -> Self {
        self.stream_name = stream_name;
        self
    }

    /// Set the consumer group
    pub fn with_consumer_group(mut self, consumer_group: String) -> Self {
        self.consumer_group = consumer_group;
        self
    }
}

/// Credentials for the durable store backing leases and checkpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Storage account name
    pub account_name: String,

    /// Storage account access key
    pub access_key: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            account_name: "devstore".to_string(),
            access_key: "devkey".to_string(),
        }
    }
}

impl StorageConfig {
    /// Create a new storage configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the account name
    pub fn with_account_name(mut self, account_name: String) -> Self {
        self.account_name = account_name;
        self
    }

    /// Set the access key
    pub fn with_access_key(mut self, access_key: String) -> Self {
        self.access_key = access_key;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_configs() {
        let connection = ConnectionConfig::default();
        assert_eq!(connection.endpoint, "127.0.0.1:5672");
        assert_eq!(connection.stream_name, "events");

        let stream = StreamConfig::default();
        assert_eq!(stream.endpoint, "127.0.0.1:5672");
        assert_eq!(stream.stream_name, "events");
        assert_eq!(stream.consumer_group, "default");

        let storage = StorageConfig::default();
        assert_eq!(storage.account_name, "devstore");
        assert_eq!(storage.access_key, "devkey");
    }

    #[test]
    fn test_builder_pattern() {
        let stream = StreamConfig::new()
            .with_endpoint("10.0.0.1:5671".to_string())
            .with_stream_name("traffic".to_string())
            .with_consumer_group("dashboard".to_string());

        assert_eq!(stream.endpoint, "10.0.0.1:5671");
        assert_eq!(stream.stream_name, "traffic");
        assert_eq!(stream.consumer_group, "dashboard");

        let storage = StorageConfig::new()
            .with_account_name("prodstore".to_string())
            .with_access_key("s3cret".to_string());

        assert_eq!(storage.account_name, "prodstore");
        assert_eq!(storage.access_key, "s3cret");
    }

    #[test]
    fn test_serialization() {
        let config = StreamConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let deserialized: StreamConfig = serde_json::from_str(&json).unwrap();

        assert_eq!(config.endpoint, deserialized.endpoint);
        assert_eq!(config.stream_name, deserialized.stream_name);
        assert_eq!(config.consumer_group, deserialized.consumer_group);
    }
}
