use crate::connection::Connection;
use crate::error::{Error, Result};
use crate::lease::LeaseStore;
use crate::processor::{EventProcessor, ProcessorOptions};
use crate::registry::SubscriptionRegistry;
use bytes::Bytes;
use hubkit_core::{ConnectionConfig, StorageConfig, StreamConfig};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::warn;

/// Facade pairing one optional publishing connection with a
/// [`SubscriptionRegistry`].
///
/// The two halves are independent: publishing needs a connection,
/// subscribing needs only the lease store, and neither side blocks the
/// other. A toolbox is an ordinary value; create one per stream, or
/// several side by side, each wired to its own store.
pub struct Toolbox {
    connection: RwLock<Option<Connection>>,
    registry: SubscriptionRegistry,
}

impl Toolbox {
    /// Create a toolbox whose subscriptions are backed by `store`.
    pub fn new(store: Arc<dyn LeaseStore>) -> Self {
        Self {
            connection: RwLock::new(None),
            registry: SubscriptionRegistry::new(store),
        }
    }

    /// The registry managing this toolbox's subscriptions.
    pub fn registry(&self) -> &SubscriptionRegistry {
        &self.registry
    }

    /// Open the default framed-TCP transport from `config` and install
    /// it, replacing and closing any previous connection.
    pub async fn connect(&self, config: &ConnectionConfig) -> Result<()> {
        let connection = Connection::open(config).await?;
        self.install(connection).await;
        Ok(())
    }

    /// Install an already-established connection, replacing and closing
    /// any previous one.
    pub async fn connect_with(&self, connection: Connection) {
        self.install(connection).await;
    }

    async fn install(&self, connection: Connection) {
        let previous = self.connection.write().await.replace(connection);
        if let Some(previous) = previous {
            if let Err(e) = previous.close().await {
                warn!(error = %e, "failed to close replaced connection");
            }
        }
    }

    /// Close and drop the current connection. A no-op when none is
    /// installed.
    pub async fn disconnect(&self) -> Result<()> {
        match self.connection.write().await.take() {
            Some(connection) => connection.close().await,
            None => Ok(()),
        }
    }

    /// True while an installed connection is open.
    pub async fn is_connected(&self) -> bool {
        self.connection
            .read()
            .await
            .as_ref()
            .map(Connection::is_open)
            .unwrap_or(false)
    }

    /// Publish one event payload.
    ///
    /// Empty payloads fail with `InvalidArgument` before the connection
    /// is consulted; publishing without a live connection fails with
    /// `NotConnected`.
    pub async fn send(&self, event: impl Into<Bytes>) -> Result<()> {
        let payload = event.into();
        if payload.is_empty() {
            return Err(Error::InvalidArgument(
                "event payload must not be empty".to_string(),
            ));
        }
        self.live_connection().await?.send(payload).await
    }

    /// Publish a batch of payloads, one write per event, in order.
    ///
    /// The whole batch is validated first: an empty batch or any empty
    /// payload fails with `InvalidArgument` before anything is written.
    pub async fn send_batch<I, B>(&self, events: I) -> Result<()>
    where
        I: IntoIterator<Item = B>,
        B: Into<Bytes>,
    {
        let batch: Vec<Bytes> = events.into_iter().map(Into::into).collect();
        if batch.is_empty() {
            return Err(Error::InvalidArgument(
                "event batch must not be empty".to_string(),
            ));
        }
        if batch.iter().any(Bytes::is_empty) {
            return Err(Error::InvalidArgument(
                "event payload must not be empty".to_string(),
            ));
        }

        let connection = self.live_connection().await?;
        for payload in batch {
            connection.send(payload).await?;
        }
        Ok(())
    }

    async fn live_connection(&self) -> Result<Connection> {
        self.connection
            .read()
            .await
            .as_ref()
            .filter(|c| c.is_open())
            .cloned()
            .ok_or(Error::NotConnected)
    }

    /// Subscribe `host_name` to a stream. See
    /// [`SubscriptionRegistry::subscribe`].
    pub async fn subscribe(
        &self,
        host_name: &str,
        stream: &StreamConfig,
        storage: &StorageConfig,
        processor: Arc<dyn EventProcessor>,
        options: ProcessorOptions,
    ) -> Result<()> {
        self.registry
            .subscribe(host_name, stream, storage, processor, options)
            .await
    }

    /// Revoke `host_name`'s subscription, if any.
    pub async fn unsubscribe(&self, host_name: &str) -> Result<()> {
        self.registry.unsubscribe(host_name).await
    }

    /// Revoke every live subscription. See
    /// [`SubscriptionRegistry::unsubscribe_all`].
    pub async fn unsubscribe_all(&self) -> Result<()> {
        self.registry.unsubscribe_all().await
    }

    /// True iff `host_name` currently holds a subscription.
    pub async fn is_subscribed_to(&self, host_name: &str) -> Result<bool> {
        self.registry.is_subscribed_to(host_name).await
    }

    /// True iff any subscription is live.
    pub async fn is_subscribed_to_any(&self) -> bool {
        self.registry.is_subscribed_to_any().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::ProcessorBridge;
    use crate::lease::{LeaseHandle, LeaseRequest};
    use crate::processor::{CloseReason, PartitionContext};
    use crate::sink::EventSink;
    use async_trait::async_trait;
    use hubkit_core::EventData;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Mutex;

    #[derive(Default)]
    struct RecordingSink {
        published: Mutex<Vec<Bytes>>,
        closed: AtomicUsize,
    }

    #[async_trait]
    impl EventSink for RecordingSink {
        async fn publish(&self, payload: Bytes) -> Result<()> {
            self.published.lock().await.push(payload);
            Ok(())
        }

        async fn close(&self) -> Result<()> {
            self.closed.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct StaticLeaseStore;

    #[async_trait]
    impl LeaseStore for StaticLeaseStore {
        async fn acquire(&self, request: &LeaseRequest) -> Result<LeaseHandle> {
            Ok(LeaseHandle {
                id: 1,
                host_name: request.host_name.clone(),
                stream_name: request.stream.stream_name.clone(),
                consumer_group: request.stream.consumer_group.clone(),
            })
        }

        async fn register(
            &self,
            _lease: &LeaseHandle,
            _bridge: ProcessorBridge,
            _options: ProcessorOptions,
        ) -> Result<()> {
            Ok(())
        }

        async fn revoke(&self, _lease: &LeaseHandle) -> Result<()> {
            Ok(())
        }
    }

    struct NoopProcessor;

    #[async_trait]
    impl EventProcessor for NoopProcessor {
        async fn on_open(&self, _context: &PartitionContext) -> Result<()> {
            Ok(())
        }

        async fn on_events(&self, _context: &PartitionContext, _events: &[EventData]) -> Result<()> {
            Ok(())
        }

        async fn on_close(&self, _context: &PartitionContext, _reason: CloseReason) -> Result<()> {
            Ok(())
        }
    }

    fn toolbox() -> Toolbox {
        Toolbox::new(Arc::new(StaticLeaseStore))
    }

    fn connected(sink: &Arc<RecordingSink>) -> Connection {
        Connection::with_sink("events", Arc::clone(sink) as Arc<dyn EventSink>)
    }

    #[tokio::test]
    async fn test_send_without_connection_is_not_connected() {
        let toolbox = toolbox();

        assert!(!toolbox.is_connected().await);
        let err = toolbox.send("hello").await.unwrap_err();
        assert!(matches!(err, Error::NotConnected));
    }

    #[tokio::test]
    async fn test_empty_payload_rejected_before_connection_check() {
        let toolbox = toolbox();

        let err = toolbox.send("").await.unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn test_send_forwards_in_order() {
        let toolbox = toolbox();
        let sink = Arc::new(RecordingSink::default());
        toolbox.connect_with(connected(&sink)).await;

        assert!(toolbox.is_connected().await);
        toolbox.send("one").await.unwrap();
        toolbox.send_batch(["two", "three"]).await.unwrap();

        let published = sink.published.lock().await;
        assert_eq!(
            published.as_slice(),
            &[
                Bytes::from_static(b"one"),
                Bytes::from_static(b"two"),
                Bytes::from_static(b"three"),
            ]
        );
    }

    #[tokio::test]
    async fn test_batch_validated_before_any_write() {
        let toolbox = toolbox();
        let sink = Arc::new(RecordingSink::default());
        toolbox.connect_with(connected(&sink)).await;

        let err = toolbox.send_batch(["ok", ""]).await.unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));

        let err = toolbox.send_batch(Vec::<&str>::new()).await.unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));

        assert!(sink.published.lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_disconnect_closes_and_forgets() {
        let toolbox = toolbox();
        let sink = Arc::new(RecordingSink::default());
        toolbox.connect_with(connected(&sink)).await;

        toolbox.disconnect().await.unwrap();

        assert!(!toolbox.is_connected().await);
        assert_eq!(sink.closed.load(Ordering::SeqCst), 1);
        let err = toolbox.send("late").await.unwrap_err();
        assert!(matches!(err, Error::NotConnected));

        toolbox.disconnect().await.unwrap();
        assert_eq!(sink.closed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_reconnect_closes_replaced_connection() {
        let toolbox = toolbox();
        let first = Arc::new(RecordingSink::default());
        let second = Arc::new(RecordingSink::default());

        toolbox.connect_with(connected(&first)).await;
        toolbox.connect_with(connected(&second)).await;

        assert_eq!(first.closed.load(Ordering::SeqCst), 1);
        assert_eq!(second.closed.load(Ordering::SeqCst), 0);

        toolbox.send("routed").await.unwrap();
        assert!(first.published.lock().await.is_empty());
        assert_eq!(second.published.lock().await.len(), 1);
    }

    #[tokio::test]
    async fn test_subscriptions_flow_through_registry() {
        let toolbox = toolbox();
        let stream = StreamConfig::new().with_stream_name("telemetry".to_string());
        let storage = StorageConfig::default();

        assert!(!toolbox.is_subscribed_to_any().await);
        toolbox
            .subscribe(
                "host-a",
                &stream,
                &storage,
                Arc::new(NoopProcessor),
                ProcessorOptions::default(),
            )
            .await
            .unwrap();

        assert!(toolbox.is_subscribed_to("host-a").await.unwrap());
        assert!(toolbox.is_subscribed_to_any().await);
        assert_eq!(
            toolbox.registry().stream_of("host-a").await.as_deref(),
            Some("telemetry")
        );

        toolbox.unsubscribe("host-a").await.unwrap();
        assert!(!toolbox.is_subscribed_to_any().await);

        toolbox.unsubscribe_all().await.unwrap();
    }
}
