use crate::checkpoint::CheckpointScheduler;
use crate::processor::{CloseReason, EventProcessor, PartitionContext};
use crate::Result;
use async_trait::async_trait;
use hubkit_core::EventData;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{debug, info};

const OBSERVER_CHANNEL_CAPACITY: usize = 256;

/// Where in the partition lifecycle a [`Notification`] was emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationSource {
    Open,
    ProcessEvents,
    Close,
}

/// Lifecycle observation emitted by an [`EventReceiver`].
#[derive(Debug, Clone)]
pub struct Notification {
    /// Partition the observation refers to
    pub partition_id: String,

    /// Lifecycle stage that produced it
    pub source: NotificationSource,

    /// Human-readable detail
    pub message: String,
}

/// One decoded event observation.
#[derive(Debug, Clone)]
pub struct ReceivedEvent {
    /// Partition the event arrived on
    pub partition_id: String,

    /// Payload decoded as UTF-8 (lossily)
    pub body: String,
}

/// Ready-made [`EventProcessor`] for text events.
///
/// Decodes each payload as UTF-8, fans decoded events and lifecycle
/// notifications out to broadcast observers, and checkpoints through the
/// partition context once the configured interval has elapsed, always
/// after the batch has been processed. On a graceful close it attempts
/// one final checkpoint before reporting the close.
///
/// One receiver serves every partition of its host concurrently; all
/// state is per partition inside the scheduler or immutable.
pub struct EventReceiver {
    scheduler: CheckpointScheduler,
    events: broadcast::Sender<ReceivedEvent>,
    notifications: broadcast::Sender<Notification>,
}

impl EventReceiver {
    /// Create a receiver that checkpoints at most once per
    /// `checkpoint_interval`. A zero interval checkpoints after every
    /// batch.
    pub fn new(checkpoint_interval: Duration) -> Self {
        let (events, _) = broadcast::channel(OBSERVER_CHANNEL_CAPACITY);
        let (notifications, _) = broadcast::channel(OBSERVER_CHANNEL_CAPACITY);
        Self {
            scheduler: CheckpointScheduler::new(checkpoint_interval),
            events,
            notifications,
        }
    }

    /// Subscribe to decoded events.
    pub fn events(&self) -> broadcast::Receiver<ReceivedEvent> {
        self.events.subscribe()
    }

    /// Subscribe to lifecycle notifications.
    pub fn notifications(&self) -> broadcast::Receiver<Notification> {
        self.notifications.subscribe()
    }

    /// Scheduler governing this receiver's checkpoint cadence
    pub fn scheduler(&self) -> &CheckpointScheduler {
        &self.scheduler
    }

    fn notify(&self, partition_id: &str, source: NotificationSource, message: String) {
        // Observers are optional; a send with no receivers just drops.
        let _ = self.notifications.send(Notification {
            partition_id: partition_id.to_string(),
            source,
            message,
        });
    }
}

#[async_trait]
impl EventProcessor for EventReceiver {
    async fn on_open(&self, context: &PartitionContext) -> Result<()> {
        let partition_id = context.partition_id();
        self.scheduler.open_partition(partition_id).await;
        info!(partition = partition_id, "partition open");
        self.notify(
            partition_id,
            NotificationSource::Open,
            format!("lease acquired on partition {}", partition_id),
        );
        Ok(())
    }

    async fn on_events(&self, context: &PartitionContext, events: &[EventData]) -> Result<()> {
        let partition_id = context.partition_id();
        for event in events {
            let body = String::from_utf8_lossy(&event.payload).into_owned();
            debug!(partition = partition_id, offset = event.offset, "event received");
            let _ = self.events.send(ReceivedEvent {
                partition_id: partition_id.to_string(),
                body,
            });
            self.notify(
                partition_id,
                NotificationSource::ProcessEvents,
                format!("event at offset {} on partition {}", event.offset, partition_id),
            );
        }

        if self.scheduler.due(partition_id).await {
            context.checkpoint().await?;
            self.scheduler.mark_checkpointed(partition_id).await;
            debug!(
                partition = partition_id,
                offset = context.current_offset(),
                "checkpoint written"
            );
        }
        Ok(())
    }

    async fn on_close(&self, context: &PartitionContext, reason: CloseReason) -> Result<()> {
        let partition_id = context.partition_id();
        let final_checkpoint = match reason {
            CloseReason::Shutdown => context.checkpoint().await,
            CloseReason::LeaseLost => Ok(()),
        };

        self.scheduler.close_partition(partition_id).await;
        info!(partition = partition_id, reason = %reason, "partition closed");
        self.notify(
            partition_id,
            NotificationSource::Close,
            format!("partition {} closed: {}", partition_id, reason),
        );
        final_checkpoint
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processor::Checkpointer;
    use crate::Error;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tokio::sync::Mutex;

    #[derive(Default)]
    struct RecordingCheckpointer {
        calls: Mutex<Vec<(String, u64)>>,
        fail: AtomicUsize,
    }

    impl RecordingCheckpointer {
        fn fail_next(&self, times: usize) {
            self.fail.store(times, Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl Checkpointer for RecordingCheckpointer {
        async fn checkpoint(&self, partition_id: &str, offset: u64) -> Result<()> {
            if self.fail.load(Ordering::SeqCst) > 0 {
                self.fail.fetch_sub(1, Ordering::SeqCst);
                return Err(Error::Subscription {
                    name: partition_id.to_string(),
                    cause: "checkpoint store offline".to_string(),
                });
            }
            self.calls.lock().await.push((partition_id.to_string(), offset));
            Ok(())
        }
    }

    fn batch(offsets: &[u64]) -> Vec<EventData> {
        offsets
            .iter()
            .map(|o| EventData::new(format!("event-{}", o)).with_offset(*o))
            .collect()
    }

    #[tokio::test]
    async fn test_events_and_notifications_fan_out_in_order() {
        let receiver = EventReceiver::new(Duration::from_secs(300));
        let mut events = receiver.events();
        let mut notifications = receiver.notifications();

        let checkpointer = Arc::new(RecordingCheckpointer::default());
        let context = PartitionContext::new("2", checkpointer);

        receiver.on_open(&context).await.unwrap();
        receiver.on_events(&context, &batch(&[0, 1])).await.unwrap();

        assert_eq!(events.recv().await.unwrap().body, "event-0");
        assert_eq!(events.recv().await.unwrap().body, "event-1");

        let first = notifications.recv().await.unwrap();
        assert_eq!(first.source, NotificationSource::Open);
        assert_eq!(first.partition_id, "2");
        assert_eq!(notifications.recv().await.unwrap().source, NotificationSource::ProcessEvents);
        assert_eq!(notifications.recv().await.unwrap().source, NotificationSource::ProcessEvents);
    }

    #[tokio::test]
    async fn test_zero_interval_checkpoints_after_each_batch() {
        let receiver = EventReceiver::new(Duration::ZERO);
        let checkpointer = Arc::new(RecordingCheckpointer::default());
        let context = PartitionContext::new("0", Arc::clone(&checkpointer) as Arc<dyn Checkpointer>);

        receiver.on_open(&context).await.unwrap();

        context.advance_to(2);
        receiver.on_events(&context, &batch(&[0, 1])).await.unwrap();
        context.advance_to(3);
        receiver.on_events(&context, &batch(&[2])).await.unwrap();

        let calls = checkpointer.calls.lock().await;
        assert_eq!(calls.as_slice(), &[("0".to_string(), 2), ("0".to_string(), 3)]);
    }

    #[tokio::test]
    async fn test_long_interval_defers_checkpoint_until_close() {
        let receiver = EventReceiver::new(Duration::from_secs(300));
        let checkpointer = Arc::new(RecordingCheckpointer::default());
        let context = PartitionContext::new("1", Arc::clone(&checkpointer) as Arc<dyn Checkpointer>);

        receiver.on_open(&context).await.unwrap();
        context.advance_to(5);
        receiver.on_events(&context, &batch(&[3, 4])).await.unwrap();
        assert!(checkpointer.calls.lock().await.is_empty());

        receiver.on_close(&context, CloseReason::Shutdown).await.unwrap();
        let calls = checkpointer.calls.lock().await;
        assert_eq!(calls.as_slice(), &[("1".to_string(), 5)]);
    }

    #[tokio::test]
    async fn test_lease_lost_close_skips_final_checkpoint_but_notifies() {
        let receiver = EventReceiver::new(Duration::from_secs(300));
        let mut notifications = receiver.notifications();
        let checkpointer = Arc::new(RecordingCheckpointer::default());
        let context = PartitionContext::new("1", Arc::clone(&checkpointer) as Arc<dyn Checkpointer>);

        receiver.on_open(&context).await.unwrap();
        receiver.on_close(&context, CloseReason::LeaseLost).await.unwrap();

        assert!(checkpointer.calls.lock().await.is_empty());
        assert_eq!(notifications.recv().await.unwrap().source, NotificationSource::Open);
        let close = notifications.recv().await.unwrap();
        assert_eq!(close.source, NotificationSource::Close);
        assert!(close.message.contains("lease lost"));
    }

    #[tokio::test]
    async fn test_failed_checkpoint_surfaces_and_retries_next_batch() {
        let receiver = EventReceiver::new(Duration::ZERO);
        let checkpointer = Arc::new(RecordingCheckpointer::default());
        let context = PartitionContext::new("0", Arc::clone(&checkpointer) as Arc<dyn Checkpointer>);

        receiver.on_open(&context).await.unwrap();

        checkpointer.fail_next(1);
        context.advance_to(1);
        let err = receiver.on_events(&context, &batch(&[0])).await.unwrap_err();
        assert!(matches!(err, Error::Subscription { .. }));

        context.advance_to(2);
        receiver.on_events(&context, &batch(&[1])).await.unwrap();
        let calls = checkpointer.calls.lock().await;
        assert_eq!(calls.as_slice(), &[("0".to_string(), 2)]);
    }

    #[tokio::test]
    async fn test_close_notification_emitted_even_when_final_checkpoint_fails() {
        let receiver = EventReceiver::new(Duration::from_secs(300));
        let mut notifications = receiver.notifications();
        let checkpointer = Arc::new(RecordingCheckpointer::default());
        let context = PartitionContext::new("4", Arc::clone(&checkpointer) as Arc<dyn Checkpointer>);

        receiver.on_open(&context).await.unwrap();
        checkpointer.fail_next(1);
        let err = receiver.on_close(&context, CloseReason::Shutdown).await.unwrap_err();
        assert!(matches!(err, Error::Subscription { .. }));

        assert_eq!(notifications.recv().await.unwrap().source, NotificationSource::Open);
        assert_eq!(notifications.recv().await.unwrap().source, NotificationSource::Close);
    }
}
