use crate::Result;
use async_trait::async_trait;
use hubkit_core::EventData;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Why a partition stopped delivering to its processor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    /// Graceful stop: the lease was released deliberately
    Shutdown,

    /// The lease was lost or the partition faulted
    LeaseLost,
}

impl fmt::Display for CloseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CloseReason::Shutdown => write!(f, "shutdown"),
            CloseReason::LeaseLost => write!(f, "lease lost"),
        }
    }
}

/// Durable progress sink for partition cursors, supplied by the bus side.
#[async_trait]
pub trait Checkpointer: Send + Sync {
    /// Record `offset` as the resume position for `partition_id`.
    async fn checkpoint(&self, partition_id: &str, offset: u64) -> Result<()>;
}

/// Per-callback view of one partition.
///
/// Supplied by the bus for each `on_open`/`on_events`/`on_close` call and
/// valid only for that call's duration. The cursor always points one past
/// the latest event delivered to the processor, so a checkpoint taken
/// after processing a batch resumes exactly at the next undelivered
/// event.
pub struct PartitionContext {
    partition_id: String,
    cursor: AtomicU64,
    checkpointer: Arc<dyn Checkpointer>,
}

impl PartitionContext {
    /// Create a context for `partition_id`.
    pub fn new(partition_id: impl Into<String>, checkpointer: Arc<dyn Checkpointer>) -> Self {
        Self {
            partition_id: partition_id.into(),
            cursor: AtomicU64::new(0),
            checkpointer,
        }
    }

    /// Partition this context refers to
    pub fn partition_id(&self) -> &str {
        &self.partition_id
    }

    /// Current cursor: one past the latest delivered event
    pub fn current_offset(&self) -> u64 {
        self.cursor.load(Ordering::Acquire)
    }

    /// Move the cursor. Called by the bus before handing a batch over.
    pub fn advance_to(&self, offset: u64) {
        self.cursor.store(offset, Ordering::Release);
    }

    /// Durably record the current cursor for this partition.
    pub async fn checkpoint(&self) -> Result<()> {
        self.checkpointer
            .checkpoint(&self.partition_id, self.current_offset())
            .await
    }
}

/// Capability contract a consumer implements to receive partition events.
///
/// One instance serves every partition assigned to a host (see
/// [`crate::ProcessorBridge`]), so implementations must tolerate
/// concurrent callbacks for distinct partitions. Per partition the bus
/// serializes the sequence: `on_open` once, `on_events` zero or more
/// times in arrival order, `on_close` once, never re-opening afterwards.
#[async_trait]
pub trait EventProcessor: Send + Sync {
    /// A lease on the context's partition was acquired.
    async fn on_open(&self, context: &PartitionContext) -> Result<()>;

    /// A non-empty batch arrived. Errors are not retried here; the bus
    /// decides the partition's fate.
    async fn on_events(&self, context: &PartitionContext, events: &[EventData]) -> Result<()>;

    /// The partition stopped delivering; `reason` says whether the stop
    /// was graceful.
    async fn on_close(&self, context: &PartitionContext, reason: CloseReason) -> Result<()>;
}

/// Report of a processor callback failure on one partition.
#[derive(Debug, Clone)]
pub struct ProcessorFault {
    /// Host whose processor faulted
    pub host_name: String,

    /// Partition the failure occurred on
    pub partition_id: String,

    /// Rendered failure
    pub message: String,
}

/// Behavior knobs applied when a bridge is registered with a lease.
#[derive(Debug, Clone)]
pub struct ProcessorOptions {
    /// Maximum events handed to one `on_events` call
    pub max_batch_size: usize,

    /// Where partition faults are reported, if anywhere
    pub fault_sender: Option<mpsc::UnboundedSender<ProcessorFault>>,
}

impl Default for ProcessorOptions {
    fn default() -> Self {
        Self {
            max_batch_size: 10,
            fault_sender: None,
        }
    }
}

impl ProcessorOptions {
    /// Create options with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum batch size
    pub fn with_max_batch_size(mut self, max_batch_size: usize) -> Self {
        self.max_batch_size = max_batch_size;
        self
    }

    /// Deliver partition faults to `sender` in addition to logging them
    pub fn with_fault_sender(mut self, sender: mpsc::UnboundedSender<ProcessorFault>) -> Self {
        self.fault_sender = Some(sender);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NoopCheckpointer;

    #[async_trait]
    impl Checkpointer for NoopCheckpointer {
        async fn checkpoint(&self, _partition_id: &str, _offset: u64) -> Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_context_cursor_moves_forward() {
        let context = PartitionContext::new("3", Arc::new(NoopCheckpointer));
        assert_eq!(context.partition_id(), "3");
        assert_eq!(context.current_offset(), 0);

        context.advance_to(17);
        assert_eq!(context.current_offset(), 17);
    }

    #[test]
    fn test_options_defaults() {
        let options = ProcessorOptions::default();
        assert_eq!(options.max_batch_size, 10);
        assert!(options.fault_sender.is_none());
    }

    #[test]
    fn test_close_reason_display() {
        assert_eq!(CloseReason::Shutdown.to_string(), "shutdown");
        assert_eq!(CloseReason::LeaseLost.to_string(), "lease lost");
    }
}
