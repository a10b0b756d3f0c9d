use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::debug;

/// Rate-limits checkpoint requests per partition.
///
/// One monotonic timer per open partition: started by
/// [`open_partition`](Self::open_partition), consulted after each batch
/// with [`due`](Self::due), restarted with
/// [`mark_checkpointed`](Self::mark_checkpointed) once the checkpoint
/// actually succeeded, and dropped by
/// [`close_partition`](Self::close_partition). Keeping the restart
/// separate from the due-check means a failed checkpoint leaves the timer
/// running, so the next batch tries again.
///
/// A zero interval makes every batch due. Partitions without a timer
/// (never opened, or already closed) are never due.
pub struct CheckpointScheduler {
    interval: Duration,
    timers: Mutex<HashMap<String, Instant>>,
}

impl CheckpointScheduler {
    /// Create a scheduler with a fixed interval shared by all partitions.
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            timers: Mutex::new(HashMap::new()),
        }
    }

    /// Configured minimum spacing between checkpoints
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Start the timer for a newly opened partition.
    pub async fn open_partition(&self, partition_id: &str) {
        self.open_partition_at(partition_id, Instant::now()).await;
    }

    /// [`open_partition`](Self::open_partition) at an explicit instant.
    pub async fn open_partition_at(&self, partition_id: &str, now: Instant) {
        self.timers.lock().await.insert(partition_id.to_string(), now);
        debug!(partition = partition_id, "checkpoint timer started");
    }

    /// True when more than the interval has passed since the partition's
    /// last checkpoint (or open).
    pub async fn due(&self, partition_id: &str) -> bool {
        self.due_at(partition_id, Instant::now()).await
    }

    /// [`due`](Self::due) at an explicit instant.
    pub async fn due_at(&self, partition_id: &str, now: Instant) -> bool {
        let timers = self.timers.lock().await;
        match timers.get(partition_id) {
            Some(_) if self.interval.is_zero() => true,
            Some(last) => now.saturating_duration_since(*last) > self.interval,
            None => false,
        }
    }

    /// Restart the timer after a successful checkpoint.
    pub async fn mark_checkpointed(&self, partition_id: &str) {
        self.mark_checkpointed_at(partition_id, Instant::now()).await;
    }

    /// [`mark_checkpointed`](Self::mark_checkpointed) at an explicit instant.
    pub async fn mark_checkpointed_at(&self, partition_id: &str, now: Instant) {
        let mut timers = self.timers.lock().await;
        if let Some(last) = timers.get_mut(partition_id) {
            *last = now;
        }
    }

    /// Drop the timer for a closed partition.
    pub async fn close_partition(&self, partition_id: &str) {
        self.timers.lock().await.remove(partition_id);
        debug!(partition = partition_id, "checkpoint timer discarded");
    }
}
