//! Mock implementations for testing

use async_trait::async_trait;
use hubkit_client::{
    CloseReason, Error, EventProcessor, LeaseHandle, LeaseRequest, LeaseStore, PartitionContext,
    ProcessorBridge, ProcessorOptions, Result,
};
use hubkit_core::EventData;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

/// One `on_events` call captured by [`CapturingProcessor`]
#[derive(Debug, Clone)]
pub struct CapturedBatch {
    pub partition_id: String,
    pub offsets: Vec<u64>,
    pub bodies: Vec<String>,
}

/// An [`EventProcessor`] that records every callback for verification
#[derive(Clone, Default)]
pub struct CapturingProcessor {
    opens: Arc<Mutex<Vec<String>>>,
    batches: Arc<Mutex<Vec<CapturedBatch>>>,
    closes: Arc<Mutex<Vec<(String, CloseReason)>>>,
    delivered: Arc<AtomicUsize>,
    checkpoint_after_batch: bool,
    fail_events_on: Option<String>,
}

impl CapturingProcessor {
    pub fn new() -> Self {
        Self::default()
    }

    /// A processor that checkpoints after every batch it records
    pub fn checkpointing() -> Self {
        Self {
            checkpoint_after_batch: true,
            ..Self::default()
        }
    }

    /// A processor whose `on_events` fails on one partition
    pub fn failing_events_on(partition_id: &str) -> Self {
        Self {
            fail_events_on: Some(partition_id.to_string()),
            ..Self::default()
        }
    }

    /// Total events recorded so far
    pub fn delivered_count(&self) -> usize {
        self.delivered.load(Ordering::SeqCst)
    }

    /// Partitions opened, in callback order
    pub async fn opens(&self) -> Vec<String> {
        self.opens.lock().await.clone()
    }

    /// All captured batches
    pub async fn batches(&self) -> Vec<CapturedBatch> {
        self.batches.lock().await.clone()
    }

    /// Offsets recorded for one partition, in delivery order
    pub async fn offsets_for(&self, partition_id: &str) -> Vec<u64> {
        self.batches
            .lock()
            .await
            .iter()
            .filter(|batch| batch.partition_id == partition_id)
            .flat_map(|batch| batch.offsets.clone())
            .collect()
    }

    /// Bodies recorded for one partition, in delivery order
    pub async fn bodies_for(&self, partition_id: &str) -> Vec<String> {
        self.batches
            .lock()
            .await
            .iter()
            .filter(|batch| batch.partition_id == partition_id)
            .flat_map(|batch| batch.bodies.clone())
            .collect()
    }

    /// Close reasons recorded for one partition
    pub async fn closes_for(&self, partition_id: &str) -> Vec<CloseReason> {
        self.closes
            .lock()
            .await
            .iter()
            .filter(|(pid, _)| pid == partition_id)
            .map(|(_, reason)| *reason)
            .collect()
    }

    /// Wait until at least `count` events have been recorded
    pub async fn wait_for_delivered(&self, count: usize, timeout: Duration) -> bool {
        let start = std::time::Instant::now();
        while start.elapsed() < timeout {
            if self.delivered_count() >= count {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        self.delivered_count() >= count
    }
}

#[async_trait]
impl EventProcessor for CapturingProcessor {
    async fn on_open(&self, context: &PartitionContext) -> Result<()> {
        self.opens
            .lock()
            .await
            .push(context.partition_id().to_string());
        Ok(())
    }

    async fn on_events(&self, context: &PartitionContext, events: &[EventData]) -> Result<()> {
        if self.fail_events_on.as_deref() == Some(context.partition_id()) {
            return Err(Error::Connection("processing refused".to_string()));
        }
        self.batches.lock().await.push(CapturedBatch {
            partition_id: context.partition_id().to_string(),
            offsets: events.iter().map(|e| e.offset).collect(),
            bodies: events
                .iter()
                .map(|e| String::from_utf8_lossy(&e.payload).into_owned())
                .collect(),
        });
        self.delivered.fetch_add(events.len(), Ordering::SeqCst);
        if self.checkpoint_after_batch {
            context.checkpoint().await?;
        }
        Ok(())
    }

    async fn on_close(&self, context: &PartitionContext, reason: CloseReason) -> Result<()> {
        self.closes
            .lock()
            .await
            .push((context.partition_id().to_string(), reason));
        Ok(())
    }
}

/// Lease store decorator that can refuse revokes for chosen hosts
pub struct FaultyLeaseStore {
    inner: Arc<dyn LeaseStore>,
    revoke_failure: Mutex<Option<String>>,
}

impl FaultyLeaseStore {
    pub fn wrapping(inner: Arc<dyn LeaseStore>) -> Self {
        Self {
            inner,
            revoke_failure: Mutex::new(None),
        }
    }

    /// Make revokes fail for `host` until cleared
    pub async fn fail_revokes_for(&self, host: &str) {
        *self.revoke_failure.lock().await = Some(host.to_string());
    }

    pub async fn clear_failures(&self) {
        *self.revoke_failure.lock().await = None;
    }
}

#[async_trait]
impl LeaseStore for FaultyLeaseStore {
    async fn acquire(&self, request: &LeaseRequest) -> Result<LeaseHandle> {
        self.inner.acquire(request).await
    }

    async fn register(
        &self,
        lease: &LeaseHandle,
        bridge: ProcessorBridge,
        options: ProcessorOptions,
    ) -> Result<()> {
        self.inner.register(lease, bridge, options).await
    }

    async fn revoke(&self, lease: &LeaseHandle) -> Result<()> {
        let failing = self.revoke_failure.lock().await.clone();
        if failing.as_deref() == Some(lease.host_name.as_str()) {
            return Err(Error::Connection("revoke refused".to_string()));
        }
        self.inner.revoke(lease).await
    }
}
