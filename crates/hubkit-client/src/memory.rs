//! A self-contained hub for tests, demos and local development.
//!
//! [`InMemoryHub`] plays both bus roles at once: it accepts published
//! events as an [`EventSink`] and drives registered processors as a
//! [`LeaseStore`]. Incoming events are placed round-robin across a fixed
//! set of partitions, each partition delivers in offset order on its own
//! pump task, and checkpoints are kept per consumer group so a later
//! registration resumes where the previous one left off.

use crate::bridge::ProcessorBridge;
use crate::connection::Connection;
use crate::error::{Error, Result};
use crate::lease::{LeaseHandle, LeaseRequest, LeaseStore};
use crate::processor::{
    Checkpointer, CloseReason, PartitionContext, ProcessorFault, ProcessorOptions,
};
use crate::sink::EventSink;
use async_trait::async_trait;
use bytes::Bytes;
use hubkit_core::EventData;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{watch, Mutex, Notify};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

struct PartitionState {
    id: String,
    events: Mutex<Vec<EventData>>,
    notify: Notify,
}

struct Registration {
    shutdown: watch::Sender<bool>,
    pumps: Vec<JoinHandle<()>>,
}

struct HubInner {
    stream_name: String,
    partitions: Vec<Arc<PartitionState>>,
    next_partition: AtomicUsize,
    next_lease_id: AtomicU64,
    checkpoints: Mutex<HashMap<(String, String), u64>>,
    registrations: Mutex<HashMap<u64, Registration>>,
}

/// In-process event hub hosting one named stream.
///
/// Clones share the same hub. Event payloads are kept forever, so
/// late-registering consumer groups replay from offset zero unless a
/// checkpoint says otherwise.
#[derive(Clone)]
pub struct InMemoryHub {
    inner: Arc<HubInner>,
}

impl InMemoryHub {
    /// Create a hub for `stream_name` with `partitions` partitions
    /// (at least one), identified as `"0"`, `"1"`, and so on.
    pub fn new(stream_name: impl Into<String>, partitions: usize) -> Self {
        let partitions = (0..partitions.max(1))
            .map(|index| {
                Arc::new(PartitionState {
                    id: index.to_string(),
                    events: Mutex::new(Vec::new()),
                    notify: Notify::new(),
                })
            })
            .collect();
        Self {
            inner: Arc::new(HubInner {
                stream_name: stream_name.into(),
                partitions,
                next_partition: AtomicUsize::new(0),
                next_lease_id: AtomicU64::new(1),
                checkpoints: Mutex::new(HashMap::new()),
                registrations: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Stream this hub hosts
    pub fn stream_name(&self) -> &str {
        &self.inner.stream_name
    }

    /// Number of partitions
    pub fn partition_count(&self) -> usize {
        self.inner.partitions.len()
    }

    /// A fresh publishing sink into this hub. Closing the sink does not
    /// affect the hub or other sinks.
    pub fn sink(&self) -> HubSink {
        HubSink {
            hub: self.clone(),
            closed: AtomicBool::new(false),
        }
    }

    /// A [`Connection`] publishing into this hub through a fresh sink.
    pub fn connection(&self) -> Connection {
        Connection::with_sink(self.inner.stream_name.clone(), Arc::new(self.sink()))
    }

    /// Number of events stored in partition `index`, if it exists.
    pub async fn partition_len(&self, index: usize) -> Option<usize> {
        match self.inner.partitions.get(index) {
            Some(partition) => Some(partition.events.lock().await.len()),
            None => None,
        }
    }

    /// Snapshot of partition `index`'s events, if it exists.
    pub async fn partition_events(&self, index: usize) -> Option<Vec<EventData>> {
        match self.inner.partitions.get(index) {
            Some(partition) => Some(partition.events.lock().await.clone()),
            None => None,
        }
    }

    /// Last checkpoint recorded for a consumer group on a partition.
    pub async fn checkpointed_offset(
        &self,
        consumer_group: &str,
        partition_id: &str,
    ) -> Option<u64> {
        self.inner
            .checkpoints
            .lock()
            .await
            .get(&(consumer_group.to_string(), partition_id.to_string()))
            .copied()
    }

    async fn append(&self, payload: Bytes) {
        let index = self.inner.next_partition.fetch_add(1, Ordering::Relaxed)
            % self.inner.partitions.len();
        let partition = &self.inner.partitions[index];
        let mut events = partition.events.lock().await;
        let offset = events.len() as u64;
        events.push(EventData::new(payload).with_offset(offset));
        drop(events);
        partition.notify.notify_waiters();
    }
}

/// Publishing endpoint handed out by [`InMemoryHub::sink`].
pub struct HubSink {
    hub: InMemoryHub,
    closed: AtomicBool,
}

#[async_trait]
impl EventSink for HubSink {
    async fn publish(&self, payload: Bytes) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(Error::Send("sink is closed".to_string()));
        }
        self.hub.append(payload).await;
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.closed.store(true, Ordering::Release);
        Ok(())
    }
}

#[async_trait]
impl LeaseStore for InMemoryHub {
    async fn acquire(&self, request: &LeaseRequest) -> Result<LeaseHandle> {
        if request.stream.stream_name != self.inner.stream_name {
            return Err(Error::Connection(format!(
                "stream '{}' is not hosted by this hub",
                request.stream.stream_name
            )));
        }
        let id = self.inner.next_lease_id.fetch_add(1, Ordering::Relaxed);
        debug!(lease = id, host = %request.host_name, "lease acquired");
        Ok(LeaseHandle {
            id,
            host_name: request.host_name.clone(),
            stream_name: request.stream.stream_name.clone(),
            consumer_group: request.stream.consumer_group.clone(),
        })
    }

    async fn register(
        &self,
        lease: &LeaseHandle,
        bridge: ProcessorBridge,
        options: ProcessorOptions,
    ) -> Result<()> {
        if lease.stream_name != self.inner.stream_name {
            return Err(Error::Connection(format!(
                "stream '{}' is not hosted by this hub",
                lease.stream_name
            )));
        }
        let mut registrations = self.inner.registrations.lock().await;
        if registrations.contains_key(&lease.id) {
            return Err(Error::Connection(format!(
                "lease {} is already registered",
                lease.id
            )));
        }

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let mut pumps = Vec::with_capacity(self.inner.partitions.len());
        for partition in &self.inner.partitions {
            pumps.push(tokio::spawn(pump(
                Arc::clone(&self.inner),
                Arc::clone(partition),
                bridge.clone(),
                options.clone(),
                lease.host_name.clone(),
                lease.consumer_group.clone(),
                shutdown_rx.clone(),
            )));
        }
        registrations.insert(
            lease.id,
            Registration {
                shutdown: shutdown_tx,
                pumps,
            },
        );
        info!(
            lease = lease.id,
            host = %lease.host_name,
            partitions = self.inner.partitions.len(),
            "processor registered"
        );
        Ok(())
    }

    async fn revoke(&self, lease: &LeaseHandle) -> Result<()> {
        let registration = self.inner.registrations.lock().await.remove(&lease.id);
        let Some(registration) = registration else {
            return Ok(());
        };

        let _ = registration.shutdown.send(true);
        for pump in registration.pumps {
            if let Err(e) = pump.await {
                warn!(lease = lease.id, error = %e, "partition pump aborted");
            }
        }
        info!(lease = lease.id, host = %lease.host_name, "lease revoked");
        Ok(())
    }
}

struct HubCheckpointer {
    inner: Arc<HubInner>,
    consumer_group: String,
}

#[async_trait]
impl Checkpointer for HubCheckpointer {
    async fn checkpoint(&self, partition_id: &str, offset: u64) -> Result<()> {
        self.inner
            .checkpoints
            .lock()
            .await
            .insert(
                (self.consumer_group.clone(), partition_id.to_string()),
                offset,
            );
        debug!(group = %self.consumer_group, partition = partition_id, offset, "checkpointed");
        Ok(())
    }
}

/// Delivery loop for one partition of one registration.
///
/// Runs `on_open` once, then hands batches over in offset order until
/// told to shut down (close reason `Shutdown`) or a callback fails
/// (close reason `LeaseLost`, after reporting the fault). The context
/// cursor is advanced past each batch before `on_events` runs, so a
/// checkpoint taken inside the callback records the resume position.
async fn pump(
    inner: Arc<HubInner>,
    partition: Arc<PartitionState>,
    bridge: ProcessorBridge,
    options: ProcessorOptions,
    host_name: String,
    consumer_group: String,
    mut shutdown: watch::Receiver<bool>,
) {
    let checkpointer = Arc::new(HubCheckpointer {
        inner: Arc::clone(&inner),
        consumer_group: consumer_group.clone(),
    });
    let context = PartitionContext::new(partition.id.clone(), checkpointer);
    let processor = bridge.processor_for(&context);

    let resume = inner
        .checkpoints
        .lock()
        .await
        .get(&(consumer_group, partition.id.clone()))
        .copied()
        .unwrap_or(0);
    context.advance_to(resume);

    if let Err(e) = processor.on_open(&context).await {
        report_fault(&options, &host_name, &partition.id, format!("open failed: {e}"));
        return;
    }
    debug!(partition = %partition.id, host = %host_name, resume, "partition pump started");

    let max_batch = options.max_batch_size.max(1);
    loop {
        if *shutdown.borrow() {
            break;
        }

        // Created before the emptiness check so an append landing in
        // between still wakes the select below.
        let notified = partition.notify.notified();
        let batch = next_batch(&partition, context.current_offset(), max_batch).await;
        if batch.is_empty() {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
                _ = notified => {}
            }
            continue;
        }

        let last = batch[batch.len() - 1].offset;
        context.advance_to(last + 1);
        if let Err(e) = processor.on_events(&context, &batch).await {
            report_fault(
                &options,
                &host_name,
                &partition.id,
                format!("processing failed: {e}"),
            );
            if let Err(e) = processor.on_close(&context, CloseReason::LeaseLost).await {
                report_fault(&options, &host_name, &partition.id, format!("close failed: {e}"));
            }
            return;
        }
    }

    if let Err(e) = processor.on_close(&context, CloseReason::Shutdown).await {
        report_fault(&options, &host_name, &partition.id, format!("close failed: {e}"));
    }
}

async fn next_batch(partition: &PartitionState, from: u64, max: usize) -> Vec<EventData> {
    let events = partition.events.lock().await;
    let start = from as usize;
    if start >= events.len() {
        return Vec::new();
    }
    let end = events.len().min(start + max);
    events[start..end].to_vec()
}

fn report_fault(options: &ProcessorOptions, host_name: &str, partition_id: &str, message: String) {
    warn!(host = host_name, partition = partition_id, message = %message, "processor fault");
    if let Some(sender) = &options.fault_sender {
        let _ = sender.send(ProcessorFault {
            host_name: host_name.to_string(),
            partition_id: partition_id.to_string(),
            message,
        });
    }
}
