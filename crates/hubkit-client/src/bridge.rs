use crate::processor::{EventProcessor, PartitionContext};
use std::sync::Arc;

/// Adapts one long-lived [`EventProcessor`] to the bus's per-partition
/// construction contract: every partition of a host gets the same shared
/// instance rather than a fresh one.
///
/// The bus may drive several partitions in parallel against that single
/// instance, which is why [`EventProcessor`] requires `Send + Sync`.
#[derive(Clone)]
pub struct ProcessorBridge {
    processor: Arc<dyn EventProcessor>,
}

impl ProcessorBridge {
    /// Wrap `processor` for reuse across all partitions of a host.
    pub fn new(processor: Arc<dyn EventProcessor>) -> Self {
        Self { processor }
    }

    /// Hand out the shared processor for the context's partition.
    pub fn processor_for(&self, _context: &PartitionContext) -> Arc<dyn EventProcessor> {
        Arc::clone(&self.processor)
    }
}
