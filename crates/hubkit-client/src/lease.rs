use crate::bridge::ProcessorBridge;
use crate::processor::ProcessorOptions;
use crate::Result;
use async_trait::async_trait;
use hubkit_core::{StorageConfig, StreamConfig};

/// Exclusive, revocable claim on the partitions of a stream.
///
/// Issued by [`LeaseStore::acquire`] and passed back verbatim to
/// `register` and `revoke`; the registry treats it as opaque.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaseHandle {
    /// Store-assigned lease id
    pub id: u64,

    /// Host that owns the lease
    pub host_name: String,

    /// Stream the lease covers
    pub stream_name: String,

    /// Consumer group the lease reads for
    pub consumer_group: String,
}

/// Parameters for one lease acquisition.
#[derive(Debug, Clone)]
pub struct LeaseRequest {
    /// Host name claiming the lease
    pub host_name: String,

    /// Stream to lease
    pub stream: StreamConfig,

    /// Durable store credentials for lease and checkpoint state
    pub storage: StorageConfig,
}

/// Durable arbiter deciding which host owns which partitions.
///
/// Implementations also drive delivery: `register` binds a processor
/// bridge to an acquired lease and starts the per-partition callback
/// sequence, and `revoke` stops it. All three calls may involve slow
/// network round trips and may fail; the registry surfaces the first
/// failure without retrying. [`crate::InMemoryHub`] is the bundled
/// process-local implementation.
#[async_trait]
pub trait LeaseStore: Send + Sync {
    /// Claim the stream for `request.host_name`, returning a revocable handle.
    async fn acquire(&self, request: &LeaseRequest) -> Result<LeaseHandle>;

    /// Bind `bridge` to an acquired lease and start delivery.
    async fn register(
        &self,
        lease: &LeaseHandle,
        bridge: ProcessorBridge,
        options: ProcessorOptions,
    ) -> Result<()>;

    /// Release the lease and stop the delivery bound to it.
    async fn revoke(&self, lease: &LeaseHandle) -> Result<()>;
}
