use crate::bridge::ProcessorBridge;
use crate::error::{require_non_empty, Error, Result};
use crate::lease::{LeaseHandle, LeaseRequest, LeaseStore};
use crate::processor::{EventProcessor, ProcessorOptions};
use hubkit_core::{StorageConfig, StreamConfig};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// One live claim held by the registry.
struct Subscription {
    stream_name: String,
    lease: LeaseHandle,
    processor: Arc<dyn EventProcessor>,
}

/// Single-writer map from host name to lease-bound processor
/// registration.
///
/// The registry guarantees at most one live subscription per host name:
/// subscribing an already-subscribed host revokes the old lease before a
/// new one is acquired. All mutating operations serialize on one async
/// lock held across the lease-store calls, so overlapping subscribes and
/// unsubscribes can never interleave their revoke/acquire sequences or
/// double-revoke a lease.
///
/// An entry is committed to the map only after the store's registration
/// call has succeeded, and removed only after its revoke has succeeded;
/// the map never holds a half-registered entry. The one exception to
/// fail-fast is [`unsubscribe_all`](Self::unsubscribe_all), which keeps
/// the progress it made before the first failure.
///
/// Registries are ordinary values with no process-wide instance; create
/// as many as needed, each wired to its own [`LeaseStore`].
pub struct SubscriptionRegistry {
    store: Arc<dyn LeaseStore>,
    subscriptions: Mutex<BTreeMap<String, Subscription>>,
}

impl SubscriptionRegistry {
    /// Create a registry backed by `store`.
    pub fn new(store: Arc<dyn LeaseStore>) -> Self {
        Self {
            store,
            subscriptions: Mutex::new(BTreeMap::new()),
        }
    }

    /// Subscribe `host_name` to a stream, replacing any existing
    /// subscription under that name.
    ///
    /// Empty required fields fail with `InvalidArgument` before any
    /// lease-store call. A failed revoke of the prior lease, or a failed
    /// acquire/registration, fails with `Subscription` naming the host
    /// or the stream respectively; in both cases the map keeps its prior
    /// shape for that key.
    pub async fn subscribe(
        &self,
        host_name: &str,
        stream: &StreamConfig,
        storage: &StorageConfig,
        processor: Arc<dyn EventProcessor>,
        options: ProcessorOptions,
    ) -> Result<()> {
        require_non_empty("host name", host_name)?;
        require_non_empty("stream endpoint", &stream.endpoint)?;
        require_non_empty("stream name", &stream.stream_name)?;
        require_non_empty("consumer group", &stream.consumer_group)?;
        require_non_empty("storage account name", &storage.account_name)?;
        require_non_empty("storage access key", &storage.access_key)?;

        let mut subscriptions = self.subscriptions.lock().await;

        if let Some(existing) = subscriptions.get(host_name).map(|s| s.lease.clone()) {
            debug!(host = host_name, "revoking existing lease before resubscribe");
            self.store.revoke(&existing).await.map_err(|e| Error::Subscription {
                name: host_name.to_string(),
                cause: e.to_string(),
            })?;
            subscriptions.remove(host_name);
        }

        let request = LeaseRequest {
            host_name: host_name.to_string(),
            stream: stream.clone(),
            storage: storage.clone(),
        };
        let lease = self.store.acquire(&request).await.map_err(|e| Error::Subscription {
            name: stream.stream_name.clone(),
            cause: e.to_string(),
        })?;

        let bridge = ProcessorBridge::new(Arc::clone(&processor));
        self.store
            .register(&lease, bridge, options)
            .await
            .map_err(|e| Error::Subscription {
                name: stream.stream_name.clone(),
                cause: e.to_string(),
            })?;

        subscriptions.insert(
            host_name.to_string(),
            Subscription {
                stream_name: stream.stream_name.clone(),
                lease,
                processor,
            },
        );
        info!(host = host_name, stream = %stream.stream_name, "subscribed");
        Ok(())
    }

    /// Revoke and remove `host_name`'s subscription. Unknown hosts are a
    /// no-op; a failed revoke leaves the entry in place.
    pub async fn unsubscribe(&self, host_name: &str) -> Result<()> {
        let mut subscriptions = self.subscriptions.lock().await;
        let Some(lease) = subscriptions.get(host_name).map(|s| s.lease.clone()) else {
            return Ok(());
        };

        self.store.revoke(&lease).await.map_err(|e| Error::Subscription {
            name: host_name.to_string(),
            cause: e.to_string(),
        })?;
        subscriptions.remove(host_name);
        info!(host = host_name, "unsubscribed");
        Ok(())
    }

    /// Revoke every subscription known at call time, in ascending
    /// lexicographic host-name order.
    ///
    /// Stops at the first revoke failure, naming the offending host.
    /// Entries revoked before the failure stay removed; the failed entry
    /// and any hosts after it remain subscribed.
    pub async fn unsubscribe_all(&self) -> Result<()> {
        let mut subscriptions = self.subscriptions.lock().await;
        let leases: Vec<(String, LeaseHandle)> = subscriptions
            .iter()
            .map(|(host, s)| (host.clone(), s.lease.clone()))
            .collect();

        for (host, lease) in leases {
            if let Err(e) = self.store.revoke(&lease).await {
                warn!(host = %host, error = %e, "bulk unsubscribe stopped");
                return Err(Error::Subscription {
                    name: host,
                    cause: e.to_string(),
                });
            }
            subscriptions.remove(&host);
            debug!(host = %host, "unsubscribed");
        }
        Ok(())
    }

    /// True iff `host_name` currently holds a subscription. An empty
    /// host name fails with `InvalidArgument`.
    pub async fn is_subscribed_to(&self, host_name: &str) -> Result<bool> {
        require_non_empty("host name", host_name)?;
        Ok(self.subscriptions.lock().await.contains_key(host_name))
    }

    /// True iff any subscription is live.
    pub async fn is_subscribed_to_any(&self) -> bool {
        !self.subscriptions.lock().await.is_empty()
    }

    /// Snapshot of the subscribed host names, in lexicographic order.
    pub async fn subscribed_hosts(&self) -> Vec<String> {
        self.subscriptions.lock().await.keys().cloned().collect()
    }

    /// Stream a host is subscribed to, if it is subscribed.
    pub async fn stream_of(&self, host_name: &str) -> Option<String> {
        self.subscriptions
            .lock()
            .await
            .get(host_name)
            .map(|s| s.stream_name.clone())
    }

    /// Processor a host is subscribed with, if it is subscribed.
    pub async fn processor_of(&self, host_name: &str) -> Option<Arc<dyn EventProcessor>> {
        self.subscriptions
            .lock()
            .await
            .get(host_name)
            .map(|s| Arc::clone(&s.processor))
    }
}
