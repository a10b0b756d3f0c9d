//! Synchronous front door for callers without an async runtime.

use crate::connection::Connection;
use crate::error::Result;
use crate::lease::LeaseStore;
use crate::processor::{EventProcessor, ProcessorOptions};
use crate::toolbox;
use bytes::Bytes;
use hubkit_core::{ConnectionConfig, StorageConfig, StreamConfig};
use std::sync::Arc;
use tokio::runtime::Runtime;

/// Blocking counterpart to [`toolbox::Toolbox`].
///
/// Every method drives the async facade to completion on a private
/// multi-thread runtime, so delivery tasks spawned by the lease store
/// keep running between calls. Must not be used from inside an async
/// context; blocking one runtime on another panics.
pub struct Toolbox {
    runtime: Runtime,
    inner: toolbox::Toolbox,
}

impl Toolbox {
    /// Create a blocking toolbox backed by `store`, with its own runtime.
    pub fn new(store: Arc<dyn LeaseStore>) -> Self {
        Self {
            runtime: Runtime::new().expect("tokio runtime"),
            inner: toolbox::Toolbox::new(store),
        }
    }

    /// Open the default framed-TCP transport from `config` and install it.
    pub fn connect(&self, config: &ConnectionConfig) -> Result<()> {
        self.runtime.block_on(self.inner.connect(config))
    }

    /// Install an already-established connection.
    pub fn connect_with(&self, connection: Connection) {
        self.runtime.block_on(self.inner.connect_with(connection));
    }

    /// Close and drop the current connection.
    pub fn disconnect(&self) -> Result<()> {
        self.runtime.block_on(self.inner.disconnect())
    }

    /// True while an installed connection is open.
    pub fn is_connected(&self) -> bool {
        self.runtime.block_on(self.inner.is_connected())
    }

    /// Publish one event payload.
    pub fn send(&self, event: impl Into<Bytes>) -> Result<()> {
        self.runtime.block_on(self.inner.send(event))
    }

    /// Publish a batch of payloads, validated before anything is written.
    pub fn send_batch<I, B>(&self, events: I) -> Result<()>
    where
        I: IntoIterator<Item = B>,
        B: Into<Bytes>,
    {
        self.runtime.block_on(self.inner.send_batch(events))
    }

    /// Subscribe `host_name` to a stream.
    pub fn subscribe(
        &self,
        host_name: &str,
        stream: &StreamConfig,
        storage: &StorageConfig,
        processor: Arc<dyn EventProcessor>,
        options: ProcessorOptions,
    ) -> Result<()> {
        self.runtime
            .block_on(self.inner.subscribe(host_name, stream, storage, processor, options))
    }

    /// Revoke `host_name`'s subscription, if any.
    pub fn unsubscribe(&self, host_name: &str) -> Result<()> {
        self.runtime.block_on(self.inner.unsubscribe(host_name))
    }

    /// Revoke every live subscription, stopping at the first failure.
    pub fn unsubscribe_all(&self) -> Result<()> {
        self.runtime.block_on(self.inner.unsubscribe_all())
    }

    /// True iff `host_name` currently holds a subscription.
    pub fn is_subscribed_to(&self, host_name: &str) -> Result<bool> {
        self.runtime.block_on(self.inner.is_subscribed_to(host_name))
    }

    /// True iff any subscription is live.
    pub fn is_subscribed_to_any(&self) -> bool {
        self.runtime.block_on(self.inner.is_subscribed_to_any())
    }
}
