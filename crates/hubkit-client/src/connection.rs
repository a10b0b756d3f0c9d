use crate::error::{require_non_empty, Error, Result};
use crate::sink::{EventSink, TcpEventSink};
use bytes::Bytes;
use hubkit_core::ConnectionConfig;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::info;

/// A live publishing channel into one stream.
///
/// Cloning is cheap and clones share the same underlying channel; all
/// producers may publish concurrently. The connection adds no locking of
/// its own around [`send`](Connection::send), leaving write serialization
/// to the [`EventSink`] implementation.
#[derive(Clone)]
pub struct Connection {
    stream_name: String,
    sink: Arc<dyn EventSink>,
    open: Arc<AtomicBool>,
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("stream_name", &self.stream_name)
            .field("open", &self.open)
            .finish_non_exhaustive()
    }
}

impl Connection {
    /// Establish the default framed-TCP transport from `config`.
    pub async fn open(config: &ConnectionConfig) -> Result<Self> {
        require_non_empty("endpoint", &config.endpoint)?;
        require_non_empty("stream name", &config.stream_name)?;

        let sink = TcpEventSink::connect(&config.endpoint).await?;
        info!(stream = %config.stream_name, endpoint = %config.endpoint, "connected");
        Ok(Self::with_sink(config.stream_name.clone(), Arc::new(sink)))
    }

    /// Wrap an already-established transport.
    pub fn with_sink(stream_name: impl Into<String>, sink: Arc<dyn EventSink>) -> Self {
        Self {
            stream_name: stream_name.into(),
            sink,
            open: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Stream this connection publishes into
    pub fn stream_name(&self) -> &str {
        &self.stream_name
    }

    /// True until [`close`](Connection::close) has run
    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    /// Publish one payload. One network write per call.
    pub async fn send(&self, payload: Bytes) -> Result<()> {
        if !self.is_open() {
            return Err(Error::NotConnected);
        }
        self.sink.publish(payload).await
    }

    /// Close the channel. Later sends fail with `NotConnected`.
    pub async fn close(&self) -> Result<()> {
        if self.open.swap(false, Ordering::AcqRel) {
            self.sink.close().await?;
        }
        Ok(())
    }
}
