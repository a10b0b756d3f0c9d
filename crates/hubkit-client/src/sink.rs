use crate::error::{Error, Result};
use async_trait::async_trait;
use bytes::Bytes;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Outbound transport for opaque event payloads.
///
/// The toolbox treats the transport as a collaborator: it never retries or
/// reorders writes, and it relies on the implementation for whatever write
/// serialization the medium needs.
#[async_trait]
pub trait EventSink: Send + Sync {
    /// Write one payload to the bus.
    async fn publish(&self, payload: Bytes) -> Result<()>;

    /// Tear the channel down. Publishing afterwards fails.
    async fn close(&self) -> Result<()>;
}

/// [`EventSink`] over a TCP stream, framing each payload with a u32
/// big-endian length prefix.
///
/// Concurrent publishes serialize on the stream lock, so frames never
/// interleave on the wire.
#[derive(Debug)]
pub struct TcpEventSink {
    stream: Mutex<TcpStream>,
    peer: String,
}

impl TcpEventSink {
    /// Connect to an event hub ingest endpoint
    pub async fn connect(addr: &str) -> Result<Self> {
        info!("Connecting to event hub at {}", addr);
        let stream = TcpStream::connect(addr)
            .await
            .map_err(|e| Error::Connection(e.to_string()))?;

        Ok(Self {
            stream: Mutex::new(stream),
            peer: addr.to_string(),
        })
    }

    /// Address this sink writes to
    pub fn peer(&self) -> &str {
        &self.peer
    }
}

#[async_trait]
impl EventSink for TcpEventSink {
    async fn publish(&self, payload: Bytes) -> Result<()> {
        let mut stream = self.stream.lock().await;
        write_frame(&mut stream, &payload)
            .await
            .map_err(|e| Error::Send(e.to_string()))?;
        debug!(peer = %self.peer, bytes = payload.len(), "frame written");
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        let mut stream = self.stream.lock().await;
        stream
            .shutdown()
            .await
            .map_err(|e| Error::Connection(e.to_string()))?;
        info!(peer = %self.peer, "connection closed");
        Ok(())
    }
}

async fn write_frame(stream: &mut TcpStream, payload: &[u8]) -> std::io::Result<()> {
    let len = payload.len() as u32;
    stream.write_all(&len.to_be_bytes()).await?;
    stream.write_all(payload).await?;
    stream.flush().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn test_publish_writes_length_prefixed_frame() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();

        let accept = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut len_buf = [0u8; 4];
            socket.read_exact(&mut len_buf).await.unwrap();
            let len = u32::from_be_bytes(len_buf) as usize;
            let mut body = vec![0u8; len];
            socket.read_exact(&mut body).await.unwrap();
            body
        });

        let sink = TcpEventSink::connect(&addr).await.unwrap();
        sink.publish(Bytes::from_static(b"hello hub")).await.unwrap();

        let body = accept.await.unwrap();
        assert_eq!(body, b"hello hub");
    }

    #[tokio::test]
    async fn test_connect_refused_maps_to_connection_error() {
        // Bind then drop to get an address nothing is listening on.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        drop(listener);

        let err = TcpEventSink::connect(&addr).await.unwrap_err();
        assert!(matches!(err, Error::Connection(_)));
    }
}
