use bytes::Bytes;
use chrono::{DateTime, Utc};

/// A single event delivered from a stream partition
#[derive(Debug, Clone)]
pub struct EventData {
    /// Offset within the partition
    pub offset: u64,

    /// Timestamp when the event was enqueued
    pub timestamp: DateTime<Utc>,

    /// Raw payload
    pub payload: Bytes,
}

impl EventData {
    /// Create a new event stamped with the current time
    pub fn new(payload: impl Into<Bytes>) -> Self {
        Self {
            offset: 0,
            timestamp: Utc::now(),
            payload: payload.into(),
        }
    }

    /// Set the partition offset
    pub fn with_offset(mut self, offset: u64) -> Self {
        self.offset = offset;
        self
    }

    /// Payload size in bytes
    pub fn len(&self) -> usize {
        self.payload.len()
    }

    /// True if the payload is empty
    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }
}
