//! # Hubkit
//!
//! Client toolbox for partitioned, leased event hub streams.
//!
//! This crate provides a unified API for the hubkit ecosystem,
//! re-exporting the commonly used types from [`hubkit_core`] and
//! [`hubkit_client`].
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use hubkit::prelude::*;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     // Host a small in-process hub and wire a toolbox to it
//!     let hub = InMemoryHub::new("events", 4);
//!     let toolbox = Toolbox::new(Arc::new(hub.clone()));
//!     toolbox.connect_with(hub.connection()).await;
//!
//!     // Publish a few events
//!     toolbox.send("hello").await?;
//!     toolbox.send_batch(["one", "two", "three"]).await?;
//!
//!     // Subscribe the ready-made text receiver
//!     let receiver = Arc::new(EventReceiver::new(Duration::from_secs(30)));
//!     let mut events = receiver.events();
//!     toolbox
//!         .subscribe(
//!             "host-1",
//!             &StreamConfig::new(),
//!             &StorageConfig::default(),
//!             receiver,
//!             ProcessorOptions::default(),
//!         )
//!         .await?;
//!
//!     while let Ok(event) = events.recv().await {
//!         println!("partition {}: {}", event.partition_id, event.body);
//!     }
//!
//!     toolbox.unsubscribe_all().await?;
//!     toolbox.disconnect().await?;
//!     Ok(())
//! }
//! ```

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

// Re-export core crate
pub use hubkit_core as core;

/// Event payload and metadata types.
pub mod event {
    pub use hubkit_core::event::*;
}

/// Connection, stream, and storage configuration.
pub mod config {
    pub use hubkit_core::config::*;
}

/// Simulated device telemetry payloads.
pub mod telemetry {
    pub use hubkit_core::telemetry::*;
}

// Re-export client crate
pub use hubkit_client as client;

/// Error types.
pub mod error {
    pub use hubkit_client::error::*;
}

/// Blocking front door for callers without an async runtime.
pub mod blocking {
    pub use hubkit_client::blocking::*;
}

pub use hubkit_client::Toolbox;

/// Prelude module for convenient imports.
///
/// ```rust
/// use hubkit::prelude::*;
/// ```
pub mod prelude {
    pub use hubkit_client::{
        CloseReason, Connection, EventProcessor, EventReceiver, InMemoryHub, PartitionContext,
        ProcessorOptions, SubscriptionRegistry, Toolbox,
    };
    pub use hubkit_core::{
        ConnectionConfig, DeviceTelemetry, EventData, StorageConfig, StreamConfig,
    };
}
