pub mod blocking;
pub mod bridge;
pub mod checkpoint;
pub mod connection;
pub mod error;
pub mod lease;
pub mod memory;
pub mod processor;
pub mod receiver;
pub mod registry;
pub mod sink;
pub mod toolbox;

pub use bridge::ProcessorBridge;
pub use checkpoint::CheckpointScheduler;
pub use connection::Connection;
pub use error::{Error, Result};
pub use lease::{LeaseHandle, LeaseRequest, LeaseStore};
pub use memory::{HubSink, InMemoryHub};
pub use processor::{
    Checkpointer, CloseReason, EventProcessor, PartitionContext, ProcessorFault, ProcessorOptions,
};
pub use receiver::{EventReceiver, Notification, NotificationSource, ReceivedEvent};
pub use registry::SubscriptionRegistry;
pub use sink::{EventSink, TcpEventSink};
pub use toolbox::Toolbox;
