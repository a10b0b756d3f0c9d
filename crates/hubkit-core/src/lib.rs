pub mod config;
pub mod event;
pub mod telemetry;

pub use config::{ConnectionConfig, StorageConfig, StreamConfig};
pub use event::EventData;
pub use telemetry::{DeviceKind, DeviceTelemetry, WebRequest};
