//! Hubkit Integration Tests
//!
//! This crate contains integration and end-to-end tests for the hubkit
//! event hub toolbox. It is NOT published to crates.io.
//!
//! # Test Categories
//!
//! - **toolbox_pipeline**: publish → hub → processor flows, checkpoint
//!   resume, fault isolation, and the blocking facade
//! - **tcp_transport**: the framed TCP transport against a real listener
//! - **subscription_lifecycle**: registry behavior driven end to end
//!
//! # Running Tests
//!
//! ```bash
//! # Run all integration tests
//! cargo test -p hubkit-integration-tests
//!
//! # Run specific test suite
//! cargo test -p hubkit-integration-tests --test toolbox_pipeline
//!
//! # Run with logging
//! RUST_LOG=debug cargo test -p hubkit-integration-tests -- --nocapture
//! ```

pub mod fixtures;
pub mod helpers;
pub mod mocks;

pub use fixtures::*;
pub use helpers::*;
