//! Riftwatch – live state tracker and snapshot publisher for Guardians of the Rift
//!
//! This crate observes the minigame through an ordered stream of world events
//! and keeps a consistent model of it:
//! - Entity lifecycle tracking that reconciles spawn/despawn notifications into role slots
//! - Inference of the colossal pouch's hidden essence count from inventory deltas
//! - Phase, countdown, and reward tracking from HUD widgets and game chat
//! - Mapping of world entities and inventory slots to clickable screen points
//! - One immutable snapshot per simulation step, served over a local NDJSON listener

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

/// Tracking core: entities, inference, phase, snapshots
pub mod runtime;

/// Snapshot listener and client
pub mod service;

// Re-export key types for convenience
pub use runtime::publisher::SnapshotPublisher;
pub use runtime::snapshot::Snapshot;
pub use runtime::{Runtime, RuntimeConfig};
pub use service::{ServerConfig, SnapshotServer};

/// Current version of riftwatch
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Protocol version for the snapshot service
pub const PROTOCOL_VERSION: &str = "1.0.0";
