//! Link-layer traffic generation: raw Ethernet frames crafted from a
//! declarative configuration and injected at a controlled rate.

/// Traffic configuration and configuration files
pub mod config;
/// Error types
pub mod error;
/// Ethernet frame construction
pub mod frame;
/// Rate-governed send loop
pub mod engine;
/// Generation statistics
pub mod stats;
/// Periodic statistics report
pub mod ui;
/// Transport sinks (live injection, pcap export)
pub mod sink;
/// Host network interfaces
pub mod interfaces;

mod utils;

pub use config::{PacketCount, TrafficConfig, TrafficMode};
pub use error::{Error, Result};
pub use frame::Frame;
pub use stats::{Stats, StatsSnapshot};
