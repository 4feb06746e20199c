//! Router metrics collection and data structures.
//!
//! Collects the facts shown on the status pages: addresses, reachability,
//! Wi-Fi link, DHCP leases, VPN address, interface throughput, temperature,
//! load and memory.

pub mod collector;
pub mod data;
pub mod host;
pub mod throughput;
pub mod traits;

// Re-export commonly used items
pub use collector::RouterCollector;
pub use data::{Reading, RouterSnapshot};
pub use host::{Host, LiveHost};
pub use throughput::ThroughputSampler;
pub use traits::MetricsProvider;
