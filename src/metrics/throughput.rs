//! Interface throughput from kernel byte counters.

use crate::error::{DaemonError, Result};
use crate::metrics::data::Throughput;
use crate::metrics::host::Host;
use std::collections::HashMap;
use std::path::PathBuf;
use tokio::time::Instant;

/// Cumulative byte counters of one interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteCounters {
    pub rx_bytes: u64,
    pub tx_bytes: u64,
}

#[derive(Debug, Clone, Copy)]
struct Baseline {
    counters: ByteCounters,
    at: Instant,
}

/// Remembers the previous counters per interface and turns them into rates.
#[derive(Debug, Default)]
pub struct ThroughputSampler {
    baselines: HashMap<String, Baseline>,
}

impl ThroughputSampler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read the interface counters through `host` and return the rate since
    /// the previous call for the same interface.
    pub async fn sample<H: Host + ?Sized>(&mut self, host: &H, interface: &str) -> Result<Throughput> {
        let counters = read_counters(host, interface).await?;
        Ok(self.update(interface, counters, Instant::now()))
    }

    /// Record `counters` observed at `at`. The first observation of an
    /// interface yields a zero rate; a counter that went backwards (interface
    /// restart) yields zero for that direction.
    pub fn update(&mut self, interface: &str, counters: ByteCounters, at: Instant) -> Throughput {
        let previous = self
            .baselines
            .insert(interface.to_string(), Baseline { counters, at });

        let Some(previous) = previous else {
            return Throughput::default();
        };

        let seconds = at
            .saturating_duration_since(previous.at)
            .as_secs_f64()
            .max(0.001);

        Throughput {
            rx_kbps: kbps(previous.counters.rx_bytes, counters.rx_bytes, seconds),
            tx_kbps: kbps(previous.counters.tx_bytes, counters.tx_bytes, seconds),
        }
    }
}

fn kbps(before: u64, now: u64, seconds: f64) -> u64 {
    let delta = now.saturating_sub(before);
    (delta as f64 * 8.0 / 1000.0 / seconds) as u64
}

async fn read_counters<H: Host + ?Sized>(host: &H, interface: &str) -> Result<ByteCounters> {
    let base = PathBuf::from("/sys/class/net").join(interface).join("statistics");
    let rx = host.read_file(&base.join("rx_bytes")).await?;
    let tx = host.read_file(&base.join("tx_bytes")).await?;
    Ok(ByteCounters {
        rx_bytes: parse_counter(&rx)?,
        tx_bytes: parse_counter(&tx)?,
    })
}

fn parse_counter(raw: &str) -> Result<u64> {
    raw.trim()
        .parse()
        .map_err(|_| DaemonError::parse_error(format!("bad byte counter {:?}", raw.trim())))
}
