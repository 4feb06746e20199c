//! Data structures for router metrics.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::Ipv4Addr;

/// A single metric value, or an explicit marker that it could not be read.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Reading<T> {
    Value(T),
    Unavailable,
}

impl<T> Reading<T> {
    /// Borrow the value, if any.
    pub fn as_ref(&self) -> Reading<&T> {
        match self {
            Reading::Value(v) => Reading::Value(v),
            Reading::Unavailable => Reading::Unavailable,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Reading<U> {
        match self {
            Reading::Value(v) => Reading::Value(f(v)),
            Reading::Unavailable => Reading::Unavailable,
        }
    }

    pub fn value(self) -> Option<T> {
        match self {
            Reading::Value(v) => Some(v),
            Reading::Unavailable => None,
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, Reading::Value(_))
    }

    /// Format the value, or return `placeholder` when unavailable.
    pub fn show_or(&self, placeholder: &str, f: impl FnOnce(&T) -> String) -> String {
        match self {
            Reading::Value(v) => f(v),
            Reading::Unavailable => placeholder.to_string(),
        }
    }
}

impl<T> From<Option<T>> for Reading<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => Reading::Value(v),
            None => Reading::Unavailable,
        }
    }
}

impl<T: fmt::Display> fmt::Display for Reading<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reading::Value(v) => v.fmt(f),
            Reading::Unavailable => f.write_str("-"),
        }
    }
}

/// Everything the pages show, gathered in one sampling tick.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouterSnapshot {
    /// Local wall-clock time the snapshot was taken
    pub taken_at: DateTime<Local>,
    pub hostname: Reading<String>,
    /// Seconds since boot
    pub uptime_seconds: Reading<u64>,
    /// Source address used for the default route
    pub wan_ip: Reading<Ipv4Addr>,
    /// Whether the reachability probe answered
    pub internet_reachable: bool,
    pub wifi: Reading<WifiLink>,
    pub lan_ip: Reading<Ipv4Addr>,
    pub dhcp_leases: Reading<usize>,
    pub tailscale_ip: Reading<Ipv4Addr>,
    pub lan_throughput: Reading<Throughput>,
    pub wifi_throughput: Reading<Throughput>,
    pub cpu_celsius: Reading<f32>,
    pub load_average: Reading<LoadAverage>,
    pub memory: Reading<MemoryUsage>,
}

/// Association state of the wireless interface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum WifiLink {
    Connected {
        ssid: String,
        /// Signal strength in dBm
        rssi_dbm: Reading<i32>,
    },
    NotConnected,
}

/// Receive and transmit rate of one interface.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Throughput {
    pub rx_kbps: u64,
    pub tx_kbps: u64,
}

impl Throughput {
    /// Combined rate in both directions.
    pub fn total_kbps(&self) -> u64 {
        self.rx_kbps + self.tx_kbps
    }
}

/// System load averages.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LoadAverage {
    pub one_minute: f64,
    pub five_minutes: f64,
    pub fifteen_minutes: f64,
}

/// Memory usage derived from `MemTotal` and `MemAvailable`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MemoryUsage {
    pub total_mb: u64,
    pub used_mb: u64,
    /// Usage percentage (0.0 to 100.0)
    pub used_percent: f32,
}

impl MemoryUsage {
    /// Build from `/proc/meminfo` kB figures.
    pub fn from_kb(total_kb: u64, available_kb: u64) -> Self {
        let used_kb = total_kb.saturating_sub(available_kb);
        let used_percent = if total_kb > 0 {
            (used_kb as f32 / total_kb as f32) * 100.0
        } else {
            0.0
        };
        Self {
            total_mb: total_kb / 1024,
            used_mb: used_kb / 1024,
            used_percent,
        }
    }
}

impl RouterSnapshot {
    /// A snapshot taken now with every field unavailable.
    pub fn unavailable() -> Self {
        Self {
            taken_at: Local::now(),
            hostname: Reading::Unavailable,
            uptime_seconds: Reading::Unavailable,
            wan_ip: Reading::Unavailable,
            internet_reachable: false,
            wifi: Reading::Unavailable,
            lan_ip: Reading::Unavailable,
            dhcp_leases: Reading::Unavailable,
            tailscale_ip: Reading::Unavailable,
            lan_throughput: Reading::Unavailable,
            wifi_throughput: Reading::Unavailable,
            cpu_celsius: Reading::Unavailable,
            load_average: Reading::Unavailable,
            memory: Reading::Unavailable,
        }
    }
}

/// Short uptime form: `Dd HH:MM`, or `HH:MM` under a day.
pub fn format_uptime(seconds: u64) -> String {
    let days = seconds / 86_400;
    let hours = (seconds % 86_400) / 3600;
    let minutes = (seconds % 3600) / 60;
    if days > 0 {
        format!("{}d {:02}:{:02}", days, hours, minutes)
    } else {
        format!("{:02}:{:02}", hours, minutes)
    }
}
