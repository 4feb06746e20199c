//! Router metrics collection implementation.

use crate::config::DaemonConfig;
use crate::error::{DaemonError, Result};
use crate::metrics::{
    data::*,
    host::Host,
    throughput::ThroughputSampler,
    traits::MetricsProvider,
};
use async_trait::async_trait;
use chrono::Local;
use std::collections::BTreeSet;
use std::future::Future;
use std::net::Ipv4Addr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::time;
use tracing::{debug, info, warn};

/// Collects a [`RouterSnapshot`] by querying `/proc`, `/sys` and the usual
/// networking utilities through a [`Host`].
pub struct RouterCollector<H> {
    host: H,
    lan_interface: String,
    wifi_interface: String,
    lease_file: PathBuf,
    probe_target: String,
    field_timeout: Duration,
    throughput: ThroughputSampler,
    failures: FailureLog,
}

impl<H: Host> RouterCollector<H> {
    /// Create a collector for the interfaces and files named in `config`.
    pub fn new(host: H, config: &DaemonConfig) -> Self {
        Self {
            host,
            lan_interface: config.lan_interface.clone(),
            wifi_interface: config.wifi_interface.clone(),
            lease_file: config.lease_file.clone(),
            probe_target: config.probe_target.clone(),
            // a field may need two host calls (sysfs, then vcgencmd)
            field_timeout: config.command_timeout * 2,
            throughput: ThroughputSampler::new(),
            failures: FailureLog::default(),
        }
    }

    /// Names of the fields that failed on the most recent collection.
    pub fn failing_fields(&self) -> Vec<&'static str> {
        self.failures.failing.iter().copied().collect()
    }
}

#[async_trait]
impl<H: Host> MetricsProvider for RouterCollector<H> {
    async fn collect_snapshot(&mut self) -> RouterSnapshot {
        let host = &self.host;
        let limit = self.field_timeout;
        let (wan_ip, lan_ip, reachable, wifi, leases, tailscale, temperature, uptime, load, memory) = tokio::join!(
            bounded(limit, "ip", read_wan_ip(host, &self.probe_target)),
            bounded(limit, "ip", read_interface_ip(host, &self.lan_interface)),
            async {
                time::timeout(limit, probe_internet(host, &self.probe_target))
                    .await
                    .unwrap_or(false)
            },
            bounded(limit, "iw", read_wifi_link(host, &self.wifi_interface)),
            bounded(limit, "leases", read_dhcp_leases(host, &self.lease_file)),
            bounded(limit, "tailscale", read_tailscale_ip(host)),
            bounded(limit, "temperature", read_cpu_celsius(host)),
            bounded(limit, "uptime", read_uptime(host)),
            bounded(limit, "loadavg", read_load_average(host)),
            bounded(limit, "meminfo", read_memory(host)),
        );

        let lan_throughput = bounded(
            limit,
            "lan counters",
            self.throughput.sample(&self.host, &self.lan_interface),
        )
        .await;
        let wifi_throughput = bounded(
            limit,
            "wifi counters",
            self.throughput.sample(&self.host, &self.wifi_interface),
        )
        .await;

        let hostname = self
            .host
            .hostname()
            .ok_or_else(|| DaemonError::parse_error("hostname not set"));

        let log = &mut self.failures;
        RouterSnapshot {
            taken_at: Local::now(),
            hostname: log.note("hostname", hostname),
            uptime_seconds: log.note("uptime", uptime),
            wan_ip: log.note("wan_ip", wan_ip),
            internet_reachable: reachable,
            wifi: log.note("wifi", wifi),
            lan_ip: log.note("lan_ip", lan_ip),
            dhcp_leases: log.note("dhcp_leases", leases),
            tailscale_ip: log.note("tailscale_ip", tailscale),
            lan_throughput: log.note("lan_throughput", lan_throughput),
            wifi_throughput: log.note("wifi_throughput", wifi_throughput),
            cpu_celsius: log.note("cpu_celsius", temperature),
            load_average: log.note("load_average", load),
            memory: log.note("memory", memory),
        }
    }
}

/// Tracks which fields are currently failing so each failure episode is
/// logged once instead of on every tick.
#[derive(Debug, Default)]
struct FailureLog {
    failing: BTreeSet<&'static str>,
}

impl FailureLog {
    fn note<T>(&mut self, field: &'static str, result: Result<T>) -> Reading<T> {
        match result {
            Ok(value) => {
                if self.failing.remove(field) {
                    info!(field, "metric available again");
                }
                Reading::Value(value)
            }
            Err(err) => {
                if self.failing.insert(field) {
                    warn!(field, error = %err, "metric unavailable");
                } else {
                    debug!(field, error = %err, "metric still unavailable");
                }
                Reading::Unavailable
            }
        }
    }
}

/// Give up on a collector that outlives `limit`, whatever the host does.
async fn bounded<T>(
    limit: Duration,
    source: &'static str,
    collect: impl Future<Output = Result<T>>,
) -> Result<T> {
    time::timeout(limit, collect)
        .await
        .map_err(|_| DaemonError::Timeout {
            program: source.to_string(),
            after: limit,
        })?
}

async fn read_wan_ip<H: Host + ?Sized>(host: &H, target: &str) -> Result<Ipv4Addr> {
    let out = host.run("ip", &["-4", "route", "get", target]).await?;
    parse_route_source(&out)
}

async fn read_interface_ip<H: Host + ?Sized>(host: &H, interface: &str) -> Result<Ipv4Addr> {
    let out = host.run("ip", &["-4", "addr", "show", "dev", interface]).await?;
    parse_inet_address(&out)
}

/// A failed or timed-out ping means "no internet", not "unknown".
async fn probe_internet<H: Host + ?Sized>(host: &H, target: &str) -> bool {
    host.run("ping", &["-c1", "-W1", target]).await.is_ok()
}

async fn read_wifi_link<H: Host + ?Sized>(host: &H, interface: &str) -> Result<WifiLink> {
    let out = host.run("iw", &["dev", interface, "link"]).await?;
    parse_wifi_link(&out)
}

async fn read_dhcp_leases<H: Host + ?Sized>(host: &H, path: &Path) -> Result<usize> {
    let leases = host.read_file(path).await?;
    Ok(count_leases(&leases))
}

async fn read_tailscale_ip<H: Host + ?Sized>(host: &H) -> Result<Ipv4Addr> {
    let out = host.run("tailscale", &["ip", "-4"]).await?;
    parse_tailscale_ip(&out)
}

async fn read_cpu_celsius<H: Host + ?Sized>(host: &H) -> Result<f32> {
    let sysfs = host
        .read_file(Path::new("/sys/class/thermal/thermal_zone0/temp"))
        .await
        .and_then(|raw| parse_millidegrees(&raw));

    match sysfs {
        Ok(celsius) => Ok(celsius),
        Err(_) => {
            let out = host.run("vcgencmd", &["measure_temp"]).await?;
            parse_vcgencmd_temp(&out)
        }
    }
}

async fn read_uptime<H: Host + ?Sized>(host: &H) -> Result<u64> {
    let raw = host.read_file(Path::new("/proc/uptime")).await?;
    parse_proc_uptime(&raw)
}

async fn read_load_average<H: Host + ?Sized>(host: &H) -> Result<LoadAverage> {
    let raw = host.read_file(Path::new("/proc/loadavg")).await?;
    parse_loadavg(&raw)
}

async fn read_memory<H: Host + ?Sized>(host: &H) -> Result<MemoryUsage> {
    let raw = host.read_file(Path::new("/proc/meminfo")).await?;
    parse_meminfo(&raw)
}

/// Parse the `src` address out of `ip -4 route get`.
pub fn parse_route_source(out: &str) -> Result<Ipv4Addr> {
    let mut tokens = out.split_whitespace();
    while let Some(token) = tokens.next() {
        if token == "src" {
            if let Some(addr) = tokens.next() {
                return parse_ipv4(addr);
            }
        }
    }
    Err(DaemonError::parse_error("no src in route lookup"))
}

/// Parse the first `inet a.b.c.d/nn` line of `ip -4 addr show`.
pub fn parse_inet_address(out: &str) -> Result<Ipv4Addr> {
    out.lines()
        .map(str::trim)
        .find_map(|line| line.strip_prefix("inet "))
        .and_then(|rest| rest.split_whitespace().next())
        .and_then(|cidr| cidr.split('/').next())
        .ok_or_else(|| DaemonError::parse_error("no inet address on interface"))
        .and_then(parse_ipv4)
}

/// Parse `iw dev <iface> link`.
pub fn parse_wifi_link(out: &str) -> Result<WifiLink> {
    if out.contains("Not connected.") {
        return Ok(WifiLink::NotConnected);
    }

    let mut ssid = None;
    let mut rssi_dbm = Reading::Unavailable;
    for line in out.lines().map(str::trim) {
        if let Some(name) = line.strip_prefix("SSID:") {
            ssid = Some(name.trim().to_string());
        } else if let Some(signal) = line.strip_prefix("signal:") {
            rssi_dbm = signal
                .split_whitespace()
                .next()
                .and_then(|v| v.parse::<i32>().ok())
                .into();
        }
    }

    ssid.map(|ssid| WifiLink::Connected { ssid, rssi_dbm })
        .ok_or_else(|| DaemonError::parse_error("no SSID in iw output"))
}

/// Each non-blank line of a dnsmasq lease file is one lease.
pub fn count_leases(content: &str) -> usize {
    content.lines().filter(|line| !line.trim().is_empty()).count()
}

/// Pick the tailnet (`100.x`) address from `tailscale ip -4`, else the first.
pub fn parse_tailscale_ip(out: &str) -> Result<Ipv4Addr> {
    let lines: Vec<&str> = out.lines().map(str::trim).filter(|l| !l.is_empty()).collect();
    let chosen = lines
        .iter()
        .find(|l| l.starts_with("100."))
        .or_else(|| lines.first())
        .ok_or_else(|| DaemonError::parse_error("tailscale reported no address"))?;
    parse_ipv4(chosen)
}

/// `/sys/class/thermal/*/temp` reports millidegrees.
pub fn parse_millidegrees(raw: &str) -> Result<f32> {
    raw.trim()
        .parse::<i32>()
        .map(|milli| milli as f32 / 1000.0)
        .map_err(|_| DaemonError::parse_error(format!("bad temperature {:?}", raw.trim())))
}

/// Parse `temp=48.3'C`.
pub fn parse_vcgencmd_temp(out: &str) -> Result<f32> {
    out.trim()
        .strip_prefix("temp=")
        .and_then(|rest| rest.split('\'').next())
        .and_then(|value| value.parse().ok())
        .ok_or_else(|| DaemonError::parse_error(format!("bad vcgencmd output {:?}", out)))
}

/// First field of `/proc/uptime`, truncated to whole seconds.
pub fn parse_proc_uptime(raw: &str) -> Result<u64> {
    raw.split_whitespace()
        .next()
        .and_then(|s| s.parse::<f64>().ok())
        .map(|secs| secs as u64)
        .ok_or_else(|| DaemonError::parse_error("bad /proc/uptime"))
}

pub fn parse_loadavg(raw: &str) -> Result<LoadAverage> {
    let parts: Vec<f64> = raw
        .split_whitespace()
        .take(3)
        .filter_map(|p| p.parse().ok())
        .collect();

    match parts.as_slice() {
        [one, five, fifteen] => Ok(LoadAverage {
            one_minute: *one,
            five_minutes: *five,
            fifteen_minutes: *fifteen,
        }),
        _ => Err(DaemonError::parse_error("bad /proc/loadavg")),
    }
}

pub fn parse_meminfo(raw: &str) -> Result<MemoryUsage> {
    let mut total_kb = None;
    let mut available_kb = None;

    for line in raw.lines() {
        if let Some((key, value)) = line.split_once(':') {
            let kb = value.split_whitespace().next().and_then(|v| v.parse::<u64>().ok());
            match key.trim() {
                "MemTotal" => total_kb = kb,
                "MemAvailable" => available_kb = kb,
                _ => {}
            }
        }
    }

    match (total_kb, available_kb) {
        (Some(total), Some(available)) => Ok(MemoryUsage::from_kb(total, available)),
        _ => Err(DaemonError::parse_error("MemTotal/MemAvailable missing")),
    }
}

fn parse_ipv4(raw: &str) -> Result<Ipv4Addr> {
    raw.parse()
        .map_err(|_| DaemonError::parse_error(format!("bad IPv4 address {:?}", raw)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_route_source() {
        let out = "1.1.1.1 via 192.168.1.1 dev eth0 src 192.168.1.42 uid 1000 \n    cache";
        assert_eq!(parse_route_source(out).unwrap(), Ipv4Addr::new(192, 168, 1, 42));
        assert!(parse_route_source("unreachable").is_err());
    }

    #[test]
    fn test_inet_address() {
        let out = "2: eth0: <BROADCAST,MULTICAST,UP,LOWER_UP> mtu 1500\n    inet 10.0.0.1/24 brd 10.0.0.255 scope global eth0\n       valid_lft forever";
        assert_eq!(parse_inet_address(out).unwrap(), Ipv4Addr::new(10, 0, 0, 1));
        assert!(parse_inet_address("2: eth0: <NO-CARRIER> mtu 1500").is_err());
    }

    #[test]
    fn test_wifi_link_connected() {
        let out = "Connected to aa:bb:cc:dd:ee:ff (on wlan0)\n\tSSID: HomeNet\n\tfreq: 2437\n\tsignal: -57 dBm\n";
        assert_eq!(
            parse_wifi_link(out).unwrap(),
            WifiLink::Connected {
                ssid: "HomeNet".to_string(),
                rssi_dbm: Reading::Value(-57),
            }
        );
    }

    #[test]
    fn test_wifi_link_not_connected() {
        assert_eq!(parse_wifi_link("Not connected.").unwrap(), WifiLink::NotConnected);
    }

    #[test]
    fn test_count_leases() {
        let leases = "1700000000 aa:bb:cc:dd:ee:01 192.168.4.10 phone *\n\n1700000001 aa:bb:cc:dd:ee:02 192.168.4.11 laptop *\n";
        assert_eq!(count_leases(leases), 2);
        assert_eq!(count_leases(""), 0);
    }

    #[test]
    fn test_tailscale_prefers_tailnet_address() {
        assert_eq!(
            parse_tailscale_ip("10.1.2.3\n100.64.0.7\n").unwrap(),
            Ipv4Addr::new(100, 64, 0, 7)
        );
        assert_eq!(parse_tailscale_ip("10.1.2.3").unwrap(), Ipv4Addr::new(10, 1, 2, 3));
        assert!(parse_tailscale_ip("").is_err());
    }

    #[test]
    fn test_temperatures() {
        assert!((parse_millidegrees("48312\n").unwrap() - 48.312).abs() < 0.001);
        assert!((parse_vcgencmd_temp("temp=48.3'C\n").unwrap() - 48.3).abs() < 0.001);
        assert!(parse_vcgencmd_temp("error").is_err());
    }

    #[test]
    fn test_proc_parsers() {
        assert_eq!(parse_proc_uptime("12345.67 45678.90\n").unwrap(), 12345);

        let load = parse_loadavg("0.52 0.58 0.59 1/189 12345\n").unwrap();
        assert_eq!(load.one_minute, 0.52);
        assert_eq!(load.fifteen_minutes, 0.59);
        assert!(parse_loadavg("0.52").is_err());

        let mem = parse_meminfo("MemTotal:        3884096 kB\nMemFree:          100000 kB\nMemAvailable:    2913072 kB\n").unwrap();
        assert_eq!(mem.total_mb, 3793);
        assert_eq!(mem.used_mb, 948);
    }

    #[test]
    fn test_failure_log_tracks_episodes() {
        let mut log = FailureLog::default();
        let missing: Result<u8> = Err(DaemonError::parse_error("x"));
        assert_eq!(log.note("field", missing), Reading::Unavailable);
        assert!(log.failing.contains("field"));
        assert_eq!(log.note("field", Ok(3u8)), Reading::Value(3));
        assert!(log.failing.is_empty());
    }
}
