use async_trait::async_trait;
use router_status::{
    button_queue,
    display::DisplaySink,
    metrics::data::WifiLink,
    ButtonEvent, DaemonConfig, DaemonError, DisplayMode, Frame, Host, MetricsProvider,
    ModeController, Page, Reading, RouterCollector, RouterSnapshot, Rotation, TickOutcome,
};
use std::collections::HashMap;
use std::net::Ipv4Addr;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Clone, PartialEq, Eq)]
enum SinkCall {
    Show { blank: bool },
    Blank,
}

/// Records every call and can be told to fail the next few writes.
#[derive(Clone, Default)]
struct RecordingSink {
    calls: Arc<Mutex<Vec<SinkCall>>>,
    failures_left: Arc<AtomicUsize>,
}

impl RecordingSink {
    fn failing(times: usize) -> Self {
        let sink = Self::default();
        sink.failures_left.store(times, Ordering::SeqCst);
        sink
    }

    fn calls(&self) -> Vec<SinkCall> {
        self.calls.lock().unwrap().clone()
    }

    fn blanks(&self) -> usize {
        self.calls().iter().filter(|c| **c == SinkCall::Blank).count()
    }
}

impl DisplaySink for RecordingSink {
    fn show(&mut self, frame: &Frame) -> router_status::Result<()> {
        self.calls.lock().unwrap().push(SinkCall::Show {
            blank: frame.is_blank(),
        });
        let left = self.failures_left.load(Ordering::SeqCst);
        if left > 0 {
            self.failures_left.store(left - 1, Ordering::SeqCst);
            return Err(DaemonError::display_error("i2c write nacked"));
        }
        Ok(())
    }

    fn blank(&mut self) -> router_status::Result<()> {
        self.calls.lock().unwrap().push(SinkCall::Blank);
        Ok(())
    }
}

/// Hands out a fixed snapshot and counts collections.
#[derive(Clone, Default)]
struct FakeMetrics {
    collections: Arc<AtomicUsize>,
}

#[async_trait]
impl MetricsProvider for FakeMetrics {
    async fn collect_snapshot(&mut self) -> RouterSnapshot {
        self.collections.fetch_add(1, Ordering::SeqCst);
        let mut snapshot = RouterSnapshot::unavailable();
        snapshot.hostname = Reading::Value("gateway".to_string());
        snapshot
    }
}

/// Canned command output and file content keyed by command line / path.
#[derive(Default)]
struct FakeHost {
    commands: HashMap<String, String>,
    files: HashMap<String, String>,
    hostname: Option<String>,
}

impl FakeHost {
    fn command(mut self, line: &str, out: &str) -> Self {
        self.commands.insert(line.to_string(), out.to_string());
        self
    }

    fn file(mut self, path: &str, content: &str) -> Self {
        self.files.insert(path.to_string(), content.to_string());
        self
    }
}

#[async_trait]
impl Host for FakeHost {
    async fn run(&self, program: &str, args: &[&str]) -> router_status::Result<String> {
        let line = std::iter::once(program)
            .chain(args.iter().copied())
            .collect::<Vec<_>>()
            .join(" ");
        self.commands
            .get(&line)
            .cloned()
            .ok_or_else(|| DaemonError::command_error(program, "No such file or directory"))
    }

    async fn read_file(&self, path: &Path) -> router_status::Result<String> {
        self.files
            .get(path.to_string_lossy().as_ref())
            .cloned()
            .ok_or_else(|| std::io::Error::from(std::io::ErrorKind::NotFound).into())
    }

    fn hostname(&self) -> Option<String> {
        self.hostname.clone()
    }
}

/// A host whose utilities and files never answer.
struct StalledHost;

#[async_trait]
impl Host for StalledHost {
    async fn run(&self, _program: &str, _args: &[&str]) -> router_status::Result<String> {
        std::future::pending().await
    }

    async fn read_file(&self, _path: &Path) -> router_status::Result<String> {
        std::future::pending().await
    }

    fn hostname(&self) -> Option<String> {
        Some("gateway".to_string())
    }
}

fn ms(millis: u64) -> Duration {
    Duration::from_millis(millis)
}

fn controller(
    config: &DaemonConfig,
    sink: &RecordingSink,
) -> (
    ModeController<FakeMetrics, RecordingSink>,
    tokio::sync::mpsc::Sender<ButtonEvent>,
    FakeMetrics,
) {
    let (tx, rx) = button_queue();
    let metrics = FakeMetrics::default();
    let controller = ModeController::new(config, metrics.clone(), sink.clone(), rx);
    (controller, tx, metrics)
}

fn press(tx: &tokio::sync::mpsc::Sender<ButtonEvent>, at: Instant) {
    tx.try_send(ButtonEvent { at }).unwrap();
}

/// Pages rotate on the page interval and wrap after the last one
#[tokio::test(start_paused = true)]
async fn test_page_rotation_wraps() {
    let config = DaemonConfig::default();
    let sink = RecordingSink::default();
    let (mut controller, _tx, metrics) = controller(&config, &sink);
    let t0 = Instant::now();

    assert_eq!(controller.tick(t0).await.unwrap(), TickOutcome::Page(Page::Host));
    assert_eq!(controller.tick(t0 + ms(40)).await.unwrap(), TickOutcome::Idle);
    assert_eq!(controller.tick(t0 + ms(4_999)).await.unwrap(), TickOutcome::Idle);

    let mut shown = Vec::new();
    for step in 1..=6u64 {
        match controller.tick(t0 + ms(5_000 * step)).await.unwrap() {
            TickOutcome::Page(page) => shown.push(page),
            other => panic!("expected a page at step {}, got {:?}", step, other),
        }
    }
    assert_eq!(
        shown,
        vec![Page::Wan, Page::Lan, Page::Tailscale, Page::Throughput, Page::System, Page::Host]
    );

    // one sample per page drawn, none on idle ticks
    assert_eq!(metrics.collections.load(Ordering::SeqCst), 7);
    assert_eq!(sink.calls().len(), 7);
    assert_eq!(controller.last_snapshot().unwrap().hostname, Reading::Value("gateway".to_string()));
}

/// Spaced presses cycle pages -> screensaver -> off -> pages
#[tokio::test(start_paused = true)]
async fn test_mode_cycle() {
    let config = DaemonConfig::default();
    let sink = RecordingSink::default();
    let (mut controller, tx, _metrics) = controller(&config, &sink);
    let t0 = Instant::now();

    press(&tx, t0);
    assert_eq!(controller.tick(t0).await.unwrap(), TickOutcome::Animation(0));
    assert_eq!(controller.mode(), DisplayMode::Screensaver);
    assert_eq!(controller.tick(t0 + ms(40)).await.unwrap(), TickOutcome::Animation(1));
    assert_eq!(controller.tick(t0 + ms(200)).await.unwrap(), TickOutcome::Animation(5));

    press(&tx, t0 + ms(300));
    assert_eq!(controller.tick(t0 + ms(320)).await.unwrap(), TickOutcome::Blanked);
    assert_eq!(controller.mode(), DisplayMode::Off);
    for n in 1..=5u64 {
        assert_eq!(controller.tick(t0 + ms(320 + 40 * n)).await.unwrap(), TickOutcome::Idle);
    }

    press(&tx, t0 + ms(600));
    assert_eq!(controller.tick(t0 + ms(640)).await.unwrap(), TickOutcome::Page(Page::Host));
    assert_eq!(controller.mode(), DisplayMode::Pages);

    assert_eq!(sink.blanks(), 1);
    assert!(matches!(sink.calls().last(), Some(SinkCall::Show { blank: false })));
}

/// Bounces inside the debounce window collapse into one transition
#[tokio::test(start_paused = true)]
async fn test_button_bounce_is_debounced() {
    let config = DaemonConfig::default();
    let sink = RecordingSink::default();
    let (mut controller, tx, _metrics) = controller(&config, &sink);
    let t0 = Instant::now();

    for offset in [0, 30, 90, 180, 240] {
        press(&tx, t0 + ms(offset));
    }
    controller.tick(t0 + ms(250)).await.unwrap();
    assert_eq!(controller.mode(), DisplayMode::Screensaver);
}

/// Re-entering the screensaver restarts its animation
#[tokio::test(start_paused = true)]
async fn test_screensaver_restarts_on_entry() {
    let config = DaemonConfig::default();
    let sink = RecordingSink::default();
    let (mut controller, tx, _metrics) = controller(&config, &sink);
    let t0 = Instant::now();

    controller.tick(t0).await.unwrap();
    press(&tx, t0 + ms(1_000));
    assert_eq!(controller.tick(t0 + ms(1_000)).await.unwrap(), TickOutcome::Animation(0));
    press(&tx, t0 + ms(2_000));
    press(&tx, t0 + ms(3_000));
    controller.tick(t0 + ms(3_000)).await.unwrap();
    assert_eq!(controller.mode(), DisplayMode::Pages);
    press(&tx, t0 + ms(4_000));
    assert_eq!(controller.tick(t0 + ms(4_000)).await.unwrap(), TickOutcome::Animation(0));
    assert_eq!(controller.tick(t0 + ms(4_080)).await.unwrap(), TickOutcome::Animation(2));
}

/// A transient write failure is retried and the page still lands
#[tokio::test(start_paused = true)]
async fn test_display_write_is_retried() {
    let config = DaemonConfig::default().with_display_retries(3, ms(100));
    let sink = RecordingSink::failing(2);
    let (mut controller, _tx, _metrics) = controller(&config, &sink);

    let outcome = controller.tick(Instant::now()).await.unwrap();
    assert_eq!(outcome, TickOutcome::Page(Page::Host));
    assert_eq!(sink.calls().len(), 3);
}

/// Exhausted retries surface a display error
#[tokio::test(start_paused = true)]
async fn test_display_retries_exhausted() {
    let config = DaemonConfig::default().with_display_retries(3, ms(100));
    let sink = RecordingSink::failing(usize::MAX);
    let (mut controller, _tx, _metrics) = controller(&config, &sink);

    let err = controller.tick(Instant::now()).await.unwrap_err();
    assert!(err.is_display());
    assert_eq!(sink.calls().len(), 3);
}

/// The run loop blanks the panel exactly once when shutdown is requested
#[tokio::test(start_paused = true)]
async fn test_run_blanks_on_shutdown() {
    let config = DaemonConfig::default();
    let sink = RecordingSink::default();
    let (controller, _tx, _metrics) = controller(&config, &sink);

    controller.run(tokio::time::sleep(ms(200))).await.unwrap();

    let calls = sink.calls();
    assert_eq!(calls.first(), Some(&SinkCall::Show { blank: false }));
    assert_eq!(calls.last(), Some(&SinkCall::Blank));
    assert_eq!(sink.blanks(), 1);
}

/// A dead display ends the loop with an error, but the panel is still blanked
#[tokio::test(start_paused = true)]
async fn test_run_fails_on_dead_display() {
    let config = DaemonConfig::default().with_display_retries(2, ms(10));
    let sink = RecordingSink::failing(usize::MAX);
    let (controller, _tx, _metrics) = controller(&config, &sink);

    let result = controller.run(std::future::pending::<()>()).await;
    assert!(matches!(result, Err(DaemonError::Display(_))));
    assert_eq!(sink.calls().last(), Some(&SinkCall::Blank));
}

/// Dropping the controller without running it still blanks the panel
#[tokio::test(start_paused = true)]
async fn test_drop_blanks_display() {
    let config = DaemonConfig::default();
    let sink = RecordingSink::default();
    let (controller, _tx, _metrics) = controller(&config, &sink);
    drop(controller);
    assert_eq!(sink.calls(), vec![SinkCall::Blank]);
}

fn router_host() -> FakeHost {
    FakeHost {
        hostname: Some("gateway".to_string()),
        ..FakeHost::default()
    }
    .command(
        "ip -4 route get 1.1.1.1",
        "1.1.1.1 via 192.168.1.1 dev eth0 src 192.168.1.42 uid 0\n    cache",
    )
    .command(
        "ip -4 addr show dev eth0",
        "2: eth0: <BROADCAST,MULTICAST,UP,LOWER_UP> mtu 1500\n    inet 192.168.1.42/24 brd 192.168.1.255 scope global eth0",
    )
    .command("iw dev wlan0 link", "Not connected.")
    .file("/var/lib/misc/dnsmasq.leases", "1700000000 aa:bb:cc:dd:ee:01 192.168.4.10 phone *\n")
    .file("/sys/class/thermal/thermal_zone0/temp", "51234\n")
    .file("/proc/uptime", "93784.12 180000.00\n")
    .file("/proc/loadavg", "0.10 0.20 0.30 1/100 999\n")
    .file("/sys/class/net/eth0/statistics/rx_bytes", "1000\n")
    .file("/sys/class/net/eth0/statistics/tx_bytes", "2000\n")
}

/// Missing utilities degrade to placeholders instead of failing the snapshot
#[tokio::test]
async fn test_collector_degrades_missing_sources() {
    let config = DaemonConfig::default();
    let mut collector = RouterCollector::new(router_host(), &config);

    let snapshot = collector.collect_snapshot().await;

    assert_eq!(snapshot.hostname, Reading::Value("gateway".to_string()));
    assert_eq!(snapshot.wan_ip, Reading::Value(Ipv4Addr::new(192, 168, 1, 42)));
    assert_eq!(snapshot.lan_ip, Reading::Value(Ipv4Addr::new(192, 168, 1, 42)));
    assert_eq!(snapshot.wifi, Reading::Value(WifiLink::NotConnected));
    assert_eq!(snapshot.dhcp_leases, Reading::Value(1));
    assert_eq!(snapshot.uptime_seconds, Reading::Value(93784));
    assert!(!snapshot.internet_reachable);

    // no tailscale binary, no wlan0 counters, no meminfo
    assert_eq!(snapshot.tailscale_ip, Reading::Unavailable);
    assert_eq!(snapshot.wifi_throughput, Reading::Unavailable);
    assert_eq!(snapshot.memory, Reading::Unavailable);
    let failing = collector.failing_fields();
    assert!(failing.contains(&"tailscale_ip"));
    assert!(failing.contains(&"memory"));
    assert!(!failing.contains(&"wan_ip"));

    // first throughput sample only establishes the baseline
    assert_eq!(snapshot.lan_throughput.value().map(|t| t.total_kbps()), Some(0));

    let tailscale = Page::Tailscale.layout(&snapshot).plain_text();
    assert!(tailscale.contains("IP4  -"), "got {:?}", tailscale);
    let wan = Page::Wan.layout(&snapshot).plain_text();
    assert!(wan.contains("NET: NO NET"));
    assert!(wan.contains("Wi-Fi: not conn"));
}

/// A host that never answers yields unavailable fields within the time bound
#[tokio::test(start_paused = true)]
async fn test_stalled_host_is_bounded() {
    let config = DaemonConfig::default().with_command_timeout(ms(500));
    let mut collector = RouterCollector::new(StalledHost, &config);
    let started = Instant::now();

    let snapshot = collector.collect_snapshot().await;

    // ten fields in parallel, then the two counter reads
    assert!(started.elapsed() <= ms(3 * 1_000));
    assert_eq!(snapshot.hostname, Reading::Value("gateway".to_string()));
    assert_eq!(snapshot.wan_ip, Reading::Unavailable);
    assert_eq!(snapshot.tailscale_ip, Reading::Unavailable);
    assert_eq!(snapshot.cpu_celsius, Reading::Unavailable);
    assert_eq!(snapshot.lan_throughput, Reading::Unavailable);
    assert!(!snapshot.internet_reachable);
    assert!(collector.failing_fields().contains(&"memory"));
}

/// Temperature falls back to vcgencmd when sysfs has nothing
#[tokio::test]
async fn test_temperature_falls_back_to_vcgencmd() {
    let config = DaemonConfig::default();
    let host = FakeHost::default().command("vcgencmd measure_temp", "temp=47.2'C");
    let mut collector = RouterCollector::new(host, &config);

    let snapshot = collector.collect_snapshot().await;
    let celsius = snapshot.cpu_celsius.value().unwrap();
    assert!((celsius - 47.2).abs() < 0.01);
    assert_eq!(snapshot.hostname, Reading::Unavailable);
}

/// Every page renders something even when nothing could be collected
#[test]
fn test_pages_render_without_data() {
    let snapshot = RouterSnapshot::unavailable();
    for page in Page::ALL {
        let frame = page.render(&snapshot);
        assert!(!frame.is_blank(), "{} page rendered blank", page.name());
    }
}

/// Snapshots serialize for the `snapshot --format json` command
#[test]
fn test_snapshot_serializes() {
    let mut snapshot = RouterSnapshot::unavailable();
    snapshot.dhcp_leases = Reading::Value(4);
    let json = serde_json::to_string(&snapshot).unwrap();
    assert!(json.contains("dhcp_leases"));
    assert!(json.contains("Unavailable"));
}

/// Configuration builder and validation
#[test]
fn test_daemon_config() {
    let config = DaemonConfig::default()
        .with_display(3, 0x3D)
        .with_rotation(Rotation::UpsideDown)
        .with_page_interval(Duration::from_secs(8))
        .with_interfaces("br0", "wlan1");

    assert_eq!(config.i2c_bus, 3);
    assert_eq!(config.display_address, 0x3D);
    assert_eq!(config.rotation, Rotation::UpsideDown);
    assert_eq!(config.page_interval, Duration::from_secs(8));
    assert_eq!(config.lan_interface, "br0");
    assert_eq!(config.wifi_interface, "wlan1");
    assert!(config.validate().is_ok());

    let bad = DaemonConfig::default().with_page_interval(Duration::ZERO);
    assert!(matches!(bad.validate(), Err(DaemonError::Config(_))));
    assert!(Rotation::from_degrees(90).is_err());
}
