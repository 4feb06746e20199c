//! Router Status - OLED status display daemon
//!
//! Runs the display loop on a Raspberry Pi router, or inspects what it would show.

use clap::{Args, Parser, Subcommand};
use router_status::{
    button_queue, open_display, start_button, DaemonConfig, DisplaySink, InputMode, LiveHost,
    MetricsProvider, ModeController, Page, RouterCollector, RouterSnapshot, Rotation,
    DEFAULT_BUTTON_PIN, DEFAULT_DISPLAY_ADDRESS, DEFAULT_PAGE_INTERVAL_MS,
};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{error, info, warn, Level};
use tracing_subscriber::{filter::LevelFilter, EnvFilter, FmtSubscriber};

#[derive(Parser)]
#[command(name = "router_status")]
#[command(about = "Router status display for a 128x64 SH1106 OLED")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(long_about = "Samples router and system state and rotates it across status pages on a small OLED, with a button cycling pages, screensaver and off")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// I2C bus number of the display
    #[arg(long, default_value_t = 1)]
    i2c_bus: u8,

    /// I2C address of the display (decimal or 0x-prefixed hex)
    #[arg(long, default_value_t = DEFAULT_DISPLAY_ADDRESS, value_parser = parse_address)]
    address: u16,

    /// Display rotation in degrees (0 or 180)
    #[arg(long, default_value_t = 0)]
    rotate: u16,

    /// BCM pin of the mode button
    #[arg(long, default_value_t = DEFAULT_BUTTON_PIN)]
    button_pin: u8,

    /// Time each page stays on screen in milliseconds
    #[arg(short, long, default_value_t = DEFAULT_PAGE_INTERVAL_MS)]
    interval: u64,

    /// Wired LAN interface
    #[arg(long, default_value = "eth0")]
    lan: String,

    /// Wireless interface
    #[arg(long, default_value = "wlan0")]
    wifi: String,

    /// dnsmasq lease file counted on the LAN page
    #[arg(long, default_value = "/var/lib/misc/dnsmasq.leases")]
    lease_file: PathBuf,

    /// Button debounce window in milliseconds
    #[arg(long, default_value_t = 250)]
    debounce: u64,

    /// Timeout for each helper utility in milliseconds
    #[arg(long, default_value_t = 1500)]
    command_timeout: u64,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the display daemon (default)
    Run,

    /// Collect a single snapshot and print it
    Snapshot(SnapshotArgs),

    /// Print status pages as ASCII art
    Render(RenderArgs),

    /// Clear and power down the display, then exit
    Blank,
}

#[derive(Args)]
struct SnapshotArgs {
    /// Output format: json or pretty
    #[arg(short, long, default_value = "pretty")]
    format: String,
}

#[derive(Args)]
struct RenderArgs {
    /// Only render this page number (1-based)
    #[arg(short, long)]
    page: Option<usize>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    init_logging(&cli)?;

    let config = build_config(&cli)?;

    match &cli.command {
        Some(Commands::Run) | None => run_command(&config).await?,
        Some(Commands::Snapshot(args)) => snapshot_command(&config, args).await?,
        Some(Commands::Render(args)) => render_command(&config, args).await?,
        Some(Commands::Blank) => blank_command(&config),
    }

    Ok(())
}

fn init_logging(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    let level = if cli.debug {
        Level::DEBUG
    } else if cli.verbose {
        Level::INFO
    } else {
        Level::WARN
    };

    let directives = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(log_filter(level, directives.as_deref()))
        .with_target(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    Ok(())
}

/// `RUST_LOG` directives refine the level picked by `-v`/`-d`; without them
/// everything at or above that level is shown.
fn log_filter(level: Level, directives: Option<&str>) -> EnvFilter {
    EnvFilter::builder()
        .with_default_directive(LevelFilter::from_level(level).into())
        .parse_lossy(directives.unwrap_or_default())
}

fn build_config(cli: &Cli) -> router_status::Result<DaemonConfig> {
    let config = DaemonConfig::default()
        .with_display(cli.i2c_bus, cli.address)
        .with_rotation(Rotation::from_degrees(cli.rotate)?)
        .with_button_pin(cli.button_pin)
        .with_page_interval(Duration::from_millis(cli.interval))
        .with_interfaces(&cli.lan, &cli.wifi)
        .with_lease_file(cli.lease_file.clone())
        .with_debounce(Duration::from_millis(cli.debounce))
        .with_command_timeout(Duration::from_millis(cli.command_timeout));
    config.validate()?;
    Ok(config)
}

fn parse_address(raw: &str) -> Result<u16, String> {
    let parsed = match raw.strip_prefix("0x").or_else(|| raw.strip_prefix("0X")) {
        Some(hex) => u16::from_str_radix(hex, 16),
        None => raw.parse(),
    };
    parsed.map_err(|e| format!("invalid I2C address {:?}: {}", raw, e))
}

async fn run_command(config: &DaemonConfig) -> Result<(), Box<dyn std::error::Error>> {
    info!("Starting router status display...");

    let display = match open_display(config) {
        Ok(display) => display,
        Err(err) => {
            error!("Display initialisation failed: {}", err);
            return Err(err.into());
        }
    };

    let (tx, rx) = button_queue();
    let button = start_button(config, tx);
    match button.mode() {
        InputMode::Interrupt => info!("Mode button: edge interrupts"),
        InputMode::Polling => info!("Mode button: polling every {:?}", config.poll_interval),
        InputMode::Disabled => warn!("Mode button unavailable; display will stay on status pages"),
    }

    let metrics = RouterCollector::new(LiveHost::new(config.command_timeout), config);
    let controller = ModeController::new(config, metrics, display, rx);

    info!("Display configuration:");
    info!("  - Bus: i2c-{} @ {:#04x}", config.i2c_bus, config.display_address);
    info!("  - Rotation: {:?}", config.rotation);
    info!("  - Page interval: {:?}", config.page_interval);
    info!("  - Interfaces: {} / {}", config.lan_interface, config.wifi_interface);

    controller.run(shutdown_signal()).await?;
    drop(button);

    info!("Display blanked, exiting");
    Ok(())
}

async fn snapshot_command(
    config: &DaemonConfig,
    args: &SnapshotArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    let snapshot = collect_once(config).await;

    match args.format.as_str() {
        "json" => {
            let json = serde_json::to_string_pretty(&snapshot)?;
            println!("{}", json);
        }
        "pretty" => {
            for page in Page::ALL {
                println!("[{}]", page.name());
                println!("{}", page.layout(&snapshot).plain_text());
                println!();
            }
        }
        _ => {
            error!("Unsupported format: {}. Use 'json' or 'pretty'", args.format);
            std::process::exit(1);
        }
    }

    Ok(())
}

async fn render_command(
    config: &DaemonConfig,
    args: &RenderArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    let pages: Vec<Page> = match args.page {
        Some(n) if (1..=Page::ALL.len()).contains(&n) => vec![Page::ALL[n - 1]],
        Some(n) => {
            return Err(format!("page must be between 1 and {}, got {}", Page::ALL.len(), n).into());
        }
        None => Page::ALL.to_vec(),
    };

    let snapshot = collect_once(config).await;
    for page in pages {
        println!("[{}]", page.name());
        print!("{}", page.render(&snapshot).to_ascii());
        println!();
    }

    Ok(())
}

/// Best effort: a missing or unresponsive panel is not worth failing shutdown over.
fn blank_command(config: &DaemonConfig) {
    match open_display(config) {
        Ok(mut display) => {
            if let Err(err) = display.blank() {
                warn!("Failed to blank display: {}", err);
            }
        }
        Err(err) => warn!("Display not available: {}", err),
    }
}

async fn collect_once(config: &DaemonConfig) -> RouterSnapshot {
    let mut collector = RouterCollector::new(LiveHost::new(config.command_timeout), config);
    collector.collect_snapshot().await
}

/// Resolves on Ctrl-C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!("Ctrl-C handler unavailable: {}", err);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                warn!("SIGTERM handler unavailable: {}", err);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
