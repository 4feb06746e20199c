//! # Router Status - OLED status display for a Raspberry Pi router
//!
//! A small daemon that samples network and system state and shows it on a
//! 128x64 SH1106 OLED, with a push button cycling between rotating status
//! pages, a bouncing-raspberry screensaver and a blanked panel.
//!
//! ## Features
//!
//! - **Status pages**: host, WAN/Wi-Fi, LAN/DHCP, Tailscale, throughput, system
//! - **Mode button**: edge interrupts with a polling fallback (feature-gated)
//! - **Graceful degradation**: missing utilities show placeholders, never crash
//! - **Clean shutdown**: the panel is blanked on every exit path
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use router_status::{
//!     button_queue, open_display, start_button, DaemonConfig, LiveHost, ModeController,
//!     RouterCollector,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = DaemonConfig::default();
//!     let display = open_display(&config)?;
//!     let (tx, rx) = button_queue();
//!     let _button = start_button(&config, tx);
//!     let metrics = RouterCollector::new(LiveHost::new(config.command_timeout), &config);
//!
//!     ModeController::new(&config, metrics, display, rx)
//!         .run(async {
//!             let _ = tokio::signal::ctrl_c().await;
//!         })
//!         .await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod controller;
pub mod display;
pub mod error;
pub mod input;
pub mod metrics;

// Re-export public API
pub use config::{DaemonConfig, Rotation};
pub use controller::{DisplayMode, ModeController, TickOutcome};
pub use display::{open_display, DisplaySink, Frame, HeadlessDisplay, Page, ScopedDisplay};
pub use error::{DaemonError, Result};
pub use input::{button_queue, start_button, ButtonEvent, ButtonInput, InputMode};
pub use metrics::{
    data::{Reading, RouterSnapshot},
    host::{Host, LiveHost},
    MetricsProvider, RouterCollector,
};

/// The default I2C address of SH1106 panels
pub const DEFAULT_DISPLAY_ADDRESS: u16 = 0x3C;

/// The default BCM pin of the mode button
pub const DEFAULT_BUTTON_PIN: u8 = 17;

/// The default time each status page stays on screen, in milliseconds
pub const DEFAULT_PAGE_INTERVAL_MS: u64 = 5000;
