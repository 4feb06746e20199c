//! Daemon configuration.
//!
//! All knobs are compile-time defaults that the command line may override;
//! there is no configuration file.

use crate::error::{DaemonError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Panel orientation. The SH1106 can only flip in hardware, so quarter turns
/// are not offered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Rotation {
    #[default]
    Normal,
    UpsideDown,
}

impl Rotation {
    /// Map a rotation in degrees to a supported orientation.
    pub fn from_degrees(degrees: u16) -> Result<Self> {
        match degrees {
            0 => Ok(Self::Normal),
            180 => Ok(Self::UpsideDown),
            other => Err(DaemonError::config_error(format!(
                "Unsupported rotation {} (use 0 or 180)",
                other
            ))),
        }
    }
}

/// Configuration for the status daemon.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// I2C bus number the panel is attached to
    pub i2c_bus: u8,
    /// 7-bit I2C address of the panel
    pub display_address: u16,
    /// Panel orientation
    pub rotation: Rotation,
    /// BCM pin number of the mode button (active low, pulled up)
    pub button_pin: u8,
    /// Time each page stays on screen
    pub page_interval: Duration,
    /// Scheduler tick and screensaver frame period
    pub frame_interval: Duration,
    /// Presses closer than this to the last accepted press are ignored
    pub debounce: Duration,
    /// Pin sampling period when interrupts are unavailable
    pub poll_interval: Duration,
    /// Upper bound on any helper utility invocation
    pub command_timeout: Duration,
    /// Attempts per display write before giving up
    pub display_retries: u32,
    /// Delay before the first display retry, doubled on each further attempt
    pub retry_backoff: Duration,
    /// Wired LAN interface
    pub lan_interface: String,
    /// Wireless interface
    pub wifi_interface: String,
    /// dnsmasq lease database
    pub lease_file: PathBuf,
    /// Host used for WAN route lookup and reachability checks
    pub probe_target: String,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            i2c_bus: 1,
            display_address: crate::DEFAULT_DISPLAY_ADDRESS,
            rotation: Rotation::Normal,
            button_pin: crate::DEFAULT_BUTTON_PIN,
            page_interval: Duration::from_millis(crate::DEFAULT_PAGE_INTERVAL_MS),
            frame_interval: Duration::from_millis(40),
            debounce: Duration::from_millis(250),
            poll_interval: Duration::from_millis(25),
            command_timeout: Duration::from_millis(1500),
            display_retries: 3,
            retry_backoff: Duration::from_millis(100),
            lan_interface: "eth0".to_string(),
            wifi_interface: "wlan0".to_string(),
            lease_file: PathBuf::from("/var/lib/misc/dnsmasq.leases"),
            probe_target: "1.1.1.1".to_string(),
        }
    }
}

impl DaemonConfig {
    /// Set the I2C bus and panel address.
    pub fn with_display(mut self, i2c_bus: u8, address: u16) -> Self {
        self.i2c_bus = i2c_bus;
        self.display_address = address;
        self
    }

    /// Set the panel orientation.
    pub fn with_rotation(mut self, rotation: Rotation) -> Self {
        self.rotation = rotation;
        self
    }

    /// Set the button pin.
    pub fn with_button_pin(mut self, pin: u8) -> Self {
        self.button_pin = pin;
        self
    }

    /// Set the page rotation interval.
    pub fn with_page_interval(mut self, interval: Duration) -> Self {
        self.page_interval = interval;
        self
    }

    /// Set the scheduler tick / animation frame interval.
    pub fn with_frame_interval(mut self, interval: Duration) -> Self {
        self.frame_interval = interval;
        self
    }

    /// Set the button debounce window.
    pub fn with_debounce(mut self, window: Duration) -> Self {
        self.debounce = window;
        self
    }

    /// Set the helper utility timeout.
    pub fn with_command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = timeout;
        self
    }

    /// Set the display retry policy.
    pub fn with_display_retries(mut self, retries: u32, backoff: Duration) -> Self {
        self.display_retries = retries;
        self.retry_backoff = backoff;
        self
    }

    /// Set the monitored interfaces.
    pub fn with_interfaces(mut self, lan: impl Into<String>, wifi: impl Into<String>) -> Self {
        self.lan_interface = lan.into();
        self.wifi_interface = wifi.into();
        self
    }

    /// Set the DHCP lease file.
    pub fn with_lease_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.lease_file = path.into();
        self
    }

    /// Check that the configuration can drive the daemon.
    pub fn validate(&self) -> Result<()> {
        if self.display_address > 0x7F {
            return Err(DaemonError::config_error(format!(
                "Display address {:#04x} is not a 7-bit I2C address",
                self.display_address
            )));
        }
        let intervals = [
            ("page interval", self.page_interval),
            ("frame interval", self.frame_interval),
            ("poll interval", self.poll_interval),
            ("command timeout", self.command_timeout),
        ];
        for (name, value) in intervals {
            if value.is_zero() {
                return Err(DaemonError::config_error(format!("{} must be non-zero", name)));
            }
        }
        if self.display_retries == 0 {
            return Err(DaemonError::config_error("display retries must be at least 1"));
        }
        Ok(())
    }
}
