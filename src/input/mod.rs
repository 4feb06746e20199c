//! Mode button input.
//!
//! Presses are delivered into a bounded queue, either from a GPIO edge
//! interrupt or from a task polling the pin level. The mode controller only
//! ever drains the queue, so it does not care which mechanism is active.

pub mod poll;

#[cfg(feature = "hardware")]
mod gpio;

pub use poll::{press_stream, spawn_poller, EdgeDetector, LevelSource};

use crate::config::DaemonConfig;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::debug;

/// Queue depth. Presses beyond this between two ticks are dropped.
pub const QUEUE_CAPACITY: usize = 32;

/// One physical press of the mode button.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ButtonEvent {
    pub at: Instant,
}

impl ButtonEvent {
    pub fn now() -> Self {
        Self { at: Instant::now() }
    }
}

pub type ButtonSender = mpsc::Sender<ButtonEvent>;
pub type ButtonReceiver = mpsc::Receiver<ButtonEvent>;

/// Create the button event queue.
pub fn button_queue() -> (ButtonSender, ButtonReceiver) {
    mpsc::channel(QUEUE_CAPACITY)
}

/// Enqueue a press without blocking. Returns `false` once the consumer is gone.
pub fn report_press(tx: &ButtonSender, event: ButtonEvent) -> bool {
    match tx.try_send(event) {
        Ok(()) => true,
        Err(mpsc::error::TrySendError::Full(_)) => {
            debug!("button queue full, press dropped");
            true
        }
        Err(mpsc::error::TrySendError::Closed(_)) => false,
    }
}

/// Accepts an event only if it is at least `window` after the last accepted one.
#[derive(Debug, Clone)]
pub struct Debounce {
    window: Duration,
    last: Option<Instant>,
}

impl Debounce {
    pub fn new(window: Duration) -> Self {
        Self { window, last: None }
    }

    pub fn admit(&mut self, at: Instant) -> bool {
        if let Some(last) = self.last {
            if at.saturating_duration_since(last) < self.window {
                return false;
            }
        }
        self.last = Some(at);
        true
    }
}

/// Line must be quiet this long before a new press edge is believed.
pub const SETTLE_TIME: Duration = Duration::from_millis(20);

/// Turns raw interrupt edges into presses. A press must follow a release,
/// land after `SETTLE_TIME` without edges, and clear the debounce window.
#[derive(Debug, Clone)]
pub struct EdgeGate {
    debounce: Debounce,
    settle: Duration,
    pressed: bool,
    last_edge: Option<Instant>,
}

impl EdgeGate {
    pub fn new(window: Duration) -> Self {
        Self {
            debounce: Debounce::new(window),
            settle: SETTLE_TIME,
            pressed: false,
            last_edge: None,
        }
    }

    /// Feed one edge with the level it left the line at. Returns `true` when
    /// the edge starts a new press.
    pub fn edge(&mut self, pressed: bool, at: Instant) -> bool {
        let quiet = self
            .last_edge
            .map_or(true, |last| at.saturating_duration_since(last) >= self.settle);
        self.last_edge = Some(at);

        if !pressed {
            self.pressed = false;
            return false;
        }
        if self.pressed || !quiet {
            return false;
        }
        self.pressed = true;
        self.debounce.admit(at)
    }
}

/// How presses are being delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    /// Edge-triggered GPIO interrupt
    Interrupt,
    /// Periodic sampling of the pin level
    Polling,
    /// No button available
    Disabled,
}

/// Keeps the button delivery mechanism alive. Dropping it stops delivery.
pub struct ButtonInput {
    mode: InputMode,
    _pin: Option<Box<dyn Send>>,
    poller: Option<JoinHandle<()>>,
}

impl ButtonInput {
    pub fn disabled() -> Self {
        Self {
            mode: InputMode::Disabled,
            _pin: None,
            poller: None,
        }
    }

    pub fn interrupt(pin: impl Send + 'static) -> Self {
        Self {
            mode: InputMode::Interrupt,
            _pin: Some(Box::new(pin)),
            poller: None,
        }
    }

    pub fn polling(poller: JoinHandle<()>) -> Self {
        Self {
            mode: InputMode::Polling,
            _pin: None,
            poller: Some(poller),
        }
    }

    pub fn mode(&self) -> InputMode {
        self.mode
    }
}

impl Drop for ButtonInput {
    fn drop(&mut self) {
        if let Some(poller) = self.poller.take() {
            poller.abort();
        }
    }
}

/// Start delivering presses of the configured button into `tx`, preferring
/// interrupts, then polling. Never fails: without GPIO access the button is
/// disabled with a warning.
#[cfg(feature = "hardware")]
pub fn start_button(config: &DaemonConfig, tx: ButtonSender) -> ButtonInput {
    gpio::start(config, tx)
}

#[cfg(not(feature = "hardware"))]
pub fn start_button(config: &DaemonConfig, _tx: ButtonSender) -> ButtonInput {
    tracing::warn!(
        pin = config.button_pin,
        "built without hardware support; button handling disabled"
    );
    ButtonInput::disabled()
}
