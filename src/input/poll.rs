//! Polled button input with software debounce.

use crate::input::{report_press, ButtonEvent, ButtonSender};
use futures_util::stream::{self, BoxStream, StreamExt};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};

/// Consecutive samples a new level must hold before it is believed.
pub const STABLE_SAMPLES: u8 = 2;

/// Something whose pressed/released level can be sampled.
pub trait LevelSource: Send + 'static {
    fn is_pressed(&mut self) -> bool;
}

impl<F> LevelSource for F
where
    F: FnMut() -> bool + Send + 'static,
{
    fn is_pressed(&mut self) -> bool {
        self()
    }
}

/// Turns raw level samples into one event per press.
#[derive(Debug, Clone)]
pub struct EdgeDetector {
    pressed: bool,
    pending: u8,
    required: u8,
}

impl EdgeDetector {
    pub fn new() -> Self {
        Self::with_stable_samples(STABLE_SAMPLES)
    }

    pub fn with_stable_samples(required: u8) -> Self {
        Self {
            pressed: false,
            pending: 0,
            required: required.max(1),
        }
    }

    /// Feed one sample. Returns `true` exactly when a debounced press begins.
    pub fn feed(&mut self, pressed: bool) -> bool {
        if pressed == self.pressed {
            self.pending = 0;
            return false;
        }
        self.pending += 1;
        if self.pending < self.required {
            return false;
        }
        self.pending = 0;
        self.pressed = pressed;
        pressed
    }
}

impl Default for EdgeDetector {
    fn default() -> Self {
        Self::new()
    }
}

/// Sample `source` every `interval` and yield an event for each press.
pub fn press_stream<L: LevelSource>(source: L, interval: Duration) -> BoxStream<'static, ButtonEvent> {
    let mut ticker = time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    stream::unfold(
        (source, EdgeDetector::new(), ticker),
        |(mut source, mut detector, mut ticker)| async move {
            loop {
                ticker.tick().await;
                if detector.feed(source.is_pressed()) {
                    return Some((ButtonEvent::now(), (source, detector, ticker)));
                }
            }
        },
    )
    .boxed()
}

/// Run a polling task feeding presses into `tx` until the receiver is dropped.
pub fn spawn_poller<L: LevelSource>(source: L, interval: Duration, tx: ButtonSender) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut presses = press_stream(source, interval);
        while let Some(event) = presses.next().await {
            if !report_press(&tx, event) {
                break;
            }
        }
    })
}
