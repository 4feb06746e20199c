//! Raspberry Pi GPIO button using rppal.

use crate::config::DaemonConfig;
use crate::error::Result;
use crate::input::{
    poll::{spawn_poller, LevelSource},
    report_press, ButtonEvent, ButtonInput, ButtonSender, EdgeGate,
};
use rppal::gpio::{Gpio, InputPin, Level, Trigger};
use tracing::{info, warn};

/// Active-low button: pressed pulls the pin to ground.
struct ActiveLow(InputPin);

impl LevelSource for ActiveLow {
    fn is_pressed(&mut self) -> bool {
        self.0.is_low()
    }
}

fn open_pin(bcm: u8) -> Result<InputPin> {
    Ok(Gpio::new()?.get(bcm)?.into_input_pullup())
}

pub(crate) fn start(config: &DaemonConfig, tx: ButtonSender) -> ButtonInput {
    let mut pin = match open_pin(config.button_pin) {
        Ok(pin) => pin,
        Err(err) => {
            warn!(
                pin = config.button_pin,
                error = %err,
                "GPIO unavailable; button handling disabled"
            );
            return ButtonInput::disabled();
        }
    };

    // Both edges, so a press is only counted after the button was released.
    let mut gate = EdgeGate::new(config.debounce);
    let callback_tx = tx.clone();
    let registered = pin.set_async_interrupt(Trigger::Both, move |level: Level| {
        let event = ButtonEvent::now();
        if gate.edge(level == Level::Low, event.at) {
            report_press(&callback_tx, event);
        }
    });

    match registered {
        Ok(()) => {
            info!(pin = config.button_pin, "button using edge interrupts");
            ButtonInput::interrupt(pin)
        }
        Err(err) => {
            warn!(
                pin = config.button_pin,
                error = %err,
                interval_ms = config.poll_interval.as_millis() as u64,
                "edge interrupts unavailable, polling button"
            );
            ButtonInput::polling(spawn_poller(ActiveLow(pin), config.poll_interval, tx))
        }
    }
}
