//! Rendering and the physical panel.
//!
//! Everything drawn ends up in a [`Frame`]; a [`DisplaySink`] pushes finished
//! frames to the panel or blanks it. [`ScopedDisplay`] owns the sink for the
//! life of the daemon and guarantees the panel is blanked on the way out.

pub mod frame;
pub mod pages;
pub mod screensaver;
pub mod sh1106;

pub use frame::{Frame, HEIGHT, WIDTH};
pub use pages::{Layout, Page};
pub use screensaver::{Bouncer, Screensaver};
pub use sh1106::Sh1106;

use crate::config::DaemonConfig;
use crate::error::Result;
use tracing::{debug, info, trace, warn};

/// Output device for rendered frames.
pub trait DisplaySink: Send {
    /// Push a complete frame, powering the panel on if it was blanked.
    fn show(&mut self, frame: &Frame) -> Result<()>;

    /// Clear the panel and power it down.
    fn blank(&mut self) -> Result<()>;
}

impl<S: DisplaySink + ?Sized> DisplaySink for Box<S> {
    fn show(&mut self, frame: &Frame) -> Result<()> {
        (**self).show(frame)
    }

    fn blank(&mut self) -> Result<()> {
        (**self).blank()
    }
}

/// Sole owner of the display sink. Blanks the panel when released or
/// dropped, whichever comes first.
pub struct ScopedDisplay<S: DisplaySink> {
    sink: S,
    released: bool,
}

impl<S: DisplaySink> ScopedDisplay<S> {
    pub fn new(sink: S) -> Self {
        Self {
            sink,
            released: false,
        }
    }

    pub fn show(&mut self, frame: &Frame) -> Result<()> {
        self.sink.show(frame)
    }

    pub fn blank(&mut self) -> Result<()> {
        self.sink.blank()
    }

    /// Blank the panel and give up the sink, reporting any failure.
    pub fn release(mut self) -> Result<()> {
        self.released = true;
        self.sink.blank()
    }
}

impl<S: DisplaySink> Drop for ScopedDisplay<S> {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        if let Err(err) = self.sink.blank() {
            warn!(error = %err, "failed to blank display during shutdown");
        }
    }
}

/// Open the configured panel. Fails if the panel cannot be initialised.
#[cfg(feature = "hardware")]
pub fn open_display(config: &DaemonConfig) -> Result<Box<dyn DisplaySink>> {
    let panel = Sh1106::open(config.i2c_bus, config.display_address, config.rotation)?;
    info!(
        bus = config.i2c_bus,
        address = %format!("{:#04x}", config.display_address),
        "SH1106 display ready"
    );
    Ok(Box::new(panel))
}

/// Without hardware support frames go to the log.
#[cfg(not(feature = "hardware"))]
pub fn open_display(config: &DaemonConfig) -> Result<Box<dyn DisplaySink>> {
    info!(
        address = %format!("{:#04x}", config.display_address),
        "built without hardware support; using headless display"
    );
    Ok(Box::new(HeadlessDisplay::new()))
}

/// Sink for hosts without a panel: frames are logged instead of drawn.
#[derive(Debug, Default)]
pub struct HeadlessDisplay {
    frames: u64,
}

impl HeadlessDisplay {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DisplaySink for HeadlessDisplay {
    fn show(&mut self, frame: &Frame) -> Result<()> {
        self.frames += 1;
        debug!(frame = self.frames, lit = frame.lit_pixels(), "headless frame");
        trace!("\n{}", frame.to_ascii());
        Ok(())
    }

    fn blank(&mut self) -> Result<()> {
        debug!("headless display blanked");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct Counting(Arc<Mutex<u32>>);

    impl DisplaySink for Counting {
        fn show(&mut self, _frame: &Frame) -> Result<()> {
            Ok(())
        }

        fn blank(&mut self) -> Result<()> {
            *self.0.lock().unwrap() += 1;
            Ok(())
        }
    }

    #[test]
    fn test_drop_blanks_once() {
        let blanks = Counting::default();
        drop(ScopedDisplay::new(blanks.clone()));
        assert_eq!(*blanks.0.lock().unwrap(), 1);
    }

    #[test]
    fn test_release_does_not_blank_twice() {
        let blanks = Counting::default();
        ScopedDisplay::new(blanks.clone()).release().unwrap();
        assert_eq!(*blanks.0.lock().unwrap(), 1);
    }
}
