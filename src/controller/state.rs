//! Display mode state machine and page cursor.

use crate::input::{ButtonEvent, Debounce};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// What the panel is currently showing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DisplayMode {
    /// Rotating status pages
    Pages,
    /// Bouncing sprite animation
    Screensaver,
    /// Panel blanked and powered down
    Off,
}

impl DisplayMode {
    /// The mode one button press leads to.
    pub fn next(self) -> Self {
        match self {
            DisplayMode::Pages => DisplayMode::Screensaver,
            DisplayMode::Screensaver => DisplayMode::Off,
            DisplayMode::Off => DisplayMode::Pages,
        }
    }
}

impl fmt::Display for DisplayMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DisplayMode::Pages => "pages",
            DisplayMode::Screensaver => "screensaver",
            DisplayMode::Off => "off",
        };
        f.write_str(name)
    }
}

/// Applies debounced button presses to the current [`DisplayMode`].
#[derive(Debug, Clone)]
pub struct ModeMachine {
    mode: DisplayMode,
    debounce: Debounce,
}

impl ModeMachine {
    /// Start in [`DisplayMode::Pages`].
    pub fn new(debounce: Duration) -> Self {
        Self {
            mode: DisplayMode::Pages,
            debounce: Debounce::new(debounce),
        }
    }

    pub fn mode(&self) -> DisplayMode {
        self.mode
    }

    /// Apply one press. Returns the new mode, or `None` if the press fell
    /// inside the debounce window of the previous accepted press.
    pub fn press(&mut self, event: ButtonEvent) -> Option<DisplayMode> {
        if !self.debounce.admit(event.at) {
            return None;
        }
        self.mode = self.mode.next();
        Some(self.mode)
    }
}

/// Index into a fixed number of pages, wrapping after the last.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageCursor {
    index: usize,
    count: usize,
}

impl PageCursor {
    pub fn new(count: usize) -> Self {
        Self {
            index: 0,
            count: count.max(1),
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn count(&self) -> usize {
        self.count
    }

    /// Move to the next page and return its index.
    pub fn advance(&mut self) -> usize {
        self.index = (self.index + 1) % self.count;
        self.index
    }
}
