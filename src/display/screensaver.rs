//! Bouncing raspberry screensaver.
//!
//! The sprite position is a closed-form function of the frame number, so the
//! animation can be resumed at any phase without replaying earlier frames.

use crate::display::frame::{drawn, Frame, HEIGHT, WIDTH};
use embedded_graphics::{
    mono_font::{ascii::FONT_6X10, MonoTextStyle},
    pixelcolor::BinaryColor,
    prelude::*,
    primitives::{Circle, Ellipse, PrimitiveStyle},
    text::{Baseline, Text},
};
use std::time::Duration;

/// Sprite edge length in pixels.
pub const SPRITE_SIZE: u32 = 32;
/// Rows reserved for the caption.
const CAPTION_HEIGHT: i32 = 10;
const CAPTION: &str = "Raspberry Pi";

/// Motion along one axis, reflecting off `min` and `max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Axis {
    pub start: i32,
    pub min: i32,
    pub max: i32,
    /// Pixels per frame; the sign is the initial direction
    pub velocity: i32,
}

impl Axis {
    /// Position after `frame` steps.
    pub fn position(&self, frame: u64) -> i32 {
        let span = i64::from(self.max - self.min);
        if span <= 0 {
            return self.min;
        }
        let period = 2 * span;
        let offset = i64::from(self.start.clamp(self.min, self.max) - self.min);
        let unfolded = if self.velocity >= 0 {
            offset
        } else {
            (period - offset) % period
        };
        let step = i64::from(self.velocity.unsigned_abs()) * (frame % period as u64) as i64;
        let phase = (unfolded + step) % period;
        let folded = if phase <= span { phase } else { period - phase };
        self.min + folded as i32
    }
}

/// A sprite bouncing inside the area below the caption.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bouncer {
    pub x: Axis,
    pub y: Axis,
}

impl Bouncer {
    /// Centered sprite moving down and to the right at 1 px per frame.
    pub fn centered() -> Self {
        let max_x = (WIDTH - SPRITE_SIZE) as i32;
        let max_y = (HEIGHT - SPRITE_SIZE) as i32;
        Self {
            x: Axis {
                start: max_x / 2,
                min: 0,
                max: max_x,
                velocity: 1,
            },
            y: Axis {
                start: max_y / 2,
                min: CAPTION_HEIGHT,
                max: max_y,
                velocity: 1,
            },
        }
    }

    /// Top-left corner of the sprite at `frame`.
    pub fn position(&self, frame: u64) -> Point {
        Point::new(self.x.position(frame), self.y.position(frame))
    }
}

impl Default for Bouncer {
    fn default() -> Self {
        Self::centered()
    }
}

/// Screensaver renderer driven by elapsed time.
#[derive(Debug, Clone)]
pub struct Screensaver {
    bouncer: Bouncer,
    frame_interval: Duration,
}

impl Screensaver {
    pub fn new(frame_interval: Duration) -> Self {
        Self {
            bouncer: Bouncer::centered(),
            frame_interval,
        }
    }

    /// Frame number reached after `elapsed`.
    pub fn phase(&self, elapsed: Duration) -> u64 {
        let step = self.frame_interval.as_micros().max(1);
        (elapsed.as_micros() / step) as u64
    }

    pub fn render(&self, elapsed: Duration) -> Frame {
        self.render_phase(self.phase(elapsed))
    }

    pub fn render_phase(&self, phase: u64) -> Frame {
        let mut frame = Frame::new();
        drawn(
            Text::with_baseline(
                CAPTION,
                Point::zero(),
                MonoTextStyle::new(&FONT_6X10, BinaryColor::On),
                Baseline::Top,
            )
            .draw(&mut frame),
        );
        draw_raspberry(&mut frame, self.bouncer.position(phase));
        frame
    }
}

/// Three overlapping berry circles with two leaves on top, inside a
/// `SPRITE_SIZE` square at `origin`.
fn draw_raspberry(frame: &mut Frame, origin: Point) {
    let fill = PrimitiveStyle::with_fill(BinaryColor::On);
    for (cx, cy) in [(10, 20), (22, 20), (16, 13)] {
        drawn(
            Circle::with_center(origin + Point::new(cx, cy), 20)
                .into_styled(fill)
                .draw(frame),
        );
    }
    for lx in [9, 16] {
        drawn(
            Ellipse::new(origin + Point::new(lx, 0), Size::new(7, 5))
                .into_styled(fill)
                .draw(frame),
        );
    }
}
