//! SH1106 128x64 OLED controller over I2C.
//!
//! The SH1106 has 132 columns of RAM with the visible 128 starting at column
//! 2, and only supports page addressing, so frames go out one 8-row page at a
//! time.

use crate::config::Rotation;
use crate::display::frame::{Frame, PAGES};
use crate::display::DisplaySink;
use crate::error::Result;
use tracing::debug;

/// Control byte prefix for a command stream.
const CONTROL_COMMAND: u8 = 0x00;
/// Control byte prefix for display RAM data.
const CONTROL_DATA: u8 = 0x40;

/// Visible area starts at RAM column 2.
const COLUMN_OFFSET: u8 = 2;

/// SH1106 commands
mod cmd {
    pub const DISPLAY_OFF: u8 = 0xAE;
    pub const DISPLAY_ON: u8 = 0xAF;
    pub const SET_CONTRAST: u8 = 0x81;
    pub const SET_NORMAL: u8 = 0xA6;
    pub const RESUME_RAM: u8 = 0xA4;
    pub const SET_DISPLAY_OFFSET: u8 = 0xD3;
    pub const SET_COM_PINS: u8 = 0xDA;
    pub const SET_VCOM_DETECT: u8 = 0xDB;
    pub const SET_CLOCK_DIV: u8 = 0xD5;
    pub const SET_PRECHARGE: u8 = 0xD9;
    pub const SET_MUX_RATIO: u8 = 0xA8;
    pub const SET_LOW_COLUMN: u8 = 0x00;
    pub const SET_HIGH_COLUMN: u8 = 0x10;
    pub const SET_PAGE_ADDR: u8 = 0xB0;
    pub const SET_START_LINE: u8 = 0x40;
    pub const SET_DC_DC: u8 = 0xAD;
    pub const SEG_REMAP_NORMAL: u8 = 0xA0;
    pub const SEG_REMAP_FLIPPED: u8 = 0xA1;
    pub const COM_SCAN_INC: u8 = 0xC0;
    pub const COM_SCAN_DEC: u8 = 0xC8;
}

/// Raw write access to the panel's bus address.
pub trait BusWrite: Send {
    fn write(&mut self, bytes: &[u8]) -> Result<()>;
}

/// Driver for an SH1106 panel on any [`BusWrite`].
pub struct Sh1106<B> {
    bus: B,
    powered: bool,
}

impl<B: BusWrite> Sh1106<B> {
    /// Initialise the controller and leave the panel on with a cleared RAM.
    pub fn new(bus: B, rotation: Rotation) -> Result<Self> {
        let mut display = Self { bus, powered: false };
        display.command(&init_sequence(rotation))?;
        display.clear()?;
        display.command(&[cmd::DISPLAY_ON])?;
        display.powered = true;
        debug!(?rotation, "SH1106 initialised");
        Ok(display)
    }

    fn command(&mut self, commands: &[u8]) -> Result<()> {
        let mut packet = Vec::with_capacity(commands.len() + 1);
        packet.push(CONTROL_COMMAND);
        packet.extend_from_slice(commands);
        self.bus.write(&packet)
    }

    fn write_page(&mut self, page: usize, columns: &[u8]) -> Result<()> {
        self.command(&[
            cmd::SET_PAGE_ADDR | page as u8,
            cmd::SET_LOW_COLUMN | (COLUMN_OFFSET & 0x0F),
            cmd::SET_HIGH_COLUMN | (COLUMN_OFFSET >> 4),
        ])?;
        let mut packet = Vec::with_capacity(columns.len() + 1);
        packet.push(CONTROL_DATA);
        packet.extend_from_slice(columns);
        self.bus.write(&packet)
    }

    fn clear(&mut self) -> Result<()> {
        let empty = Frame::new();
        for page in 0..PAGES {
            self.write_page(page, empty.page(page))?;
        }
        Ok(())
    }
}

impl<B: BusWrite> DisplaySink for Sh1106<B> {
    fn show(&mut self, frame: &Frame) -> Result<()> {
        for page in 0..PAGES {
            self.write_page(page, frame.page(page))?;
        }
        if !self.powered {
            self.command(&[cmd::DISPLAY_ON])?;
            self.powered = true;
        }
        Ok(())
    }

    fn blank(&mut self) -> Result<()> {
        self.clear()?;
        self.command(&[cmd::DISPLAY_OFF])?;
        self.powered = false;
        Ok(())
    }
}

fn init_sequence(rotation: Rotation) -> Vec<u8> {
    let (segment_remap, com_scan) = match rotation {
        Rotation::Normal => (cmd::SEG_REMAP_FLIPPED, cmd::COM_SCAN_DEC),
        Rotation::UpsideDown => (cmd::SEG_REMAP_NORMAL, cmd::COM_SCAN_INC),
    };
    vec![
        cmd::DISPLAY_OFF,
        cmd::SET_CLOCK_DIV,
        0x80,
        cmd::SET_MUX_RATIO,
        0x3F, // 64 lines
        cmd::SET_DISPLAY_OFFSET,
        0x00,
        cmd::SET_START_LINE,
        cmd::SET_DC_DC,
        0x8B, // on
        segment_remap,
        com_scan,
        cmd::SET_COM_PINS,
        0x12,
        cmd::SET_CONTRAST,
        0x7F,
        cmd::SET_PRECHARGE,
        0x22,
        cmd::SET_VCOM_DETECT,
        0x35,
        cmd::RESUME_RAM,
        cmd::SET_NORMAL,
    ]
}

#[cfg(feature = "hardware")]
mod rpi {
    use super::*;
    use rppal::i2c::I2c;

    impl BusWrite for I2c {
        fn write(&mut self, bytes: &[u8]) -> Result<()> {
            I2c::write(self, bytes)?;
            Ok(())
        }
    }

    impl Sh1106<I2c> {
        /// Open the panel on I2C bus `bus` at 7-bit `address`.
        pub fn open(bus: u8, address: u16, rotation: Rotation) -> Result<Self> {
            let mut i2c = I2c::with_bus(bus)?;
            i2c.set_slave_address(address)?;
            Self::new(i2c, rotation)
        }
    }
}
