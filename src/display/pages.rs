//! Status pages shown during rotation.
//!
//! Rendering is split in two: [`Page::layout`] turns a snapshot into text
//! lines and bar gauges, and [`Layout::render`] rasterises that into a
//! [`Frame`]. Both steps are pure.

use crate::display::frame::{drawn, Frame, WIDTH};
use crate::metrics::data::{format_uptime, Reading, RouterSnapshot, Throughput, WifiLink};
use embedded_graphics::{
    mono_font::{ascii::FONT_6X10, MonoTextStyle},
    pixelcolor::BinaryColor,
    prelude::*,
    primitives::{PrimitiveStyle, Rectangle},
    text::{Baseline, Text},
};
use serde::{Deserialize, Serialize};

/// Characters that fit across the panel in `FONT_6X10`.
const MAX_CHARS: usize = (WIDTH / 6) as usize;
/// Vertical pitch of plain text pages.
const LINE_HEIGHT: i32 = 11;
/// Throughput that fills a bar (combined RX+TX, kbit/s).
const THROUGHPUT_FULL_SCALE_KBPS: f32 = 5000.0;
/// SSID characters kept on the Wi-Fi line.
const SSID_CHARS: usize = 16;
/// RSSI range mapped onto the signal bar.
const RSSI_FLOOR_DBM: f32 = -90.0;
const RSSI_CEIL_DBM: f32 = -30.0;

/// One screenful of content in the rotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Page {
    Host,
    Wan,
    Lan,
    Tailscale,
    Throughput,
    System,
}

impl Page {
    /// Rotation order.
    pub const ALL: [Page; 6] = [
        Page::Host,
        Page::Wan,
        Page::Lan,
        Page::Tailscale,
        Page::Throughput,
        Page::System,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Page::Host => "host",
            Page::Wan => "wan",
            Page::Lan => "lan",
            Page::Tailscale => "tailscale",
            Page::Throughput => "throughput",
            Page::System => "system",
        }
    }

    /// Lay out this page's content for `snapshot`.
    pub fn layout(&self, snapshot: &RouterSnapshot) -> Layout {
        match self {
            Page::Host => Layout::lines([
                snapshot.hostname.show_or("-", |h| h.clone()),
                format!("time  {}", snapshot.taken_at.format("%H:%M:%S")),
                format!("up    {}", snapshot.uptime_seconds.show_or("?", |s| format_uptime(*s))),
                format!("WAN   {}", snapshot.wan_ip),
                format!("LAN   {}", snapshot.lan_ip),
            ]),
            Page::Wan => wan_layout(snapshot),
            Page::Lan => Layout::lines([
                "LAN / DHCP".to_string(),
                format!("LAN   {}", snapshot.lan_ip),
                format!("leases {}", snapshot.dhcp_leases.show_or("?", |n| n.to_string())),
            ]),
            Page::Tailscale => Layout::lines([
                "TAILSCALE".to_string(),
                format!("IP4  {}", snapshot.tailscale_ip),
            ]),
            Page::Throughput => throughput_layout(snapshot),
            Page::System => Layout::lines([
                "SYSTEM".to_string(),
                format!("temp  {}", snapshot.cpu_celsius.show_or("?", |t| format!("{:.1}C", t))),
                format!(
                    "load  {}",
                    snapshot.load_average.show_or("?", |l| format!(
                        "{:.2} {:.2} {:.2}",
                        l.one_minute, l.five_minutes, l.fifteen_minutes
                    ))
                ),
                format!(
                    "mem   {}",
                    snapshot
                        .memory
                        .show_or("?", |m| format!("{} MB ({:.0}%)", m.used_mb, m.used_percent))
                ),
            ]),
        }
    }

    /// Lay out and rasterise in one step.
    pub fn render(&self, snapshot: &RouterSnapshot) -> Frame {
        self.layout(snapshot).render()
    }
}

fn wan_layout(snapshot: &RouterSnapshot) -> Layout {
    let net = if snapshot.internet_reachable { "OK" } else { "NO NET" };
    let (ssid, rssi) = match &snapshot.wifi {
        Reading::Value(WifiLink::Connected { ssid, rssi_dbm }) => {
            (format!("SSID:{}", truncate(ssid, SSID_CHARS)), *rssi_dbm)
        }
        Reading::Value(WifiLink::NotConnected) => ("Wi-Fi: not conn".to_string(), Reading::Unavailable),
        Reading::Unavailable => ("Wi-Fi: down".to_string(), Reading::Unavailable),
    };
    let signal = rssi.value().map_or(0.0, |dbm| {
        (dbm as f32 - RSSI_FLOOR_DBM) / (RSSI_CEIL_DBM - RSSI_FLOOR_DBM)
    });

    let mut layout = Layout::default();
    layout.text(0, "WAN / Wi-Fi");
    layout.text(12, format!("WAN: {}", snapshot.wan_ip));
    layout.text(24, format!("NET: {}", net));
    layout.text(36, ssid);
    layout.bar(50, 10, signal);
    layout
}

fn throughput_layout(snapshot: &RouterSnapshot) -> Layout {
    let mut layout = Layout::default();
    layout.text(0, "THROUGHPUT (kbit/s)");
    for (label, reading, y) in [
        ("LAN", snapshot.lan_throughput, 14),
        ("WiFi", snapshot.wifi_throughput, 38),
    ] {
        layout.text(y, throughput_line(label, reading));
        let fill = reading
            .value()
            .map_or(0.0, |t| t.total_kbps() as f32 / THROUGHPUT_FULL_SCALE_KBPS);
        layout.bar(y + 10, 8, fill);
    }
    layout
}

fn throughput_line(label: &str, reading: Reading<Throughput>) -> String {
    match reading {
        Reading::Value(t) => format!("{:<4} RX:{:4} TX:{:4}", label, t.rx_kbps, t.tx_kbps),
        Reading::Unavailable => format!("{:<4} ?", label),
    }
}

fn truncate(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

/// A positioned line of text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextItem {
    pub y: i32,
    pub text: String,
}

/// A full-width horizontal gauge.
#[derive(Debug, Clone, PartialEq)]
pub struct Bar {
    pub y: i32,
    pub height: u32,
    /// Filled share, clamped to 0.0..=1.0
    pub fraction: f32,
}

/// Page content ready to rasterise.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Layout {
    pub texts: Vec<TextItem>,
    pub bars: Vec<Bar>,
}

impl Layout {
    /// Plain text lines at the standard pitch.
    pub fn lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut layout = Self::default();
        for (i, line) in lines.into_iter().enumerate() {
            layout.text(i as i32 * LINE_HEIGHT, line);
        }
        layout
    }

    pub fn text(&mut self, y: i32, text: impl Into<String>) {
        let text: String = text.into();
        self.texts.push(TextItem {
            y,
            text: truncate(&text, MAX_CHARS),
        });
    }

    pub fn bar(&mut self, y: i32, height: u32, fraction: f32) {
        let fraction = if fraction.is_finite() { fraction.clamp(0.0, 1.0) } else { 0.0 };
        self.bars.push(Bar { y, height, fraction });
    }

    /// All text joined by newlines, top to bottom.
    pub fn plain_text(&self) -> String {
        self.texts
            .iter()
            .map(|t| t.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn render(&self) -> Frame {
        let mut frame = Frame::new();
        self.draw(&mut frame);
        frame
    }

    pub fn draw(&self, frame: &mut Frame) {
        let style = MonoTextStyle::new(&FONT_6X10, BinaryColor::On);
        for item in &self.texts {
            drawn(Text::with_baseline(&item.text, Point::new(0, item.y), style, Baseline::Top).draw(frame));
        }
        for bar in &self.bars {
            draw_bar(frame, bar);
        }
    }
}

fn draw_bar(frame: &mut Frame, bar: &Bar) {
    drawn(
        Rectangle::new(Point::new(0, bar.y), Size::new(WIDTH, bar.height))
            .into_styled(PrimitiveStyle::with_stroke(BinaryColor::On, 1))
            .draw(frame),
    );
    let fill = ((WIDTH - 2) as f32 * bar.fraction) as u32;
    if fill > 0 && bar.height > 2 {
        drawn(
            Rectangle::new(Point::new(1, bar.y + 1), Size::new(fill, bar.height - 2))
                .into_styled(PrimitiveStyle::with_fill(BinaryColor::On))
                .draw(frame),
        );
    }
}
