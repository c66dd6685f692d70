#![deny(unsafe_code)]
//! Outcome rendering
//!
//! Every screen is a full redraw: clear, one text line per 10 px row,
//! present. The reporter never powers the panel and never retries; it only
//! tells the caller how long the screen should stay up.

use hal_abstractions::{Color, Display};

use crate::outcome::SyncOutcome;

/// Vertical pitch between text lines, in pixels (5x7 font plus spacing)
pub const LINE_PITCH: i32 = 10;

/// Shown while the fetch runs
pub const FETCHING: &str = "Fetching the time!";

/// Shown when a cycle ended without a usable response
pub const NO_TIME: &str = "Could not fetch time!";

/// Hardware-fault screen
pub const SENSOR_FAULT: [&str; 2] = ["Sensor fault!", "Restart device"];

/// Maps outcomes to display instructions
#[derive(Debug, Clone, Copy)]
pub struct Reporter {
    dwell_ms: u32,
}

impl Reporter {
    pub fn new(dwell_ms: u32) -> Self {
        Self { dwell_ms }
    }

    /// Text lines for `outcome`, top to bottom
    ///
    /// A success shows the time above the date.
    pub fn status_lines(outcome: &SyncOutcome) -> ([&str; 2], usize) {
        match outcome {
            SyncOutcome::Success(parsed) => ([parsed.time(), parsed.date()], 2),
            SyncOutcome::DnsFailure => (["DNS lookup failed", ""], 1),
            SyncOutcome::SocketFailure => (["Socket alloc failed", ""], 1),
            SyncOutcome::ConnectFailure => (["Connect failed", ""], 1),
            SyncOutcome::SendFailure => (["Send failed", ""], 1),
            SyncOutcome::TimeoutConfigFailure => (["Socket config failed", ""], 1),
            SyncOutcome::NoParsableField => ([NO_TIME, ""], 1),
            SyncOutcome::SensorFault => (SENSOR_FAULT, 2),
        }
    }

    /// Draw `outcome` and return how long it should stay on screen
    pub fn render<D: Display>(&self, display: &mut D, outcome: &SyncOutcome) -> Result<u32, D::Error> {
        let (lines, count) = Self::status_lines(outcome);
        render_lines(display, &lines[..count])?;
        Ok(self.dwell_ms)
    }
}

/// Redraw the whole frame with `lines`, one per row
pub fn render_lines<D: Display>(display: &mut D, lines: &[&str]) -> Result<(), D::Error> {
    display.clear()?;
    for (row, line) in (0..).zip(lines) {
        display.draw_text(0, row * LINE_PITCH, line, Color::On, Color::Off)?;
    }
    display.present()
}
