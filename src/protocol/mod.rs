//! Device line protocol
//!
//! The device speaks a newline-terminated UTF-8 text protocol. Outbound we
//! send one of three bare commands; inbound we recognise a handful of line
//! shapes and ignore everything else (boot banners, status dumps, debug
//! prints).
//!
//! - [`DeviceCommand`] - Outbound command vocabulary
//! - [`Event`] - Typed form of one recognised inbound line
//! - [`parser`] - The line parser that produces events

pub mod parser;

pub use parser::{parse_line, parse_line_at, try_parse_line, try_parse_line_at, ParseError};

use crate::types::Reading;

/// Marker for periodic telemetry lines (`Gas Level: 120.5 ppm|Alert:2|R0:9.8`)
pub const GAS_LEVEL_MARKER: &str = "Gas Level:";
/// Marker for calibration progress lines (`Calibration progress: 45%`)
pub const PROGRESS_MARKER: &str = "Calibration progress:";
/// Phrase the firmware prints when a calibration run succeeds
pub const SUCCESS_PHRASE: &str = "Calibration completed successfully";
/// Phrase the firmware prints when a calibration run fails
pub const FAILURE_PHRASE: &str = "Calibration failed";
/// Marker for R0 report lines (`R0 value: 10.25 kOhm`)
pub const R0_MARKER: &str = "R0 value:";
/// Separator between fields of a telemetry line
pub const FIELD_SEPARATOR: char = '|';

/// Commands the tool sends to the device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceCommand {
    /// Ask the device to print its status block
    Status,
    /// Start the on-device calibration procedure
    Calibrate,
    /// Abort a running calibration (not every firmware supports it)
    Stop,
}

impl DeviceCommand {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceCommand::Status => "status",
            DeviceCommand::Calibrate => "calibrate",
            DeviceCommand::Stop => "stop",
        }
    }

    /// The command as written to the wire, newline included
    pub fn to_wire(&self) -> String {
        format!("{}\n", self.as_str())
    }
}

impl std::fmt::Display for DeviceCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Terminal signal for a calibration run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalibrationOutcome {
    Success,
    Failure,
}

/// One recognised inbound line
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// Periodic telemetry
    Reading(Reading),
    /// Calibration progress in percent, 0..=100
    Progress(f64),
    /// The device finished a calibration run
    CalibrationOutcome(CalibrationOutcome),
    /// The device reported the R0 it settled on
    R0Report(f64),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_wire_format() {
        assert_eq!(DeviceCommand::Status.to_wire(), "status\n");
        assert_eq!(DeviceCommand::Calibrate.to_wire(), "calibrate\n");
        assert_eq!(DeviceCommand::Stop.to_wire(), "stop\n");
    }
}
