//! Core data types for gascal-rs
//!
//! This module contains the data structures shared by the session core,
//! the backend thread and the operator UI.
//!
//! # Main Types
//!
//! - [`Reading`] - One decoded `Gas Level:` telemetry line
//! - [`AlertLevel`] - Display classification of the device's alert code
//! - [`ConnectionStatus`] / [`CalibrationState`] - The two halves of the session state
//! - [`Capabilities`] - Which operator actions the current state allows
//! - [`SessionStats`] - Line and command counters published to the status bar
//! - [`CalibrationResult`] - What the results view shows after an R0 report

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

/// A single sensor reading decoded from the device's telemetry line.
///
/// `raw_value`, `voltage` and `resistance` are part of the export schema but
/// the current line format never carries them, so they are always `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    /// Local time the line was decoded
    pub timestamp: DateTime<Local>,
    /// Gas concentration in ppm
    pub gas_ppm: f64,
    /// Alert code reported by the device (0..=3 on current firmware)
    pub alert_level: i32,
    /// Baseline resistance the device is currently using
    pub r0_value: f64,
    /// Raw ADC value (reserved)
    pub raw_value: Option<f64>,
    /// Sensor voltage (reserved)
    pub voltage: Option<f64>,
    /// Sensor resistance (reserved)
    pub resistance: Option<f64>,
}

impl Reading {
    /// Create a reading stamped with the current local time
    pub fn new(gas_ppm: f64, alert_level: i32, r0_value: f64) -> Self {
        Self::at(Local::now(), gas_ppm, alert_level, r0_value)
    }

    /// Create a reading with an explicit timestamp
    pub fn at(timestamp: DateTime<Local>, gas_ppm: f64, alert_level: i32, r0_value: f64) -> Self {
        Self {
            timestamp,
            gas_ppm,
            alert_level,
            r0_value,
            raw_value: None,
            voltage: None,
            resistance: None,
        }
    }

    /// Classified alert level
    pub fn alert(&self) -> AlertLevel {
        AlertLevel::from_code(self.alert_level)
    }
}

/// Alert classification used by the firmware's LED/buzzer patterns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlertLevel {
    Safe,
    Warning,
    Danger,
    Critical,
    /// Any code the firmware is not known to emit
    Unknown(i32),
}

impl AlertLevel {
    /// Map a device alert code to a level
    pub fn from_code(code: i32) -> Self {
        match code {
            0 => AlertLevel::Safe,
            1 => AlertLevel::Warning,
            2 => AlertLevel::Danger,
            3 => AlertLevel::Critical,
            other => AlertLevel::Unknown(other),
        }
    }
}

impl std::fmt::Display for AlertLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AlertLevel::Safe => write!(f, "Safe"),
            AlertLevel::Warning => write!(f, "Warning"),
            AlertLevel::Danger => write!(f, "Danger"),
            AlertLevel::Critical => write!(f, "Critical"),
            AlertLevel::Unknown(code) => write!(f, "Unknown ({})", code),
        }
    }
}

/// Connection status of the single device session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConnectionStatus {
    /// No transport open
    #[default]
    Disconnected,
    /// Transport open and reader running
    Connected,
}

impl std::fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectionStatus::Disconnected => write!(f, "Disconnected"),
            ConnectionStatus::Connected => write!(f, "Connected"),
        }
    }
}

/// Lifecycle of a calibration run on the device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CalibrationState {
    #[default]
    Idle,
    Running,
    Completed,
    Failed,
}

impl CalibrationState {
    pub fn is_running(&self) -> bool {
        matches!(self, CalibrationState::Running)
    }

    /// Whether a new run may be started from this state
    pub fn can_start(&self) -> bool {
        !self.is_running()
    }
}

impl std::fmt::Display for CalibrationState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CalibrationState::Idle => write!(f, "Idle"),
            CalibrationState::Running => write!(f, "Running"),
            CalibrationState::Completed => write!(f, "Completed"),
            CalibrationState::Failed => write!(f, "Failed"),
        }
    }
}

/// Operator actions permitted by the current session state.
///
/// The UI enables and disables its buttons from this, never from its own
/// copy of the state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Capabilities {
    pub can_connect: bool,
    pub can_disconnect: bool,
    pub can_start_calibration: bool,
    pub can_stop_calibration: bool,
    pub can_save_calibration: bool,
    pub can_export: bool,
}

/// Everything the UI needs to redraw the session controls
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SessionStatus {
    pub connection: ConnectionStatus,
    pub calibration: CalibrationState,
    /// Last accepted progress value, 0..=100
    pub progress: f64,
    pub capabilities: Capabilities,
}

/// A fresh session: disconnected, idle, only Connect allowed
impl Default for SessionStatus {
    fn default() -> Self {
        Self {
            connection: ConnectionStatus::Disconnected,
            calibration: CalibrationState::Idle,
            progress: 0.0,
            capabilities: Capabilities {
                can_connect: true,
                ..Capabilities::default()
            },
        }
    }
}

/// Counters maintained by the session and published periodically
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionStats {
    /// Lines handed to the parser
    pub lines_received: u64,
    /// Lines that produced an event
    pub events_parsed: u64,
    /// Lines outside the recognised vocabulary
    pub lines_ignored: u64,
    /// Lines that matched a rule but failed to decode
    pub lines_malformed: u64,
    /// Readings appended to the sample store
    pub readings_stored: u64,
    /// Commands successfully written to the device
    pub commands_sent: u64,
    /// Commands whose write failed
    pub write_failures: u64,
    /// Notifications dropped because the UI queue was full
    pub dropped_notifications: u64,
}

/// Gas the sensor is being calibrated for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum GasType {
    #[default]
    #[serde(rename = "LPG")]
    Lpg,
    Butane,
    Propane,
    Methane,
}

impl GasType {
    /// All selectable gas types, in menu order
    pub const ALL: [GasType; 4] = [
        GasType::Lpg,
        GasType::Butane,
        GasType::Propane,
        GasType::Methane,
    ];
}

impl std::fmt::Display for GasType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GasType::Lpg => write!(f, "LPG"),
            GasType::Butane => write!(f, "Butane"),
            GasType::Propane => write!(f, "Propane"),
            GasType::Methane => write!(f, "Methane"),
        }
    }
}

/// Result block shown after the device reports its R0
#[derive(Debug, Clone, PartialEq)]
pub struct CalibrationResult {
    pub r0_value: f64,
    pub gas_type: GasType,
    pub target_samples: u32,
    pub timestamp: DateTime<Local>,
}

impl CalibrationResult {
    /// Multi-line text for the results view
    pub fn summary(&self) -> String {
        format!(
            "Calibration Results:\nR0 Value: {:.2} kΩ\nGas Type: {}\nSamples: {}\nTimestamp: {}\n",
            self.r0_value,
            self.gas_type,
            self.target_samples,
            self.timestamp.format("%Y-%m-%d %H:%M:%S"),
        )
    }
}
