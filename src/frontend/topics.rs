//! Data published by the backend and consumed by the panels.
//!
//! The `Topics` struct is a plain data bus. The app folds each
//! [`Notification`] into it in `process_backend_messages()`; panels only
//! read from it. Readings themselves are not copied here, they are read
//! from the shared sample store.

use chrono::Local;

use crate::backend::{Notification, PortInfo};
use crate::config::CalibrationConfig;
use crate::types::{CalibrationResult, Reading, SessionStats, SessionStatus};

/// Severity of a message shown to the operator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Info,
    Error,
}

/// One-line message shown under the controls until replaced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub text: String,
}

impl Notice {
    pub fn info(text: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Info,
            text: text.into(),
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Error,
            text: text.into(),
        }
    }
}

#[derive(Debug, Default)]
pub struct Topics {
    /// Session state as last published by the backend
    pub status: SessionStatus,

    /// Counters (updated ~2Hz)
    pub stats: SessionStats,

    /// Ports from the last RefreshPorts
    pub available_ports: Vec<PortInfo>,

    /// Newest reading, for the live value display
    pub latest_reading: Option<Reading>,

    /// Last R0 the device reported
    pub last_r0: Option<f64>,

    /// Results block built from the last R0 report
    pub calibration_result: Option<CalibrationResult>,

    pub notice: Option<Notice>,

    /// The backend thread has exited
    pub backend_stopped: bool,
}

impl Topics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one backend notification into the topics
    pub fn apply(&mut self, notification: Notification, calibration: &CalibrationConfig) {
        match notification {
            Notification::StatusChanged(status) => self.status = status,
            Notification::ConnectError(msg)
            | Notification::TransportError(msg)
            | Notification::InvalidOperation(msg) => {
                self.notice = Some(Notice::error(msg));
            }
            Notification::ReadingUpdated(reading) => self.latest_reading = Some(reading),
            Notification::ProgressUpdated(percent) => self.status.progress = percent,
            Notification::CalibrationSucceeded => {
                self.notice = Some(Notice::info("Calibration completed successfully!"));
            }
            Notification::CalibrationFailed => {
                self.notice = Some(Notice::error("Calibration failed!"));
            }
            Notification::R0Updated(value) => {
                self.last_r0 = Some(value);
                self.calibration_result = Some(CalibrationResult {
                    r0_value: value,
                    gas_type: calibration.gas_type,
                    target_samples: calibration.target_samples,
                    timestamp: Local::now(),
                });
            }
            Notification::DataCleared => {
                self.latest_reading = None;
                self.last_r0 = None;
                self.calibration_result = None;
                self.notice = Some(Notice::info("Data cleared"));
            }
            Notification::Stats(stats) => self.stats = stats,
            Notification::PortList(ports) => self.available_ports = ports,
            Notification::Shutdown => self.backend_stopped = true,
        }
    }
}
