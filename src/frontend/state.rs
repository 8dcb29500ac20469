//! Action types emitted by the panels
//!
//! Panels return `AppAction`s instead of talking to the backend or the
//! file system directly; the app applies them after the frame is laid out.

use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq)]
pub enum AppAction {
    // Backend commands
    Connect { port: String, baud_rate: u32 },
    Disconnect,
    StartCalibration,
    StopCalibration,
    ClearData,
    RefreshPorts,

    // Files
    /// Export stored readings; `None` asks for a path
    ExportCsv(Option<PathBuf>),
    /// Save the JSON calibration report; `None` asks for a path
    SaveCalibration(Option<PathBuf>),
}
