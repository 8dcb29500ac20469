//! # gascal-rs: Gas Sensor Calibration Tool
//!
//! A desktop tool for calibrating a gas-sensor device over a serial link.
//! The device streams comma-separated readings and calibration events; the
//! operator connects, starts a calibration run, watches gas concentration and
//! alert level live, and saves the resulting R0 baseline.
//!
//! ## Architecture
//!
//! - **Backend**: A worker thread owns the [`session::Session`] and the serial
//!   transport; a reader thread turns bytes into lines
//! - **Frontend**: Renders the UI using eframe/egui with egui_plot for graphs
//! - **Communication**: Crossbeam channels carry commands down and
//!   [`backend::Notification`]s up; readings live in a shared bounded store
//! - **Export**: CSV of stored readings and a JSON calibration report
//!
//! ## Configuration
//!
//! Application state (last port, baud rate, gas type, preferences) is stored
//! in the platform-appropriate data directory under `dev.bantaygas.gascal-rs`:
//!
//! - **Linux**: `~/.local/share/dev.bantaygas.gascal-rs/`
//! - **macOS**: `~/Library/Application Support/dev.bantaygas.gascal-rs/`
//! - **Windows**: `%APPDATA%\dev.bantaygas.gascal-rs\`
//!
//! ## Example
//!
//! ```ignore
//! use gascal_rs::{backend::SerialBackend, config::{AppConfig, AppState}, CalibrationApp};
//!
//! fn main() -> eframe::Result<()> {
//!     let app_state = AppState::load_or_default();
//!     let config = app_state.apply_to(AppConfig::default());
//!
//!     let (backend, frontend) = SerialBackend::new(config.clone());
//!     std::thread::spawn(move || backend.run());
//!
//!     eframe::run_native(
//!         "BantayGas Calibration Tool",
//!         eframe::NativeOptions::default(),
//!         Box::new(|cc| Ok(Box::new(CalibrationApp::new(cc, frontend, config, app_state)))),
//!     )
//! }
//! ```

pub mod app;
pub mod backend;
pub mod config;
pub mod error;
pub mod export;
pub mod frontend;
pub mod protocol;
pub mod session;
pub mod types;

// Re-export commonly used types
pub use app::CalibrationApp;
pub use backend::{BackendCommand, FrontendReceiver, Notification, SerialBackend};
pub use config::{AppConfig, AppState};
pub use error::{CalibrationError, Result};
pub use protocol::{parse_line, DeviceCommand, Event};
pub use types::{CalibrationState, ConnectionStatus, GasType, Reading};
