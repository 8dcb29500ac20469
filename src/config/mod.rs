//! Configuration module for gascal-rs
//!
//! This module handles application configuration including:
//! - Application state persistence (last port, baud rate, gas type, export directory)
//! - Serial, calibration and collection settings used by the backend
//! - Runtime display settings during execution
//!
//! # App Data Location
//!
//! Application data is stored in the platform-appropriate location:
//! - **Linux**: `~/.local/share/dev.bantaygas.gascal-rs/`
//! - **macOS**: `~/Library/Application Support/dev.bantaygas.gascal-rs/`
//! - **Windows**: `%APPDATA%\dev.bantaygas.gascal-rs\`
//!
//! # Files
//!
//! - `app_state.json` - Last connection and calibration choices
//! - `logs/gascal.log.*` - Daily rolling log files
//!
//! # Example
//!
//! ```ignore
//! use gascal_rs::config::{AppConfig, AppState};
//!
//! let mut state = AppState::load_or_default();
//! let config = state.apply_to(AppConfig::default());
//!
//! state.update_last_connection("/dev/ttyUSB0", 115200);
//! state.save()?;
//! ```

pub mod settings;

pub use settings::*;

pub use crate::types::GasType;

use crate::error::{CalibrationError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Application identifier for data directories
pub const APP_ID: &str = "dev.bantaygas.gascal-rs";

/// App state filename
pub const APP_STATE_FILE: &str = "app_state.json";

/// Log directory name under the app data directory
pub const LOG_DIR: &str = "logs";

/// Log file prefix for the rolling appender
pub const LOG_FILE_PREFIX: &str = "gascal.log";

/// Baud rates offered in the port picker
pub const SUPPORTED_BAUD_RATES: [u32; 5] = [9600, 19200, 38400, 57600, 115200];

/// Default baud rate of the device firmware
pub const DEFAULT_BAUD_RATE: u32 = 115200;

/// Default per-read timeout on the serial port in milliseconds
pub const DEFAULT_READ_TIMEOUT_MS: u64 = 50;

/// Default number of readings kept in the sample store
pub const DEFAULT_MAX_SAMPLES: usize = 100;

// ==================== App Data Directory ====================

/// Get the application data directory path
pub fn app_data_dir() -> Option<PathBuf> {
    dirs_next::data_dir().map(|p| p.join(APP_ID))
}

/// Ensure the app data directory exists
pub fn ensure_app_data_dir() -> Result<PathBuf> {
    let dir = app_data_dir().ok_or_else(|| {
        CalibrationError::Config("Could not determine app data directory".to_string())
    })?;

    if !dir.exists() {
        std::fs::create_dir_all(&dir).map_err(|e| {
            CalibrationError::Config(format!("Failed to create app data directory: {}", e))
        })?;
    }

    Ok(dir)
}

/// Get the path to the app state file
pub fn app_state_path() -> Option<PathBuf> {
    app_data_dir().map(|p| p.join(APP_STATE_FILE))
}

/// Get the log directory, creating it if needed
pub fn ensure_log_dir() -> Result<PathBuf> {
    let dir = ensure_app_data_dir()?.join(LOG_DIR);
    std::fs::create_dir_all(&dir).map_err(|e| {
        CalibrationError::Config(format!("Failed to create log directory: {}", e))
    })?;
    Ok(dir)
}

// ==================== App State ====================

/// Persistent application state
///
/// Remembers the operator's last choices between launches. Stored as JSON
/// in the app data directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppState {
    /// Version for future migration support
    #[serde(default = "default_app_state_version")]
    pub version: u32,

    /// Last port connected to
    #[serde(default)]
    pub last_port: Option<String>,

    /// Last baud rate used
    #[serde(default)]
    pub last_baud_rate: Option<u32>,

    /// Last gas type selected
    #[serde(default)]
    pub last_gas_type: Option<GasType>,

    /// Target sample count shown in results
    #[serde(default)]
    pub target_samples: Option<u32>,

    /// Enable dark mode
    #[serde(default = "default_true")]
    pub dark_mode: bool,

    /// Directory of the last CSV/JSON export
    #[serde(default)]
    pub last_export_dir: Option<PathBuf>,
}

fn default_app_state_version() -> u32 {
    1
}

fn default_true() -> bool {
    true
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            version: 1,
            last_port: None,
            last_baud_rate: None,
            last_gas_type: None,
            target_samples: None,
            dark_mode: true,
            last_export_dir: None,
        }
    }
}

impl AppState {
    /// Load app state from the default location
    pub fn load() -> Result<Self> {
        let path = app_state_path().ok_or_else(|| {
            CalibrationError::Config("Could not determine app state path".to_string())
        })?;
        Self::load_from(&path)
    }

    /// Load app state from an explicit path; a missing file yields defaults
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| CalibrationError::Config(format!("Failed to read app state: {}", e)))?;

        serde_json::from_str(&content)
            .map_err(|e| CalibrationError::Config(format!("Failed to parse app state: {}", e)))
    }

    /// Load app state, returning defaults on any error
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_else(|e| {
            tracing::warn!("Failed to load app state, using defaults: {}", e);
            Self::default()
        })
    }

    /// Save app state to the default location
    pub fn save(&self) -> Result<()> {
        let dir = ensure_app_data_dir()?;
        self.save_to(dir.join(APP_STATE_FILE))
    }

    pub fn save_to(&self, path: impl AsRef<Path>) -> Result<()> {
        let content = serde_json::to_string_pretty(self).map_err(|e| {
            CalibrationError::Config(format!("Failed to serialize app state: {}", e))
        })?;

        std::fs::write(path.as_ref(), content)
            .map_err(|e| CalibrationError::Config(format!("Failed to write app state: {}", e)))
    }

    /// Remember a successful connection
    pub fn update_last_connection(&mut self, port: &str, baud_rate: u32) {
        self.last_port = Some(port.to_string());
        self.last_baud_rate = Some(baud_rate);
    }

    /// Remember where the operator last exported to
    pub fn update_export_dir(&mut self, exported_file: impl AsRef<Path>) {
        self.last_export_dir = exported_file.as_ref().parent().map(Path::to_path_buf);
    }

    /// Overlay remembered choices onto a configuration
    pub fn apply_to(&self, mut config: AppConfig) -> AppConfig {
        if let Some(port) = &self.last_port {
            config.serial.port = port.clone();
        }
        if let Some(baud) = self.last_baud_rate.filter(|b| SUPPORTED_BAUD_RATES.contains(b)) {
            config.serial.baud_rate = baud;
        }
        if let Some(gas) = self.last_gas_type {
            config.calibration.gas_type = gas;
        }
        if let Some(samples) = self.target_samples.filter(|s| *s > 0) {
            config.calibration.target_samples = samples;
        }
        config
    }
}

// ==================== App Config ====================

/// Main application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Serial link settings
    #[serde(default)]
    pub serial: SerialConfig,

    /// Calibration run settings
    #[serde(default)]
    pub calibration: CalibrationConfig,

    /// Device identity written into calibration reports
    #[serde(default)]
    pub device: DeviceInfo,

    /// Buffer and queue sizes
    #[serde(default)]
    pub collection: CollectionConfig,
}

/// Serial link configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SerialConfig {
    /// Port name (`/dev/ttyUSB0`, `COM3`, `mock://device`)
    pub port: String,
    pub baud_rate: u32,
    /// Per-read timeout; also bounds how quickly the reader notices a stop
    pub read_timeout_ms: u64,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: String::new(),
            baud_rate: DEFAULT_BAUD_RATE,
            read_timeout_ms: DEFAULT_READ_TIMEOUT_MS,
        }
    }
}

impl SerialConfig {
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms.max(1))
    }
}

/// Calibration run configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationConfig {
    pub gas_type: GasType,
    /// Sample count the device is asked to average (display only)
    pub target_samples: u32,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            gas_type: GasType::Lpg,
            target_samples: 100,
        }
    }
}

/// Device identity recorded in calibration reports
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceInfo {
    pub model: String,
    pub sensor: String,
    pub firmware_version: String,
}

impl Default for DeviceInfo {
    fn default() -> Self {
        Self {
            model: "BantayGas IoT".to_string(),
            sensor: "MQ-6".to_string(),
            firmware_version: "1.0.0".to_string(),
        }
    }
}

// ==================== Collection Config ====================

/// Buffer and queue sizing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectionConfig {
    /// Readings kept in the sample store
    pub max_samples: usize,

    /// Capacity of the reader -> worker line channel
    pub line_queue_size: usize,

    /// Capacity of the worker -> UI notification channel
    pub notification_queue_size: usize,

    /// Rows shown in the recent-readings table
    pub table_rows: usize,
}

impl Default for CollectionConfig {
    fn default() -> Self {
        Self {
            max_samples: DEFAULT_MAX_SAMPLES,
            line_queue_size: 1024,
            notification_queue_size: 4096,
            table_rows: 20,
        }
    }
}

// ==================== Tests ====================
