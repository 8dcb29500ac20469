//! JSON calibration report
//!
//! ```json
//! {
//!   "r0_value": 10.0,
//!   "gas_type": "LPG",
//!   "calibration_date": "2024-03-01T14:05:09.123456+08:00",
//!   "samples": 100,
//!   "confidence": 95.0,
//!   "device_info": { "model": "BantayGas IoT", "sensor": "MQ-6", "firmware_version": "1.0.0" }
//! }
//! ```

use crate::config::DeviceInfo;
use crate::error::{CalibrationError, Result, ResultExt};
use crate::types::{GasType, Reading};
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Confidence written into every report; the device does not send one
pub const REPORT_CONFIDENCE: f64 = 95.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationReport {
    pub r0_value: f64,
    pub gas_type: GasType,
    pub calibration_date: DateTime<Local>,
    /// Readings in the store when the report was built
    pub samples: usize,
    pub confidence: f64,
    pub device_info: DeviceInfo,
}

impl CalibrationReport {
    /// Build a report from a store snapshot.
    ///
    /// Uses the device's last reported R0 when there is one, otherwise the
    /// R0 carried by the newest reading.
    pub fn build(
        readings: &[Reading],
        reported_r0: Option<f64>,
        gas_type: GasType,
        device_info: &DeviceInfo,
    ) -> Result<Self> {
        let latest = readings.last().ok_or_else(super::no_data)?;

        Ok(Self {
            r0_value: reported_r0.unwrap_or(latest.r0_value),
            gas_type,
            calibration_date: Local::now(),
            samples: readings.len(),
            confidence: REPORT_CONFIDENCE,
            device_info: device_info.clone(),
        })
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content).with_context(|| format!("Writing {}", path.display()))?;
        tracing::info!("Saved calibration report to {}", path.display());
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content =
            std::fs::read_to_string(path).with_context(|| format!("Reading {}", path.display()))?;
        serde_json::from_str(&content).map_err(|e| {
            CalibrationError::Export(format!("Invalid report {}: {}", path.display(), e))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn readings() -> Vec<Reading> {
        vec![Reading::new(100.0, 0, 9.5), Reading::new(101.0, 0, 9.75)]
    }

    #[test]
    fn test_build_prefers_reported_r0() {
        let info = DeviceInfo::default();
        let report = CalibrationReport::build(&readings(), Some(10.25), GasType::Butane, &info)
            .unwrap();
        assert_eq!(report.r0_value, 10.25);
        assert_eq!(report.samples, 2);
        assert_eq!(report.confidence, 95.0);
        assert_eq!(report.device_info.sensor, "MQ-6");
    }

    #[test]
    fn test_build_falls_back_to_latest_reading() {
        let report =
            CalibrationReport::build(&readings(), None, GasType::Lpg, &DeviceInfo::default())
                .unwrap();
        assert_eq!(report.r0_value, 9.75);
    }

    #[test]
    fn test_build_without_data_fails() {
        let result = CalibrationReport::build(&[], Some(1.0), GasType::Lpg, &DeviceInfo::default());
        assert!(matches!(result, Err(CalibrationError::Export(_))));
    }

    #[test]
    fn test_json_field_names() {
        let report =
            CalibrationReport::build(&readings(), None, GasType::Lpg, &DeviceInfo::default())
                .unwrap();
        let value: serde_json::Value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["gas_type"], "LPG");
        assert_eq!(value["device_info"]["model"], "BantayGas IoT");
        assert_eq!(value["device_info"]["firmware_version"], "1.0.0");
        assert!(value["calibration_date"].as_str().is_some());
        assert_eq!(value["samples"], 2);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("calibration.json");
        let report =
            CalibrationReport::build(&readings(), Some(10.0), GasType::Propane, &DeviceInfo::default())
                .unwrap();

        report.save(&path).unwrap();
        assert_eq!(CalibrationReport::load(&path).unwrap(), report);
    }

    #[test]
    fn test_load_garbage_is_export_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, "[]").unwrap();
        assert!(matches!(
            CalibrationReport::load(&path),
            Err(CalibrationError::Export(_))
        ));
    }
}
