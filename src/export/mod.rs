//! File exports
//!
//! - [`csv`] - Stored readings as CSV, plus a reader for re-importing them
//! - [`report`] - The JSON calibration report
//!
//! Both work on a snapshot of the sample store, so an export never blocks
//! the backend and a failed write leaves the collected data untouched.

pub mod csv;
pub mod report;

pub use self::csv::{export_readings, read_readings, CSV_HEADER};
pub use report::CalibrationReport;

use crate::error::CalibrationError;

pub(crate) fn no_data() -> CalibrationError {
    CalibrationError::Export("No data to export".to_string())
}
