//! CSV export of stored readings
//!
//! One header row, then one row per reading in arrival order:
//!
//! ```text
//! timestamp,raw_value,voltage,resistance,gas_ppm,alert_level,r0_value
//! 2024-03-01T14:05:09.123456+08:00,,,,120.5,2,9.8
//! ```
//!
//! Timestamps are RFC 3339 with microseconds. Absent optional fields are
//! written as empty cells.

use crate::error::{CalibrationError, Result, ResultExt};
use crate::types::Reading;
use chrono::{DateTime, Local, SecondsFormat};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

pub const CSV_HEADER: &str = "timestamp,raw_value,voltage,resistance,gas_ppm,alert_level,r0_value";

const COLUMNS: usize = 7;

/// Write `readings` to `path`, returning the number of rows written.
///
/// An empty slice is an error and leaves any existing file alone.
pub fn export_readings(path: impl AsRef<Path>, readings: &[Reading]) -> Result<usize> {
    let path = path.as_ref();
    if readings.is_empty() {
        return Err(super::no_data());
    }

    let file = File::create(path).with_context(|| format!("Creating {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    let rows = write_readings(&mut writer, readings)
        .with_context(|| format!("Writing {}", path.display()))?;
    writer
        .flush()
        .with_context(|| format!("Flushing {}", path.display()))?;

    tracing::info!("Exported {} readings to {}", rows, path.display());
    Ok(rows)
}

/// Write the header and rows to any writer
pub fn write_readings<W: Write>(writer: &mut W, readings: &[Reading]) -> std::io::Result<usize> {
    writeln!(writer, "{}", CSV_HEADER)?;
    for reading in readings {
        writeln!(
            writer,
            "{},{},{},{},{},{},{}",
            reading
                .timestamp
                .to_rfc3339_opts(SecondsFormat::Micros, false),
            optional(reading.raw_value),
            optional(reading.voltage),
            optional(reading.resistance),
            reading.gas_ppm,
            reading.alert_level,
            reading.r0_value,
        )?;
    }
    Ok(readings.len())
}

fn optional(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

/// Read a file written by [`export_readings`]
pub fn read_readings(path: impl AsRef<Path>) -> Result<Vec<Reading>> {
    let path = path.as_ref();
    let file = File::open(path).with_context(|| format!("Opening {}", path.display()))?;
    parse_readings(BufReader::new(file))
}

/// Parse CSV text in the export format
pub fn parse_readings<R: BufRead>(reader: R) -> Result<Vec<Reading>> {
    let mut lines = reader.lines();

    match lines.next() {
        Some(header) => {
            let header = header?;
            if header.trim() != CSV_HEADER {
                return Err(CalibrationError::Export(format!(
                    "Unexpected CSV header: {}",
                    header.trim()
                )));
            }
        }
        None => return Err(CalibrationError::Export("Empty CSV file".to_string())),
    }

    let mut readings = Vec::new();
    for (index, line) in lines.enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        // Header is line 1
        let reading = parse_row(&line)
            .map_err(|msg| CalibrationError::Export(format!("Line {}: {}", index + 2, msg)))?;
        readings.push(reading);
    }
    Ok(readings)
}

fn parse_row(line: &str) -> std::result::Result<Reading, String> {
    let cells: Vec<&str> = line.trim().split(',').collect();
    if cells.len() != COLUMNS {
        return Err(format!("expected {} columns, found {}", COLUMNS, cells.len()));
    }

    let timestamp = DateTime::parse_from_rfc3339(cells[0])
        .map_err(|e| format!("bad timestamp {:?}: {}", cells[0], e))?
        .with_timezone(&Local);

    let mut reading = Reading::at(
        timestamp,
        number(cells[4], "gas_ppm")?,
        cells[5]
            .parse()
            .map_err(|_| format!("bad alert_level {:?}", cells[5]))?,
        number(cells[6], "r0_value")?,
    );
    reading.raw_value = optional_number(cells[1], "raw_value")?;
    reading.voltage = optional_number(cells[2], "voltage")?;
    reading.resistance = optional_number(cells[3], "resistance")?;
    Ok(reading)
}

fn number(cell: &str, field: &str) -> std::result::Result<f64, String> {
    cell.parse().map_err(|_| format!("bad {} {:?}", field, cell))
}

fn optional_number(cell: &str, field: &str) -> std::result::Result<Option<f64>, String> {
    if cell.is_empty() {
        Ok(None)
    } else {
        number(cell, field).map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample(n: usize) -> Vec<Reading> {
        (0..n)
            .map(|i| {
                let ts = Local.with_ymd_and_hms(2024, 3, 1, 14, 5, i as u32).unwrap();
                Reading::at(ts, 100.0 + i as f64 * 0.25, (i % 4) as i32, 9.8)
            })
            .collect()
    }

    #[test]
    fn test_header_and_empty_cells() {
        let mut out = Vec::new();
        write_readings(&mut out, &sample(1)).unwrap();
        let text = String::from_utf8(out).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some(CSV_HEADER));
        let row = lines.next().unwrap();
        assert!(row.ends_with(",,,,100,0,9.8"), "row was {}", row);
        assert!(row.starts_with("2024-03-01T14:05:00.000000"));
    }

    #[test]
    fn test_export_empty_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("readings.csv");
        match export_readings(&path, &[]) {
            Err(CalibrationError::Export(msg)) => assert_eq!(msg, "No data to export"),
            other => panic!("unexpected {:?}", other),
        }
        assert!(!path.exists());
    }

    #[test]
    fn test_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("readings.csv");
        let readings = sample(25);

        assert_eq!(export_readings(&path, &readings).unwrap(), 25);
        let back = read_readings(&path).unwrap();
        assert_eq!(back, readings);
    }

    #[test]
    fn test_optional_fields_read_back() {
        let text = format!(
            "{}\n2024-03-01T14:05:09+00:00,512,1.5,20.25,3,1,9.5\n",
            CSV_HEADER
        );
        let readings = parse_readings(text.as_bytes()).unwrap();
        assert_eq!(readings[0].raw_value, Some(512.0));
        assert_eq!(readings[0].voltage, Some(1.5));
        assert_eq!(readings[0].resistance, Some(20.25));
    }

    #[test]
    fn test_bad_rows_report_line_number() {
        let text = format!(
            "{}\n2024-03-01T14:05:09+00:00,,,,1,0,9\n2024-03-01T14:05:10+00:00,,,,x,0,9\n",
            CSV_HEADER
        );
        match parse_readings(text.as_bytes()) {
            Err(CalibrationError::Export(msg)) => assert!(msg.starts_with("Line 3:"), "{}", msg),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_wrong_header_rejected() {
        assert!(parse_readings("a,b,c\n".as_bytes()).is_err());
        assert!(parse_readings("".as_bytes()).is_err());
    }
}
