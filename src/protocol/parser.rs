//! Line parser for inbound device text.
//!
//! Rules are checked in a fixed order and the first rule whose marker
//! appears in the line decides the outcome, even if decoding then fails:
//!
//! 1. [`GAS_LEVEL_MARKER`] → [`Event::Reading`]
//! 2. [`PROGRESS_MARKER`] → [`Event::Progress`]
//! 3. [`SUCCESS_PHRASE`] → [`Event::CalibrationOutcome`] (success)
//! 4. [`FAILURE_PHRASE`] → [`Event::CalibrationOutcome`] (failure)
//! 5. [`R0_MARKER`] → [`Event::R0Report`]
//!
//! Field values sit between the first and second `:` of their segment.

use super::{
    CalibrationOutcome, Event, FAILURE_PHRASE, FIELD_SEPARATOR, GAS_LEVEL_MARKER,
    PROGRESS_MARKER, R0_MARKER, SUCCESS_PHRASE,
};
use crate::types::Reading;
use chrono::{DateTime, Local};
use thiserror::Error;

/// Why a line that matched a rule could not be decoded
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("expected at least 3 '|' segments, found {found}")]
    TooFewSegments { found: usize },

    #[error("missing value for {field}")]
    MissingField { field: &'static str },

    #[error("invalid number for {field}: {value:?}")]
    InvalidNumber { field: &'static str, value: String },

    #[error("{field} out of range: {value}")]
    OutOfRange { field: &'static str, value: f64 },
}

/// Parse one line, stamping readings with the current time.
///
/// Lines outside the vocabulary and lines that fail to decode both yield
/// `None`; decode failures are logged at debug level.
pub fn parse_line(line: &str) -> Option<Event> {
    parse_line_at(line, Local::now())
}

/// [`parse_line`] with an explicit timestamp for any produced reading
pub fn parse_line_at(line: &str, timestamp: DateTime<Local>) -> Option<Event> {
    match try_parse_line_at(line, timestamp) {
        Ok(event) => event,
        Err(e) => {
            tracing::debug!("Dropping malformed line {:?}: {}", line, e);
            None
        }
    }
}

/// Parse one line, distinguishing "not for us" (`Ok(None)`) from
/// "for us but malformed" (`Err`).
pub fn try_parse_line(line: &str) -> Result<Option<Event>, ParseError> {
    try_parse_line_at(line, Local::now())
}

/// [`try_parse_line`] with an explicit timestamp for any produced reading
pub fn try_parse_line_at(
    line: &str,
    timestamp: DateTime<Local>,
) -> Result<Option<Event>, ParseError> {
    if line.contains(GAS_LEVEL_MARKER) {
        return parse_reading(line, timestamp).map(|r| Some(Event::Reading(r)));
    }
    if line.contains(PROGRESS_MARKER) {
        return parse_progress(line).map(|p| Some(Event::Progress(p)));
    }
    if line.contains(SUCCESS_PHRASE) {
        return Ok(Some(Event::CalibrationOutcome(CalibrationOutcome::Success)));
    }
    if line.contains(FAILURE_PHRASE) {
        return Ok(Some(Event::CalibrationOutcome(CalibrationOutcome::Failure)));
    }
    if line.contains(R0_MARKER) {
        return parse_r0_report(line).map(|v| Some(Event::R0Report(v)));
    }
    Ok(None)
}

/// `Gas Level: 120.5 ppm|Alert:2|R0:9.8`
fn parse_reading(line: &str, timestamp: DateTime<Local>) -> Result<Reading, ParseError> {
    let segments: Vec<&str> = line.split(FIELD_SEPARATOR).collect();
    if segments.len() < 3 {
        return Err(ParseError::TooFewSegments {
            found: segments.len(),
        });
    }

    let gas_text = first_token(field_value(segments[0], "gas_ppm")?, "gas_ppm")?;
    let gas_ppm = non_negative(parse_f64(gas_text, "gas_ppm")?, "gas_ppm")?;

    let alert_text = field_value(segments[1], "alert_level")?;
    let alert_level = alert_text
        .parse::<i32>()
        .map_err(|_| ParseError::InvalidNumber {
            field: "alert_level",
            value: alert_text.to_string(),
        })?;

    let r0_text = field_value(segments[2], "r0_value")?;
    let r0_value = non_negative(parse_f64(r0_text, "r0_value")?, "r0_value")?;

    Ok(Reading::at(timestamp, gas_ppm, alert_level, r0_value))
}

/// `Calibration progress: 45%`
fn parse_progress(line: &str) -> Result<f64, ParseError> {
    let text = field_value(line, "progress")?;
    let text = text.strip_suffix('%').unwrap_or(text).trim_end();
    let percent = parse_f64(text, "progress")?;
    if !(0.0..=100.0).contains(&percent) {
        return Err(ParseError::OutOfRange {
            field: "progress",
            value: percent,
        });
    }
    Ok(percent)
}

/// `R0 value: 10.25 kOhm`
fn parse_r0_report(line: &str) -> Result<f64, ParseError> {
    let text = first_token(field_value(line, "r0_report")?, "r0_report")?;
    non_negative(parse_f64(text, "r0_report")?, "r0_report")
}

/// Text between the first and second `:` of a segment, trimmed
fn field_value<'a>(segment: &'a str, field: &'static str) -> Result<&'a str, ParseError> {
    segment
        .split(':')
        .nth(1)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or(ParseError::MissingField { field })
}

fn first_token<'a>(text: &'a str, field: &'static str) -> Result<&'a str, ParseError> {
    text.split_whitespace()
        .next()
        .ok_or(ParseError::MissingField { field })
}

fn parse_f64(text: &str, field: &'static str) -> Result<f64, ParseError> {
    text.parse::<f64>().map_err(|_| ParseError::InvalidNumber {
        field,
        value: text.to_string(),
    })
}

fn non_negative(value: f64, field: &'static str) -> Result<f64, ParseError> {
    if value.is_finite() && value >= 0.0 {
        Ok(value)
    } else {
        Err(ParseError::OutOfRange { field, value })
    }
}
