//! Error handling for the gascal-rs application
//!
//! This module defines the crate-wide error type and a Result alias.
//! Line parse failures have their own type in [`crate::protocol::parser`]
//! because they never leave the parser.

use thiserror::Error;

/// Main error type for gascal-rs operations
#[derive(Error, Debug)]
pub enum CalibrationError {
    /// Transport open/read/write failures
    #[error("Transport error: {0}")]
    Transport(String),

    /// Errors reported by the serial port driver
    #[error("Serial port error: {0}")]
    SerialPort(#[from] serialport::Error),

    /// A command was issued in a state that forbids it
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    /// Errors writing or reading export files
    #[error("Export error: {0}")]
    Export(String),

    /// Errors related to configuration loading/saving
    #[error("Configuration error: {0}")]
    Config(String),

    /// Errors related to channel communication
    #[error("Channel error: {0}")]
    Channel(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<CalibrationError>,
    },
}

impl CalibrationError {
    /// Add context to an error
    pub fn with_context(self, context: impl Into<String>) -> Self {
        CalibrationError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Whether this error came from the link to the device.
    ///
    /// Transport errors force the session back to `Disconnected`.
    pub fn is_transport(&self) -> bool {
        match self {
            CalibrationError::Transport(_)
            | CalibrationError::SerialPort(_)
            | CalibrationError::Io(_) => true,
            CalibrationError::WithContext { source, .. } => source.is_transport(),
            _ => false,
        }
    }
}

impl From<serde_json::Error> for CalibrationError {
    fn from(err: serde_json::Error) -> Self {
        CalibrationError::Serialization(err.to_string())
    }
}

/// Result type alias for gascal-rs operations
pub type Result<T> = std::result::Result<T, CalibrationError>;

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error result
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add context lazily to an error result
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| e.with_context(f()))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, std::io::Error> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| CalibrationError::Io(e).with_context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| CalibrationError::Io(e).with_context(f()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CalibrationError::InvalidOperation("not connected".to_string());
        assert_eq!(err.to_string(), "Invalid operation: not connected");
    }

    #[test]
    fn test_error_with_context() {
        let err = CalibrationError::Export("disk full".to_string());
        let with_ctx = err.with_context("Failed to save report");
        assert!(with_ctx.to_string().contains("Failed to save report"));
        assert!(with_ctx.to_string().contains("disk full"));
    }

    #[test]
    fn test_transport_classification() {
        assert!(CalibrationError::Transport("gone".into()).is_transport());
        assert!(CalibrationError::Io(std::io::Error::other("broken pipe")).is_transport());
        assert!(CalibrationError::Transport("gone".into())
            .with_context("write")
            .is_transport());
        assert!(!CalibrationError::Export("x".into()).is_transport());
        assert!(!CalibrationError::InvalidOperation("x".into()).is_transport());
    }

    #[test]
    fn test_io_result_context() {
        let res: std::result::Result<(), std::io::Error> =
            Err(std::io::Error::new(std::io::ErrorKind::NotFound, "missing"));
        let err = res.context("Opening report").unwrap_err();
        assert!(err.to_string().starts_with("Opening report"));
    }
}
