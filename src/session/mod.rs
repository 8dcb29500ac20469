//! Device session state machine
//!
//! A [`Session`] is the single owner of the device link. It turns inbound
//! protocol events into state changes and UI notifications, and turns
//! operator actions into outbound device commands.
//!
//! # States
//!
//! ```text
//! Disconnected --connect--> Connected/Idle --start--> Running
//!                                ^                      |   |
//!                                +--------stop----------+   +--> Completed / Failed
//! ```
//!
//! Completed and Failed both allow a new run. Any state returns to
//! Disconnected on `disconnect()` or on a transport failure.
//!
//! The session lives on the backend worker thread. The only state shared
//! with the UI is the [`SharedSampleStore`].

pub mod store;

pub use store::{share_sample_store, SampleStore, SharedSampleStore, DEFAULT_SAMPLE_CAPACITY};

use crate::backend::transport::{LineReader, Transport};
use crate::backend::Notification;
use crate::error::{CalibrationError, Result};
use crate::protocol::{try_parse_line, CalibrationOutcome, DeviceCommand, Event};
use crate::types::{
    CalibrationState, Capabilities, ConnectionStatus, Reading, SessionStats, SessionStatus,
};
use crossbeam_channel::{Sender, TrySendError};

/// State machine for one device connection
pub struct Session {
    transport: Box<dyn Transport>,
    store: SharedSampleStore,
    /// Readings collected since the current run started
    calibration_samples: SampleStore,
    connection: ConnectionStatus,
    calibration: CalibrationState,
    progress: f64,
    last_r0: Option<f64>,
    /// A run has completed successfully at least once in this process
    calibration_succeeded: bool,
    port: String,
    stats: SessionStats,
    notifications: Sender<Notification>,
    /// A `StatusChanged` was lost to a full queue and must be resent
    status_dropped: bool,
}

impl Session {
    pub fn new(
        transport: Box<dyn Transport>,
        store: SharedSampleStore,
        notifications: Sender<Notification>,
    ) -> Self {
        let capacity = store.read().map(|s| s.capacity()).unwrap_or(DEFAULT_SAMPLE_CAPACITY);
        Self {
            transport,
            store,
            calibration_samples: SampleStore::with_capacity(capacity),
            connection: ConnectionStatus::Disconnected,
            calibration: CalibrationState::Idle,
            progress: 0.0,
            last_r0: None,
            calibration_succeeded: false,
            port: String::new(),
            stats: SessionStats::default(),
            notifications,
            status_dropped: false,
        }
    }

    /// Swap the transport implementation. Only allowed while disconnected.
    pub fn set_transport(&mut self, transport: Box<dyn Transport>) -> Result<()> {
        if self.connection == ConnectionStatus::Connected {
            return Err(CalibrationError::InvalidOperation(
                "Cannot change transport while connected".to_string(),
            ));
        }
        self.transport = transport;
        Ok(())
    }

    /// Open the transport and request the device status.
    ///
    /// Returns the read half for the caller to drain, or `None` if the
    /// session did not end up connected.
    pub fn connect(&mut self, port: &str, baud_rate: u32) -> Option<Box<dyn LineReader>> {
        if self.connection == ConnectionStatus::Connected {
            self.reject(format!("Already connected to {}", self.port));
            return None;
        }
        if port.trim().is_empty() {
            self.notify(Notification::ConnectError("Please select a port".to_string()));
            return None;
        }

        let reader = match self.transport.open(port, baud_rate) {
            Ok(reader) => reader,
            Err(e) => {
                tracing::error!("Failed to connect to {}: {}", port, e);
                self.notify(Notification::ConnectError(format!(
                    "Failed to connect to {}: {}",
                    port, e
                )));
                return None;
            }
        };

        tracing::info!("Connected to {} at {} baud", port, baud_rate);
        self.connection = ConnectionStatus::Connected;
        self.calibration = CalibrationState::Idle;
        self.progress = 0.0;
        self.port = port.to_string();
        self.notify_status();

        self.send(DeviceCommand::Status);
        if self.connection != ConnectionStatus::Connected {
            return None;
        }
        Some(reader)
    }

    /// Close the transport. A running calibration is abandoned without
    /// sending `stop`.
    pub fn disconnect(&mut self) {
        self.transport.close();
        if self.connection == ConnectionStatus::Disconnected {
            return;
        }

        if self.calibration.is_running() {
            tracing::info!("Abandoning running calibration on disconnect");
        }
        tracing::info!("Disconnected from {}", self.port);

        self.connection = ConnectionStatus::Disconnected;
        self.calibration = CalibrationState::Idle;
        self.progress = 0.0;
        self.port.clear();
        self.notify_status();
    }

    pub fn start_calibration(&mut self) {
        if self.connection != ConnectionStatus::Connected {
            self.reject("Please connect to device first".to_string());
            return;
        }
        if !self.calibration.can_start() {
            self.reject("Calibration is already running".to_string());
            return;
        }

        tracing::info!("Starting calibration");
        self.calibration = CalibrationState::Running;
        self.progress = 0.0;
        self.calibration_samples.clear();
        self.notify_status();
        self.notify(Notification::ProgressUpdated(0.0));

        self.send(DeviceCommand::Calibrate);
    }

    pub fn stop_calibration(&mut self) {
        if !self.calibration.is_running() {
            self.reject("No calibration is running".to_string());
            return;
        }

        tracing::info!("Stopping calibration");
        self.calibration = CalibrationState::Idle;
        self.progress = 0.0;
        self.notify_status();
        self.notify(Notification::ProgressUpdated(0.0));

        self.send(DeviceCommand::Stop);
    }

    /// Parse one inbound line and apply the resulting event, if any
    pub fn on_line(&mut self, line: &str) {
        self.stats.lines_received += 1;
        match try_parse_line(line) {
            Ok(Some(event)) => {
                self.stats.events_parsed += 1;
                self.on_event(event);
            }
            Ok(None) => {
                self.stats.lines_ignored += 1;
                tracing::trace!("Ignoring line: {}", line);
            }
            Err(e) => {
                self.stats.lines_malformed += 1;
                tracing::debug!("Dropping malformed line {:?}: {}", line, e);
            }
        }
    }

    pub fn on_event(&mut self, event: Event) {
        match event {
            Event::Reading(reading) => self.on_reading(reading),
            Event::Progress(percent) => {
                if !self.calibration.is_running() {
                    tracing::debug!(
                        "Ignoring progress {}% while calibration is {}",
                        percent,
                        self.calibration
                    );
                    return;
                }
                self.progress = percent;
                self.notify(Notification::ProgressUpdated(percent));
            }
            Event::CalibrationOutcome(outcome) => self.on_outcome(outcome),
            Event::R0Report(value) => {
                tracing::info!("Device reported R0 = {:.2}", value);
                self.last_r0 = Some(value);
                self.notify(Notification::R0Updated(value));
            }
        }
    }

    /// The read half failed; report it and drop to Disconnected
    pub fn on_transport_failure(&mut self, reason: &str) {
        tracing::warn!("Transport failure: {}", reason);
        self.notify(Notification::TransportError(reason.to_string()));
        self.disconnect();
    }

    /// Forget all collected readings and the last R0
    pub fn clear_data(&mut self) {
        match self.store.write() {
            Ok(mut store) => store.clear(),
            Err(poisoned) => poisoned.into_inner().clear(),
        }
        self.calibration_samples.clear();
        self.last_r0 = None;
        tracing::info!("Cleared collected data");
        self.notify(Notification::DataCleared);
        self.notify_status();
    }

    pub fn capabilities(&self) -> Capabilities {
        let connected = self.connection == ConnectionStatus::Connected;
        let has_data = self.store_len() > 0;
        Capabilities {
            can_connect: !connected,
            can_disconnect: connected,
            can_start_calibration: connected && self.calibration.can_start(),
            can_stop_calibration: self.calibration.is_running(),
            can_save_calibration: self.calibration_succeeded && has_data,
            can_export: has_data,
        }
    }

    pub fn status(&self) -> SessionStatus {
        SessionStatus {
            connection: self.connection,
            calibration: self.calibration,
            progress: self.progress,
            capabilities: self.capabilities(),
        }
    }

    pub fn connection(&self) -> ConnectionStatus {
        self.connection
    }

    pub fn calibration(&self) -> CalibrationState {
        self.calibration
    }

    pub fn progress(&self) -> f64 {
        self.progress
    }

    pub fn last_r0(&self) -> Option<f64> {
        self.last_r0
    }

    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }

    pub fn calibration_samples(&self) -> &SampleStore {
        &self.calibration_samples
    }

    pub fn store(&self) -> &SharedSampleStore {
        &self.store
    }

    /// Resend the current status if an earlier `StatusChanged` was dropped.
    ///
    /// Returns whether a resend was attempted.
    pub fn republish_dropped_status(&mut self) -> bool {
        if !self.status_dropped {
            return false;
        }
        tracing::debug!("Resending status dropped by a full notification queue");
        self.notify_status();
        true
    }

    /// Send a notification that is not tied to a state change
    pub fn publish(&mut self, notification: Notification) {
        self.notify(notification);
    }

    fn on_reading(&mut self, reading: Reading) {
        if self.connection != ConnectionStatus::Connected {
            tracing::debug!("Dropping reading received while disconnected");
            return;
        }

        let had_data = self.store_len() > 0;
        match self.store.write() {
            Ok(mut store) => {
                store.append(reading.clone());
            }
            Err(poisoned) => {
                poisoned.into_inner().append(reading.clone());
            }
        }
        self.stats.readings_stored += 1;

        if self.calibration.is_running() {
            self.calibration_samples.append(reading.clone());
        }

        self.notify(Notification::ReadingUpdated(reading));
        if !had_data {
            // Export and save availability depend on the store being non-empty
            self.notify_status();
        }
    }

    fn on_outcome(&mut self, outcome: CalibrationOutcome) {
        if !self.calibration.is_running() {
            tracing::debug!("Ignoring {:?} while calibration is {}", outcome, self.calibration);
            return;
        }

        match outcome {
            CalibrationOutcome::Success => {
                tracing::info!(
                    "Calibration completed with {} samples",
                    self.calibration_samples.len()
                );
                self.calibration = CalibrationState::Completed;
                self.calibration_succeeded = true;
                self.notify(Notification::CalibrationSucceeded);
            }
            CalibrationOutcome::Failure => {
                tracing::warn!("Device reported calibration failure");
                self.calibration = CalibrationState::Failed;
                self.notify(Notification::CalibrationFailed);
            }
        }
        self.notify_status();
    }

    /// Write a command; a transport failure forces Disconnected
    fn send(&mut self, command: DeviceCommand) {
        match self.transport.write_line(command.as_str()) {
            Ok(()) => {
                self.stats.commands_sent += 1;
                tracing::debug!("Sent command: {}", command);
            }
            Err(e) => {
                self.stats.write_failures += 1;
                let reason = format!("Failed to send {}: {}", command, e);
                if e.is_transport() {
                    self.on_transport_failure(&reason);
                } else {
                    tracing::warn!("{}", reason);
                    self.notify(Notification::TransportError(reason));
                }
            }
        }
    }

    fn reject(&mut self, reason: String) {
        tracing::debug!("Rejected operation: {}", reason);
        self.notify(Notification::InvalidOperation(reason));
    }

    fn notify_status(&mut self) {
        let status = self.status();
        self.notify(Notification::StatusChanged(status));
    }

    fn notify(&mut self, notification: Notification) {
        let is_status = matches!(notification, Notification::StatusChanged(_));
        match self.notifications.try_send(notification) {
            Ok(()) => {
                if is_status {
                    self.status_dropped = false;
                }
            }
            Err(TrySendError::Full(_)) => {
                self.stats.dropped_notifications += 1;
                if is_status {
                    self.status_dropped = true;
                }
            }
            Err(TrySendError::Disconnected(_)) => {}
        }
    }

    fn store_len(&self) -> usize {
        match self.store.read() {
            Ok(store) => store.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }
}
