//! Backend module for the device link
//!
//! This module handles all serial communication in separate threads to keep
//! the UI responsive. It uses crossbeam channels for thread-safe communication
//! with the frontend.
//!
//! # Architecture
//!
//! Three threads cooperate:
//!
//! - The **line reader** ([`reader`]) owns the read half of the transport and
//!   only moves complete lines into a bounded channel
//! - The **worker** ([`BackendWorker`]) owns the [`Session`](crate::session::Session),
//!   applies UI commands and inbound lines to it, and writes device commands
//! - The **UI** sends [`BackendCommand`]s and drains [`Notification`]s through a
//!   [`FrontendReceiver`], and reads readings from the shared sample store
//!
//! # Components
//!
//! - [`Transport`] / [`LineReader`] - Link abstraction
//! - [`SerialTransport`] - Real USB-serial ports
//! - [`MockDevice`](mock_device::MockDevice) - Simulated firmware (feature-gated)
//!
//! # Example
//!
//! ```ignore
//! use gascal_rs::backend::SerialBackend;
//! use gascal_rs::config::AppConfig;
//!
//! let (backend, frontend) = SerialBackend::new(AppConfig::default());
//! std::thread::spawn(move || backend.run());
//!
//! frontend.connect("/dev/ttyUSB0", 115200);
//! frontend.start_calibration();
//!
//! for msg in frontend.drain() {
//!     if let Notification::ProgressUpdated(p) = msg {
//!         println!("{}%", p);
//!     }
//! }
//! ```

#[cfg(any(test, feature = "mock-device"))]
pub mod mock_device;
pub mod reader;
pub mod serial;
pub mod transport;
pub mod worker;

pub use reader::{spawn_reader, ReaderEvent, ReaderHandle};
pub use serial::{list_ports, PortInfo, SerialTransport};
pub use transport::{LineAssembler, LineReader, Transport};
pub use worker::BackendWorker;

use crate::config::AppConfig;
use crate::session::{share_sample_store, SharedSampleStore};
use crate::types::{Reading, SessionStats, SessionStatus};
use crossbeam_channel::{bounded, Receiver, Sender};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;

/// Message sent from the UI to the backend
#[derive(Debug, Clone, PartialEq)]
pub enum BackendCommand {
    /// Open a port and request the device status
    Connect {
        /// Port name from [`list_all_ports`]
        port: String,
        baud_rate: u32,
    },
    /// Close the port
    Disconnect,
    /// Send `calibrate`
    StartCalibration,
    /// Send `stop`
    StopCalibration,
    /// Forget collected readings and the last R0
    ClearData,
    /// Request port list refresh (async)
    RefreshPorts,
    /// Request current statistics
    RequestStats,
    /// Shutdown the backend
    Shutdown,
}

/// Message sent from the backend to the UI
#[derive(Debug, Clone)]
pub enum Notification {
    /// Connection, calibration state or capabilities changed
    StatusChanged(SessionStatus),
    /// Opening the port failed
    ConnectError(String),
    /// The open link failed; the session is now disconnected
    TransportError(String),
    /// An operator action was not allowed in the current state
    InvalidOperation(String),
    /// A reading was appended to the sample store
    ReadingUpdated(Reading),
    /// Calibration progress in percent
    ProgressUpdated(f64),
    CalibrationSucceeded,
    CalibrationFailed,
    /// The device reported its R0 value
    R0Updated(f64),
    /// Collected data was cleared
    DataCleared,
    /// Statistics update
    Stats(SessionStats),
    /// Port list update (response to RefreshPorts)
    PortList(Vec<PortInfo>),
    /// Backend is shutting down
    Shutdown,
}

/// Creates the transport used for a given port name
pub type TransportFactory = Box<dyn Fn(&str) -> Box<dyn Transport> + Send>;

/// Serial ports for everything except `mock://` names when the mock is enabled
pub fn default_transport_factory(read_timeout: Duration) -> TransportFactory {
    Box::new(move |port: &str| -> Box<dyn Transport> {
        #[cfg(feature = "mock-device")]
        {
            if port.starts_with(mock_device::MOCK_PORT_PREFIX) {
                return Box::new(mock_device::MockDevice::default());
            }
        }
        #[cfg(not(feature = "mock-device"))]
        let _ = port;

        Box::new(SerialTransport::new(read_timeout))
    })
}

/// List all available ports (real + mock if feature enabled)
/// This should be called from a background thread, not the UI thread.
pub fn list_all_ports() -> Vec<PortInfo> {
    #[allow(unused_mut)]
    let mut ports = list_ports();

    #[cfg(feature = "mock-device")]
    {
        ports.push(PortInfo {
            name: mock_device::MOCK_PORT_NAME.to_string(),
            description: "Simulated device".to_string(),
        });
    }

    ports
}

/// List ports asynchronously by sending result through a channel
pub fn list_ports_async(sender: Sender<Notification>) {
    let spawned = std::thread::Builder::new()
        .name("gascal-port-scan".to_string())
        .spawn(move || {
            let ports = list_all_ports();
            tracing::debug!("Found {} ports", ports.len());
            let _ = sender.try_send(Notification::PortList(ports));
        });
    if let Err(e) = spawned {
        tracing::error!("Failed to spawn port scan: {}", e);
    }
}

/// Frontend receiver for backend messages
pub struct FrontendReceiver {
    /// Receiver for backend notifications
    pub receiver: Receiver<Notification>,
    /// Sender for commands to the backend
    pub command_sender: Sender<BackendCommand>,
    /// Readings written by the backend, read by the UI
    pub store: SharedSampleStore,
}

impl FrontendReceiver {
    /// Try to receive a message without blocking
    pub fn try_recv(&self) -> Option<Notification> {
        self.receiver.try_recv().ok()
    }

    /// Receive all pending messages
    pub fn drain(&self) -> Vec<Notification> {
        self.receiver.try_iter().collect()
    }

    /// Send a command to the backend
    pub fn send_command(&self, cmd: BackendCommand) -> bool {
        self.command_sender.send(cmd).is_ok()
    }

    pub fn connect(&self, port: impl Into<String>, baud_rate: u32) {
        let _ = self.command_sender.send(BackendCommand::Connect {
            port: port.into(),
            baud_rate,
        });
    }

    pub fn disconnect(&self) {
        let _ = self.command_sender.send(BackendCommand::Disconnect);
    }

    pub fn start_calibration(&self) {
        let _ = self.command_sender.send(BackendCommand::StartCalibration);
    }

    pub fn stop_calibration(&self) {
        let _ = self.command_sender.send(BackendCommand::StopCalibration);
    }

    pub fn clear_data(&self) {
        let _ = self.command_sender.send(BackendCommand::ClearData);
    }

    pub fn refresh_ports(&self) {
        let _ = self.command_sender.send(BackendCommand::RefreshPorts);
    }

    pub fn request_stats(&self) {
        let _ = self.command_sender.send(BackendCommand::RequestStats);
    }

    /// Request shutdown
    pub fn shutdown(&self) {
        let _ = self.command_sender.send(BackendCommand::Shutdown);
    }
}

/// The serial backend that runs in a separate thread
pub struct SerialBackend {
    config: AppConfig,
    command_receiver: Receiver<BackendCommand>,
    message_sender: Sender<Notification>,
    running: Arc<AtomicBool>,
    store: SharedSampleStore,
    transport_factory: TransportFactory,
}

impl SerialBackend {
    /// Create a new backend using real serial ports
    pub fn new(config: AppConfig) -> (Self, FrontendReceiver) {
        let factory = default_transport_factory(config.serial.read_timeout());
        Self::with_transport_factory(config, factory)
    }

    /// Create a backend whose transports come from `factory`
    pub fn with_transport_factory(
        config: AppConfig,
        factory: TransportFactory,
    ) -> (Self, FrontendReceiver) {
        let (cmd_tx, cmd_rx) = bounded(256);
        let (msg_tx, msg_rx) = bounded(config.collection.notification_queue_size.max(1));
        let store = share_sample_store(config.collection.max_samples);

        let backend = Self {
            config,
            command_receiver: cmd_rx,
            message_sender: msg_tx,
            running: Arc::new(AtomicBool::new(true)),
            store: store.clone(),
            transport_factory: factory,
        };

        let frontend = FrontendReceiver {
            receiver: msg_rx,
            command_sender: cmd_tx,
            store,
        };

        (backend, frontend)
    }

    /// Run the backend loop
    pub fn run(self) {
        let mut worker = BackendWorker::new(
            self.config,
            self.command_receiver,
            self.message_sender,
            self.running,
            self.store,
            self.transport_factory,
        );
        worker.run();
    }

    /// Get a handle to stop the backend
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        self.running.clone()
    }
}
