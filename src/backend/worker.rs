//! Backend Worker Thread Implementation
//!
//! This module contains the main worker loop that runs in a separate thread.
//! The worker is the only owner of the [`Session`]; every state change
//! happens here, one message at a time.
//!
//! # Responsibilities
//!
//! - **Command processing**: Responds to UI commands (connect, calibrate, stop, etc.)
//! - **Line processing**: Feeds lines from the reader thread through the session
//! - **Reader lifecycle**: Spawns the reader on connect and joins it on disconnect
//! - **Statistics tracking**: Publishes session counters at most every 500ms
//!
//! # Wake-ups
//!
//! The loop blocks in `select!` on the command channel and the current line
//! channel. A 100ms idle timeout bounds how long a shutdown flag set from
//! another thread can go unnoticed.

use crate::backend::reader::{spawn_reader, ReaderEvent, ReaderHandle};
use crate::backend::{list_ports_async, BackendCommand, Notification, TransportFactory};
use crate::config::AppConfig;
use crate::session::{Session, SharedSampleStore};
use crate::types::{ConnectionStatus, SessionStats};
use crossbeam_channel::{bounded, never, select, Receiver, Sender};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Longest the loop sleeps without a message
const IDLE_TIMEOUT: Duration = Duration::from_millis(100);

/// Minimum spacing of unsolicited stats updates
const STATS_INTERVAL: Duration = Duration::from_millis(500);

/// The backend worker that runs the session loop
pub struct BackendWorker {
    config: AppConfig,
    /// Command receiver from the UI
    command_rx: Receiver<BackendCommand>,
    /// Kept for async port scans; the session holds its own clone
    message_tx: Sender<Notification>,
    running: Arc<AtomicBool>,
    session: Session,
    transport_factory: TransportFactory,
    /// Lines from the current connection's reader
    lines: Option<Receiver<ReaderEvent>>,
    reader: Option<ReaderHandle>,
    last_stats_time: Instant,
    last_published_stats: SessionStats,
}

impl BackendWorker {
    pub fn new(
        config: AppConfig,
        command_rx: Receiver<BackendCommand>,
        message_tx: Sender<Notification>,
        running: Arc<AtomicBool>,
        store: SharedSampleStore,
        transport_factory: TransportFactory,
    ) -> Self {
        let transport = transport_factory(&config.serial.port);
        let session = Session::new(transport, store, message_tx.clone());

        Self {
            config,
            command_rx,
            message_tx,
            running,
            session,
            transport_factory,
            lines: None,
            reader: None,
            last_stats_time: Instant::now(),
            last_published_stats: SessionStats::default(),
        }
    }

    /// Run the main worker loop
    pub fn run(&mut self) {
        tracing::info!("Backend worker started");
        let status = self.session.status();
        self.session.publish(Notification::StatusChanged(status));

        while self.running.load(Ordering::SeqCst) {
            let commands = self.command_rx.clone();
            let lines = self.lines.clone().unwrap_or_else(never);

            select! {
                recv(commands) -> cmd => match cmd {
                    Ok(cmd) => self.handle_command(cmd),
                    Err(_) => {
                        tracing::debug!("Command channel closed");
                        self.running.store(false, Ordering::SeqCst);
                    }
                },
                recv(lines) -> event => match event {
                    Ok(event) => self.handle_reader_event(event),
                    Err(_) => self.handle_reader_gone(),
                },
                default(IDLE_TIMEOUT) => {}
            }

            self.sync_reader();
            if self.last_stats_time.elapsed() >= STATS_INTERVAL {
                self.publish_stats_if_changed();
            }
        }

        // Cleanup
        self.handle_disconnect();
        self.session.publish(Notification::Shutdown);
        tracing::info!("Backend worker stopped");
    }

    /// Handle a single command
    pub fn handle_command(&mut self, cmd: BackendCommand) {
        match cmd {
            BackendCommand::Connect { port, baud_rate } => self.handle_connect(&port, baud_rate),
            BackendCommand::Disconnect => self.handle_disconnect(),
            BackendCommand::StartCalibration => self.session.start_calibration(),
            BackendCommand::StopCalibration => self.session.stop_calibration(),
            BackendCommand::ClearData => self.session.clear_data(),
            BackendCommand::RefreshPorts => list_ports_async(self.message_tx.clone()),
            BackendCommand::RequestStats => self.send_stats(),
            BackendCommand::Shutdown => self.running.store(false, Ordering::SeqCst),
        }
    }

    /// Read-only access for tests and diagnostics
    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn is_reading(&self) -> bool {
        self.reader.as_ref().is_some_and(|r| !r.is_finished())
    }

    fn handle_connect(&mut self, port: &str, baud_rate: u32) {
        if self.session.connection() == ConnectionStatus::Disconnected {
            if let Err(e) = self.session.set_transport((self.transport_factory)(port)) {
                tracing::warn!("Keeping current transport: {}", e);
            }
        }

        let Some(reader) = self.session.connect(port, baud_rate) else {
            return;
        };

        let (line_tx, line_rx) = bounded(self.config.collection.line_queue_size.max(1));
        self.reader = Some(spawn_reader(
            reader,
            line_tx,
            self.config.serial.read_timeout(),
        ));
        self.lines = Some(line_rx);
    }

    fn handle_disconnect(&mut self) {
        self.stop_reader();
        self.session.disconnect();
    }

    fn handle_reader_event(&mut self, event: ReaderEvent) {
        match event {
            ReaderEvent::Line(line) => self.session.on_line(&line),
            ReaderEvent::Failed(reason) => {
                self.stop_reader();
                self.session.on_transport_failure(&reason);
            }
        }
    }

    /// The reader dropped its sender without reporting a failure
    fn handle_reader_gone(&mut self) {
        self.stop_reader();
        if self.session.connection() == ConnectionStatus::Connected {
            self.session.on_transport_failure("Line reader stopped unexpectedly");
        }
    }

    /// Stop the reader if the session dropped to Disconnected on its own
    fn sync_reader(&mut self) {
        if self.reader.is_some() && self.session.connection() == ConnectionStatus::Disconnected {
            self.stop_reader();
        }
    }

    fn stop_reader(&mut self) {
        // Dropping the receiver first unblocks a reader stuck on a full channel
        self.lines = None;
        if let Some(mut reader) = self.reader.take() {
            reader.stop();
        }
    }

    fn publish_stats_if_changed(&mut self) {
        self.session.republish_dropped_status();
        if *self.session.stats() != self.last_published_stats {
            self.send_stats();
        }
        self.last_stats_time = Instant::now();
    }

    /// Send statistics to UI
    fn send_stats(&mut self) {
        let stats = self.session.stats().clone();
        self.last_published_stats = stats.clone();
        self.last_stats_time = Instant::now();
        self.session.publish(Notification::Stats(stats));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::mock_device::{MockDevice, MockDeviceConfig, MockDeviceHandle};
    use crate::backend::transport::Transport;
    use crate::session::share_sample_store;
    use crate::types::CalibrationState;
    use std::sync::Mutex;

    struct Harness {
        worker: BackendWorker,
        notifications: Receiver<Notification>,
        _commands: Sender<BackendCommand>,
        devices: Arc<Mutex<Vec<MockDeviceHandle>>>,
    }

    fn create_test_worker(config: MockDeviceConfig) -> Harness {
        let (cmd_tx, cmd_rx) = bounded(16);
        let (msg_tx, msg_rx) = bounded(1024);
        let devices = Arc::new(Mutex::new(Vec::new()));
        let created = devices.clone();
        let factory: TransportFactory = Box::new(move |_port: &str| -> Box<dyn Transport> {
            let device = MockDevice::new(config.clone());
            created.lock().unwrap().push(device.handle());
            Box::new(device)
        });

        let worker = BackendWorker::new(
            AppConfig::default(),
            cmd_rx,
            msg_tx,
            Arc::new(AtomicBool::new(true)),
            share_sample_store(100),
            factory,
        );
        Harness {
            worker,
            notifications: msg_rx,
            _commands: cmd_tx,
            devices,
        }
    }

    fn connect(h: &mut Harness) -> MockDeviceHandle {
        h.worker.handle_command(BackendCommand::Connect {
            port: "mock://device".into(),
            baud_rate: 115200,
        });
        h.devices.lock().unwrap().last().cloned().unwrap()
    }

    /// Pump reader events until `done` or a timeout
    fn pump_until(h: &mut Harness, done: impl Fn(&BackendWorker) -> bool) {
        let deadline = Instant::now() + Duration::from_secs(2);
        while !done(&h.worker) && Instant::now() < deadline {
            if let Some(lines) = h.worker.lines.clone() {
                match lines.recv_timeout(Duration::from_millis(20)) {
                    Ok(event) => h.worker.handle_reader_event(event),
                    Err(crossbeam_channel::RecvTimeoutError::Disconnected) => {
                        h.worker.handle_reader_gone()
                    }
                    Err(_) => {}
                }
            } else {
                std::thread::sleep(Duration::from_millis(5));
            }
            h.worker.sync_reader();
        }
    }

    #[test]
    fn test_worker_creation() {
        let h = create_test_worker(MockDeviceConfig::quiet());
        assert_eq!(h.worker.session().connection(), ConnectionStatus::Disconnected);
        assert!(!h.worker.is_reading());
    }

    #[test]
    fn test_connect_spawns_reader() {
        let mut h = create_test_worker(MockDeviceConfig::quiet());
        let device = connect(&mut h);

        assert_eq!(h.worker.session().connection(), ConnectionStatus::Connected);
        assert!(h.worker.is_reading());
        assert_eq!(device.received_commands(), vec!["status"]);

        h.worker.handle_command(BackendCommand::Disconnect);
        assert!(!h.worker.is_reading());
        assert_eq!(h.worker.session().connection(), ConnectionStatus::Disconnected);
    }

    #[test]
    fn test_calibration_through_reader() {
        let mut h = create_test_worker(MockDeviceConfig::quiet());
        connect(&mut h);
        h.worker.handle_command(BackendCommand::StartCalibration);

        pump_until(&mut h, |w| w.session().calibration() == CalibrationState::Completed);
        assert_eq!(h.worker.session().calibration(), CalibrationState::Completed);
        pump_until(&mut h, |w| w.session().last_r0().is_some());
        assert_eq!(h.worker.session().last_r0(), Some(10.0));

        let notes: Vec<Notification> = h.notifications.try_iter().collect();
        assert!(notes
            .iter()
            .any(|n| matches!(n, Notification::CalibrationSucceeded)));
        assert!(notes
            .iter()
            .any(|n| matches!(n, Notification::ProgressUpdated(p) if *p == 100.0)));
    }

    #[test]
    fn test_link_loss_disconnects() {
        let mut h = create_test_worker(MockDeviceConfig::quiet());
        let device = connect(&mut h);
        device.lose_link();

        pump_until(&mut h, |w| {
            w.session().connection() == ConnectionStatus::Disconnected
        });
        assert_eq!(h.worker.session().connection(), ConnectionStatus::Disconnected);
        assert!(!h.worker.is_reading());
        assert!(h
            .notifications
            .try_iter()
            .any(|n| matches!(n, Notification::TransportError(_))));
    }

    #[test]
    fn test_write_failure_stops_reader() {
        let mut h = create_test_worker(MockDeviceConfig::quiet());
        let device = connect(&mut h);
        device.set_fail_writes(true);

        h.worker.handle_command(BackendCommand::StartCalibration);
        h.worker.sync_reader();
        assert!(!h.worker.is_reading());
        assert_eq!(h.worker.session().connection(), ConnectionStatus::Disconnected);
    }

    #[test]
    fn test_reconnect_uses_fresh_transport() {
        let mut h = create_test_worker(MockDeviceConfig::quiet());
        connect(&mut h);
        h.worker.handle_command(BackendCommand::Disconnect);
        let second = connect(&mut h);

        // One transport from construction, one per connect
        assert_eq!(h.devices.lock().unwrap().len(), 3);
        assert_eq!(second.received_commands(), vec!["status"]);
    }

    #[test]
    fn test_request_stats() {
        let mut h = create_test_worker(MockDeviceConfig::quiet());
        connect(&mut h);
        h.notifications.try_iter().count();

        h.worker.handle_command(BackendCommand::RequestStats);
        match h.notifications.try_recv() {
            Ok(Notification::Stats(stats)) => assert_eq!(stats.commands_sent, 1),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_shutdown_command() {
        let mut h = create_test_worker(MockDeviceConfig::quiet());
        connect(&mut h);
        h.worker.handle_command(BackendCommand::Shutdown);
        assert!(!h.worker.running.load(Ordering::SeqCst));

        h.worker.run();
        assert!(!h.worker.is_reading());
        assert!(h
            .notifications
            .try_iter()
            .any(|n| matches!(n, Notification::Shutdown)));
    }
}
